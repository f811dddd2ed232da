use alloc::vec::Vec;

use super::error::DecodeError;
use crate::mac::MacAddress;
use crate::message::MessageType;

/// Radio frame limit in bytes
pub const MAX_MESSAGE_LENGTH: usize = 256;

/// First header byte: type tag in the upper 7 bits, last flag in bit 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameFlags(u8);

impl FrameFlags {
    const LAST: u8 = 0b0000_0001;

    pub fn new(message_type: MessageType) -> Self {
        Self(message_type.as_u8() << 1)
    }

    pub fn with_last(mut self, last: bool) -> Self {
        if last {
            self.0 |= Self::LAST;
        } else {
            self.0 &= !Self::LAST;
        }
        self
    }

    pub fn is_last(&self) -> bool {
        (self.0 & Self::LAST) != 0
    }

    pub fn type_tag(&self) -> u8 {
        self.0 >> 1
    }

    pub fn as_u8(&self) -> u8 {
        self.0
    }

    pub fn from_u8(value: u8) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub message_type: MessageType,
    pub last: bool,
    pub source: MacAddress,
    pub dest: MacAddress,
}

impl FrameHeader {
    /// Header size: flags(1) + source(6) + dest(6)
    pub const SIZE: usize = 1 + 2 * MacAddress::LENGTH;

    pub fn encode(&self, buffer: &mut Vec<u8>) {
        let flags = FrameFlags::new(self.message_type).with_last(self.last);
        buffer.push(flags.as_u8());
        buffer.extend_from_slice(self.source.as_bytes());
        buffer.extend_from_slice(self.dest.as_bytes());
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        if data.len() < Self::SIZE {
            return Err(DecodeError::TooShort(data.len()));
        }

        let flags = FrameFlags::from_u8(data[0]);
        let message_type = MessageType::from_u8(flags.type_tag())?;
        let source = MacAddress::from_slice(&data[1..7]).ok_or(DecodeError::TooShort(data.len()))?;
        let dest = MacAddress::from_slice(&data[7..13]).ok_or(DecodeError::TooShort(data.len()))?;

        Ok(Self {
            message_type,
            last: flags.is_last(),
            source,
            dest,
        })
    }
}
