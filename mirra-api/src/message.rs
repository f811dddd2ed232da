use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::mac::MacAddress;
use crate::wire::frame::{FrameHeader, MAX_MESSAGE_LENGTH};
use crate::wire::DecodeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Sentinel for a failed exchange
    Error = 0,
    /// Discovery broadcast from a gateway
    Hello = 1,
    /// Node answer to a discovery broadcast
    HelloReply = 2,
    /// Schedule assignment from a gateway
    TimeConfig = 3,
    /// Node acknowledgement of a schedule
    AckTime = 4,
    /// Buffered sensor readings from a node
    SensorData = 5,
    /// Gateway acknowledgement of sensor readings
    AckData = 6,
    /// Request to retransmit the last sent message
    Repeat = 7,
    /// Receive-side wildcard, never transmitted
    All = 8,
}

impl MessageType {
    pub fn from_u8(value: u8) -> Result<Self, DecodeError> {
        match value {
            0 => Ok(Self::Error),
            1 => Ok(Self::Hello),
            2 => Ok(Self::HelloReply),
            3 => Ok(Self::TimeConfig),
            4 => Ok(Self::AckTime),
            5 => Ok(Self::SensorData),
            6 => Ok(Self::AckData),
            7 => Ok(Self::Repeat),
            other => Err(DecodeError::UnknownType(other)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Returns true if a message of type `other` passes this filter.
    pub fn accepts(&self, other: MessageType) -> bool {
        *self == Self::All || *self == other
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Hello => "HELLO",
            Self::HelloReply => "HELLO_REPLY",
            Self::TimeConfig => "TIME_CONFIG",
            Self::AckTime => "ACK_TIME",
            Self::SensorData => "SENSOR_DATA",
            Self::AckData => "ACK_DATA",
            Self::Repeat => "REPEAT",
            Self::All => "ALL",
        }
    }
}

impl core::fmt::Display for MessageType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageHeader {
    /// Marks the final message of a sequence
    pub last: bool,
    pub source: MacAddress,
    pub dest: MacAddress,
}

/// Schedule assignment. Zero in a sample field means "leave unchanged".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeConfig {
    pub cur_time: u32,
    pub sample_interval: u32,
    pub sample_rounding: u32,
    pub sample_offset: u32,
    pub comm_interval: u32,
    pub comm_time: u32,
    pub max_messages: u32,
}

impl TimeConfig {
    /// Body size: seven u32 fields
    pub const SIZE: usize = 7 * 4;

    /// Returns true if any sample field carries a new value.
    pub fn changes_sampling(&self) -> bool {
        self.sample_interval != 0 || self.sample_rounding != 0 || self.sample_offset != 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorValue {
    pub tag: u16,
    pub value: f32,
}

impl SensorValue {
    pub const SIZE: usize = 2 + 4;

    pub fn new(tag: u16, value: f32) -> Self {
        Self { tag, value }
    }

    /// Builds a value whose tag packs a 12-bit sensor type and a 4-bit instance.
    pub fn with_type(type_id: u16, instance: u8, value: f32) -> Self {
        Self::new(Self::compose_tag(type_id, instance), value)
    }

    pub fn compose_tag(type_id: u16, instance: u8) -> u16 {
        ((type_id & 0x0FFF) << 4) | (instance as u16 & 0x0F)
    }

    pub fn type_id(&self) -> u16 {
        self.tag >> 4
    }

    pub fn instance(&self) -> u8 {
        (self.tag & 0x0F) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorData {
    /// Epoch time of the readout
    pub time: u32,
    values: Vec<SensorValue>,
}

impl SensorData {
    /// Values that fit in one frame after the header, time and count fields
    pub const MAX_VALUES: usize =
        (MAX_MESSAGE_LENGTH - FrameHeader::SIZE - 4 - 1) / SensorValue::SIZE;

    /// Creates a readout, dropping values beyond [`Self::MAX_VALUES`].
    pub fn new(time: u32, mut values: Vec<SensorValue>) -> Self {
        values.truncate(Self::MAX_VALUES);
        Self { time, values }
    }

    /// Appends a value, returns false when the frame is full.
    pub fn push(&mut self, value: SensorValue) -> bool {
        if self.values.len() >= Self::MAX_VALUES {
            return false;
        }
        self.values.push(value);
        true
    }

    pub fn values(&self) -> &[SensorValue] {
        &self.values
    }

    pub fn n_values(&self) -> u8 {
        self.values.len() as u8
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Body size: time, count and values
    pub fn size(&self) -> usize {
        4 + 1 + self.values.len() * SensorValue::SIZE
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MessagePayload {
    Error,
    Hello,
    HelloReply,
    TimeConfig(TimeConfig),
    AckTime,
    SensorData(SensorData),
    AckData,
    Repeat,
}

impl MessagePayload {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Error => MessageType::Error,
            Self::Hello => MessageType::Hello,
            Self::HelloReply => MessageType::HelloReply,
            Self::TimeConfig(_) => MessageType::TimeConfig,
            Self::AckTime => MessageType::AckTime,
            Self::SensorData(_) => MessageType::SensorData,
            Self::AckData => MessageType::AckData,
            Self::Repeat => MessageType::Repeat,
        }
    }

    /// Encoded body size after the header
    pub fn size(&self) -> usize {
        match self {
            Self::TimeConfig(_) => TimeConfig::SIZE,
            Self::SensorData(data) => data.size(),
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub header: MessageHeader,
    pub payload: MessagePayload,
}

impl Message {
    pub fn new(source: MacAddress, dest: MacAddress, payload: MessagePayload) -> Self {
        Self {
            header: MessageHeader {
                last: false,
                source,
                dest,
            },
            payload,
        }
    }

    pub fn with_last(mut self, last: bool) -> Self {
        self.header.last = last;
        self
    }

    pub fn hello(source: MacAddress) -> Self {
        Self::new(source, MacAddress::BROADCAST, MessagePayload::Hello)
    }

    pub fn repeat(source: MacAddress, dest: MacAddress) -> Self {
        Self::new(source, dest, MessagePayload::Repeat)
    }

    pub fn message_type(&self) -> MessageType {
        self.payload.message_type()
    }

    pub fn is_type(&self, message_type: MessageType) -> bool {
        self.message_type() == message_type
    }

    pub fn is_last(&self) -> bool {
        self.header.last
    }

    pub fn source(&self) -> MacAddress {
        self.header.source
    }

    pub fn dest(&self) -> MacAddress {
        self.header.dest
    }

    /// Encoded length in bytes
    pub fn encoded_len(&self) -> usize {
        FrameHeader::SIZE + self.payload.size()
    }

    pub fn as_time_config(&self) -> Option<&TimeConfig> {
        match &self.payload {
            MessagePayload::TimeConfig(config) => Some(config),
            _ => None,
        }
    }

    pub fn as_sensor_data(&self) -> Option<&SensorData> {
        match &self.payload {
            MessagePayload::SensorData(data) => Some(data),
            _ => None,
        }
    }
}
