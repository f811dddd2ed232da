use core::fmt;

use crate::message::MessageType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame shorter than the fixed header
    TooShort(usize),
    /// Type tag outside the known message kinds
    UnknownType(u8),
    /// Body shorter than its message kind requires
    Truncated(MessageType),
    /// Frame exceeds the radio frame limit
    Oversized(usize),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort(len) => write!(f, "Frame too short: {} bytes", len),
            Self::UnknownType(tag) => write!(f, "Unknown message type: {}", tag),
            Self::Truncated(kind) => write!(f, "Truncated {} message", kind),
            Self::Oversized(len) => write!(f, "Frame too large: {} bytes", len),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DecodeError {}
