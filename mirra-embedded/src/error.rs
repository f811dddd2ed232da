use core::fmt;

use mirra_api::DecodeError;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Decode(DecodeError),
    RadioError,
    TimeoutError,
    ScheduleFault,
    StorageFault,
    UplinkFault,
    SerializationError,
    NodeTableFull,
    SensorError,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Decode(e) => write!(f, "Decode error: {}", e),
            Error::RadioError => write!(f, "Radio error"),
            Error::TimeoutError => write!(f, "Timeout error"),
            Error::ScheduleFault => write!(f, "Comm time already passed"),
            Error::StorageFault => write!(f, "Storage fault"),
            Error::UplinkFault => write!(f, "Uplink fault"),
            Error::SerializationError => write!(f, "Serialization error"),
            Error::NodeTableFull => write!(f, "Node table full"),
            Error::SensorError => write!(f, "Sensor error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Error::Decode(e)
    }
}

impl From<postcard::Error> for Error {
    fn from(_: postcard::Error) -> Self {
        Error::SerializationError
    }
}

pub type Result<T> = core::result::Result<T, Error>;
