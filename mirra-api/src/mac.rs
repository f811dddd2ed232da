use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// 6-byte radio identity of a module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct MacAddress(pub [u8; 6]);

impl MacAddress {
    pub const LENGTH: usize = 6;

    /// Length of the `AA:BB:CC:DD:EE:FF` form
    pub const STRING_LENGTH: usize = 17;

    /// All-zero sentinel, addresses every listener
    pub const BROADCAST: MacAddress = MacAddress([0; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 6] = bytes.get(..Self::LENGTH)?.try_into().ok()?;
        Some(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }

    pub fn is_broadcast(&self) -> bool {
        *self == Self::BROADCAST
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacParseError;

impl fmt::Display for MacParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid MAC address, expected AA:BB:CC:DD:EE:FF")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for MacParseError {}

impl FromStr for MacAddress {
    type Err = MacParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != Self::STRING_LENGTH {
            return Err(MacParseError);
        }

        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for byte in bytes.iter_mut() {
            let part = parts.next().ok_or(MacParseError)?;
            if part.len() != 2 {
                return Err(MacParseError);
            }
            *byte = u8::from_str_radix(part, 16).map_err(|_| MacParseError)?;
        }

        if parts.next().is_some() {
            return Err(MacParseError);
        }

        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_mac_display() {
        let mac = MacAddress::new([0xB4, 0xE6, 0x2D, 0xDD, 0x3A, 0x09]);
        assert_eq!(mac.to_string(), "B4:E6:2D:DD:3A:09");
        assert_eq!(mac.to_string().len(), MacAddress::STRING_LENGTH);
    }

    #[test]
    fn test_mac_parse() {
        let mac: MacAddress = "b4:e6:2d:dd:3a:09".parse().unwrap();
        assert_eq!(mac, MacAddress::new([0xB4, 0xE6, 0x2D, 0xDD, 0x3A, 0x09]));

        assert!("B4:E6:2D:DD:3A".parse::<MacAddress>().is_err());
        assert!("B4-E6-2D-DD-3A-09".parse::<MacAddress>().is_err());
        assert!("B4:E6:2D:DD:3A:ZZ".parse::<MacAddress>().is_err());
    }

    #[test]
    fn test_broadcast_sentinel() {
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert!(MacAddress::default().is_broadcast());
        assert!(!MacAddress::new([0, 0, 0, 0, 0, 1]).is_broadcast());
        assert_eq!(MacAddress::BROADCAST.to_string(), "00:00:00:00:00:00");
    }

    #[test]
    fn test_from_slice() {
        let raw = [1, 2, 3, 4, 5, 6, 7];
        assert_eq!(MacAddress::from_slice(&raw), Some(MacAddress::new([1, 2, 3, 4, 5, 6])));
        assert_eq!(MacAddress::from_slice(&raw[..5]), None);
    }
}
