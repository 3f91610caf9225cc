//! Core data types for the iicbus library and CLI
//!
//! - Address: a validated 7-bit slave address (0 is the general call)
//! - BusSpeed: the discrete clock rates an I2C bus can run at

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::BusError;
use crate::protocol;

/// A 7-bit I2C slave address
///
/// The read/write flag is not part of the address; callers pass the bare
/// 7-bit value (e.g. 0x42, not 0x84/0x85).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(u8);

impl Address {
    /// The general call address
    pub const GENERAL_CALL: Address = Address(protocol::GENERAL_CALL_ADDRESS);

    /// Validate a raw address
    ///
    /// # Errors
    /// Returns `BusError::InvalidParameter` if the value does not fit in 7 bits.
    pub fn new(raw: u16) -> Result<Self, BusError> {
        if raw > protocol::MAX_7BIT_ADDRESS as u16 {
            return Err(BusError::InvalidParameter(format!(
                "address 0x{:02X} is outside the 7-bit range",
                raw
            )));
        }
        Ok(Self(raw as u8))
    }

    /// Raw address value
    pub fn value(self) -> u8 {
        self.0
    }

    /// Check if this is the general call address
    pub fn is_general_call(self) -> bool {
        self.0 == protocol::GENERAL_CALL_ADDRESS
    }

    /// Check if this address is reserved by the I2C standard
    pub fn is_reserved(self) -> bool {
        self.0 < protocol::FIRST_SCAN_ADDRESS || self.0 > protocol::LAST_SCAN_ADDRESS
    }
}

impl From<Address> for u16 {
    fn from(address: Address) -> Self {
        address.0 as u16
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

/// I2C bus speed mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BusSpeed {
    /// Standard mode, 100 kHz
    #[default]
    Standard,
    /// Fast mode, 400 kHz
    Fast,
    /// Fast mode plus, 1 MHz
    FastPlus,
    /// High speed mode, 3.4 MHz
    High,
}

impl BusSpeed {
    /// All speed modes, slowest first
    pub const ALL: [BusSpeed; 4] = [
        BusSpeed::Standard,
        BusSpeed::Fast,
        BusSpeed::FastPlus,
        BusSpeed::High,
    ];

    /// Clock rate of this mode in hertz
    pub fn hz(self) -> u32 {
        match self {
            BusSpeed::Standard => protocol::STANDARD_MODE_HZ,
            BusSpeed::Fast => protocol::FAST_MODE_HZ,
            BusSpeed::FastPlus => protocol::FAST_MODE_PLUS_HZ,
            BusSpeed::High => protocol::HIGH_SPEED_MODE_HZ,
        }
    }

    /// Fastest mode that does not exceed `hz`
    ///
    /// Returns `None` for requests below standard mode, which no mode can honor.
    pub fn at_most(hz: u32) -> Option<Self> {
        Self::ALL.into_iter().rev().find(|speed| speed.hz() <= hz)
    }

    /// Mode running at exactly `hz`
    pub fn from_hz(hz: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|speed| speed.hz() == hz)
    }
}

impl fmt::Display for BusSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BusSpeed::Standard => "standard",
            BusSpeed::Fast => "fast",
            BusSpeed::FastPlus => "fast-plus",
            BusSpeed::High => "high-speed",
        };
        write!(f, "{} ({} Hz)", name, self.hz())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_accepts_7bit_range() {
        assert_eq!(Address::new(0x42).unwrap().value(), 0x42);
        assert_eq!(Address::new(0x7F).unwrap().value(), 0x7F);
        assert!(Address::new(0x80).is_err());
        assert!(Address::new(0x3FF).is_err());
    }

    #[test]
    fn test_address_general_call() {
        let addr = Address::new(0).unwrap();
        assert!(addr.is_general_call());
        assert_eq!(addr, Address::GENERAL_CALL);
        assert_eq!(Address::default(), Address::GENERAL_CALL);
        assert!(!Address::new(0x42).unwrap().is_general_call());
    }

    #[test]
    fn test_address_reserved() {
        assert!(Address::new(0x00).unwrap().is_reserved());
        assert!(Address::new(0x02).unwrap().is_reserved());
        assert!(!Address::new(0x03).unwrap().is_reserved());
        assert!(!Address::new(0x77).unwrap().is_reserved());
        assert!(Address::new(0x78).unwrap().is_reserved());
    }

    #[test]
    fn test_address_display() {
        assert_eq!(Address::new(0x6D).unwrap().to_string(), "0x6D");
        assert_eq!(Address::new(0x05).unwrap().to_string(), "0x05");
    }

    #[test]
    fn test_bus_speed_at_most() {
        assert_eq!(BusSpeed::at_most(100_000), Some(BusSpeed::Standard));
        assert_eq!(BusSpeed::at_most(399_999), Some(BusSpeed::Standard));
        assert_eq!(BusSpeed::at_most(400_000), Some(BusSpeed::Fast));
        assert_eq!(BusSpeed::at_most(999_999), Some(BusSpeed::Fast));
        assert_eq!(BusSpeed::at_most(1_000_000), Some(BusSpeed::FastPlus));
        assert_eq!(BusSpeed::at_most(10_000_000), Some(BusSpeed::High));
        assert_eq!(BusSpeed::at_most(99_999), None);
        assert_eq!(BusSpeed::at_most(0), None);
    }

    #[test]
    fn test_bus_speed_from_hz() {
        assert_eq!(BusSpeed::from_hz(400_000), Some(BusSpeed::Fast));
        assert_eq!(BusSpeed::from_hz(3_400_000), Some(BusSpeed::High));
        assert_eq!(BusSpeed::from_hz(250_000), None);
    }

    #[test]
    fn test_bus_speed_serde_names() {
        let yaml = serde_yaml::to_string(&BusSpeed::FastPlus).unwrap();
        assert_eq!(yaml.trim(), "fast-plus");
        let speed: BusSpeed = serde_yaml::from_str("fast").unwrap();
        assert_eq!(speed, BusSpeed::Fast);
    }
}
