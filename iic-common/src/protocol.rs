//! I2C and SMBus protocol definitions
//!
//! This module defines the reserved address ranges, the standard bus speed
//! rates and the SMBus word encoding used by the register helpers.

// ============================================================================
// Addresses
// ============================================================================

/// General call address (broadcast to every listening slave)
pub const GENERAL_CALL_ADDRESS: u8 = 0x00;

/// Highest 7-bit slave address
pub const MAX_7BIT_ADDRESS: u8 = 0x7F;

/// First address probed by a bus scan
///
/// 0x00-0x02 are reserved for general call, CBUS and other bus formats.
pub const FIRST_SCAN_ADDRESS: u8 = 0x03;

/// Last address probed by a bus scan
///
/// 0x78-0x7F are reserved for 10-bit addressing and future use.
pub const LAST_SCAN_ADDRESS: u8 = 0x77;

// ============================================================================
// Bus Speeds
// ============================================================================

/// Standard mode clock rate (100 kHz)
pub const STANDARD_MODE_HZ: u32 = 100_000;

/// Fast mode clock rate (400 kHz)
pub const FAST_MODE_HZ: u32 = 400_000;

/// Fast mode plus clock rate (1 MHz)
pub const FAST_MODE_PLUS_HZ: u32 = 1_000_000;

/// High speed mode clock rate (3.4 MHz)
pub const HIGH_SPEED_MODE_HZ: u32 = 3_400_000;

// ============================================================================
// Encoding/Decoding Functions
// ============================================================================

/// Encode a 16-bit value as SMBus word bytes (low byte first)
pub fn encode_word(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// Decode SMBus word bytes (low byte first) to a 16-bit value
pub fn decode_word(bytes: &[u8]) -> Result<u16, ProtocolError> {
    if bytes.len() < 2 {
        return Err(ProtocolError::InsufficientData {
            expected: 2,
            got: bytes.len(),
        });
    }
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Parse a number written in decimal or with a `0x`/`0X` hex prefix
///
/// Used for addresses, registers and data bytes given on the command line
/// or in configuration files.
pub fn parse_number(text: &str) -> Result<u32, ProtocolError> {
    let text = text.trim();
    let parsed = match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => text.parse::<u32>(),
    };
    parsed.map_err(|_| ProtocolError::InvalidNumber(text.to_string()))
}

// ============================================================================
// Errors
// ============================================================================

/// Protocol-level decoding errors
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Insufficient data: expected {expected} bytes, got {got}")]
    InsufficientData { expected: usize, got: usize },

    #[error("Invalid number: {0:?}")]
    InvalidNumber(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_is_low_byte_first() {
        assert_eq!(encode_word(0x1234), [0x34, 0x12]);
        assert_eq!(decode_word(&[0x34, 0x12]).unwrap(), 0x1234);
    }

    #[test]
    fn test_decode_insufficient_data() {
        let err = decode_word(&[0x12]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::InsufficientData {
                expected: 2,
                got: 1
            }
        ));
    }

    #[test]
    fn test_scan_range_excludes_reserved_addresses() {
        assert!(FIRST_SCAN_ADDRESS > GENERAL_CALL_ADDRESS);
        assert!(LAST_SCAN_ADDRESS < MAX_7BIT_ADDRESS);
        assert_eq!(LAST_SCAN_ADDRESS - FIRST_SCAN_ADDRESS + 1, 117);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("0x42").unwrap(), 0x42);
        assert_eq!(parse_number("0XFF").unwrap(), 0xFF);
        assert_eq!(parse_number("17").unwrap(), 17);
        assert_eq!(parse_number(" 3 ").unwrap(), 3);
        assert!(parse_number("0xZZ").is_err());
        assert!(parse_number("-1").is_err());
        assert!(parse_number("").is_err());
    }
}
