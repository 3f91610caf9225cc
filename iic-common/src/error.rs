//! Error types for the iicbus library and CLI
//!
//! This module provides the error hierarchy for bus access:
//! - Status: the closed result enumeration with stable numeric codes
//! - BusError: errors reported by bus context operations
//! - TransportError: errors reported by a bus transport
//! - ConfigError: configuration loading/validation errors (re-exported from config module)
//! - ProtocolError: decoding errors (re-exported from protocol module)

use std::fmt;
use std::io;

pub use crate::config::ConfigError;
pub use crate::protocol::ProtocolError;
use crate::types::{Address, BusSpeed};

// ============================================================================
// Status
// ============================================================================

/// Result status of a bus operation
///
/// The numeric codes are stable and follow the historical libmaa encoding,
/// so they can be handed across a C or process boundary unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Status {
    /// Operation completed
    Success = 0,
    /// Requested configuration is not supported by the bus
    Unsupported = 2,
    /// An argument was out of range
    InvalidParameter = 4,
    /// The context was never opened or has been stopped
    InvalidHandle = 5,
    /// Any other failure (acquisition, transfer, release)
    Error = 99,
}

impl Status {
    /// Numeric status code
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Success => "success",
            Status::Unsupported => "unsupported configuration",
            Status::InvalidParameter => "invalid parameter",
            Status::InvalidHandle => "invalid handle",
            Status::Error => "error",
        };
        write!(f, "{} ({})", name, self.code())
    }
}

impl From<&BusError> for Status {
    fn from(err: &BusError) -> Self {
        err.status()
    }
}

impl<T> From<&BusResult<T>> for Status {
    fn from(result: &BusResult<T>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(err) => err.status(),
        }
    }
}

// ============================================================================
// Bus Error
// ============================================================================

/// Errors reported by bus context operations
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    /// The transport could not open the bus
    #[error("Failed to open I2C bus {bus}: {source}")]
    Open {
        bus: u32,
        #[source]
        source: TransportError,
    },

    /// Logical bus id has no mapping on this board
    #[error("Logical bus {0} is not mapped on this board")]
    UnknownBus(i32),

    /// Context was never opened or has already been stopped
    #[error("Invalid handle: I2C context is not open")]
    InvalidHandle,

    /// Argument out of range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Bus cannot run at (or near) the requested rate
    #[error("Unsupported bus frequency: {hz} Hz")]
    Unsupported { hz: u32 },

    /// Transfer with a slave failed
    #[error("Transfer with slave {address} failed: {source}")]
    Transfer {
        address: Address,
        #[source]
        source: TransportError,
    },

    /// Only part of a write reached the slave
    #[error("Partial write to slave {address}: {written} of {expected} bytes")]
    PartialWrite {
        address: Address,
        expected: usize,
        written: usize,
    },

    /// Read returned fewer bytes than the operation needs
    #[error("Short read from slave {address}: expected {expected} bytes, got {got}")]
    ShortRead {
        address: Address,
        expected: usize,
        got: usize,
    },

    /// The transport reported a failure while releasing the bus
    #[error("Failed to close I2C bus {bus}: {source}")]
    Close {
        bus: u32,
        #[source]
        source: TransportError,
    },
}

impl BusError {
    /// Map this error onto the closed status enumeration
    pub fn status(&self) -> Status {
        match self {
            BusError::InvalidHandle => Status::InvalidHandle,
            BusError::InvalidParameter(_) | BusError::UnknownBus(_) => Status::InvalidParameter,
            BusError::Unsupported { .. } => Status::Unsupported,
            BusError::Open { .. }
            | BusError::Transfer { .. }
            | BusError::PartialWrite { .. }
            | BusError::ShortRead { .. }
            | BusError::Close { .. } => Status::Error,
        }
    }

    /// Check if the slave did not acknowledge its address
    ///
    /// A no-ack usually means "no device at this address" rather than a
    /// transient fault, which is why it gets its own predicate.
    pub fn is_no_ack(&self) -> bool {
        matches!(
            self,
            BusError::Transfer {
                source: TransportError::NoAck(_),
                ..
            }
        )
    }
}

// ============================================================================
// Transport Error
// ============================================================================

/// Errors reported by a bus transport
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Bus device does not exist
    #[error("No such I2C bus: {0}")]
    NoSuchBus(u32),

    /// Bus device exists but could not be opened
    #[error("Failed to open I2C device {device}: {source}")]
    DeviceOpen {
        device: String,
        #[source]
        source: io::Error,
    },

    /// Slave did not acknowledge
    #[error("No acknowledge from slave {0}")]
    NoAck(Address),

    /// Bus or address is claimed by someone else
    #[error("I2C bus busy")]
    Busy,

    /// Hardware-level timeout (e.g. clock stretching)
    #[error("I2C bus timeout")]
    Timeout,

    /// Adapter cannot run at this speed
    #[error("Bus speed {0} is not supported by this adapter")]
    UnsupportedSpeed(BusSpeed),

    /// Any other I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

// ============================================================================
// Result Type Aliases
// ============================================================================

/// Result type using BusError
pub type BusResult<T> = std::result::Result<T, BusError>;

/// Result type using TransportError
pub type TransportResult<T> = std::result::Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(raw: u16) -> Address {
        Address::new(raw).unwrap()
    }

    #[test]
    fn test_status_codes_are_stable() {
        assert_eq!(Status::Success.code(), 0);
        assert_eq!(Status::Unsupported.code(), 2);
        assert_eq!(Status::InvalidParameter.code(), 4);
        assert_eq!(Status::InvalidHandle.code(), 5);
        assert_eq!(Status::Error.code(), 99);
    }

    #[test]
    fn test_bus_error_status_mapping() {
        assert_eq!(BusError::InvalidHandle.status(), Status::InvalidHandle);
        assert_eq!(
            BusError::InvalidParameter("x".to_string()).status(),
            Status::InvalidParameter
        );
        assert_eq!(BusError::UnknownBus(7).status(), Status::InvalidParameter);
        assert_eq!(
            BusError::Unsupported { hz: 50_000 }.status(),
            Status::Unsupported
        );
        assert_eq!(
            BusError::Open {
                bus: 1,
                source: TransportError::NoSuchBus(1)
            }
            .status(),
            Status::Error
        );
        assert_eq!(
            BusError::PartialWrite {
                address: addr(0x42),
                expected: 2,
                written: 1
            }
            .status(),
            Status::Error
        );
    }

    #[test]
    fn test_status_from_result() {
        let ok: BusResult<u8> = Ok(7);
        assert_eq!(Status::from(&ok), Status::Success);

        let err: BusResult<u8> = Err(BusError::InvalidHandle);
        assert_eq!(Status::from(&err), Status::InvalidHandle);
    }

    #[test]
    fn test_is_no_ack() {
        let err = BusError::Transfer {
            address: addr(0x42),
            source: TransportError::NoAck(addr(0x42)),
        };
        assert!(err.is_no_ack());

        let err = BusError::Transfer {
            address: addr(0x42),
            source: TransportError::Busy,
        };
        assert!(!err.is_no_ack());
    }

    #[test]
    fn test_open_error_message() {
        let err = BusError::Open {
            bus: 1,
            source: TransportError::DeviceOpen {
                device: "/dev/i2c-1".to_string(),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "permission denied"),
            },
        };
        let msg = err.to_string();
        assert!(msg.contains("bus 1"));
        assert!(msg.contains("/dev/i2c-1"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_transfer_error_message() {
        let err = BusError::Transfer {
            address: addr(0x6D),
            source: TransportError::NoAck(addr(0x6D)),
        };
        let msg = err.to_string();
        assert!(msg.contains("0x6D"));
        assert!(msg.contains("No acknowledge"));
    }

    #[test]
    fn test_short_read_message() {
        let err = BusError::ShortRead {
            address: addr(0x20),
            expected: 2,
            got: 0,
        };
        let msg = err.to_string();
        assert!(msg.contains("expected 2"));
        assert!(msg.contains("got 0"));
    }

    #[test]
    fn test_transport_error_from_io() {
        fn inner() -> TransportResult<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe broken"))?;
            Ok(())
        }

        let err = inner().unwrap_err();
        assert!(matches!(err, TransportError::Io(_)));
        assert!(err.to_string().contains("pipe broken"));
    }
}
