//! I2C bus context manager
//!
//! `iicbus` lets higher-level code talk to I2C slaves on a numbered bus
//! without touching the kernel interface directly. A [`BusContext`] holds
//! one open bus, the slave address transfers go to and the negotiated bus
//! speed. The bytes themselves are moved by a [`Transport`]: the Linux
//! i2c-dev interface in production, or an in-memory mock in tests.
//!
//! ```ignore
//! use iicbus::{BusContext, transport::LinuxTransport};
//!
//! let mut i2c = BusContext::init_raw(LinuxTransport::default(), 1)?;
//! i2c.frequency(400_000)?;
//! i2c.address(0x1E)?;
//! let id = i2c.read_byte_data(0x0A)?;
//! i2c.stop()?;
//! # Ok::<(), iicbus::BusError>(())
//! ```

pub mod board;
pub mod context;
pub mod transport;

pub use board::{BusResolver, RawBuses, open_configured};
pub use context::{BusContext, ContextState};
pub use iic_common::{Address, BusError, BusResult, BusSpeed, Status, TransportError};
pub use transport::Transport;
