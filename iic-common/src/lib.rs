//! Shared types and utilities for the iicbus library and the iic CLI

pub mod config;
pub mod error;
pub mod protocol;
pub mod types;

pub use error::{BusError, BusResult, Status, TransportError};
pub use types::{Address, BusSpeed};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
