//! Bus transports
//!
//! A transport is the narrow capability a [`BusContext`](crate::BusContext)
//! drives: open a numbered bus, select a slave, set the clock, move bytes
//! and close. The transport owns the protocol engine; the context owns the
//! session state.

#[cfg(target_os = "linux")]
pub mod linux;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

use iic_common::error::TransportResult;
use iic_common::{Address, BusSpeed};

#[cfg(target_os = "linux")]
pub use linux::{LinuxHandle, LinuxTransport};
#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;

/// Capability required from the operating system's bus-control mechanism
///
/// Handles are moved into the transport on `close`, so a handle can only be
/// released once.
pub trait Transport {
    /// An open connection to one bus
    type Handle;

    /// Open bus number `bus`
    fn open(&self, bus: u32) -> TransportResult<Self::Handle>;

    /// Select the slave subsequent transfers on `handle` are addressed to
    fn set_slave_address(&self, handle: &mut Self::Handle, address: Address)
    -> TransportResult<()>;

    /// Run the bus at `speed`, returning the speed actually in effect
    fn set_clock(&self, handle: &mut Self::Handle, speed: BusSpeed) -> TransportResult<BusSpeed>;

    /// Blocking read from the selected slave, returning the byte count
    fn read(&self, handle: &mut Self::Handle, buf: &mut [u8]) -> TransportResult<usize>;

    /// Blocking write to the selected slave, returning the byte count
    fn write(&self, handle: &mut Self::Handle, data: &[u8]) -> TransportResult<usize>;

    /// Release the bus
    fn close(&self, handle: Self::Handle) -> TransportResult<()>;

    /// Speed a freshly opened bus runs at
    fn default_speed(&self) -> BusSpeed {
        BusSpeed::Standard
    }
}
