//! Logical bus resolution
//!
//! Boards number their I2C buses differently from the kernel (the header
//! bus of a Raspberry Pi is `/dev/i2c-1`, for instance). A `BusResolver`
//! turns the board's logical bus id into the raw OS bus number.

use iic_common::config::BoardConfig;
use iic_common::error::BusResult;
use tracing::debug;

use crate::context::BusContext;
use crate::transport::Transport;

/// Maps logical board bus ids to raw OS bus numbers
pub trait BusResolver {
    /// Raw bus number for `bus_id`, or `None` if the board has no such bus
    fn resolve(&self, bus_id: i32) -> Option<u32>;
}

impl BusResolver for BoardConfig {
    fn resolve(&self, bus_id: i32) -> Option<u32> {
        self.raw_bus(bus_id)
    }
}

/// Resolver for boards whose logical ids equal the raw bus numbers
#[derive(Debug, Clone, Copy, Default)]
pub struct RawBuses;

impl BusResolver for RawBuses {
    fn resolve(&self, bus_id: i32) -> Option<u32> {
        u32::try_from(bus_id).ok()
    }
}

/// Open a logical bus as a board configuration describes it
///
/// Resolves `bus_id` through the board's bus table and, if the board names
/// a frequency, requests it before handing the context back.
///
/// # Errors
/// Returns the errors of [`BusContext::init`] and [`BusContext::frequency`].
/// A context that fails to configure is released before returning.
pub fn open_configured<T: Transport>(
    config: &BoardConfig,
    transport: T,
    bus_id: i32,
) -> BusResult<BusContext<T>> {
    let mut context = BusContext::init(config, transport, bus_id)?;
    if let Some(hz) = config.frequency {
        let speed = context.frequency(hz)?;
        debug!("Board {} bus {} configured for {}", config.board, bus_id, speed);
    }
    Ok(context)
}
