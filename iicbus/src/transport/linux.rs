//! Linux `/dev/i2c-N` transport
//!
//! This module provides `LinuxTransport`, which drives the kernel's i2c-dev
//! interface through the `i2cdev` crate:
//! - one file descriptor per open bus
//! - slave selection with the `I2C_SLAVE` ioctl (per descriptor)
//! - plain `read(2)`/`write(2)` transfers
//! - errno classification into no-ack, busy and timeout
//!
//! The bus clock is fixed by the adapter driver and cannot be changed from
//! userspace. When the adapter publishes its device-tree `clock-frequency`,
//! only that speed is accepted; otherwise any standard speed is accepted as
//! advisory.
//!
//! This module is only available on Linux targets.

#![cfg(target_os = "linux")]

use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;
use iic_common::config::{BoardConfig, DEFAULT_DEV_DIR};
use iic_common::error::{TransportError, TransportResult};
use iic_common::{Address, BusSpeed};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::Transport;

/// Sysfs directory listing the I2C adapters
const SYSFS_I2C_DIR: &str = "/sys/bus/i2c/devices";

/// Transport over the Linux i2c-dev character devices
#[derive(Debug, Clone)]
pub struct LinuxTransport {
    /// Directory holding the `i2c-N` device nodes
    dev_dir: PathBuf,
    /// Directory holding the `i2c-N` adapter entries
    sysfs_dir: PathBuf,
}

/// An open `/dev/i2c-N` descriptor
pub struct LinuxHandle {
    /// Underlying Linux I2C device
    device: LinuxI2CDevice,
    /// I2C bus number
    bus: u32,
    /// Slave currently selected on this descriptor
    address: Address,
    /// Clock rate fixed by the adapter, if published
    fixed_speed: Option<BusSpeed>,
}

impl LinuxHandle {
    /// Bus number this descriptor is open on
    pub fn bus(&self) -> u32 {
        self.bus
    }
}

impl Default for LinuxTransport {
    fn default() -> Self {
        Self::new(DEFAULT_DEV_DIR)
    }
}

impl LinuxTransport {
    /// Create a transport looking for device nodes in `dev_dir`
    ///
    /// # Example
    /// ```ignore
    /// use iicbus::transport::LinuxTransport;
    ///
    /// let transport = LinuxTransport::new("/dev");
    /// ```
    pub fn new(dev_dir: impl Into<PathBuf>) -> Self {
        Self {
            dev_dir: dev_dir.into(),
            sysfs_dir: PathBuf::from(SYSFS_I2C_DIR),
        }
    }

    /// Create a transport for the device directory named in a board configuration
    pub fn from_config(config: &BoardConfig) -> Self {
        Self::new(&config.dev_dir)
    }

    /// Override where adapter entries are looked up
    pub fn with_sysfs_dir(mut self, sysfs_dir: impl Into<PathBuf>) -> Self {
        self.sysfs_dir = sysfs_dir.into();
        self
    }

    /// Device node path for a bus number
    pub fn device_path(&self, bus: u32) -> PathBuf {
        self.dev_dir.join(format!("i2c-{}", bus))
    }

    /// Clock rate published by the adapter's device-tree node
    fn adapter_speed(&self, bus: u32) -> Option<BusSpeed> {
        let path = self
            .sysfs_dir
            .join(format!("i2c-{}", bus))
            .join("of_node")
            .join("clock-frequency");
        read_dt_u32(&path).and_then(BusSpeed::from_hz)
    }
}

impl Transport for LinuxTransport {
    type Handle = LinuxHandle;

    fn open(&self, bus: u32) -> TransportResult<LinuxHandle> {
        let path = self.device_path(bus);
        if !path.exists() {
            return Err(TransportError::NoSuchBus(bus));
        }

        let device = LinuxI2CDevice::new(&path, Address::GENERAL_CALL.into()).map_err(|e| {
            TransportError::DeviceOpen {
                device: path.display().to_string(),
                source: e.into(),
            }
        })?;

        let fixed_speed = self.adapter_speed(bus);
        debug!(
            "Opened {} (adapter clock {})",
            path.display(),
            fixed_speed.map_or_else(|| "unknown".to_string(), |s| s.to_string())
        );

        Ok(LinuxHandle {
            device,
            bus,
            address: Address::GENERAL_CALL,
            fixed_speed,
        })
    }

    fn set_slave_address(&self, handle: &mut LinuxHandle, address: Address) -> TransportResult<()> {
        handle
            .device
            .set_slave_address(address.into())
            .map_err(|e| classify(e.into(), address))?;
        handle.address = address;
        Ok(())
    }

    fn set_clock(&self, handle: &mut LinuxHandle, speed: BusSpeed) -> TransportResult<BusSpeed> {
        match handle.fixed_speed {
            Some(fixed) if fixed != speed => Err(TransportError::UnsupportedSpeed(speed)),
            _ => Ok(speed),
        }
    }

    /// The kernel's i2c-dev read either fills the whole buffer or fails with
    /// an errno, so a successful read always reports `buf.len()` bytes.
    fn read(&self, handle: &mut LinuxHandle, buf: &mut [u8]) -> TransportResult<usize> {
        trace!(
            "i2c-{} read {} bytes from {}",
            handle.bus,
            buf.len(),
            handle.address
        );
        let address = handle.address;
        handle
            .device
            .read(buf)
            .map_err(|e| classify(e.into(), address))?;
        Ok(buf.len())
    }

    fn write(&self, handle: &mut LinuxHandle, data: &[u8]) -> TransportResult<usize> {
        trace!(
            "i2c-{} write {:02X?} to {}",
            handle.bus, data, handle.address
        );
        let address = handle.address;
        handle
            .device
            .write(data)
            .map_err(|e| classify(e.into(), address))?;
        Ok(data.len())
    }

    fn close(&self, handle: LinuxHandle) -> TransportResult<()> {
        debug!("Closing i2c-{}", handle.bus);
        drop(handle);
        Ok(())
    }

    fn default_speed(&self) -> BusSpeed {
        BusSpeed::Standard
    }
}

/// Classify an i2c-dev errno
///
/// Fault codes follow Documentation/i2c/fault-codes.rst in the kernel tree.
fn classify(err: io::Error, address: Address) -> TransportError {
    match err.raw_os_error() {
        Some(libc::ENXIO) | Some(libc::EREMOTEIO) => TransportError::NoAck(address),
        // EAGAIN is reported on lost arbitration
        Some(libc::EBUSY) | Some(libc::EAGAIN) => TransportError::Busy,
        Some(libc::ETIMEDOUT) => TransportError::Timeout,
        _ => TransportError::Io(err),
    }
}

/// Read a device-tree u32 property (big-endian cell)
fn read_dt_u32(path: &Path) -> Option<u32> {
    let bytes = std::fs::read(path).ok()?;
    let cell: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
    Some(u32::from_be_bytes(cell))
}
