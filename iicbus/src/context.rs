//! I2C bus context
//!
//! A `BusContext` represents one open bus. The bus may carry several
//! slaves; the context addresses one of them at a time and every transfer
//! goes to the address set last.
//!
//! Several contexts may be open on the same physical bus, and other
//! processes may use it too. Nothing arbitrates between them, so set the
//! address before transferring (or use [`BusContext::write_to`] and
//! [`BusContext::read_from`]) when the bus is shared.
//!
//! # Lifecycle
//!
//! `Unopened -> Open -> Closed`. Configuration and transfers are only valid
//! while `Open`; anything else returns [`BusError::InvalidHandle`] without
//! reaching the transport. `Closed` is terminal.

use iic_common::error::{BusError, BusResult, TransportError};
use iic_common::protocol::{self, ProtocolError};
use iic_common::{Address, BusSpeed};
use std::fmt;
use std::mem;
use tracing::{debug, warn};

use crate::board::BusResolver;
use crate::transport::Transport;

/// Lifecycle state of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Never opened
    Unopened,
    /// Bus handle held, ready for configuration and transfers
    Open,
    /// Bus handle released
    Closed,
}

struct Session<H> {
    handle: H,
    bus: u32,
    address: Address,
    speed: BusSpeed,
}

enum State<H> {
    Unopened,
    Open(Session<H>),
    Closed { bus: u32 },
}

/// An I2C bus context
pub struct BusContext<T: Transport> {
    transport: T,
    state: State<T::Handle>,
}

impl<T: Transport> BusContext<T> {
    /// Create a context that has not been opened
    ///
    /// Every operation on it returns `BusError::InvalidHandle`.
    pub fn unopened(transport: T) -> Self {
        Self {
            transport,
            state: State::Unopened,
        }
    }

    /// Open a bus by raw OS bus number
    ///
    /// The new context addresses the general call address and runs at the
    /// transport's default speed.
    ///
    /// # Arguments
    /// * `transport` - Transport used for every operation on this context
    /// * `bus` - Raw bus number, i.e. /dev/i2c-2 is `2`
    ///
    /// # Errors
    /// Returns `BusError::Open` if the bus does not exist or cannot be opened
    /// (permissions, device busy).
    ///
    /// # Example
    /// ```ignore
    /// use iicbus::{BusContext, transport::LinuxTransport};
    ///
    /// let mut i2c = BusContext::init_raw(LinuxTransport::default(), 1)?;
    /// i2c.address(0x42)?;
    /// i2c.write(&[0xAA, 0xBB])?;
    /// # Ok::<(), iicbus::BusError>(())
    /// ```
    pub fn init_raw(transport: T, bus: u32) -> BusResult<Self> {
        let handle = transport
            .open(bus)
            .map_err(|source| BusError::Open { bus, source })?;
        let speed = transport.default_speed();
        debug!("Opened I2C bus {}", bus);

        Ok(Self {
            transport,
            state: State::Open(Session {
                handle,
                bus,
                address: Address::GENERAL_CALL,
                speed,
            }),
        })
    }

    /// Open a bus by logical board bus id
    ///
    /// # Errors
    /// Returns `BusError::UnknownBus` if the board has no bus with this id,
    /// otherwise the errors of [`BusContext::init_raw`].
    pub fn init<R: BusResolver + ?Sized>(resolver: &R, transport: T, bus_id: i32) -> BusResult<Self> {
        let bus = resolver
            .resolve(bus_id)
            .ok_or(BusError::UnknownBus(bus_id))?;
        debug!("Logical bus {} is raw bus {}", bus_id, bus);
        Self::init_raw(transport, bus)
    }

    fn open_parts(&mut self) -> BusResult<(&T, &mut Session<T::Handle>)> {
        match &mut self.state {
            State::Open(session) => Ok((&self.transport, session)),
            State::Unopened | State::Closed { .. } => Err(BusError::InvalidHandle),
        }
    }

    /// Set the bus frequency
    ///
    /// The request is rounded down to the fastest standard speed that does
    /// not exceed `hz`. This affects every slave on the physical bus,
    /// including those used through other contexts.
    ///
    /// Returns the speed now in effect. On failure the previous speed stays
    /// in effect.
    ///
    /// # Errors
    /// - `InvalidHandle` if the context is not open
    /// - `InvalidParameter` if `hz` is zero
    /// - `Unsupported` if no supported speed is near `hz`
    pub fn frequency(&mut self, hz: u32) -> BusResult<BusSpeed> {
        let (transport, session) = self.open_parts()?;
        if hz == 0 {
            return Err(BusError::InvalidParameter(
                "frequency must be positive".to_string(),
            ));
        }

        let requested = BusSpeed::at_most(hz).ok_or(BusError::Unsupported { hz })?;
        let address = session.address;
        let speed = transport
            .set_clock(&mut session.handle, requested)
            .map_err(|source| match source {
                TransportError::UnsupportedSpeed(_) => BusError::Unsupported { hz },
                source => BusError::Transfer { address, source },
            })?;

        debug!("I2C bus {} running at {}", session.bus, speed);
        session.speed = speed;
        Ok(speed)
    }

    /// Set the slave address for subsequent transfers
    ///
    /// `address` is the bare 7-bit address without the read/write flag.
    /// Address 0 selects the general call address.
    ///
    /// # Errors
    /// - `InvalidHandle` if the context is not open
    /// - `InvalidParameter` if `address` does not fit in 7 bits
    /// - `Transfer` if the transport refuses the address (e.g. claimed by a kernel driver)
    pub fn address(&mut self, address: u16) -> BusResult<()> {
        let (transport, session) = self.open_parts()?;
        let address = Address::new(address)?;

        transport
            .set_slave_address(&mut session.handle, address)
            .map_err(|source| BusError::Transfer { address, source })?;

        debug!("I2C bus {} addressing {}", session.bus, address);
        session.address = address;
        Ok(())
    }

    /// Read from the current slave into `buf`
    ///
    /// Blocks until the transfer completes. Returns the number of bytes read,
    /// which never exceeds `buf.len()`.
    ///
    /// # Errors
    /// - `InvalidHandle` if the context is not open
    /// - `InvalidParameter` if `buf` is empty
    /// - `Transfer` on no-ack, busy bus or I/O failure
    pub fn read(&mut self, buf: &mut [u8]) -> BusResult<usize> {
        let (transport, session) = self.open_parts()?;
        if buf.is_empty() {
            return Err(BusError::InvalidParameter(
                "read length must be positive".to_string(),
            ));
        }

        let address = session.address;
        let count = transport
            .read(&mut session.handle, buf)
            .map_err(|source| BusError::Transfer { address, source })?;
        Ok(count.min(buf.len()))
    }

    /// Read exactly `buf.len()` bytes from the current slave
    ///
    /// # Errors
    /// As [`BusContext::read`], plus `ShortRead` if fewer bytes arrived.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> BusResult<()> {
        let got = self.read(buf)?;
        if got < buf.len() {
            return Err(BusError::ShortRead {
                address: self.current_address().unwrap_or_default(),
                expected: buf.len(),
                got,
            });
        }
        Ok(())
    }

    /// Read a single byte from the current slave
    ///
    /// A transfer that completes without data is reported as `ShortRead`,
    /// distinct from a missing acknowledge (`Transfer`).
    pub fn read_byte(&mut self) -> BusResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a single byte, returning -1 on any failure
    ///
    /// For callers that need a plain integer; anything negative is a
    /// failure, never a byte value.
    pub fn read_byte_raw(&mut self) -> i32 {
        self.read_byte().map_or(-1, i32::from)
    }

    /// Write `data` to the current slave
    ///
    /// All or nothing: if the slave acknowledges only part of the data the
    /// write fails with `PartialWrite`.
    ///
    /// # Errors
    /// - `InvalidHandle` if the context is not open
    /// - `InvalidParameter` if `data` is empty
    /// - `Transfer` on no-ack, busy bus or I/O failure
    /// - `PartialWrite` if not every byte was taken
    pub fn write(&mut self, data: &[u8]) -> BusResult<()> {
        let (transport, session) = self.open_parts()?;
        if data.is_empty() {
            return Err(BusError::InvalidParameter(
                "write length must be positive".to_string(),
            ));
        }

        let address = session.address;
        let written = transport
            .write(&mut session.handle, data)
            .map_err(|source| BusError::Transfer { address, source })?;

        if written != data.len() {
            return Err(BusError::PartialWrite {
                address,
                expected: data.len(),
                written,
            });
        }
        Ok(())
    }

    /// Write a single byte to the current slave
    pub fn write_byte(&mut self, byte: u8) -> BusResult<()> {
        self.write(&[byte])
    }

    /// Set the address and write in one call
    pub fn write_to(&mut self, address: u16, data: &[u8]) -> BusResult<()> {
        self.address(address)?;
        self.write(data)
    }

    /// Set the address and read in one call
    pub fn read_from(&mut self, address: u16, buf: &mut [u8]) -> BusResult<usize> {
        self.address(address)?;
        self.read(buf)
    }

    /// Read one register of the current slave
    pub fn read_byte_data(&mut self, register: u8) -> BusResult<u8> {
        self.write(&[register])?;
        self.read_byte()
    }

    /// Write one register of the current slave
    pub fn write_byte_data(&mut self, register: u8, value: u8) -> BusResult<()> {
        self.write(&[register, value])
    }

    /// Read a 16-bit register (SMBus word, low byte first)
    pub fn read_word_data(&mut self, register: u8) -> BusResult<u16> {
        self.write(&[register])?;
        let mut buf = [0u8; 2];
        let got = self.read(&mut buf)?;
        protocol::decode_word(&buf[..got]).map_err(|e| match e {
            ProtocolError::InsufficientData { expected, got } => BusError::ShortRead {
                address: self.current_address().unwrap_or_default(),
                expected,
                got,
            },
            e => BusError::InvalidParameter(e.to_string()),
        })
    }

    /// Write a 16-bit register (SMBus word, low byte first)
    pub fn write_word_data(&mut self, register: u8, value: u16) -> BusResult<()> {
        let [low, high] = protocol::encode_word(value);
        self.write(&[register, low, high])
    }

    /// Read consecutive registers starting at `register`
    pub fn read_bytes_data(&mut self, register: u8, buf: &mut [u8]) -> BusResult<usize> {
        self.write(&[register])?;
        self.read(buf)
    }

    /// Release the bus
    ///
    /// The context is unusable afterwards. Stopping a context that is not
    /// open returns `InvalidHandle` and does not touch the transport.
    ///
    /// # Errors
    /// Returns `BusError::Close` if the transport reported a failure while
    /// releasing; the context is closed regardless.
    pub fn stop(&mut self) -> BusResult<()> {
        match mem::replace(&mut self.state, State::Unopened) {
            State::Open(session) => {
                let bus = session.bus;
                self.state = State::Closed { bus };
                debug!("Closing I2C bus {}", bus);
                self.transport
                    .close(session.handle)
                    .map_err(|source| BusError::Close { bus, source })
            }
            other => {
                self.state = other;
                Err(BusError::InvalidHandle)
            }
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> ContextState {
        match self.state {
            State::Unopened => ContextState::Unopened,
            State::Open(_) => ContextState::Open,
            State::Closed { .. } => ContextState::Closed,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self.state, State::Open(_))
    }

    /// Raw bus number this context was opened on
    pub fn bus(&self) -> Option<u32> {
        match &self.state {
            State::Unopened => None,
            State::Open(session) => Some(session.bus),
            State::Closed { bus } => Some(*bus),
        }
    }

    /// Address transfers are currently directed at
    pub fn current_address(&self) -> Option<Address> {
        match &self.state {
            State::Open(session) => Some(session.address),
            _ => None,
        }
    }

    /// Bus speed last negotiated on this context
    pub fn current_speed(&self) -> Option<BusSpeed> {
        match &self.state {
            State::Open(session) => Some(session.speed),
            _ => None,
        }
    }

    /// Bus frequency in hertz last negotiated on this context
    pub fn current_frequency(&self) -> Option<u32> {
        self.current_speed().map(BusSpeed::hz)
    }

    /// Transport this context drives
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Drop for BusContext<T> {
    fn drop(&mut self) {
        if let State::Open(session) = mem::replace(&mut self.state, State::Unopened) {
            if let Err(e) = self.transport.close(session.handle) {
                warn!("Failed to close I2C bus {}: {}", session.bus, e);
            }
        }
    }
}

impl<T: Transport> fmt::Debug for BusContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BusContext")
            .field("state", &self.state())
            .field("bus", &self.bus())
            .field("address", &self.current_address())
            .field("speed", &self.current_speed())
            .finish_non_exhaustive()
    }
}
