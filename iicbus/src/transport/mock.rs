//! In-memory transport for tests
//!
//! `MockTransport` simulates any number of buses, each with a set of slaves
//! and a set of supported speeds. Every call that reaches the transport is
//! appended to a journal, so tests can check what a context did (and did
//! not) send to the hardware.
//!
//! Clones share the same simulated hardware, which allows several contexts
//! to open the same bus.

use iic_common::error::{TransportError, TransportResult};
use iic_common::{Address, BusSpeed};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use super::Transport;

/// A simulated slave device
pub trait MockSlave: Send {
    /// Accept a write, returning how many bytes were acknowledged
    fn write(&mut self, data: &[u8]) -> usize;

    /// Serve a read, returning how many bytes were produced
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// Receive a general call broadcast
    fn general_call(&mut self, _data: &[u8]) {}
}

/// Slave that reads back whatever was last written to it
#[derive(Debug, Default)]
pub struct EchoSlave {
    last: Vec<u8>,
    write_limit: Option<usize>,
    general_calls: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl EchoSlave {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledge at most `limit` bytes of each write
    pub fn with_write_limit(mut self, limit: usize) -> Self {
        self.write_limit = Some(limit);
        self
    }

    /// Shared log of the general call payloads this slave received
    pub fn general_call_log(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.general_calls)
    }
}

impl MockSlave for EchoSlave {
    fn write(&mut self, data: &[u8]) -> usize {
        let accepted = self.write_limit.map_or(data.len(), |limit| data.len().min(limit));
        self.last = data[..accepted].to_vec();
        accepted
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        let count = buf.len().min(self.last.len());
        buf[..count].copy_from_slice(&self.last[..count]);
        count
    }

    fn general_call(&mut self, data: &[u8]) {
        lock(&self.general_calls).push(data.to_vec());
    }
}

/// Slave with a 256-byte register file and an auto-incrementing pointer
///
/// The first byte of a write sets the register pointer; remaining bytes are
/// stored from there on. Reads start at the pointer.
#[derive(Debug)]
pub struct RegisterSlave {
    registers: [u8; 256],
    pointer: u8,
}

impl Default for RegisterSlave {
    fn default() -> Self {
        Self {
            registers: [0; 256],
            pointer: 0,
        }
    }
}

impl RegisterSlave {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a register
    pub fn with_register(mut self, register: u8, value: u8) -> Self {
        self.registers[register as usize] = value;
        self
    }
}

impl MockSlave for RegisterSlave {
    fn write(&mut self, data: &[u8]) -> usize {
        let Some((&register, values)) = data.split_first() else {
            return 0;
        };
        self.pointer = register;
        for value in values {
            self.registers[self.pointer as usize] = *value;
            self.pointer = self.pointer.wrapping_add(1);
        }
        data.len()
    }

    fn read(&mut self, buf: &mut [u8]) -> usize {
        for byte in buf.iter_mut() {
            *byte = self.registers[self.pointer as usize];
            self.pointer = self.pointer.wrapping_add(1);
        }
        buf.len()
    }
}

/// A call that reached the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOp {
    Open { bus: u32 },
    SetAddress { bus: u32, address: Address },
    SetClock { bus: u32, speed: BusSpeed },
    Read { bus: u32, address: Address, len: usize },
    Write { bus: u32, address: Address, data: Vec<u8> },
    Close { bus: u32 },
}

/// Handle to a simulated bus
#[derive(Debug)]
pub struct MockHandle {
    bus: u32,
    address: Address,
}

struct MockBus {
    slaves: BTreeMap<Address, Box<dyn MockSlave>>,
    claimed: BTreeSet<Address>,
    supported: Vec<BusSpeed>,
    speed: BusSpeed,
    busy: bool,
    close_fails: bool,
}

#[derive(Default)]
struct MockState {
    buses: BTreeMap<u32, MockBus>,
    journal: Vec<MockOp>,
    open_handles: usize,
}

/// In-memory transport
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a bus supporting standard and fast mode
    pub fn with_bus(self, bus: u32) -> Self {
        self.with_bus_speeds(bus, &[BusSpeed::Standard, BusSpeed::Fast])
    }

    /// Add a bus supporting exactly `speeds`
    pub fn with_bus_speeds(self, bus: u32, speeds: &[BusSpeed]) -> Self {
        lock(&self.state).buses.insert(
            bus,
            MockBus {
                slaves: BTreeMap::new(),
                claimed: BTreeSet::new(),
                supported: speeds.to_vec(),
                speed: BusSpeed::Standard,
                busy: false,
                close_fails: false,
            },
        );
        self
    }

    /// Attach a slave to a bus added earlier
    pub fn with_slave(self, bus: u32, address: u8, slave: impl MockSlave + 'static) -> Self {
        if let (Some(mock_bus), Ok(address)) = (
            lock(&self.state).buses.get_mut(&bus),
            Address::new(address.into()),
        ) {
            mock_bus.slaves.insert(address, Box::new(slave));
        }
        self
    }

    /// Make every transfer on `bus` fail with a busy error
    pub fn set_busy(&self, bus: u32, busy: bool) {
        if let Some(mock_bus) = lock(&self.state).buses.get_mut(&bus) {
            mock_bus.busy = busy;
        }
    }

    /// Make releasing a handle on `bus` report an I/O error
    ///
    /// The handle still counts as released.
    pub fn set_close_failure(&self, bus: u32, fails: bool) {
        if let Some(mock_bus) = lock(&self.state).buses.get_mut(&bus) {
            mock_bus.close_fails = fails;
        }
    }

    /// Mark an address as claimed by a kernel driver
    ///
    /// Selecting a claimed address fails with a busy error.
    pub fn claim(&self, bus: u32, address: u8) {
        if let (Some(mock_bus), Ok(address)) = (
            lock(&self.state).buses.get_mut(&bus),
            Address::new(address.into()),
        ) {
            mock_bus.claimed.insert(address);
        }
    }

    /// Snapshot of the calls that reached the transport
    pub fn journal(&self) -> Vec<MockOp> {
        lock(&self.state).journal.clone()
    }

    pub fn clear_journal(&self) {
        lock(&self.state).journal.clear();
    }

    /// Number of handles opened and not yet closed
    pub fn open_handles(&self) -> usize {
        lock(&self.state).open_handles
    }

    /// Speed a bus is currently running at
    pub fn speed(&self, bus: u32) -> Option<BusSpeed> {
        lock(&self.state).buses.get(&bus).map(|b| b.speed)
    }
}

impl MockState {
    fn bus(&mut self, bus: u32) -> TransportResult<&mut MockBus> {
        self.buses.get_mut(&bus).ok_or(TransportError::NoSuchBus(bus))
    }
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    fn open(&self, bus: u32) -> TransportResult<MockHandle> {
        let mut state = lock(&self.state);
        state.journal.push(MockOp::Open { bus });
        state.bus(bus)?;
        state.open_handles += 1;
        Ok(MockHandle {
            bus,
            address: Address::GENERAL_CALL,
        })
    }

    fn set_slave_address(&self, handle: &mut MockHandle, address: Address) -> TransportResult<()> {
        let mut state = lock(&self.state);
        state.journal.push(MockOp::SetAddress {
            bus: handle.bus,
            address,
        });
        if state.bus(handle.bus)?.claimed.contains(&address) {
            return Err(TransportError::Busy);
        }
        handle.address = address;
        Ok(())
    }

    fn set_clock(&self, handle: &mut MockHandle, speed: BusSpeed) -> TransportResult<BusSpeed> {
        let mut state = lock(&self.state);
        state.journal.push(MockOp::SetClock {
            bus: handle.bus,
            speed,
        });
        let mock_bus = state.bus(handle.bus)?;
        if !mock_bus.supported.contains(&speed) {
            return Err(TransportError::UnsupportedSpeed(speed));
        }
        mock_bus.speed = speed;
        Ok(speed)
    }

    fn read(&self, handle: &mut MockHandle, buf: &mut [u8]) -> TransportResult<usize> {
        let mut state = lock(&self.state);
        state.journal.push(MockOp::Read {
            bus: handle.bus,
            address: handle.address,
            len: buf.len(),
        });
        let mock_bus = state.bus(handle.bus)?;
        if mock_bus.busy {
            return Err(TransportError::Busy);
        }
        // General call is write-only
        match mock_bus.slaves.get_mut(&handle.address) {
            Some(slave) if !handle.address.is_general_call() => Ok(slave.read(buf)),
            _ => Err(TransportError::NoAck(handle.address)),
        }
    }

    fn write(&self, handle: &mut MockHandle, data: &[u8]) -> TransportResult<usize> {
        let mut state = lock(&self.state);
        state.journal.push(MockOp::Write {
            bus: handle.bus,
            address: handle.address,
            data: data.to_vec(),
        });
        let mock_bus = state.bus(handle.bus)?;
        if mock_bus.busy {
            return Err(TransportError::Busy);
        }

        if handle.address.is_general_call() {
            if mock_bus.slaves.is_empty() {
                return Err(TransportError::NoAck(handle.address));
            }
            for slave in mock_bus.slaves.values_mut() {
                slave.general_call(data);
            }
            return Ok(data.len());
        }

        match mock_bus.slaves.get_mut(&handle.address) {
            Some(slave) => Ok(slave.write(data)),
            None => Err(TransportError::NoAck(handle.address)),
        }
    }

    fn close(&self, handle: MockHandle) -> TransportResult<()> {
        let mut state = lock(&self.state);
        state.journal.push(MockOp::Close { bus: handle.bus });
        state.open_handles = state.open_handles.saturating_sub(1);
        if state.bus(handle.bus)?.close_fails {
            return Err(TransportError::Io(io::Error::other("close failed")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(raw: u16) -> Address {
        Address::new(raw).unwrap()
    }

    #[test]
    fn test_open_unknown_bus_fails() {
        let transport = MockTransport::new().with_bus(1);
        assert!(matches!(
            transport.open(2),
            Err(TransportError::NoSuchBus(2))
        ));
        assert_eq!(transport.open_handles(), 0);
    }

    #[test]
    fn test_handles_are_counted() {
        let transport = MockTransport::new().with_bus(1);
        let first = transport.open(1).unwrap();
        let second = transport.open(1).unwrap();
        assert_eq!(transport.open_handles(), 2);
        transport.close(first).unwrap();
        transport.close(second).unwrap();
        assert_eq!(transport.open_handles(), 0);
    }

    #[test]
    fn test_address_is_per_handle() {
        let transport = MockTransport::new()
            .with_bus(1)
            .with_slave(1, 0x10, EchoSlave::new())
            .with_slave(1, 0x20, EchoSlave::new());
        let mut a = transport.open(1).unwrap();
        let mut b = transport.open(1).unwrap();
        transport.set_slave_address(&mut a, addr(0x10)).unwrap();
        transport.set_slave_address(&mut b, addr(0x20)).unwrap();

        transport.write(&mut a, &[1]).unwrap();
        transport.write(&mut b, &[2]).unwrap();

        let mut buf = [0u8; 1];
        transport.read(&mut a, &mut buf).unwrap();
        assert_eq!(buf, [1]);
        transport.read(&mut b, &mut buf).unwrap();
        assert_eq!(buf, [2]);
    }

    #[test]
    fn test_missing_slave_does_not_ack() {
        let transport = MockTransport::new().with_bus(1);
        let mut handle = transport.open(1).unwrap();
        transport.set_slave_address(&mut handle, addr(0x50)).unwrap();
        let err = transport.write(&mut handle, &[0]).unwrap_err();
        assert!(matches!(err, TransportError::NoAck(a) if a == addr(0x50)));
    }

    #[test]
    fn test_register_slave_pointer() {
        let transport = MockTransport::new()
            .with_bus(0)
            .with_slave(0, 0x68, RegisterSlave::new().with_register(0x75, 0x68));
        let mut handle = transport.open(0).unwrap();
        transport.set_slave_address(&mut handle, addr(0x68)).unwrap();

        transport.write(&mut handle, &[0x75]).unwrap();
        let mut buf = [0u8; 1];
        transport.read(&mut handle, &mut buf).unwrap();
        assert_eq!(buf, [0x68]);

        transport.write(&mut handle, &[0x10, 0xAA, 0xBB]).unwrap();
        transport.write(&mut handle, &[0x10]).unwrap();
        let mut buf = [0u8; 2];
        transport.read(&mut handle, &mut buf).unwrap();
        assert_eq!(buf, [0xAA, 0xBB]);
    }

    #[test]
    fn test_unsupported_speed_keeps_current_speed() {
        let transport = MockTransport::new().with_bus_speeds(1, &[BusSpeed::Standard]);
        let mut handle = transport.open(1).unwrap();
        let err = transport.set_clock(&mut handle, BusSpeed::Fast).unwrap_err();
        assert!(matches!(err, TransportError::UnsupportedSpeed(BusSpeed::Fast)));
        assert_eq!(transport.speed(1), Some(BusSpeed::Standard));
    }

    #[test]
    fn test_busy_bus() {
        let transport = MockTransport::new()
            .with_bus(1)
            .with_slave(1, 0x42, EchoSlave::new());
        let mut handle = transport.open(1).unwrap();
        transport.set_slave_address(&mut handle, addr(0x42)).unwrap();
        transport.set_busy(1, true);
        assert!(matches!(
            transport.write(&mut handle, &[1]),
            Err(TransportError::Busy)
        ));
        transport.set_busy(1, false);
        assert_eq!(transport.write(&mut handle, &[1]).unwrap(), 1);
    }

    #[test]
    fn test_claimed_address_is_busy() {
        let transport = MockTransport::new().with_bus(1);
        transport.claim(1, 0x50);
        let mut handle = transport.open(1).unwrap();
        assert!(matches!(
            transport.set_slave_address(&mut handle, addr(0x50)),
            Err(TransportError::Busy)
        ));
        transport.set_slave_address(&mut handle, addr(0x51)).unwrap();
    }

    #[test]
    fn test_echo_write_limit() {
        let mut slave = EchoSlave::new().with_write_limit(1);
        assert_eq!(slave.write(&[1, 2, 3]), 1);
        let mut buf = [0u8; 3];
        assert_eq!(slave.read(&mut buf), 1);
        assert_eq!(buf[0], 1);
    }
}
