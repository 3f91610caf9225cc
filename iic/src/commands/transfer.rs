//! Raw read/write command implementation

use anyhow::{Context, Result};
use iicbus::{BusContext, Transport};

use super::format_bytes;

/// Read `count` bytes from a slave and print them
pub fn read<T: Transport>(i2c: &mut BusContext<T>, address: u16, count: usize) -> Result<()> {
    let data = read_bytes(i2c, address, count)?;
    println!("{}", format_bytes(&data));
    Ok(())
}

/// Write bytes to a slave
pub fn write<T: Transport>(i2c: &mut BusContext<T>, address: u16, bytes: &[u8]) -> Result<()> {
    i2c.write_to(address, bytes)
        .with_context(|| format!("Writing {} bytes to 0x{:02X}", bytes.len(), address))
}

fn read_bytes<T: Transport>(
    i2c: &mut BusContext<T>,
    address: u16,
    count: usize,
) -> Result<Vec<u8>> {
    let mut buf = vec![0u8; count];
    let got = i2c
        .read_from(address, &mut buf)
        .with_context(|| format!("Reading {} bytes from 0x{:02X}", count, address))?;
    buf.truncate(got);
    Ok(buf)
}
