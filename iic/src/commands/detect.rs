//! Bus scan command implementation

use anyhow::Result;
use iic_common::protocol::MAX_7BIT_ADDRESS;
use iicbus::{Address, BusContext, BusError, Transport, TransportError};
use serde::Serialize;
use std::fmt::Write;

/// Outcome of probing one address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Probe {
    /// A slave acknowledged
    Present,
    /// Nothing acknowledged
    Absent,
    /// Address is claimed by a kernel driver
    InUse,
}

#[derive(Debug, Serialize)]
struct ScanEntry {
    address: Address,
    state: Probe,
}

#[derive(Debug, Serialize)]
struct ScanReport {
    bus: Option<u32>,
    devices: Vec<ScanEntry>,
}

/// Scan the bus and print the result
pub fn detect<T: Transport>(i2c: &mut BusContext<T>, json: bool) -> Result<()> {
    let results = scan(i2c)?;

    if json {
        let report = ScanReport {
            bus: i2c.bus(),
            devices: results
                .into_iter()
                .filter(|(_, state)| *state != Probe::Absent)
                .map(|(address, state)| ScanEntry { address, state })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_table(&results));
    }

    Ok(())
}

/// Probe every non-reserved 7-bit address with a one-byte read
pub fn scan<T: Transport>(i2c: &mut BusContext<T>) -> Result<Vec<(Address, Probe)>, BusError> {
    let mut results = Vec::new();
    for raw in 0..=u16::from(MAX_7BIT_ADDRESS) {
        let address = Address::new(raw)?;
        if address.is_reserved() {
            continue;
        }
        results.push((address, probe(i2c, address)?));
    }
    Ok(results)
}

fn probe<T: Transport>(i2c: &mut BusContext<T>, address: Address) -> Result<Probe, BusError> {
    match i2c.address(address.into()) {
        Ok(()) => {}
        Err(BusError::Transfer {
            source: TransportError::Busy,
            ..
        }) => return Ok(Probe::InUse),
        Err(e) => return Err(e),
    }

    match i2c.read_byte() {
        // An acknowledged read that carried no data still means a slave is there
        Ok(_) | Err(BusError::ShortRead { .. }) => Ok(Probe::Present),
        Err(e) if e.is_no_ack() => Ok(Probe::Absent),
        Err(e) => Err(e),
    }
}

/// Render scan results as an i2cdetect-style grid
fn render_table(results: &[(Address, Probe)]) -> String {
    let mut out = String::from("     0  1  2  3  4  5  6  7  8  9  a  b  c  d  e  f\n");

    for row in (0u8..0x80).step_by(16) {
        let _ = write!(out, "{:02x}:", row);
        for raw in row..row + 16 {
            let cell = match results.iter().find(|(a, _)| a.value() == raw) {
                Some((_, Probe::Present)) => format!("{:02x}", raw),
                Some((_, Probe::InUse)) => "UU".to_string(),
                Some((_, Probe::Absent)) => "--".to_string(),
                None => "  ".to_string(),
            };
            let _ = write!(out, " {}", cell);
        }
        out.push('\n');
    }

    out
}
