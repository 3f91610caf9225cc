//! Register get/set command implementation

use anyhow::{Context, Result, bail};
use iicbus::{BusContext, Transport};

/// Read a register and print its value
pub fn get<T: Transport>(
    i2c: &mut BusContext<T>,
    address: u16,
    register: u8,
    word: bool,
) -> Result<()> {
    let value = read_register(i2c, address, register, word)?;
    if word {
        println!("0x{:04X}", value);
    } else {
        println!("0x{:02X}", value);
    }
    Ok(())
}

/// Write a register
pub fn set<T: Transport>(
    i2c: &mut BusContext<T>,
    address: u16,
    register: u8,
    value: u16,
    word: bool,
) -> Result<()> {
    i2c.address(address)?;
    let result = if word {
        i2c.write_word_data(register, value)
    } else {
        let Ok(byte) = u8::try_from(value) else {
            bail!("Value 0x{:X} does not fit in a byte; use --word", value);
        };
        i2c.write_byte_data(register, byte)
    };
    result.with_context(|| format!("Writing register 0x{:02X} of 0x{:02X}", register, address))
}

fn read_register<T: Transport>(
    i2c: &mut BusContext<T>,
    address: u16,
    register: u8,
    word: bool,
) -> Result<u16> {
    i2c.address(address)?;
    let value = if word {
        i2c.read_word_data(register)
    } else {
        i2c.read_byte_data(register).map(u16::from)
    };
    value.with_context(|| format!("Reading register 0x{:02X} of 0x{:02X}", register, address))
}
