#[cfg(target_os = "linux")]
mod bus;
mod commands;

use clap::{Args, Parser, Subcommand};
use iic_common::protocol::parse_number;
use std::path::PathBuf;

/// I2C bus command-line tool
#[derive(Parser)]
#[command(name = "iic")]
#[command(about = "Talk to I2C slaves through iicbus", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    bus: BusArgs,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options selecting and configuring the bus
#[derive(Args, Debug, Default)]
pub struct BusArgs {
    /// Path to board configuration file
    #[arg(short, long, value_name = "FILE", global = true)]
    pub conf: Option<PathBuf>,

    /// Logical board bus id
    #[arg(short, long, global = true, conflicts_with = "raw_bus")]
    pub bus: Option<i32>,

    /// Raw OS bus number (/dev/i2c-N), bypassing the board mapping
    #[arg(long, global = true)]
    pub raw_bus: Option<u32>,

    /// Bus frequency in hertz
    #[arg(short, long, global = true)]
    pub frequency: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the board's logical buses
    Buses,
    /// Scan the bus for responding slaves
    Detect {
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Read bytes from a slave
    Read {
        /// Slave address (e.g. 0x42)
        #[arg(value_parser = parse_address)]
        address: u16,
        /// Number of bytes to read
        #[arg(default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..=4096))]
        count: u16,
    },
    /// Write bytes to a slave
    Write {
        /// Slave address (e.g. 0x42)
        #[arg(value_parser = parse_address)]
        address: u16,
        /// Bytes to write (e.g. 0xAA 0xBB)
        #[arg(required = true, value_parser = parse_byte)]
        bytes: Vec<u8>,
    },
    /// Read a register
    Get {
        /// Slave address (e.g. 0x42)
        #[arg(value_parser = parse_address)]
        address: u16,
        /// Register number
        #[arg(value_parser = parse_byte)]
        register: u8,
        /// Read a 16-bit word instead of a byte
        #[arg(short, long)]
        word: bool,
    },
    /// Write a register
    Set {
        /// Slave address (e.g. 0x42)
        #[arg(value_parser = parse_address)]
        address: u16,
        /// Register number
        #[arg(value_parser = parse_byte)]
        register: u8,
        /// Value to write
        #[arg(value_parser = parse_word)]
        value: u16,
        /// Write a 16-bit word instead of a byte
        #[arg(short, long)]
        word: bool,
    },
    /// Display version information
    Version,
}

fn parse_bounded(text: &str, max: u32) -> Result<u32, String> {
    let value = parse_number(text).map_err(|e| e.to_string())?;
    if value > max {
        return Err(format!("{} is out of range (max 0x{:X})", text, max));
    }
    Ok(value)
}

fn parse_address(text: &str) -> Result<u16, String> {
    parse_bounded(text, 0x7F).map(|v| v as u16)
}

fn parse_byte(text: &str) -> Result<u8, String> {
    parse_bounded(text, 0xFF).map(|v| v as u8)
}

fn parse_word(text: &str) -> Result<u16, String> {
    parse_bounded(text, 0xFFFF).map(|v| v as u16)
}

fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let default_filter = match verbose {
        0 => "iic=warn,iicbus=warn",
        1 => "iic=debug,iicbus=debug",
        _ => "iic=trace,iicbus=trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[cfg(target_os = "linux")]
fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Version) | None => {
            println!("iic version {}", iic_common::VERSION);
            Ok(())
        }
        Some(Commands::Buses) => {
            let config = bus::load_config(&cli.bus)?;
            commands::buses::buses(&config);
            Ok(())
        }
        Some(Commands::Detect { json }) => {
            let mut i2c = bus::open(&cli.bus)?;
            commands::detect::detect(&mut i2c, json)
        }
        Some(Commands::Read { address, count }) => {
            let mut i2c = bus::open(&cli.bus)?;
            commands::transfer::read(&mut i2c, address, count.into())
        }
        Some(Commands::Write { address, bytes }) => {
            let mut i2c = bus::open(&cli.bus)?;
            commands::transfer::write(&mut i2c, address, &bytes)
        }
        Some(Commands::Get {
            address,
            register,
            word,
        }) => {
            let mut i2c = bus::open(&cli.bus)?;
            commands::register::get(&mut i2c, address, register, word)
        }
        Some(Commands::Set {
            address,
            register,
            value,
            word,
        }) => {
            let mut i2c = bus::open(&cli.bus)?;
            commands::register::set(&mut i2c, address, register, value, word)
        }
    }
}

#[cfg(target_os = "linux")]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(not(target_os = "linux"))]
fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    eprintln!("iic requires Linux for I2C device access");
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_verify() {
        // Verify CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_no_command_defaults_to_version() {
        let cli = Cli::try_parse_from(["iic"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_global_bus_options() {
        let cli = Cli::try_parse_from([
            "iic",
            "detect",
            "--bus",
            "1",
            "--frequency",
            "400000",
            "--conf",
            "/etc/iic/rpi.conf",
        ])
        .unwrap();
        assert_eq!(cli.bus.bus, Some(1));
        assert_eq!(cli.bus.frequency, Some(400_000));
        assert_eq!(cli.bus.conf, Some(PathBuf::from("/etc/iic/rpi.conf")));
        assert!(matches!(cli.command, Some(Commands::Detect { json: false })));
    }

    #[test]
    fn test_cli_bus_and_raw_bus_conflict() {
        let result = Cli::try_parse_from(["iic", "--bus", "0", "--raw-bus", "1", "detect"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_read_default_count() {
        let cli = Cli::try_parse_from(["iic", "read", "0x42"]).unwrap();
        match cli.command {
            Some(Commands::Read { address, count }) => {
                assert_eq!(address, 0x42);
                assert_eq!(count, 1);
            }
            _ => panic!("Expected Read command"),
        }
    }

    #[test]
    fn test_cli_read_rejects_zero_count() {
        assert!(Cli::try_parse_from(["iic", "read", "0x42", "0"]).is_err());
    }

    #[test]
    fn test_cli_write_bytes() {
        let cli = Cli::try_parse_from(["iic", "--raw-bus", "1", "write", "0x42", "0xAA", "187"])
            .unwrap();
        assert_eq!(cli.bus.raw_bus, Some(1));
        match cli.command {
            Some(Commands::Write { address, bytes }) => {
                assert_eq!(address, 0x42);
                assert_eq!(bytes, vec![0xAA, 0xBB]);
            }
            _ => panic!("Expected Write command"),
        }
    }

    #[test]
    fn test_cli_write_requires_bytes() {
        assert!(Cli::try_parse_from(["iic", "write", "0x42"]).is_err());
    }

    #[test]
    fn test_cli_rejects_out_of_range_values() {
        assert!(Cli::try_parse_from(["iic", "read", "0x80"]).is_err());
        assert!(Cli::try_parse_from(["iic", "write", "0x42", "0x100"]).is_err());
        assert!(Cli::try_parse_from(["iic", "get", "0x42", "bogus"]).is_err());
    }

    #[test]
    fn test_cli_get_word() {
        let cli = Cli::try_parse_from(["iic", "get", "0x68", "0x75", "--word"]).unwrap();
        match cli.command {
            Some(Commands::Get {
                address,
                register,
                word,
            }) => {
                assert_eq!(address, 0x68);
                assert_eq!(register, 0x75);
                assert!(word);
            }
            _ => panic!("Expected Get command"),
        }
    }

    #[test]
    fn test_cli_set_byte() {
        let cli = Cli::try_parse_from(["iic", "set", "0x68", "0x6B", "0x00"]).unwrap();
        match cli.command {
            Some(Commands::Set {
                address,
                register,
                value,
                word,
            }) => {
                assert_eq!(address, 0x68);
                assert_eq!(register, 0x6B);
                assert_eq!(value, 0);
                assert!(!word);
            }
            _ => panic!("Expected Set command"),
        }
    }

    #[test]
    fn test_cli_verbose_count() {
        let cli = Cli::try_parse_from(["iic", "-vv", "buses"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Some(Commands::Buses)));
    }
}
