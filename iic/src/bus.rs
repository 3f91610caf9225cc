//! Bus selection for the CLI
//!
//! Precedence for every setting is: command line > configuration file > defaults.

use anyhow::{Context, Result};
use iic_common::config::{BoardConfig, DEFAULT_CONFIG_FILE};
use iicbus::BusContext;
use iicbus::transport::LinuxTransport;
use tracing::{debug, info};

use crate::BusArgs;

/// Load the board configuration and apply command-line overrides
pub fn load_config(args: &BusArgs) -> Result<BoardConfig> {
    let mut config = match &args.conf {
        Some(path) => {
            let config = BoardConfig::from_file(path)?;
            info!("Loaded configuration from {}", path.display());
            config
        }
        None => BoardConfig::from_file_or_default(DEFAULT_CONFIG_FILE)?,
    };

    if let Some(bus) = args.bus {
        config.default_bus = bus;
    }
    if let Some(frequency) = args.frequency {
        config.frequency = Some(frequency);
    }

    config
        .validate()
        .context("Invalid bus configuration")?;
    Ok(config)
}

/// Open the bus selected on the command line
pub fn open(args: &BusArgs) -> Result<BusContext<LinuxTransport>> {
    let config = load_config(args)?;
    let transport = LinuxTransport::from_config(&config);

    let context = match args.raw_bus {
        Some(raw_bus) => {
            debug!("Opening raw bus {}", raw_bus);
            let mut context = BusContext::init_raw(transport, raw_bus)?;
            if let Some(hz) = config.frequency {
                context.frequency(hz)?;
            }
            context
        }
        None => {
            debug!(
                "Opening logical bus {} on board {}",
                config.default_bus, config.board
            );
            iicbus::open_configured(&config, transport, config.default_bus)?
        }
    };

    Ok(context)
}
