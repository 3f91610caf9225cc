//! Board configuration types and loading

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::types::BusSpeed;

/// Default configuration file location
pub const DEFAULT_CONFIG_FILE: &str = "/etc/iic/board.conf";

/// Default board name
pub const DEFAULT_BOARD: &str = "generic";

/// Default directory holding the `i2c-N` device nodes
pub const DEFAULT_DEV_DIR: &str = "/dev";

/// Default logical bus id
pub const DEFAULT_BUS: i32 = 0;

/// Raw OS bus behind the default logical bus (Raspberry Pi header bus)
pub const DEFAULT_RAW_BUS: u32 = 1;

/// Board configuration
///
/// Describes how logical board bus ids map to raw OS bus numbers, where the
/// device nodes live and which clock rate to request after opening a bus.
///
/// Field names with underscores map to dash-separated keys in YAML
/// (e.g., `default_bus` <-> `default-bus`)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct BoardConfig {
    /// Human-readable board name
    #[serde(default = "default_board")]
    pub board: String,

    /// Directory holding the `i2c-N` device nodes
    #[serde(default = "default_dev_dir")]
    pub dev_dir: PathBuf,

    /// Logical bus used when none is given
    #[serde(default = "default_bus")]
    pub default_bus: i32,

    /// Clock rate (Hz) to request after opening a bus
    ///
    /// If None, the bus is left at the adapter default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<u32>,

    /// Logical bus id -> raw OS bus number
    #[serde(default = "default_buses")]
    pub buses: BTreeMap<i32, u32>,
}

// Default value functions for serde
fn default_board() -> String {
    DEFAULT_BOARD.to_string()
}

fn default_dev_dir() -> PathBuf {
    PathBuf::from(DEFAULT_DEV_DIR)
}

fn default_bus() -> i32 {
    DEFAULT_BUS
}

fn default_buses() -> BTreeMap<i32, u32> {
    BTreeMap::from([(DEFAULT_BUS, DEFAULT_RAW_BUS)])
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            board: default_board(),
            dev_dir: default_dev_dir(),
            default_bus: DEFAULT_BUS,
            frequency: None,
            buses: default_buses(),
        }
    }
}

impl BoardConfig {
    /// Load configuration from a YAML file
    ///
    /// Returns `Ok(BoardConfig)` if the file exists and is valid YAML.
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead(path.into(), e))?;

        serde_yaml::from_str(&contents)
            .map_err(|e| ConfigError::YamlParse(path.into(), e.to_string()))
    }

    /// Load configuration from a file if it exists, otherwise return defaults
    ///
    /// This is useful for the default config file location where a missing file is not an error.
    pub fn from_file_or_default(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::from_file(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Raw OS bus number for a logical bus id
    pub fn raw_bus(&self, bus_id: i32) -> Option<u32> {
        self.buses.get(&bus_id).copied()
    }

    /// Validate configuration values
    ///
    /// Returns an error if any values are out of acceptable ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buses.is_empty() {
            return Err(ConfigError::InvalidValue(
                "buses must map at least one logical bus".to_string(),
            ));
        }

        if let Some((id, _)) = self.buses.iter().find(|(id, _)| **id < 0) {
            return Err(ConfigError::InvalidValue(format!(
                "logical bus id {} must not be negative",
                id
            )));
        }

        if !self.buses.contains_key(&self.default_bus) {
            return Err(ConfigError::InvalidValue(format!(
                "default-bus {} is not listed in buses",
                self.default_bus
            )));
        }

        if let Some(hz) = self.frequency {
            if BusSpeed::at_most(hz).is_none() {
                return Err(ConfigError::InvalidValue(format!(
                    "frequency {} Hz is below standard mode ({} Hz)",
                    hz,
                    BusSpeed::Standard.hz()
                )));
            }
        }

        if !self.dev_dir.is_absolute() {
            return Err(ConfigError::InvalidValue(format!(
                "dev-dir {} must be an absolute path",
                self.dev_dir.display()
            )));
        }

        Ok(())
    }
}

/// Configuration loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    FileRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse YAML config file {0}: {1}")]
    YamlParse(PathBuf, String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BoardConfig::default();
        assert_eq!(config.board, "generic");
        assert_eq!(config.dev_dir, PathBuf::from("/dev"));
        assert_eq!(config.default_bus, 0);
        assert_eq!(config.frequency, None);
        assert_eq!(config.raw_bus(0), Some(1));
        assert_eq!(config.raw_bus(1), None);
    }

    #[test]
    fn test_validate_valid_config() {
        let config = BoardConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_default_bus_must_be_mapped() {
        let config = BoardConfig {
            default_bus: 3,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_negative_ids_and_empty_map() {
        let config = BoardConfig {
            buses: BTreeMap::from([(0, 1), (-1, 2)]),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BoardConfig {
            buses: BTreeMap::new(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_frequency() {
        let config = BoardConfig {
            frequency: Some(50_000),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = BoardConfig {
            frequency: Some(400_000),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_relative_dev_dir() {
        let config = BoardConfig {
            dev_dir: PathBuf::from("dev"),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yaml_deserialization_with_dashes() {
        let yaml = r#"
board: beaglebone
dev-dir: /dev
default-bus: 1
frequency: 400000
buses:
  0: 0
  1: 2
"#;
        let config: BoardConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.board, "beaglebone");
        assert_eq!(config.default_bus, 1);
        assert_eq!(config.frequency, Some(400_000));
        assert_eq!(config.raw_bus(0), Some(0));
        assert_eq!(config.raw_bus(1), Some(2));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_deserialization_partial() {
        let yaml = r#"
board: rpi
"#;
        let config: BoardConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.board, "rpi");
        assert_eq!(config.raw_bus(0), Some(1)); // default
    }

    #[test]
    fn test_yaml_rejects_unknown_keys() {
        let yaml = r#"
bus-speed: fast
"#;
        assert!(serde_yaml::from_str::<BoardConfig>(yaml).is_err());
    }

    #[test]
    fn test_from_file_or_default_missing_file() {
        let config = BoardConfig::from_file_or_default("/nonexistent/iic/board.conf").unwrap();
        assert_eq!(config, BoardConfig::default());
    }
}
