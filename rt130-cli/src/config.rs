//! Configuration loading and parsing

use anyhow::{bail, Context, Result};
use rt130_decoder::{TrackerConfig, UnitConfig};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Main application configuration (loaded from units.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub units: Vec<UnitConfig>,
}

impl AppConfig {
    /// Configuration of one unit, by number
    pub fn unit(&self, unit: u16) -> Option<&UnitConfig> {
        self.units.iter().find(|u| u.unit == unit)
    }

    fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for unit in &self.units {
            if !seen.insert(unit.unit) {
                bail!("Unit {:04X} is configured more than once", unit.unit);
            }
            let mut streams = HashSet::new();
            for stream in &unit.streams {
                if !streams.insert(stream.stream) {
                    bail!("Unit {:04X}: stream {} is configured more than once", unit.unit, stream.stream);
                }
            }
        }
        if self.tracker.unknown_log_trim == 0 || self.tracker.unknown_log_trim > self.tracker.unknown_log_limit {
            bail!(
                "unknown_log_trim must be between 1 and unknown_log_limit ({})",
                self.tracker.unknown_log_limit
            );
        }
        Ok(())
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    config
        .validate()
        .with_context(|| format!("Invalid config file: {:?}", path))?;

    log::debug!("Loaded {} unit(s) from {:?}", config.units.len(), path);
    Ok(config)
}

/// Parse a unit number written as hex (`9C3E` or `0x9C3E`)
pub fn parse_unit(text: &str) -> Result<u16> {
    let digits = text
        .trim()
        .trim_start_matches("0x")
        .trim_start_matches("0X");
    u16::from_str_radix(digits, 16).with_context(|| format!("Invalid unit number: {:?}", text))
}
