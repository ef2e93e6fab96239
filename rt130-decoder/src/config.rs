//! Tracker and unit configuration types
//!
//! Unit assignments (network, station, per-stream naming) normally come from
//! the configuration database; the tracker settings control the scheduler
//! cadence and the memory bounds of each unit.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings shared by every unit tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Emission scheduler tick in milliseconds (default: 1000ms)
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,

    /// Maximum size of the unknown-log buffer in characters
    #[serde(default = "default_unknown_log_limit")]
    pub unknown_log_limit: usize,

    /// Characters discarded from the front when the limit is exceeded
    #[serde(default = "default_unknown_log_trim")]
    pub unknown_log_trim: usize,

    /// Initial size of the data stream table
    #[serde(default = "default_stream_slots")]
    pub stream_slots: usize,

    /// Initial size of the channel table
    #[serde(default = "default_channel_slots")]
    pub channel_slots: usize,

    /// Digitizer type reported in the composite status line
    #[serde(default = "default_das_type")]
    pub das_type: String,

    /// Depth of each unit's command queue
    #[serde(default = "default_command_queue")]
    pub command_queue: usize,
}

fn default_tick_ms() -> u64 {
    1000
}

fn default_unknown_log_limit() -> usize {
    100_000
}

fn default_unknown_log_trim() -> usize {
    50_000
}

fn default_stream_slots() -> usize {
    16
}

fn default_channel_slots() -> usize {
    30
}

fn default_das_type() -> String {
    "RT130".to_string()
}

fn default_command_queue() -> usize {
    256
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            tick_ms: default_tick_ms(),
            unknown_log_limit: default_unknown_log_limit(),
            unknown_log_trim: default_unknown_log_trim(),
            stream_slots: default_stream_slots(),
            channel_slots: default_channel_slots(),
            das_type: default_das_type(),
            command_queue: default_command_queue(),
        }
    }
}

impl TrackerConfig {
    /// Create a tracker configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the scheduler tick
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick_ms = tick.as_millis() as u64;
        self
    }

    /// Builder method: set the unknown-log bound and trim amount
    pub fn with_unknown_log_limits(mut self, limit: usize, trim: usize) -> Self {
        self.unknown_log_limit = limit;
        self.unknown_log_trim = trim;
        self
    }

    /// Builder method: set the digitizer type label
    pub fn with_das_type(mut self, das_type: impl Into<String>) -> Self {
        self.das_type = das_type.into();
        self
    }

    /// Scheduler tick as a `Duration`
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }
}

/// Naming assignment for one data stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamAssignment {
    /// 0-based stream index
    pub stream: usize,
    /// Location code; 4 characters when the stream has two sensors (`0010`)
    #[serde(default)]
    pub location: String,
    /// Channel numbers recorded by the stream, one digit each (`123456`)
    #[serde(default)]
    pub channels: String,
    /// Component letters by channel position (`ZNE`)
    pub components: String,
    /// Sample rate in samples per second
    #[serde(default = "default_rate")]
    pub rate: f64,
    /// Band and instrument codes; 4 characters when the stream has two sensors (`HHHN`)
    pub band: String,
}

fn default_rate() -> f64 {
    1.0
}

impl StreamAssignment {
    /// Create an assignment for a stream
    pub fn new(stream: usize, band: impl Into<String>, components: impl Into<String>) -> Self {
        Self {
            stream,
            location: String::new(),
            channels: String::new(),
            components: components.into(),
            rate: default_rate(),
            band: band.into(),
        }
    }

    /// Builder method: set the location code
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Builder method: set the channel-number string
    pub fn with_channels(mut self, channels: impl Into<String>) -> Self {
        self.channels = channels.into();
        self
    }

    /// Builder method: set the sample rate
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.rate = rate;
        self
    }
}

/// Identity and stream assignments of one field unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConfig {
    /// Unit number (shown on the unit as 4 hex digits)
    pub unit: u16,
    #[serde(default)]
    pub ip: String,
    pub network: String,
    pub station: String,
    #[serde(default)]
    pub streams: Vec<StreamAssignment>,
}

impl UnitConfig {
    /// Create a unit configuration with no streams
    pub fn new(unit: u16, network: impl Into<String>, station: impl Into<String>) -> Self {
        Self {
            unit,
            ip: String::new(),
            network: network.into(),
            station: station.into(),
            streams: Vec::new(),
        }
    }

    /// Builder method: set the unit IP address
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self
    }

    /// Builder method: add a stream assignment
    pub fn add_stream(mut self, stream: StreamAssignment) -> Self {
        self.streams.push(stream);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_config_defaults() {
        let config = TrackerConfig::new();
        assert_eq!(config.tick(), Duration::from_secs(1));
        assert_eq!(config.unknown_log_limit, 100_000);
        assert_eq!(config.unknown_log_trim, 50_000);
        assert_eq!(config.stream_slots, 16);
        assert_eq!(config.channel_slots, 30);
        assert_eq!(config.das_type, "RT130");
    }

    #[test]
    fn test_builders() {
        let config = TrackerConfig::new()
            .with_tick(Duration::from_millis(250))
            .with_unknown_log_limits(100, 40)
            .with_das_type("RT130-01");
        assert_eq!(config.tick_ms, 250);
        assert_eq!(config.unknown_log_limit, 100);
        assert_eq!(config.das_type, "RT130-01");

        let unit = UnitConfig::new(0x9C3E, "XX", "TEST")
            .with_ip("10.0.0.5")
            .add_stream(
                StreamAssignment::new(0, "BH", "ZNE")
                    .with_location("00")
                    .with_channels("123")
                    .with_rate(40.0),
            );
        assert_eq!(unit.streams.len(), 1);
        assert_eq!(unit.streams[0].rate, 40.0);
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let json = r#"{"unit": 40000, "network": "XX", "station": "ABC",
                       "streams": [{"stream": 1, "components": "ZNE", "band": "HH"}]}"#;
        let unit: UnitConfig = serde_json::from_str(json).unwrap();
        assert_eq!(unit.ip, "");
        assert_eq!(unit.streams[0].rate, 1.0);
        assert_eq!(unit.streams[0].location, "");

        let tracker: TrackerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(tracker, TrackerConfig::default());
    }
}
