//! State-of-health log classifier
//!
//! The unit writes a free-text state-of-health log, one event per line,
//! usually prefixed with a `DDD:HH:MM:SS` time:
//!
//! ```text
//! 186:21:41:35 CPU SOFTWARE V3.2.3 (0812)
//! 186:21:42:10 EXTERNAL CLOCK IS LOCKED
//! 186:21:42:10 GPS: POSITION: N34:04.3550 W118:26.4080 +00093M
//! 186:21:43:00 BATTERY VOLTAGE = 13.4V, BACKUP VOLTAGE = 3.3V, TEMPERATURE = 24.0C
//! ```
//!
//! Each line is matched against an ordered list of case-sensitive substring
//! predicates. Lines matching none of them are checked against a list of
//! known benign messages; anything left over is unknown.

use crate::types::{RecordError, Result};
use serde::Serialize;

/// Time of day from a log line prefix (`DDD:HH:MM:SS`), year not included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LogTime {
    pub day_of_year: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
}

impl LogTime {
    /// Parse the leading `DDD:HH:MM:SS` token of a line
    pub fn parse_prefix(line: &str) -> Option<Self> {
        let token = line.split_whitespace().next()?;
        let parts: Vec<u32> = token
            .split(':')
            .map(|p| p.parse::<u32>().ok())
            .collect::<Option<Vec<_>>>()?;
        match parts.as_slice() {
            &[day_of_year, hour, minute, second]
                if (1..=366).contains(&day_of_year) && hour < 24 && minute < 60 && second < 60 =>
            {
                Some(Self {
                    day_of_year,
                    hour,
                    minute,
                    second,
                })
            }
            _ => None,
        }
    }
}

/// Classification of one log line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LineClass {
    Version(String),
    ClockType(String),
    ClockLocked(LogTime),
    PhaseError(f64),
    Position {
        latitude: String,
        longitude: String,
        elevation_m: Option<f64>,
    },
    Power {
        battery_volts: f64,
        backup_volts: Option<f64>,
        temperature_c: Option<f64>,
    },
    Memory {
        used: f64,
        available: Option<f64>,
        total: Option<f64>,
    },
    IpAddresses(Vec<String>),
    Hosts(Vec<String>),
    Netmasks(Vec<String>),
    Gateways(Vec<String>),
    Sensor {
        number: usize,
        ident: String,
    },
    /// Known operational message with nothing to extract
    Benign,
    /// Matched no predicate and no benign message
    Unknown,
}

/// Operational messages that carry no state and are not worth keeping
pub const BENIGN_MESSAGES: &[&str] = &[
    "ACQUISITION STARTED",
    "ACQUISITION STOPPED",
    "ACQUISITION ENABLED",
    "AUTO DUMP",
    "DUMP CALLED",
    "DUMP COMPLETE",
    "DISK 1",
    "DISK 2",
    "DISK FORMAT",
    "DISK WRAP",
    "DISK ERASE",
    "LINK IS UP",
    "LINK IS DOWN",
    "LINK STATUS",
    "WAKEUP",
    "SLEEP MODE",
    "POWER DOWN DELAY",
    "EXTERNAL CLOCK POWER",
    "EXTERNAL CLOCK SLEEP",
    "EXTERNAL CLOCK WAKEUP",
    "CLOCK IS UNLOCKED",
    "GPS: ",
    "TIME SYNC",
    "JERK",
    "STATION CHANNEL DEFINITION",
    "DATA STREAM DEFINITION",
    "OPERATING MODE DEFINITION",
    "CALIBRATION DEFINITION",
    "EVENT",
    "TRIGGER",
    "DSP CLOCK",
    "SELF TEST",
    "STATE OF HEALTH",
    "RAM BUFFER",
    "NETWORK LAYER",
    "TELEMETRY",
    "MAC ADDRESS",
    "REBOOT",
    "RESET",
];

/// Classify one line
///
/// Returns `MalformedField` when a recognized line carries a number that
/// does not parse; the caller logs it and moves on to the next line.
pub fn classify(line: &str) -> Result<LineClass> {
    if line.contains("CPU SOFTWARE") {
        return Ok(LineClass::Version(after(line, "CPU SOFTWARE").trim().to_string()));
    }
    if line.contains("EXTERNAL CLOCK TYPE") {
        return Ok(LineClass::ClockType(list_text(line, "EXTERNAL CLOCK TYPE").to_string()));
    }
    if line.contains("CLOCK IS LOCKED") {
        return LogTime::parse_prefix(line)
            .map(LineClass::ClockLocked)
            .ok_or_else(|| RecordError::malformed("lock_time", line.as_bytes(), "missing DDD:HH:MM:SS prefix"));
    }
    if line.contains("PHASE ERROR") {
        let key = if line.contains("PHASE ERROR OF") { "PHASE ERROR OF" } else { "PHASE ERROR" };
        return Ok(LineClass::PhaseError(number_after("phase_error", line, key)?));
    }
    if line.contains("POSITION:") {
        let mut tokens = after(line, "POSITION:").split_whitespace();
        let latitude = tokens.next().unwrap_or_default().to_string();
        let longitude = tokens.next().unwrap_or_default().to_string();
        let elevation_m = match tokens.next() {
            Some(raw) => Some(parse_number("elevation", raw.trim_end_matches('M'))?),
            None => None,
        };
        return Ok(LineClass::Position {
            latitude,
            longitude,
            elevation_m,
        });
    }
    if line.contains("BATTERY VOLTAGE") {
        return Ok(LineClass::Power {
            battery_volts: number_after("battery_volts", line, "BATTERY VOLTAGE")?,
            backup_volts: optional_number_after("backup_volts", line, "BACKUP VOLTAGE")?,
            temperature_c: optional_number_after("temperature", line, "TEMPERATURE")?,
        });
    }
    if line.contains("MEMORY USED") {
        return Ok(LineClass::Memory {
            used: number_after("memory_used", line, "MEMORY USED")?,
            available: optional_number_after("memory_available", line, "AVAILABLE")?,
            total: optional_number_after("memory_total", line, "TOTAL")?,
        });
    }
    if line.contains("IP ADDRESS") {
        return Ok(LineClass::IpAddresses(address_list(list_text(line, "IP ADDRESS"))));
    }
    if line.contains("NETMASK") {
        return Ok(LineClass::Netmasks(address_list(list_text(line, "NETMASK"))));
    }
    if line.contains("GATEWAY") {
        return Ok(LineClass::Gateways(address_list(list_text(line, "GATEWAY"))));
    }
    if line.contains("HOST") {
        return Ok(LineClass::Hosts(address_list(list_text(line, "HOST"))));
    }
    if let Some((number, ident)) = sensor_line(line)? {
        return Ok(LineClass::Sensor { number, ident });
    }

    if BENIGN_MESSAGES.iter().any(|m| line.contains(m)) {
        Ok(LineClass::Benign)
    } else {
        Ok(LineClass::Unknown)
    }
}

/// Everything after the first occurrence of `key`
fn after<'a>(line: &'a str, key: &str) -> &'a str {
    line.find(key).map(|i| &line[i + key.len()..]).unwrap_or("")
}

/// Text after `key` and its `:`/`=` separator (`IP ADDRESSES: a b` -> `a b`)
fn list_text<'a>(line: &'a str, key: &str) -> &'a str {
    let rest = after(line, key);
    let rest = match rest.find(|c: char| c == ':' || c == '=') {
        Some(i) => &rest[i + 1..],
        None => rest,
    };
    rest.trim()
}

/// Split a whitespace list of dotted addresses, repairing `192.168. 1.10`
pub fn address_list(text: &str) -> Vec<String> {
    let mut repaired = text.to_string();
    while repaired.contains(". ") || repaired.contains(" .") {
        repaired = repaired.replace(". ", ".").replace(" .", ".");
    }
    repaired.split_whitespace().map(str::to_string).collect()
}

fn numeric_token<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    let i = line.find(key)?;
    let rest = line[i + key.len()..].trim_start_matches(|c: char| c == ' ' || c == '=' || c == ':');
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

fn parse_number(field: &'static str, token: &str) -> Result<f64> {
    crate::codec::parse_decimal(field, token.as_bytes())?
        .ok_or_else(|| RecordError::malformed(field, token.as_bytes(), "missing number"))
}

fn number_after(field: &'static str, line: &str, key: &str) -> Result<f64> {
    let token = numeric_token(line, key).unwrap_or("");
    parse_number(field, token).map_err(|_| RecordError::malformed(field, line.as_bytes(), format!("no number after {}", key)))
}

fn optional_number_after(field: &'static str, line: &str, key: &str) -> Result<Option<f64>> {
    match numeric_token(line, key) {
        None => Ok(None),
        Some(token) => parse_number(field, token).map(Some),
    }
}

/// `SENSOR n: identifier` lines
fn sensor_line(line: &str) -> Result<Option<(usize, String)>> {
    let rest = after(line, "SENSOR ");
    let digits_end = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    if digits_end == 0 || !rest[digits_end..].starts_with(':') {
        return Ok(None);
    }
    let number: usize = rest[..digits_end]
        .parse()
        .map_err(|_| RecordError::malformed("sensor", line.as_bytes(), "bad sensor number"))?;
    if !(1..=crate::records::sensor::MAX_SENSORS).contains(&number) {
        return Err(RecordError::malformed("sensor", line.as_bytes(), "sensor number out of range"));
    }
    Ok(Some((number, rest[digits_end + 1..].trim().to_string())))
}

/// Everything the log has told us about a unit
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SohInfo {
    pub version: Option<String>,
    pub clock_type: Option<String>,
    pub lock_time: Option<LogTime>,
    pub phase_error_us: Option<f64>,
    pub latitude: Option<String>,
    pub longitude: Option<String>,
    pub elevation_m: Option<f64>,
    pub battery_volts: Option<f64>,
    pub backup_volts: Option<f64>,
    pub temperature_c: Option<f64>,
    pub memory_used: Option<f64>,
    pub memory_available: Option<f64>,
    pub memory_total: Option<f64>,
    pub ip_addresses: Vec<String>,
    pub hosts: Vec<String>,
    pub netmasks: Vec<String>,
    pub gateways: Vec<String>,
    pub sensors: [Option<String>; 4],
}

impl SohInfo {
    /// Fold one classified line into the accumulated info
    ///
    /// Returns false for `Benign` and `Unknown`, which carry no state.
    pub fn apply(&mut self, class: LineClass) -> bool {
        match class {
            LineClass::Version(v) => self.version = Some(v),
            LineClass::ClockType(t) => self.clock_type = Some(t),
            LineClass::ClockLocked(t) => self.lock_time = Some(t),
            LineClass::PhaseError(p) => self.phase_error_us = Some(p),
            LineClass::Position {
                latitude,
                longitude,
                elevation_m,
            } => {
                self.latitude = Some(latitude);
                self.longitude = Some(longitude);
                self.elevation_m = elevation_m;
            }
            LineClass::Power {
                battery_volts,
                backup_volts,
                temperature_c,
            } => {
                self.battery_volts = Some(battery_volts);
                self.backup_volts = backup_volts;
                self.temperature_c = temperature_c;
            }
            LineClass::Memory {
                used,
                available,
                total,
            } => {
                self.memory_used = Some(used);
                self.memory_available = available;
                self.memory_total = total;
            }
            LineClass::IpAddresses(list) => self.ip_addresses = list,
            LineClass::Hosts(list) => self.hosts = list,
            LineClass::Netmasks(list) => self.netmasks = list,
            LineClass::Gateways(list) => self.gateways = list,
            LineClass::Sensor { number, ident } => {
                match number.checked_sub(1).and_then(|i| self.sensors.get_mut(i)) {
                    Some(slot) => *slot = Some(ident),
                    None => {
                        log::warn!("Ignoring sensor {} ident {:?}: no such sensor", number, ident);
                        return false;
                    }
                }
            }
            LineClass::Benign | LineClass::Unknown => return false,
        }
        true
    }
}

/// Per-blob counters returned by `UnitState::apply_log_text`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LogTextSummary {
    pub recognized: usize,
    pub benign: usize,
    pub unknown: usize,
    pub malformed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_and_clock_type() {
        assert_eq!(
            classify("186:21:41:35 CPU SOFTWARE V3.2.3 (0812)").unwrap(),
            LineClass::Version("V3.2.3 (0812)".into())
        );
        assert_eq!(
            classify("186:21:41:35 EXTERNAL CLOCK TYPE: GPS").unwrap(),
            LineClass::ClockType("GPS".into())
        );
    }

    #[test]
    fn test_clock_locked_time() {
        let class = classify("186:21:42:10 EXTERNAL CLOCK IS LOCKED").unwrap();
        assert_eq!(
            class,
            LineClass::ClockLocked(LogTime {
                day_of_year: 186,
                hour: 21,
                minute: 42,
                second: 10
            })
        );
        assert!(classify("EXTERNAL CLOCK IS LOCKED").is_err());
        assert_eq!(classify("186:21:42:10 EXTERNAL CLOCK IS UNLOCKED").unwrap(), LineClass::Benign);
    }

    #[test]
    fn test_phase_error() {
        assert_eq!(
            classify("186:21:42:10 INTERNAL CLOCK PHASE ERROR OF 4 USECONDS").unwrap(),
            LineClass::PhaseError(4.0)
        );
        assert!(classify("186:21:42:10 INTERNAL CLOCK PHASE ERROR OF ?? USECONDS").is_err());
    }

    #[test]
    fn test_position() {
        assert_eq!(
            classify("186:21:42:10 GPS: POSITION: N34:04.3550 W118:26.4080 +00093M").unwrap(),
            LineClass::Position {
                latitude: "N34:04.3550".into(),
                longitude: "W118:26.4080".into(),
                elevation_m: Some(93.0),
            }
        );
    }

    #[test]
    fn test_power_triple() {
        assert_eq!(
            classify("186:21:43:00 BATTERY VOLTAGE = 13.4V, BACKUP VOLTAGE = 3.3V, TEMPERATURE = -4.0C")
                .unwrap(),
            LineClass::Power {
                battery_volts: 13.4,
                backup_volts: Some(3.3),
                temperature_c: Some(-4.0),
            }
        );
    }

    #[test]
    fn test_memory_triple() {
        assert_eq!(
            classify("186:21:43:00 MEMORY USED = 1024K, AVAILABLE = 3072K, TOTAL = 4096K").unwrap(),
            LineClass::Memory {
                used: 1024.0,
                available: Some(3072.0),
                total: Some(4096.0),
            }
        );
    }

    #[test]
    fn test_address_lists_repair_embedded_spaces() {
        assert_eq!(
            classify("186:21:43:00 IP ADDRESSES: 192.168. 1.10 10.0.0.2").unwrap(),
            LineClass::IpAddresses(vec!["192.168.1.10".into(), "10.0.0.2".into()])
        );
        assert_eq!(
            classify("186:21:43:00 NETMASK: 255.255.255. 0").unwrap(),
            LineClass::Netmasks(vec!["255.255.255.0".into()])
        );
        assert_eq!(
            classify("186:21:43:00 GATEWAY = 192.168.1 .1").unwrap(),
            LineClass::Gateways(vec!["192.168.1.1".into()])
        );
        assert_eq!(
            classify("186:21:43:00 HOST: 10.1.1.1 10.1.1.2").unwrap(),
            LineClass::Hosts(vec!["10.1.1.1".into(), "10.1.1.2".into()])
        );
    }

    #[test]
    fn test_sensor_identifier() {
        assert_eq!(
            classify("186:21:43:00 SENSOR 2: STS-2 SN 12345").unwrap(),
            LineClass::Sensor {
                number: 2,
                ident: "STS-2 SN 12345".into()
            }
        );
        assert!(classify("186:21:43:00 SENSOR 9: STS-2").is_err());
    }

    #[test]
    fn test_benign_and_unknown() {
        assert_eq!(classify("186:21:43:00 LINK IS UP").unwrap(), LineClass::Benign);
        assert_eq!(classify("186:21:43:00 DISK 1 ACTIVE").unwrap(), LineClass::Benign);
        assert_eq!(classify("186:21:43:00 FLUX CAPACITOR NOMINAL").unwrap(), LineClass::Unknown);
    }

    #[test]
    fn test_predicates_are_case_sensitive() {
        assert_eq!(classify("cpu software v1").unwrap(), LineClass::Unknown);
    }

    #[test]
    fn test_info_accumulates() {
        let mut info = SohInfo::default();
        assert!(info.apply(classify("186:21:41:35 CPU SOFTWARE V3.2.3").unwrap()));
        assert!(info.apply(classify("186:21:43:00 SENSOR 1: L-4C").unwrap()));
        assert!(!info.apply(LineClass::Benign));
        assert_eq!(info.version.as_deref(), Some("V3.2.3"));
        assert_eq!(info.sensors[0].as_deref(), Some("L-4C"));
    }

    #[test]
    fn test_sensor_number_outside_table_ignored() {
        let mut info = SohInfo::default();
        for number in [0, crate::records::sensor::MAX_SENSORS + 1] {
            let class = LineClass::Sensor {
                number,
                ident: "STS-2".into(),
            };
            assert!(!info.apply(class));
        }
        assert!(info.sensors.iter().all(Option::is_none));
    }
}
