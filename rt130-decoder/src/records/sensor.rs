//! AD: sensor mass position
//!
//! ```text
//! kind(2) time(17) sensor(1) mass1(5) mass2(5) mass3(5)
//! ```
//! Mass positions are in volts.

use super::{format_time, open_status};
use crate::types::{RecordError, RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Declared length of an AD record
pub const AD_LEN: usize = 35;

/// Number of sensors a unit reports mass positions for
pub const MAX_SENSORS: usize = 4;

/// Decoded AD record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorStatus {
    pub time: Timestamp,
    /// 1-based sensor number
    pub sensor: usize,
    pub mass_positions: [Option<f64>; 3],
}

impl SensorStatus {
    /// Decode an AD record
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (mut c, time) = open_status(RecordKind::Sensor, bytes, AD_LEN)?;
        let raw = c.take(1)?;
        let sensor = match crate::codec::parse_int("sensor", raw)? {
            Some(n) if (1..=MAX_SENSORS as i64).contains(&n) => n as usize,
            _ => return Err(RecordError::malformed("sensor", raw, "expected sensor 1-4")),
        };
        let mass_positions = [
            c.decimal("mass1", 5)?,
            c.decimal("mass2", 5)?,
            c.decimal("mass3", 5)?,
        ];
        debug_assert_eq!(c.position(), AD_LEN);
        Ok(Self {
            time,
            sensor,
            mass_positions,
        })
    }

    pub fn timestamp(&self) -> Timestamp {
        self.time
    }
}

impl fmt::Display for SensorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let positions: Vec<String> = self
            .mass_positions
            .iter()
            .map(|m| m.map(|v| format!("{:.1}", v)).unwrap_or_else(|| "-".into()))
            .collect();
        write!(
            f,
            "AD {} sensor={} mass={}",
            format_time(&self.time),
            self.sensor,
            positions.join(",")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::testdata::{ad, T0};
    use super::*;

    #[test]
    fn test_decode_sensor_record() {
        let status = SensorStatus::decode(&ad(T0, 2)).unwrap();
        assert_eq!(status.sensor, 2);
        assert_eq!(status.mass_positions, [Some(0.1), Some(-1.2), Some(2.5)]);
        assert_eq!(status.to_string(), "AD 2024:060:12:00:00 sensor=2 mass=0.1,-1.2,2.5");
    }

    #[test]
    fn test_record_of_declared_length() {
        let record = ad(T0, 1);
        assert_eq!(record.len(), AD_LEN);
        assert!(SensorStatus::decode(&record).is_ok());

        // Bytes past the declared length are not read
        let mut padded = record.clone();
        padded.extend_from_slice(b"     ");
        assert_eq!(SensorStatus::decode(&padded).unwrap().sensor, 1);

        assert!(matches!(
            SensorStatus::decode(&record[..AD_LEN - 1]),
            Err(RecordError::Truncated { needed: AD_LEN, .. })
        ));
    }

    #[test]
    fn test_sensor_number_out_of_range() {
        assert!(SensorStatus::decode(&ad(T0, 5)).is_err());
        assert!(SensorStatus::decode(&ad(T0, 0)).is_err());
    }
}
