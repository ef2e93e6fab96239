//! US: unit power and temperature status
//!
//! ```text
//! kind(2) time(17) input_volts(5) backup_volts(5) temperature_c(5)
//! ```

use super::{format_time, open_status};
use crate::types::{RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Declared length of a US record
pub const US_LEN: usize = 34;

/// Decoded US record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnitStatus {
    pub time: Timestamp,
    pub input_volts: Option<f64>,
    pub backup_volts: Option<f64>,
    pub temperature_c: Option<f64>,
}

impl UnitStatus {
    /// Decode a US record
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (mut c, time) = open_status(RecordKind::Unit, bytes, US_LEN)?;
        let status = Self {
            time,
            input_volts: c.decimal("input_volts", 5)?,
            backup_volts: c.decimal("backup_volts", 5)?,
            temperature_c: c.decimal("temperature", 5)?,
        };
        debug_assert_eq!(c.position(), US_LEN);
        Ok(status)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.time
    }

    pub fn temperature_f(&self) -> Option<f64> {
        self.temperature_c.map(|c| c * 9.0 / 5.0 + 32.0)
    }
}

impl fmt::Display for UnitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = |x: Option<f64>| x.map(|x| format!("{:.1}", x)).unwrap_or_else(|| "-".into());
        write!(
            f,
            "US {} input={}V backup={}V temp={}C",
            format_time(&self.time),
            v(self.input_volts),
            v(self.backup_volts),
            v(self.temperature_c)
        )
    }
}
