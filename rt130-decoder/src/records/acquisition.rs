//! AQ: acquisition status
//!
//! ```text
//! kind(2) time(17) acquiring(1) events(6) ram_total(8) ram_avail(8)
//! ```
//! RAM figures are in kilobytes.

use super::{format_time, open_status};
use crate::types::{RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Declared length of an AQ record
pub const AQ_LEN: usize = 42;

/// `available * 100 / total` with integer truncation, `-1` when `total <= 0`
pub fn acquisition_percent(total: i64, available: i64) -> i64 {
    if total <= 0 {
        return -1;
    }
    available * 100 / total
}

/// Decoded AQ record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionStatus {
    pub time: Timestamp,
    pub acquiring: bool,
    pub events: Option<i64>,
    pub ram_total_kb: Option<i64>,
    pub ram_available_kb: Option<i64>,
}

impl AcquisitionStatus {
    /// Decode an AQ record
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (mut c, time) = open_status(RecordKind::Acquisition, bytes, AQ_LEN)?;
        let status = Self {
            time,
            acquiring: c.flag()? == 'Y',
            events: c.int("events", 6)?,
            ram_total_kb: c.int("ram_total", 8)?,
            ram_available_kb: c.int("ram_available", 8)?,
        };
        debug_assert_eq!(c.position(), AQ_LEN);
        Ok(status)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.time
    }

    /// Percentage of acquisition RAM still available
    pub fn percent_available(&self) -> i64 {
        acquisition_percent(
            self.ram_total_kb.unwrap_or(0),
            self.ram_available_kb.unwrap_or(0),
        )
    }
}

impl fmt::Display for AcquisitionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AQ {} acquiring={} events={} ram_avail={}%",
            format_time(&self.time),
            if self.acquiring { "Y" } else { "N" },
            self.events.map(|e| e.to_string()).unwrap_or_else(|| "-".into()),
            self.percent_available()
        )
    }
}
