//! DK: disk usage status
//!
//! ```text
//! kind(2) time(17) current_disk(1)
//! d1_total(8) d1_used(8) d1_avail(8) d2_total(8) d2_used(8) d2_avail(8)
//! ```
//! Capacities are in megabytes.

use super::{format_time, open_status};
use crate::codec::FieldCursor;
use crate::types::{RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Declared length of a DK record
pub const DK_LEN: usize = 68;

/// Usage figures for one physical disk
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DiskUsage {
    pub total_mb: Option<i64>,
    pub used_mb: Option<i64>,
    pub available_mb: Option<i64>,
}

impl DiskUsage {
    fn read(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            total_mb: c.int("disk_total", 8)?,
            used_mb: c.int("disk_used", 8)?,
            available_mb: c.int("disk_available", 8)?,
        })
    }

    /// Percentage of the disk in use, `-1` when the capacity is unknown or zero
    pub fn percent_used(&self) -> i64 {
        let total = self.total_mb.unwrap_or(0);
        let available = self
            .available_mb
            .or_else(|| self.used_mb.map(|used| total - used))
            .unwrap_or(total);
        disk_percent(total, available)
    }
}

/// `round((total - available) * 100 / total)`, or `-1` when `total <= 0`
pub fn disk_percent(total: i64, available: i64) -> i64 {
    if total <= 0 {
        return -1;
    }
    (((total - available) as f64) * 100.0 / total as f64).round() as i64
}

/// Decoded DK record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiskStatus {
    pub time: Timestamp,
    /// Disk currently being written (1 or 2)
    pub current_disk: Option<i64>,
    pub disks: [DiskUsage; 2],
}

impl DiskStatus {
    /// Decode a DK record
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (mut c, time) = open_status(RecordKind::Disk, bytes, DK_LEN)?;
        let current_disk = c.int("current_disk", 1)?;
        let disks = [DiskUsage::read(&mut c)?, DiskUsage::read(&mut c)?];
        debug_assert_eq!(c.position(), DK_LEN);
        Ok(Self {
            time,
            current_disk,
            disks,
        })
    }

    pub fn timestamp(&self) -> Timestamp {
        self.time
    }

    /// Percentage in use of disk `index` (0-based)
    pub fn percent_used(&self, index: usize) -> i64 {
        self.disks.get(index).map(DiskUsage::percent_used).unwrap_or(-1)
    }
}

impl fmt::Display for DiskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DK {} current={} disk1={}% disk2={}%",
            format_time(&self.time),
            self.current_disk.map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            self.percent_used(0),
            self.percent_used(1)
        )
    }
}
