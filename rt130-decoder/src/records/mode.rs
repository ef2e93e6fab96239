//! OM: operating mode packet
//!
//! ```text
//! power_state(2) recording_mode(2) auto_dump_on_et(1) auto_dump_threshold(2)
//! power_down_delay(4) disk_wrap(1) disk_power(1) terminator_power(1)
//! wakeup_start(12) wakeup_duration(6) wakeup_interval(6) wakeup_count(2)
//! ```

use super::header::{PacketHeader, HEADER_LEN};
use super::open_record;
use crate::types::{RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Declared length of an OM packet
pub const OM_LEN: usize = HEADER_LEN + 40;

/// Decoded OM packet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperatingModeRecord {
    pub header: PacketHeader,
    pub power_state: String,
    pub recording_mode: String,
    pub auto_dump_on_et: bool,
    pub auto_dump_threshold: Option<i64>,
    pub power_down_delay: Option<i64>,
    pub disk_wrap: bool,
    pub disk_power: bool,
    pub terminator_power: bool,
    pub wakeup_start: String,
    pub wakeup_duration: Option<i64>,
    pub wakeup_interval: Option<i64>,
    pub wakeup_count: Option<i64>,
}

impl OperatingModeRecord {
    /// Decode an OM packet
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut c = open_record(RecordKind::OperatingMode, bytes, OM_LEN)?;
        let header = PacketHeader::read(RecordKind::OperatingMode, &mut c)?;
        let record = Self {
            header,
            power_state: c.text(2)?,
            recording_mode: c.text(2)?,
            auto_dump_on_et: c.flag()? == 'Y',
            auto_dump_threshold: c.int("auto_dump_threshold", 2)?,
            power_down_delay: c.int("power_down_delay", 4)?,
            disk_wrap: c.flag()? == 'Y',
            disk_power: c.flag()? == 'Y',
            terminator_power: c.flag()? == 'Y',
            wakeup_start: c.text(12)?,
            wakeup_duration: c.int("wakeup_duration", 6)?,
            wakeup_interval: c.int("wakeup_interval", 6)?,
            wakeup_count: c.int("wakeup_count", 2)?,
        };
        debug_assert_eq!(c.position(), OM_LEN);
        Ok(record)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.header.time
    }
}

impl fmt::Display for OperatingModeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yn = |b: bool| if b { 'Y' } else { 'N' };
        write!(
            f,
            "OM unit={} power={} recording={} autodump={}@{} wrap={} diskpower={} termpower={} wakeup={}",
            self.header.unit_hex(),
            self.power_state,
            self.recording_mode,
            yn(self.auto_dump_on_et),
            self.auto_dump_threshold.map(|t| t.to_string()).unwrap_or_else(|| "-".into()),
            yn(self.disk_wrap),
            yn(self.disk_power),
            yn(self.terminator_power),
            if self.wakeup_start.is_empty() { "-" } else { &self.wakeup_start }
        )
    }
}
