//! EH / ET: event header and trailer packets
//!
//! Both share one layout after the packet header:
//!
//! ```text
//! event_number(2 BCD) stream(1 BCD, 0-based) reserved(3) flags(1) format(1)
//! station(4) stream_name(16) sample_rate(4) trigger_type(4)
//! trigger_time(21) first_sample(21) detrigger_time(21) last_sample(21)
//! ```
//! The trailer fills in the detrigger and last-sample times that the header
//! leaves blank.

use super::header::{PacketHeader, HEADER_LEN};
use super::open_record;
use crate::types::{RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Declared length of an EH/ET packet
pub const EVENT_LEN: usize = HEADER_LEN + 120;

const TIME_WIDTH: usize = 21;

/// Decoded EH or ET packet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub header: PacketHeader,
    pub event_number: u32,
    /// 0-based stream index
    pub stream: usize,
    pub flags: u8,
    pub data_format: u8,
    pub station: String,
    pub stream_name: String,
    pub sample_rate: Option<i64>,
    pub trigger_type: String,
    pub trigger_time: Option<Timestamp>,
    pub first_sample_time: Option<Timestamp>,
    pub detrigger_time: Option<Timestamp>,
    pub last_sample_time: Option<Timestamp>,
}

impl EventRecord {
    /// Decode an EH or ET packet; the kind is taken from the first two bytes
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let kind = if bytes.starts_with(b"ET") {
            RecordKind::EventTrailer
        } else {
            RecordKind::EventHeader
        };
        let mut c = open_record(kind, bytes, EVENT_LEN)?;
        let header = PacketHeader::read(kind, &mut c)?;

        let event_number = c.bcd(2)?;
        let stream = c.bcd(1)? as usize;
        c.skip(3)?;
        let flags = c.take(1)?[0];
        let data_format = c.take(1)?[0];

        let record = Self {
            header,
            event_number,
            stream,
            flags,
            data_format,
            station: c.text(4)?,
            stream_name: c.text(16)?,
            sample_rate: c.int("sample_rate", 4)?,
            trigger_type: c.text(4)?,
            trigger_time: c.time("trigger_time", TIME_WIDTH)?,
            first_sample_time: c.time("first_sample_time", TIME_WIDTH)?,
            detrigger_time: c.time("detrigger_time", TIME_WIDTH)?,
            last_sample_time: c.time("last_sample_time", TIME_WIDTH)?,
        };
        debug_assert_eq!(c.position(), EVENT_LEN);
        Ok(record)
    }

    pub fn is_trailer(&self) -> bool {
        self.header.kind == RecordKind::EventTrailer
    }

    /// Record time: the trigger time when present, else the packet time
    pub fn timestamp(&self) -> Timestamp {
        self.trigger_time.unwrap_or(self.header.time)
    }

    /// Source event file name, `YYYYDDD/UNIT/S/HHMMSSTTT_EEEE`
    pub fn source_file(&self) -> String {
        let t = self.timestamp();
        format!(
            "{}/{}/{}/{}{:03}_{:04}",
            t.format("%Y%j"),
            self.header.unit_hex(),
            self.stream + 1,
            t.format("%H%M%S"),
            t.timestamp_subsec_millis(),
            self.event_number
        )
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = |ts: &Option<Timestamp>| {
            ts.map(|ts| ts.format("%Y:%j:%H:%M:%S%.3f").to_string())
                .unwrap_or_else(|| "-".into())
        };
        write!(
            f,
            "{} unit={} event={} stream={} rate={} trigger={} at {}",
            self.header.kind,
            self.header.unit_hex(),
            self.event_number,
            self.stream,
            self.sample_rate.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
            self.trigger_type,
            t(&self.trigger_time)
        )?;
        if self.is_trailer() {
            write!(f, " detrigger {}", t(&self.detrigger_time))?;
        }
        Ok(())
    }
}
