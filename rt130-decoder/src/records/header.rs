//! RT130 packet header
//!
//! ```text
//! Offset  Width  Content
//!  0      2      kind (ASCII)
//!  2      1      experiment number (BCD)
//!  3      1      year, 2 digits (BCD)
//!  4      2      unit id (big-endian binary, shown as hex)
//!  6      6      time DDDHHMMSSTTT (BCD)
//! 12      2      byte count (BCD)
//! 14      2      sequence number (BCD)
//! ```

use crate::codec::{timestamp_from_parts, FieldCursor};
use crate::types::{RecordError, RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Size of the packet header in bytes
pub const HEADER_LEN: usize = 16;

/// Decoded packet header
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketHeader {
    pub kind: RecordKind,
    pub experiment: u32,
    pub unit_id: u16,
    pub time: Timestamp,
    pub byte_count: u32,
    pub sequence: u32,
}

impl PacketHeader {
    /// Read the header that follows the kind code
    ///
    /// The cursor must be positioned just after the two-letter kind, which
    /// the caller has already checked.
    pub(crate) fn read(kind: RecordKind, c: &mut FieldCursor<'_>) -> Result<Self> {
        let experiment = c.bcd(1)?;
        let year = 2000 + c.bcd(1)? as i32;
        let unit_id = c.u16_be()?;

        let digits = c.bcd_string(6)?;
        let part = |range: std::ops::Range<usize>| -> u32 {
            // decode_string only ever yields ASCII digits
            digits[range].parse().unwrap_or(0)
        };
        let time = timestamp_from_parts(
            year,
            part(0..3),
            part(3..5),
            part(5..7),
            part(7..9),
            part(9..12),
        )
        .ok_or_else(|| {
            RecordError::malformed("header_time", digits.as_bytes(), "time out of range")
        })?;

        let byte_count = c.bcd(2)?;
        let sequence = c.bcd(2)?;

        Ok(Self {
            kind,
            experiment,
            unit_id,
            time,
            byte_count,
            sequence,
        })
    }

    /// Unit id as the 4-digit hex string printed on the unit
    pub fn unit_hex(&self) -> String {
        format!("{:04X}", self.unit_id)
    }
}

impl fmt::Display for PacketHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} unit={} exp={} seq={} {}",
            self.kind,
            self.unit_hex(),
            self.experiment,
            self.sequence,
            self.time.format("%Y:%j:%H:%M:%S%.3f")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::super::open_record;
    use super::super::testdata::header;
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_decode_header() {
        let bytes = header("OM");
        let mut c = open_record(RecordKind::OperatingMode, &bytes, HEADER_LEN).unwrap();
        let h = PacketHeader::read(RecordKind::OperatingMode, &mut c).unwrap();
        assert_eq!(c.position(), HEADER_LEN);
        assert_eq!(h.experiment, 1);
        assert_eq!(h.unit_hex(), "9C3E");
        assert_eq!(h.time.year(), 2024);
        assert_eq!(h.time.ordinal(), 60);
        assert_eq!(h.time.hour(), 12);
        assert_eq!(h.byte_count, 1024);
        assert_eq!(h.sequence, 17);
    }

    #[test]
    fn test_bad_header_time() {
        let mut bytes = header("OM");
        // Day 999
        bytes[6] = 0x99;
        bytes[7] = 0x91;
        let mut c = open_record(RecordKind::OperatingMode, &bytes, HEADER_LEN).unwrap();
        assert!(PacketHeader::read(RecordKind::OperatingMode, &mut c).is_err());
    }
}
