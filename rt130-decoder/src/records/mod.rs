//! Status record decoders
//!
//! One decoder per record kind. Every decoder consumes exactly its declared
//! byte length, exposes the record's embedded timestamp for freshness tracking
//! and renders a one-line summary through `Display`.
//!
//! ## Record families
//! - ASCII status records (XC, DK, US, AQ, AD): `kind(2) time(17)` prefix
//!   followed by fixed-width ASCII fields.
//! - RT130 packets (EH, ET, DS, SC, OM): 16-byte packed-decimal header
//!   ([`header::PacketHeader`]) followed by a fixed-width ASCII body.

pub mod acquisition;
pub mod clock;
pub mod disk;
pub mod event;
pub mod header;
pub mod mode;
pub mod sensor;
pub mod station;
pub mod stream;
pub mod unit;

pub use acquisition::{acquisition_percent, AcquisitionStatus};
pub use clock::{ClockStatus, LockState};
pub use disk::{disk_percent, DiskStatus, DiskUsage};
pub use event::EventRecord;
pub use header::PacketHeader;
pub use mode::OperatingModeRecord;
pub use sensor::SensorStatus;
pub use station::{ChannelInfo, StationChannelRecord};
pub use stream::{DataStreamRecord, StreamDefinition};
pub use unit::UnitStatus;

use crate::codec::FieldCursor;
use crate::types::{RecordError, RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Width of the `yyyy:ddd:hh:mm:ss` time that follows every status kind code
pub const STATUS_TIME_WIDTH: usize = 17;

/// Render a timestamp the way the unit writes it
pub fn format_time(ts: &Timestamp) -> String {
    ts.format("%Y:%j:%H:%M:%S").to_string()
}

/// Check length and open a cursor positioned after the kind code
///
/// Only the first `len` bytes are visible to the cursor; trailing bytes
/// belong to whatever framing the transport used.
pub(crate) fn open_record(kind: RecordKind, bytes: &[u8], len: usize) -> Result<FieldCursor<'_>> {
    if bytes.len() < len {
        return Err(RecordError::Truncated {
            kind: kind.code(),
            needed: len,
            got: bytes.len(),
        });
    }
    let mut cursor = FieldCursor::new(kind.code(), &bytes[..len]);
    let code = cursor.take(2)?;
    if code != kind.code().as_bytes() {
        return Err(RecordError::WrongKind {
            expected: kind,
            found: String::from_utf8_lossy(code).into_owned(),
        });
    }
    Ok(cursor)
}

/// Open an ASCII status record and read its mandatory time
pub(crate) fn open_status(
    kind: RecordKind,
    bytes: &[u8],
    len: usize,
) -> Result<(FieldCursor<'_>, Timestamp)> {
    let mut cursor = open_record(kind, bytes, len)?;
    let time = cursor
        .time("time", STATUS_TIME_WIDTH)?
        .ok_or_else(|| RecordError::malformed("time", b"", "record time is blank"))?;
    Ok((cursor, time))
}

/// Any decoded record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StatusRecord {
    Clock(ClockStatus),
    Disk(DiskStatus),
    Unit(UnitStatus),
    Acquisition(AcquisitionStatus),
    Sensor(SensorStatus),
    EventHeader(EventRecord),
    EventTrailer(EventRecord),
    DataStream(DataStreamRecord),
    StationChannel(StationChannelRecord),
    OperatingMode(OperatingModeRecord),
}

impl StatusRecord {
    /// Decode one record of the given kind
    pub fn decode(kind: RecordKind, bytes: &[u8]) -> Result<Self> {
        log::trace!("Decoding {} record ({} bytes)", kind, bytes.len());
        Ok(match kind {
            RecordKind::Clock => StatusRecord::Clock(ClockStatus::decode(bytes)?),
            RecordKind::Disk => StatusRecord::Disk(DiskStatus::decode(bytes)?),
            RecordKind::Unit => StatusRecord::Unit(UnitStatus::decode(bytes)?),
            RecordKind::Acquisition => StatusRecord::Acquisition(AcquisitionStatus::decode(bytes)?),
            RecordKind::Sensor => StatusRecord::Sensor(SensorStatus::decode(bytes)?),
            RecordKind::EventHeader => StatusRecord::EventHeader(EventRecord::decode(bytes)?),
            RecordKind::EventTrailer => StatusRecord::EventTrailer(EventRecord::decode(bytes)?),
            RecordKind::DataStream => StatusRecord::DataStream(DataStreamRecord::decode(bytes)?),
            RecordKind::StationChannel => {
                StatusRecord::StationChannel(StationChannelRecord::decode(bytes)?)
            }
            RecordKind::OperatingMode => {
                StatusRecord::OperatingMode(OperatingModeRecord::decode(bytes)?)
            }
        })
    }

    /// Kind of the decoded record
    pub fn kind(&self) -> RecordKind {
        match self {
            StatusRecord::Clock(_) => RecordKind::Clock,
            StatusRecord::Disk(_) => RecordKind::Disk,
            StatusRecord::Unit(_) => RecordKind::Unit,
            StatusRecord::Acquisition(_) => RecordKind::Acquisition,
            StatusRecord::Sensor(_) => RecordKind::Sensor,
            StatusRecord::EventHeader(_) => RecordKind::EventHeader,
            StatusRecord::EventTrailer(_) => RecordKind::EventTrailer,
            StatusRecord::DataStream(_) => RecordKind::DataStream,
            StatusRecord::StationChannel(_) => RecordKind::StationChannel,
            StatusRecord::OperatingMode(_) => RecordKind::OperatingMode,
        }
    }

    /// Embedded record timestamp
    pub fn timestamp(&self) -> Timestamp {
        match self {
            StatusRecord::Clock(r) => r.timestamp(),
            StatusRecord::Disk(r) => r.timestamp(),
            StatusRecord::Unit(r) => r.timestamp(),
            StatusRecord::Acquisition(r) => r.timestamp(),
            StatusRecord::Sensor(r) => r.timestamp(),
            StatusRecord::EventHeader(r) | StatusRecord::EventTrailer(r) => r.timestamp(),
            StatusRecord::DataStream(r) => r.timestamp(),
            StatusRecord::StationChannel(r) => r.timestamp(),
            StatusRecord::OperatingMode(r) => r.timestamp(),
        }
    }
}

impl fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusRecord::Clock(r) => r.fmt(f),
            StatusRecord::Disk(r) => r.fmt(f),
            StatusRecord::Unit(r) => r.fmt(f),
            StatusRecord::Acquisition(r) => r.fmt(f),
            StatusRecord::Sensor(r) => r.fmt(f),
            StatusRecord::EventHeader(r) | StatusRecord::EventTrailer(r) => r.fmt(f),
            StatusRecord::DataStream(r) => r.fmt(f),
            StatusRecord::StationChannel(r) => r.fmt(f),
            StatusRecord::OperatingMode(r) => r.fmt(f),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testdata::*;
    use super::*;

    #[test]
    fn test_dispatch_every_kind() {
        let samples: Vec<(RecordKind, Vec<u8>)> = vec![
            (RecordKind::Clock, xc(T0, 'L', "00:12:45:00")),
            (RecordKind::Disk, dk(T0)),
            (RecordKind::Unit, us(T0)),
            (RecordKind::Acquisition, aq(T0)),
            (RecordKind::Sensor, ad(T0, 1)),
            (RecordKind::EventHeader, event("EH", 0, "2024:060:11:59:58.125", "")),
            (RecordKind::EventTrailer, event("ET", 0, "2024:060:11:59:58.125", "2024:060:12:00:30.000")),
            (RecordKind::DataStream, ds(&[ds_block(1, "123", 40, "CON")])),
            (RecordKind::StationChannel, sc(&[sc_channel(1, "Z", "0.0")])),
            (RecordKind::OperatingMode, om()),
        ];

        for (kind, bytes) in samples {
            assert_eq!(bytes.len(), kind.record_len(), "layout length of {}", kind);
            let record = StatusRecord::decode(kind, &bytes).unwrap();
            assert_eq!(record.kind(), kind);
            assert!(record.to_string().starts_with(kind.code()));
        }
    }

    #[test]
    fn test_wrong_kind_and_truncation() {
        let bytes = dk(T0);
        assert!(matches!(
            StatusRecord::decode(RecordKind::Unit, &{
                let mut b = bytes.clone();
                b.truncate(RecordKind::Unit.record_len());
                b
            }),
            Err(RecordError::WrongKind { .. })
        ));
        assert!(matches!(
            StatusRecord::decode(RecordKind::Disk, &bytes[..20]),
            Err(RecordError::Truncated { .. })
        ));
    }

    #[test]
    fn test_trailing_bytes_are_not_read() {
        let mut bytes = us(T0);
        bytes.extend(b"garbage after the record");
        assert!(StatusRecord::decode(RecordKind::Unit, &bytes).is_ok());
    }
}
