//! DS: data stream definition packet
//!
//! Four 80-byte stream blocks follow the packet header:
//!
//! ```text
//! stream(2, 1-based, blank = unused) name(16) destination(4) channels(16)
//! sample_rate(4) data_format(2) trigger_type(4) trigger_description(32)
//! ```

use super::header::{PacketHeader, HEADER_LEN};
use super::open_record;
use crate::codec::FieldCursor;
use crate::types::{RecordError, RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Stream blocks per DS packet
pub const BLOCKS_PER_PACKET: usize = 4;

const BLOCK_LEN: usize = 80;

/// Declared length of a DS packet
pub const DS_LEN: usize = HEADER_LEN + BLOCKS_PER_PACKET * BLOCK_LEN;

/// One stream definition block
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamDefinition {
    /// 0-based stream index
    pub stream: usize,
    pub name: String,
    pub destination: String,
    /// Channels included, one digit per channel (e.g. `123`)
    pub channels: String,
    pub sample_rate: Option<i64>,
    pub data_format: String,
    pub trigger_type: String,
    pub trigger_description: String,
}

impl StreamDefinition {
    fn read(c: &mut FieldCursor<'_>) -> Result<Option<Self>> {
        let raw = c.take(2)?;
        let stream = match crate::codec::parse_int("stream", raw)? {
            None => {
                // Unused block, still consumes its full width
                c.skip(BLOCK_LEN - 2)?;
                return Ok(None);
            }
            Some(n) if n >= 1 => (n - 1) as usize,
            Some(_) => return Err(RecordError::malformed("stream", raw, "stream numbers start at 1")),
        };

        Ok(Some(Self {
            stream,
            name: c.text(16)?,
            destination: c.text(4)?,
            channels: c.text(16)?,
            sample_rate: c.int("sample_rate", 4)?,
            data_format: c.text(2)?,
            trigger_type: c.text(4)?,
            trigger_description: c.text(32)?,
        }))
    }
}

/// Decoded DS packet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataStreamRecord {
    pub header: PacketHeader,
    pub streams: Vec<StreamDefinition>,
}

impl DataStreamRecord {
    /// Decode a DS packet
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut c = open_record(RecordKind::DataStream, bytes, DS_LEN)?;
        let header = PacketHeader::read(RecordKind::DataStream, &mut c)?;
        let mut streams = Vec::with_capacity(BLOCKS_PER_PACKET);
        for _ in 0..BLOCKS_PER_PACKET {
            if let Some(def) = StreamDefinition::read(&mut c)? {
                streams.push(def);
            }
        }
        debug_assert_eq!(c.position(), DS_LEN);
        Ok(Self { header, streams })
    }

    pub fn timestamp(&self) -> Timestamp {
        self.header.time
    }
}

impl fmt::Display for DataStreamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DS unit={}", self.header.unit_hex())?;
        for s in &self.streams {
            write!(
                f,
                " [{} {} ch={} {}sps {} {}]",
                s.stream,
                s.name,
                s.channels,
                s.sample_rate.map(|r| r.to_string()).unwrap_or_else(|| "-".into()),
                s.destination,
                s.trigger_type
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testdata::{ds, ds_block};
    use super::*;

    #[test]
    fn test_decode_data_stream_packet() {
        let rec = DataStreamRecord::decode(&ds(&[
            ds_block(1, "123", 40, "CON"),
            ds_block(3, "456", 1, "EVT"),
        ]))
        .unwrap();
        assert_eq!(rec.streams.len(), 2);
        assert_eq!(rec.streams[0].stream, 0);
        assert_eq!(rec.streams[0].channels, "123");
        assert_eq!(rec.streams[0].sample_rate, Some(40));
        assert_eq!(rec.streams[0].destination, "RAM");
        assert_eq!(rec.streams[1].stream, 2);
        assert_eq!(rec.streams[1].trigger_type, "EVT");
        assert_eq!(rec.streams[1].trigger_description, "continuous");
    }

    #[test]
    fn test_stream_zero_is_malformed() {
        assert!(DataStreamRecord::decode(&ds(&[ds_block(0, "1", 1, "CON")])).is_err());
    }
}
