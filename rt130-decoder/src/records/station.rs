//! SC: station/channel definition packet
//!
//! ```text
//! experiment_number(2) experiment_name(24) station_number(4) station_name(24)
//! das_model(12) das_serial(12) clock_type(4) clock_serial(10)
//! 5 x channel block (146):
//!   number(2, 1-based, blank = unused) name(10) azimuth(10) inclination(10)
//!   x(10) y(10) z(10) xy_unit(4) z_unit(4) gain(4) sensor_model(12)
//!   sensor_serial(12) comment(40) bit_weight(8)
//! ```

use super::header::{PacketHeader, HEADER_LEN};
use super::open_record;
use crate::codec::FieldCursor;
use crate::types::{RecordError, RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Channel blocks per SC packet
pub const CHANNELS_PER_PACKET: usize = 5;

const STATION_LEN: usize = 92;
const CHANNEL_LEN: usize = 146;

/// Declared length of an SC packet
pub const SC_LEN: usize = HEADER_LEN + STATION_LEN + CHANNELS_PER_PACKET * CHANNEL_LEN;

/// Sensor channel description
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChannelInfo {
    /// 1-based channel number
    pub number: usize,
    pub name: String,
    pub azimuth: Option<f64>,
    pub inclination: Option<f64>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub z: Option<f64>,
    pub xy_unit: String,
    pub z_unit: String,
    pub gain: String,
    pub sensor_model: String,
    pub sensor_serial: String,
    pub comment: String,
    pub bit_weight: String,
}

impl ChannelInfo {
    fn read(c: &mut FieldCursor<'_>) -> Result<Option<Self>> {
        let raw = c.take(2)?;
        let number = match crate::codec::parse_int("channel", raw)? {
            None => {
                c.skip(CHANNEL_LEN - 2)?;
                return Ok(None);
            }
            Some(n) if n >= 1 => n as usize,
            Some(_) => return Err(RecordError::malformed("channel", raw, "channel numbers start at 1")),
        };

        Ok(Some(Self {
            number,
            name: c.text(10)?,
            azimuth: c.decimal("azimuth", 10)?,
            inclination: c.decimal("inclination", 10)?,
            x: c.decimal("x", 10)?,
            y: c.decimal("y", 10)?,
            z: c.decimal("z", 10)?,
            xy_unit: c.text(4)?,
            z_unit: c.text(4)?,
            gain: c.text(4)?,
            sensor_model: c.text(12)?,
            sensor_serial: c.text(12)?,
            comment: c.text(40)?,
            bit_weight: c.text(8)?,
        }))
    }
}

impl fmt::Display for ChannelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = |x: Option<f64>| x.map(|x| x.to_string()).unwrap_or_else(|| "-".into());
        write!(
            f,
            "ch{} {} az={} inc={} gain={} sensor={} sn={} bitwt={} {}",
            self.number,
            self.name,
            v(self.azimuth),
            v(self.inclination),
            self.gain,
            self.sensor_model,
            self.sensor_serial,
            self.bit_weight,
            self.comment
        )
    }
}

/// Decoded SC packet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationChannelRecord {
    pub header: PacketHeader,
    pub experiment_number: Option<i64>,
    pub experiment_name: String,
    pub station_number: String,
    pub station_name: String,
    pub das_model: String,
    pub das_serial: String,
    pub clock_type: String,
    pub clock_serial: String,
    pub channels: Vec<ChannelInfo>,
}

impl StationChannelRecord {
    /// Decode an SC packet
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut c = open_record(RecordKind::StationChannel, bytes, SC_LEN)?;
        let header = PacketHeader::read(RecordKind::StationChannel, &mut c)?;

        let experiment_number = c.int("experiment_number", 2)?;
        let experiment_name = c.text(24)?;
        let station_number = c.text(4)?;
        let station_name = c.text(24)?;
        let das_model = c.text(12)?;
        let das_serial = c.text(12)?;
        let clock_type = c.text(4)?;
        let clock_serial = c.text(10)?;

        let mut channels = Vec::with_capacity(CHANNELS_PER_PACKET);
        for _ in 0..CHANNELS_PER_PACKET {
            if let Some(ch) = ChannelInfo::read(&mut c)? {
                channels.push(ch);
            }
        }
        debug_assert_eq!(c.position(), SC_LEN);

        Ok(Self {
            header,
            experiment_number,
            experiment_name,
            station_number,
            station_name,
            das_model,
            das_serial,
            clock_type,
            clock_serial,
            channels,
        })
    }

    pub fn timestamp(&self) -> Timestamp {
        self.header.time
    }
}

impl fmt::Display for StationChannelRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SC unit={} station={} exp={} das={} {} clock={} channels={}",
            self.header.unit_hex(),
            self.station_name,
            self.experiment_name,
            self.das_model,
            self.das_serial,
            self.clock_type,
            self.channels
                .iter()
                .map(|c| c.number.to_string())
                .collect::<Vec<_>>()
                .join(",")
        )
    }
}
