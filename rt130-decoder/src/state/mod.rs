//! Per-unit state tracker
//!
//! `UnitState` is the single authoritative view of one field unit. Every
//! record type has an `apply_*` method that decodes the raw bytes and replaces
//! the matching slot; nothing is merged field by field except the stream table,
//! which combines database naming with the unit's own DS definitions.
//!
//! The stream and channel tables start at the configured sizes and grow when a
//! record names an index beyond them. They never shrink.

pub mod quality;
pub mod seedname;
pub mod unknown_log;

pub use seedname::{fallback_seedname, map_seedname, SeedName, SEEDNAME_LEN};
pub use unknown_log::{SharedUnknownLog, UnknownLog};

use crate::config::{StreamAssignment, TrackerConfig, UnitConfig};
use crate::records::{
    format_time, AcquisitionStatus, ChannelInfo, ClockStatus, DataStreamRecord, DiskStatus,
    EventRecord, OperatingModeRecord, SensorStatus, StationChannelRecord, StreamDefinition,
    UnitStatus,
};
use crate::records::sensor::MAX_SENSORS;
use crate::soh::{classify, LineClass, LogTextSummary, SohInfo};
use crate::types::{RecordError, RecordKind, Result, Timestamp, Trigger};
use serde::Serialize;
use std::fmt::{self, Write as _};

/// Times of the most recent event seen on a stream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDetail {
    pub event_number: u32,
    pub trigger_time: Option<Timestamp>,
    pub first_sample_time: Option<Timestamp>,
    pub detrigger_time: Option<Timestamp>,
    pub last_sample_time: Option<Timestamp>,
}

impl From<&EventRecord> for EventDetail {
    fn from(record: &EventRecord) -> Self {
        Self {
            event_number: record.event_number,
            trigger_time: record.trigger_time,
            first_sample_time: record.first_sample_time,
            detrigger_time: record.detrigger_time,
            last_sample_time: record.last_sample_time,
        }
    }
}

/// One entry of the stream table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataStream {
    /// 0-based stream index
    pub index: usize,
    pub location: String,
    /// Channel numbers, one digit each
    pub channels: String,
    /// Component letters by channel position
    pub components: String,
    /// Samples per second
    pub rate: f64,
    pub band: String,
    pub destination: String,
    pub trigger_type: String,
    pub trigger_description: String,
    /// Synthesized because an event named a stream nobody configured
    pub placeholder: bool,
    pub last_event: Option<EventDetail>,
}

impl DataStream {
    /// Stream named by the configuration database
    pub fn from_assignment(assignment: &StreamAssignment) -> Self {
        Self {
            index: assignment.stream,
            location: assignment.location.clone(),
            channels: assignment.channels.clone(),
            components: assignment.components.clone(),
            rate: assignment.rate,
            band: assignment.band.clone(),
            destination: String::new(),
            trigger_type: String::new(),
            trigger_description: String::new(),
            placeholder: false,
            last_event: None,
        }
    }

    /// 1 Hz stand-in for a stream referenced before it was configured
    pub fn placeholder(index: usize) -> Self {
        Self {
            index,
            location: String::new(),
            channels: String::new(),
            components: String::new(),
            rate: 1.0,
            band: String::new(),
            destination: String::new(),
            trigger_type: String::new(),
            trigger_description: String::new(),
            placeholder: true,
            last_event: None,
        }
    }

    /// Stream first learned from the unit's own DS definition
    fn from_definition(def: &StreamDefinition) -> Self {
        let mut stream = Self::placeholder(def.stream);
        stream.placeholder = false;
        stream.update_from_definition(def);
        stream
    }

    fn update_from_definition(&mut self, def: &StreamDefinition) {
        if !def.channels.is_empty() {
            self.channels = def.channels.clone();
        }
        if let Some(rate) = def.sample_rate.filter(|r| *r > 0) {
            self.rate = rate as f64;
        }
        self.destination = def.destination.clone();
        self.trigger_type = def.trigger_type.clone();
        self.trigger_description = def.trigger_description.clone();
    }
}

/// Station block of the most recent SC packet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationInfo {
    pub experiment_number: Option<i64>,
    pub experiment_name: String,
    pub station_number: String,
    pub station_name: String,
    pub das_model: String,
    pub das_serial: String,
    pub clock_type: String,
    pub clock_serial: String,
}

impl From<&StationChannelRecord> for StationInfo {
    fn from(record: &StationChannelRecord) -> Self {
        Self {
            experiment_number: record.experiment_number,
            experiment_name: record.experiment_name.clone(),
            station_number: record.station_number.clone(),
            station_name: record.station_name.clone(),
            das_model: record.das_model.clone(),
            das_serial: record.das_serial.clone(),
            clock_type: record.clock_type.clone(),
            clock_serial: record.clock_serial.clone(),
        }
    }
}

/// Running totals for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnitCounters {
    /// Records decoded and applied
    pub applied: u64,
    /// Records dropped because they failed to decode
    pub rejected: u64,
    /// Event headers turned into triggers
    pub triggers: u64,
    /// Stream or channel table resizes
    pub table_growths: u64,
    /// Log lines seen, by outcome
    pub log_lines: LogTextSummary,
}

/// Live state of one field unit
#[derive(Debug)]
pub struct UnitState {
    config: UnitConfig,
    tracker: TrackerConfig,
    streams: Vec<Option<DataStream>>,
    channels: Vec<Option<ChannelInfo>>,
    station: Option<StationInfo>,
    operating_mode: Option<OperatingModeRecord>,
    clock: Option<ClockStatus>,
    disk: Option<DiskStatus>,
    unit_status: Option<UnitStatus>,
    acquisition: Option<AcquisitionStatus>,
    sensors: [Option<SensorStatus>; MAX_SENSORS],
    soh: SohInfo,
    unknown_log: SharedUnknownLog,
    counters: UnitCounters,
}

impl UnitState {
    /// Create the state for a unit and install its configured streams
    pub fn new(config: UnitConfig, tracker: TrackerConfig) -> Self {
        let assignments = config.streams.clone();
        let mut state = Self {
            streams: std::iter::repeat_with(|| None).take(tracker.stream_slots).collect(),
            channels: std::iter::repeat_with(|| None).take(tracker.channel_slots).collect(),
            unknown_log: SharedUnknownLog::new(tracker.unknown_log_limit, tracker.unknown_log_trim),
            config,
            tracker,
            station: None,
            operating_mode: None,
            clock: None,
            disk: None,
            unit_status: None,
            acquisition: None,
            sensors: Default::default(),
            soh: SohInfo::default(),
            counters: UnitCounters::default(),
        };

        for assignment in assignments {
            if let Err(e) = state.install_stream(&assignment) {
                log::error!("Unit {}: cannot install stream {}: {}", state.unit_hex(), assignment.stream, e);
            }
        }
        log::info!(
            "Unit {} ({}.{}) created with {} configured streams",
            state.unit_hex(),
            state.config.network,
            state.config.station,
            state.streams.iter().flatten().count()
        );
        state
    }

    /// Add or replace a stream assignment
    pub fn add_stream(&mut self, assignment: StreamAssignment) -> Result<()> {
        self.install_stream(&assignment)?;
        self.config.streams.retain(|s| s.stream != assignment.stream);
        self.config.streams.push(assignment);
        Ok(())
    }

    fn install_stream(&mut self, assignment: &StreamAssignment) -> Result<()> {
        self.ensure_stream_slot(assignment.stream)?;
        let previous = self.streams[assignment.stream]
            .as_ref()
            .and_then(|s| s.last_event.clone());
        let mut stream = DataStream::from_assignment(assignment);
        stream.last_event = previous;
        self.streams[assignment.stream] = Some(stream);
        Ok(())
    }

    fn ensure_stream_slot(&mut self, index: usize) -> Result<()> {
        if grow_table(&mut self.streams, index)? {
            self.counters.table_growths += 1;
            log::warn!(
                "Unit {}: stream {} beyond table, stream table grown to {}",
                self.unit_hex(),
                index,
                self.streams.len()
            );
        }
        Ok(())
    }

    fn ensure_channel_slot(&mut self, index: usize) -> Result<()> {
        if grow_table(&mut self.channels, index)? {
            self.counters.table_growths += 1;
            log::warn!(
                "Unit {}: channel {} beyond table, channel table grown to {}",
                self.unit_hex(),
                index + 1,
                self.channels.len()
            );
        }
        Ok(())
    }

    /// Decode and apply one record of any kind
    ///
    /// Returns the trigger produced by an event header.
    pub fn apply_record(&mut self, kind: RecordKind, bytes: &[u8]) -> Result<Option<Trigger>> {
        log::trace!("Unit {}: applying {} record", self.unit_hex(), kind);
        let outcome = match kind {
            RecordKind::Clock => self.apply_clock_record(bytes).map(|_| None),
            RecordKind::Disk => self.apply_disk_record(bytes).map(|_| None),
            RecordKind::Unit => self.apply_unit_record(bytes).map(|_| None),
            RecordKind::Acquisition => self.apply_acquisition_record(bytes).map(|_| None),
            RecordKind::Sensor => self.apply_sensor_record(bytes).map(|_| None),
            RecordKind::EventHeader => self.apply_event_header(bytes).map(Some),
            RecordKind::EventTrailer => self.apply_event_trailer(bytes).map(|_| None),
            RecordKind::DataStream => self.apply_data_stream_record(bytes).map(|_| None),
            RecordKind::StationChannel => self.apply_station_channel_record(bytes).map(|_| None),
            RecordKind::OperatingMode => self.apply_operating_mode_record(bytes).map(|_| None),
        };
        match &outcome {
            Ok(_) => self.counters.applied += 1,
            Err(e) if !e.is_fatal() => self.counters.rejected += 1,
            Err(_) => {}
        }
        outcome
    }

    pub fn apply_clock_record(&mut self, bytes: &[u8]) -> Result<()> {
        let record = ClockStatus::decode(bytes)?;
        log::debug!("Unit {}: {}", self.unit_hex(), record);
        self.clock = Some(record);
        Ok(())
    }

    pub fn apply_disk_record(&mut self, bytes: &[u8]) -> Result<()> {
        let record = DiskStatus::decode(bytes)?;
        log::debug!("Unit {}: {}", self.unit_hex(), record);
        self.disk = Some(record);
        Ok(())
    }

    pub fn apply_unit_record(&mut self, bytes: &[u8]) -> Result<()> {
        let record = UnitStatus::decode(bytes)?;
        log::debug!("Unit {}: {}", self.unit_hex(), record);
        self.unit_status = Some(record);
        Ok(())
    }

    pub fn apply_acquisition_record(&mut self, bytes: &[u8]) -> Result<()> {
        let record = AcquisitionStatus::decode(bytes)?;
        log::debug!("Unit {}: {}", self.unit_hex(), record);
        self.acquisition = Some(record);
        Ok(())
    }

    pub fn apply_sensor_record(&mut self, bytes: &[u8]) -> Result<()> {
        let record = SensorStatus::decode(bytes)?;
        log::debug!("Unit {}: {}", self.unit_hex(), record);
        let slot = record.sensor - 1;
        self.sensors[slot] = Some(record);
        Ok(())
    }

    /// Apply an EH packet and build the trigger it announces
    pub fn apply_event_header(&mut self, bytes: &[u8]) -> Result<Trigger> {
        let record = EventRecord::decode(bytes)?;
        if record.is_trailer() {
            return Err(RecordError::WrongKind {
                expected: RecordKind::EventHeader,
                found: RecordKind::EventTrailer.code().to_string(),
            });
        }
        log::debug!("Unit {}: {}", self.unit_hex(), record);
        self.record_event(&record)?;

        let seedname = self.seedname(record.stream, 0);
        let trigger = Trigger {
            seedname: seedname.id,
            trigger_time: record.timestamp(),
            source_file: record.source_file(),
        };
        self.counters.triggers += 1;
        Ok(trigger)
    }

    /// Apply an ET packet
    pub fn apply_event_trailer(&mut self, bytes: &[u8]) -> Result<()> {
        let record = EventRecord::decode(bytes)?;
        if !record.is_trailer() {
            return Err(RecordError::WrongKind {
                expected: RecordKind::EventTrailer,
                found: RecordKind::EventHeader.code().to_string(),
            });
        }
        log::debug!("Unit {}: {}", self.unit_hex(), record);
        self.record_event(&record)
    }

    fn record_event(&mut self, record: &EventRecord) -> Result<()> {
        self.check_unit_id(record.header.unit_id);
        let index = record.stream;
        let configured = matches!(self.stream(index), Some(s) if !s.placeholder);
        if !configured {
            let err = RecordError::UnconfiguredReference {
                what: "stream",
                index,
            };
            log::error!(
                "Unit {}: event {}: {}, using a 1 Hz placeholder",
                self.unit_hex(),
                record.event_number,
                err
            );
            self.ensure_stream_slot(index)?;
            if self.streams[index].is_none() {
                self.streams[index] = Some(DataStream::placeholder(index));
            }
        }
        if let Some(stream) = self.streams[index].as_mut() {
            stream.last_event = Some(EventDetail::from(record));
        }
        Ok(())
    }

    /// Apply a DS packet; unknown streams get a new table entry
    pub fn apply_data_stream_record(&mut self, bytes: &[u8]) -> Result<()> {
        let record = DataStreamRecord::decode(bytes)?;
        log::debug!("Unit {}: {}", self.unit_hex(), record);
        self.check_unit_id(record.header.unit_id);

        for def in &record.streams {
            self.ensure_stream_slot(def.stream)?;
            match self.streams[def.stream].as_mut() {
                Some(stream) => stream.update_from_definition(def),
                None => {
                    log::info!(
                        "Unit {}: stream {} defined by the unit but not configured",
                        self.unit_hex(),
                        def.stream
                    );
                    self.streams[def.stream] = Some(DataStream::from_definition(def));
                }
            }
        }
        Ok(())
    }

    /// Apply an SC packet; each channel is filled once
    pub fn apply_station_channel_record(&mut self, bytes: &[u8]) -> Result<()> {
        let record = StationChannelRecord::decode(bytes)?;
        log::debug!("Unit {}: {}", self.unit_hex(), record);
        self.check_unit_id(record.header.unit_id);

        self.station = Some(StationInfo::from(&record));
        for channel in record.channels {
            let slot = channel.number - 1;
            self.ensure_channel_slot(slot)?;
            if self.channels[slot].is_some() {
                log::debug!(
                    "Unit {}: channel {} already populated, ignoring",
                    self.unit_hex(),
                    channel.number
                );
                continue;
            }
            self.channels[slot] = Some(channel);
        }
        Ok(())
    }

    pub fn apply_operating_mode_record(&mut self, bytes: &[u8]) -> Result<()> {
        let record = OperatingModeRecord::decode(bytes)?;
        log::debug!("Unit {}: {}", self.unit_hex(), record);
        self.check_unit_id(record.header.unit_id);
        self.operating_mode = Some(record);
        Ok(())
    }

    /// Classify every line of a state-of-health log blob
    ///
    /// Malformed lines are logged and skipped. Only `ResourceExhausted` is
    /// returned as an error.
    pub fn apply_log_text(&mut self, blob: &str) -> Result<LogTextSummary> {
        let mut summary = LogTextSummary::default();
        for line in blob.lines().map(|l| l.trim_end_matches('\r')) {
            if line.trim().is_empty() {
                continue;
            }
            match classify(line) {
                Ok(LineClass::Benign) => summary.benign += 1,
                Ok(LineClass::Unknown) => {
                    let err = RecordError::UnrecognizedLogLine(line.to_string());
                    log::warn!("Unit {}: {}", self.unit_hex(), err);
                    self.unknown_log.append(line)?;
                    summary.unknown += 1;
                }
                Ok(class) => {
                    self.soh.apply(class);
                    summary.recognized += 1;
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!("Unit {}: skipping log line: {}", self.unit_hex(), e);
                    summary.malformed += 1;
                }
            }
        }

        let totals = &mut self.counters.log_lines;
        totals.recognized += summary.recognized;
        totals.benign += summary.benign;
        totals.unknown += summary.unknown;
        totals.malformed += summary.malformed;
        Ok(summary)
    }

    fn check_unit_id(&self, unit_id: u16) {
        if unit_id != self.config.unit {
            log::warn!(
                "Unit {}: packet carries unit id {:04X}",
                self.unit_hex(),
                unit_id
            );
        }
    }

    /// SEED identifier for a stream/channel pair, never empty
    pub fn seedname(&self, stream: usize, channel: usize) -> SeedName {
        let name = map_seedname(
            &self.config.network,
            &self.config.station,
            self.config.unit,
            stream,
            self.stream(stream),
            channel,
        );
        if !name.resolved {
            log::warn!(
                "Unit {}: no naming for stream {} channel {}, using {}",
                self.unit_hex(),
                stream,
                channel,
                name.id
            );
        }
        name
    }

    /// Quality from the last `CLOCK IS LOCKED` log line
    pub fn time_quality_from_log(&self, now: Timestamp) -> i64 {
        quality::log_time_quality(self.soh.lock_time.as_ref(), now)
    }

    /// Structured quality when the XC snapshot has a lock duration, else the log value
    pub fn time_quality(&self, now: Timestamp) -> i64 {
        self.clock
            .as_ref()
            .and_then(ClockStatus::time_quality)
            .unwrap_or_else(|| self.time_quality_from_log(now))
    }

    /// Record times of the XC, DK, US and AQ snapshots, in that order
    pub fn freshness(&self) -> [Option<Timestamp>; 4] {
        [
            self.clock.as_ref().map(ClockStatus::timestamp),
            self.disk.as_ref().map(DiskStatus::timestamp),
            self.unit_status.as_ref().map(UnitStatus::timestamp),
            self.acquisition.as_ref().map(AcquisitionStatus::timestamp),
        ]
    }

    /// Full diagnostic dump of the state
    pub fn dump(&self) -> String {
        let mut out = String::new();
        // Writing into a String cannot fail
        let _ = self.write_dump(&mut out);
        out
    }

    fn write_dump(&self, out: &mut String) -> fmt::Result {
        writeln!(
            out,
            "Unit {} ip={} net={} sta={}",
            self.unit_hex(),
            self.config.ip,
            self.config.network,
            self.config.station
        )?;
        writeln!(
            out,
            "  records applied={} rejected={} triggers={} table_growths={}",
            self.counters.applied, self.counters.rejected, self.counters.triggers, self.counters.table_growths
        )?;

        writeln!(out, "Status:")?;
        let status: [Option<String>; 4] = [
            self.clock.as_ref().map(|r| r.to_string()),
            self.disk.as_ref().map(|r| r.to_string()),
            self.unit_status.as_ref().map(|r| r.to_string()),
            self.acquisition.as_ref().map(|r| r.to_string()),
        ];
        for (code, line) in ["XC", "DK", "US", "AQ"].iter().zip(status) {
            writeln!(out, "  {}", line.unwrap_or_else(|| format!("{} none", code)))?;
        }
        for sensor in self.sensors.iter().flatten() {
            writeln!(out, "  {}", sensor)?;
        }

        writeln!(out, "Streams ({} slots):", self.streams.len())?;
        for stream in self.streams.iter().flatten() {
            write!(
                out,
                "  {:>2} band={} comp={} loc={} chans={} rate={} dest={} trig={}",
                stream.index,
                stream.band,
                stream.components,
                stream.location,
                stream.channels,
                stream.rate,
                stream.destination,
                stream.trigger_type
            )?;
            if stream.placeholder {
                write!(out, " (placeholder)")?;
            }
            if let Some(event) = &stream.last_event {
                write!(
                    out,
                    " last_event={} at {}",
                    event.event_number,
                    event.trigger_time.as_ref().map(format_time).unwrap_or_else(|| "-".into())
                )?;
            }
            writeln!(out)?;
        }

        if let Some(station) = &self.station {
            writeln!(
                out,
                "Station: {} ({}) exp={} das={} {} clock={} {}",
                station.station_name,
                station.station_number,
                station.experiment_name,
                station.das_model,
                station.das_serial,
                station.clock_type,
                station.clock_serial
            )?;
        }
        writeln!(out, "Channels ({} slots):", self.channels.len())?;
        for channel in self.channels.iter().flatten() {
            writeln!(out, "  {}", channel)?;
        }
        if let Some(mode) = &self.operating_mode {
            writeln!(out, "Operating mode: {}", mode)?;
        }

        writeln!(out, "SOH:")?;
        writeln!(
            out,
            "  version={} clock={} lock={:?} phase={:?}us",
            self.soh.version.as_deref().unwrap_or("-"),
            self.soh.clock_type.as_deref().unwrap_or("-"),
            self.soh.lock_time,
            self.soh.phase_error_us
        )?;
        writeln!(
            out,
            "  ip={} netmask={} gateway={} hosts={}",
            self.soh.ip_addresses.join(","),
            self.soh.netmasks.join(","),
            self.soh.gateways.join(","),
            self.soh.hosts.join(",")
        )?;
        let unknown = self.unknown_log.lock();
        writeln!(
            out,
            "Unknown log: {} chars buffered, {} discarded",
            unknown.len(),
            unknown.discarded()
        )?;
        Ok(())
    }

    pub fn unit(&self) -> u16 {
        self.config.unit
    }

    /// Unit number as 4 hex digits
    pub fn unit_hex(&self) -> String {
        format!("{:04X}", self.config.unit)
    }

    pub fn network(&self) -> &str {
        &self.config.network
    }

    pub fn station(&self) -> &str {
        &self.config.station
    }

    pub fn config(&self) -> &UnitConfig {
        &self.config
    }

    pub fn tracker(&self) -> &TrackerConfig {
        &self.tracker
    }

    pub fn clock(&self) -> Option<&ClockStatus> {
        self.clock.as_ref()
    }

    pub fn disk(&self) -> Option<&DiskStatus> {
        self.disk.as_ref()
    }

    pub fn unit_status(&self) -> Option<&UnitStatus> {
        self.unit_status.as_ref()
    }

    pub fn acquisition(&self) -> Option<&AcquisitionStatus> {
        self.acquisition.as_ref()
    }

    /// Mass-position snapshot for a 1-based sensor number
    pub fn sensor(&self, number: usize) -> Option<&SensorStatus> {
        number
            .checked_sub(1)
            .and_then(|i| self.sensors.get(i))
            .and_then(Option::as_ref)
    }

    pub fn stream(&self, index: usize) -> Option<&DataStream> {
        self.streams.get(index).and_then(Option::as_ref)
    }

    /// Populated stream entries in index order
    pub fn streams(&self) -> impl Iterator<Item = &DataStream> {
        self.streams.iter().flatten()
    }

    pub fn stream_slots(&self) -> usize {
        self.streams.len()
    }

    /// Channel info for a 1-based channel number
    pub fn channel(&self, number: usize) -> Option<&ChannelInfo> {
        number
            .checked_sub(1)
            .and_then(|i| self.channels.get(i))
            .and_then(Option::as_ref)
    }

    pub fn channels(&self) -> impl Iterator<Item = &ChannelInfo> {
        self.channels.iter().flatten()
    }

    pub fn channel_slots(&self) -> usize {
        self.channels.len()
    }

    pub fn station_info(&self) -> Option<&StationInfo> {
        self.station.as_ref()
    }

    pub fn operating_mode(&self) -> Option<&OperatingModeRecord> {
        self.operating_mode.as_ref()
    }

    pub fn soh(&self) -> &SohInfo {
        &self.soh
    }

    /// Shared handle to the unknown-log buffer
    pub fn unknown_log(&self) -> &SharedUnknownLog {
        &self.unknown_log
    }

    pub fn counters(&self) -> &UnitCounters {
        &self.counters
    }
}

/// Grow `table` so `index` is addressable; true when it had to grow
fn grow_table<T>(table: &mut Vec<Option<T>>, index: usize) -> Result<bool> {
    if index < table.len() {
        return Ok(false);
    }
    let additional = index + 1 - table.len();
    table.try_reserve(additional)?;
    table.resize_with(index + 1, || None);
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::testdata::*;

    fn test_state() -> UnitState {
        let config = UnitConfig::new(0x9C3E, "XX", "TEST").add_stream(
            StreamAssignment::new(0, "BH", "ZNE")
                .with_location("00")
                .with_channels("123")
                .with_rate(40.0),
        );
        UnitState::new(config, TrackerConfig::default())
    }

    #[test]
    fn test_new_installs_configured_streams() {
        let state = test_state();
        assert_eq!(state.stream_slots(), 16);
        assert_eq!(state.channel_slots(), 30);
        assert_eq!(state.streams().count(), 1);
        assert_eq!(state.seedname(0, 1).id, "XXTEST BHN00");
    }

    #[test]
    fn test_status_records_replace_slots() {
        let mut state = test_state();
        assert_eq!(state.freshness(), [None; 4]);

        state.apply_record(RecordKind::Clock, &xc(T0, 'L', "12:45")).unwrap();
        state.apply_record(RecordKind::Disk, &dk(T0)).unwrap();
        state.apply_record(RecordKind::Unit, &us(T0)).unwrap();
        state.apply_record(RecordKind::Acquisition, &aq(T0)).unwrap();
        state.apply_record(RecordKind::Sensor, &ad(T0, 2)).unwrap();

        assert!(state.freshness().iter().all(Option::is_some));
        assert_eq!(state.disk().unwrap().percent_used(0), 25);
        assert_eq!(state.acquisition().unwrap().percent_available(), 25);
        assert!(state.sensor(2).is_some());
        assert!(state.sensor(1).is_none());
        assert_eq!(state.counters().applied, 5);

        let later = "2024:060:12:00:10";
        state.apply_clock_record(&xc(later, 'U', "")).unwrap();
        assert!(!state.clock().unwrap().is_locked());
        assert_eq!(crate::records::format_time(&state.freshness()[0].unwrap()), later);
    }

    #[test]
    fn test_rejected_record_leaves_state() {
        let mut state = test_state();
        state.apply_clock_record(&xc(T0, 'L', "12:45")).unwrap();
        let before = state.clock().cloned();
        assert!(state.apply_record(RecordKind::Clock, &xc(T0, 'Q', "12:45")).is_err());
        assert_eq!(state.clock().cloned(), before);
        assert_eq!(state.counters().rejected, 1);
    }

    #[test]
    fn test_time_quality_prefers_clock_record() {
        let mut state = test_state();
        let now = chrono::Utc::now();
        assert_eq!(state.time_quality(now), 90);

        state.apply_clock_record(&xc(T0, 'L', "12:45")).unwrap();
        assert_eq!(state.time_quality(now), 100 - (12 * 3600 + 45 * 60) / 1000);
    }

    #[test]
    fn test_event_header_produces_trigger() {
        let mut state = test_state();
        let trigger = state
            .apply_record(RecordKind::EventHeader, &event("EH", 0, "2024:060:11:59:58.125", ""))
            .unwrap()
            .unwrap();
        assert_eq!(trigger.seedname, "XXTEST BHZ00");
        assert_eq!(trigger.source_file, "2024060/9C3E/1/115958125_0042");
        assert_eq!(state.stream(0).unwrap().last_event.as_ref().unwrap().event_number, 42);
        assert_eq!(state.counters().triggers, 1);
    }

    #[test]
    fn test_event_on_unconfigured_stream_synthesizes_placeholder() {
        let mut state = test_state();
        let trigger = state
            .apply_event_header(&event("EH", 5, "2024:060:11:59:58.125", ""))
            .unwrap();
        let stream = state.stream(5).unwrap();
        assert!(stream.placeholder);
        assert_eq!(stream.rate, 1.0);
        assert_eq!(trigger.seedname, "ZZ9C3E UN005");

        state
            .apply_event_trailer(&event("ET", 5, "2024:060:11:59:58.125", "2024:060:12:00:30.000"))
            .unwrap();
        assert!(state.stream(5).unwrap().last_event.as_ref().unwrap().detrigger_time.is_some());
    }

    #[test]
    fn test_event_kinds_are_not_interchangeable() {
        let mut state = test_state();
        let trailer = event("ET", 0, "2024:060:11:59:58.125", "2024:060:12:00:30.000");
        assert!(matches!(
            state.apply_event_header(&trailer),
            Err(RecordError::WrongKind { .. })
        ));
    }

    #[test]
    fn test_stream_table_grows_once() {
        let mut state = test_state();
        state
            .add_stream(StreamAssignment::new(20, "HH", "ZNE").with_location("00"))
            .unwrap();
        assert_eq!(state.stream_slots(), 21);
        assert_eq!(state.counters().table_growths, 1);
        assert_eq!(state.seedname(20, 2).id, "XXTEST HHE00");

        state.add_stream(StreamAssignment::new(18, "LH", "ZNE")).unwrap();
        assert_eq!(state.stream_slots(), 21);
        assert_eq!(state.counters().table_growths, 1);
    }

    #[test]
    fn test_data_stream_record_updates_and_creates() {
        let mut state = test_state();
        state
            .apply_data_stream_record(&ds(&[
                ds_block(1, "123", 100, "CON"),
                ds_block(3, "456", 1, "EVT"),
            ]))
            .unwrap();

        let configured = state.stream(0).unwrap();
        assert_eq!(configured.rate, 100.0);
        assert_eq!(configured.band, "BH");
        assert_eq!(configured.trigger_type, "CON");

        let learned = state.stream(2).unwrap();
        assert!(!learned.placeholder);
        assert_eq!(learned.channels, "456");
        assert!(!state.seedname(2, 0).resolved);
    }

    #[test]
    fn test_station_channels_populated_once() {
        let mut state = test_state();
        state
            .apply_station_channel_record(&sc(&[sc_channel(1, "Z", "0.0"), sc_channel(2, "N", "0.0")]))
            .unwrap();
        state
            .apply_station_channel_record(&sc(&[sc_channel(1, "CHANGED", "90.0")]))
            .unwrap();
        assert_eq!(state.channel(1).unwrap().name, "Z");
        assert_eq!(state.channel(2).unwrap().name, "N");
        assert_eq!(state.station_info().unwrap().station_name, "TEST STATION");

        state.apply_station_channel_record(&sc(&[sc_channel(42, "AUX", "")])).unwrap();
        assert_eq!(state.channel_slots(), 42);
        assert!(state.channel(42).is_some());
    }

    #[test]
    fn test_operating_mode_replaced() {
        let mut state = test_state();
        assert!(state.operating_mode().is_none());
        state.apply_record(RecordKind::OperatingMode, &om()).unwrap();
        assert!(state.operating_mode().is_some());
    }

    #[test]
    fn test_log_text_classification() {
        let mut state = test_state();
        let blob = "186:21:41:35 CPU SOFTWARE V3.2.3\r\n\
                    186:21:42:10 EXTERNAL CLOCK IS LOCKED\n\
                    186:21:42:11 LINK IS UP\n\
                    186:21:42:12 SOMETHING ODD HAPPENED\n\
                    186:21:42:13 BATTERY VOLTAGE = x.yV\n\
                    \n";
        let summary = state.apply_log_text(blob).unwrap();
        assert_eq!(
            summary,
            LogTextSummary {
                recognized: 2,
                benign: 1,
                unknown: 1,
                malformed: 1
            }
        );
        assert_eq!(state.soh().version.as_deref(), Some("V3.2.3"));
        assert!(state.soh().lock_time.is_some());
        assert_eq!(state.unknown_log().snapshot(), "186:21:42:12 SOMETHING ODD HAPPENED\n");
    }

    #[test]
    fn test_dump_mentions_everything() {
        let mut state = test_state();
        state.apply_clock_record(&xc(T0, 'L', "12:45")).unwrap();
        state.apply_event_header(&event("EH", 7, "2024:060:11:59:58.125", "")).unwrap();
        let dump = state.dump();
        assert!(dump.starts_with("Unit 9C3E"));
        assert!(dump.contains("XC 2024:060:12:00:00"));
        assert!(dump.contains("DK none"));
        assert!(dump.contains("(placeholder)"));
        assert!(dump.contains("Unknown log: 0 chars"));
    }
}
