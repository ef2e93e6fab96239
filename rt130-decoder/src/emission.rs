//! Status emission scheduler and outbound status lines
//!
//! On every tick the unit task asks the scheduler whether a consolidated
//! status line is due. One is due when the XC, DK, US and AQ snapshots have
//! all been refreshed since the previous emission (by record time, not wall
//! clock). The composite line goes to the time-series pipeline and one
//! key/value line per category goes to the monitoring sink.

use crate::records::LockState;
use crate::state::UnitState;
use crate::types::Timestamp;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Scheduler phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SchedulerState {
    /// Waiting for a full set of fresh snapshots
    Idle,
    /// Fresh set seen; emission in progress
    Ready,
    /// Emission done; returns to Idle on the next evaluation
    Emitted,
}

/// Freshness gate for composite emissions
#[derive(Debug, Clone)]
pub struct EmissionScheduler {
    state: SchedulerState,
    last_emission: Option<Timestamp>,
    pending: Option<Timestamp>,
    tick: chrono::Duration,
}

impl EmissionScheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            state: SchedulerState::Idle,
            last_emission: None,
            pending: None,
            tick: chrono::Duration::from_std(tick).unwrap_or_else(|_| chrono::Duration::seconds(1)),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Record time of the newest snapshot in the last emission
    pub fn last_emission(&self) -> Option<Timestamp> {
        self.last_emission
    }

    /// Check the XC/DK/US/AQ record times on a tick
    ///
    /// Returns true when an emission is due. The caller sends it and then
    /// calls [`complete`](Self::complete); until then further evaluations
    /// return false.
    pub fn evaluate(&mut self, fresh: &[Option<Timestamp>; 4]) -> bool {
        match self.state {
            SchedulerState::Ready => return false,
            SchedulerState::Emitted => self.state = SchedulerState::Idle,
            SchedulerState::Idle => {}
        }

        let Some(times) = fresh.iter().copied().collect::<Option<Vec<_>>>() else {
            return false;
        };
        let due = match self.last_emission {
            None => true,
            Some(last) => {
                let threshold = last + self.tick;
                times.iter().all(|t| *t > threshold)
            }
        };
        if due {
            self.state = SchedulerState::Ready;
            self.pending = times.into_iter().max();
        }
        due
    }

    /// Mark the pending emission as sent
    pub fn complete(&mut self) {
        if self.state == SchedulerState::Ready {
            self.last_emission = self.pending.take().or(self.last_emission);
            self.state = SchedulerState::Emitted;
        }
    }
}

/// Consolidated status line for the time-series pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeStatus {
    pub unit: u16,
    pub time: Timestamp,
    pub station: String,
    pub das_type: String,
    /// Mass positions of sensors 1 and 2
    pub mass: [[Option<f64>; 3]; 2],
    pub clock_quality: i64,
    /// bit0 locked, bit1 receiver on, bit2 3-D fix
    pub gps_bits: u8,
    /// 2 locked, 1 unlocked, 0 off
    pub pll_state: u8,
    /// Minutes since lock, 0..=9999
    pub pll_int: i64,
    pub input_volts: Option<f64>,
    pub backup_volts: Option<f64>,
    pub temperature_c: Option<f64>,
    /// Phase error in microseconds, -9999..=9999
    pub timebase: i64,
}

impl CompositeStatus {
    /// Snapshot the unit at `now`
    pub fn build(state: &UnitState, now: Timestamp) -> Self {
        let clock = state.clock();
        let soh = state.soh();

        let mut gps_bits = 0u8;
        let mut pll_state = 0u8;
        if let Some(xc) = clock {
            if xc.is_locked() {
                gps_bits |= 0b001;
            }
            if xc.lock != LockState::Off {
                gps_bits |= 0b010;
            }
            if xc.is_3d_fix() {
                gps_bits |= 0b100;
            }
            pll_state = match xc.lock {
                LockState::Locked => 2,
                LockState::Unlocked => 1,
                LockState::Off => 0,
            };
        }

        let pll_int = clock
            .and_then(|xc| xc.lock_seconds)
            .map(|secs| (secs / 60).clamp(0, 9999))
            .unwrap_or(0);
        let timebase = clock
            .map(|xc| xc.phase_error_us)
            .or_else(|| soh.phase_error_us.map(|p| p.round() as i64))
            .unwrap_or(0)
            .clamp(-9999, 9999);

        let mass_of = |n: usize| {
            state
                .sensor(n)
                .map(|s| s.mass_positions)
                .unwrap_or([None; 3])
        };
        let us = state.unit_status();

        Self {
            unit: state.unit(),
            time: now,
            station: state.station().to_string(),
            das_type: state.tracker().das_type.clone(),
            mass: [mass_of(1), mass_of(2)],
            clock_quality: state.time_quality(now),
            gps_bits,
            pll_state,
            pll_int,
            input_volts: us.and_then(|u| u.input_volts).or(soh.battery_volts),
            backup_volts: us.and_then(|u| u.backup_volts).or(soh.backup_volts),
            temperature_c: us.and_then(|u| u.temperature_c).or(soh.temperature_c),
            timebase,
        }
    }

    /// Fixed-order key/value pairs
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let mass_keys = [
            ["mass1a", "mass1b", "mass1c"],
            ["mass2a", "mass2b", "mass2c"],
        ];
        let mut fields = vec![
            ("station", self.station.clone()),
            ("dastype", self.das_type.clone()),
        ];
        for (keys, values) in mass_keys.iter().zip(self.mass.iter()) {
            for (key, value) in keys.iter().zip(values.iter()) {
                fields.push((*key, decimal(*value, 1)));
            }
        }
        fields.extend([
            ("clkqual", self.clock_quality.to_string()),
            ("gpsbits", self.gps_bits.to_string()),
            ("pllstate", self.pll_state.to_string()),
            ("pllint", self.pll_int.to_string()),
            ("inputvolts", decimal(self.input_volts, 1)),
            ("backupvolts", decimal(self.backup_volts, 1)),
            ("temp", decimal(self.temperature_c, 1)),
            ("timebase", self.timebase.to_string()),
        ]);
        fields
    }
}

impl fmt::Display for CompositeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X} {}", self.unit, self.time.format("%Y-%m-%d %H:%M:%S"))?;
        for (key, value) in self.fields() {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Monitoring sink category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MonitorCategory {
    Power,
    Disk,
    Gps,
    Acquisition,
    Mass,
}

impl MonitorCategory {
    pub fn name(&self) -> &'static str {
        match self {
            MonitorCategory::Power => "power",
            MonitorCategory::Disk => "disk",
            MonitorCategory::Gps => "gps",
            MonitorCategory::Acquisition => "acquisition",
            MonitorCategory::Mass => "mass",
        }
    }
}

/// One key/value line for the monitoring sink
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringLine {
    pub unit: u16,
    pub category: MonitorCategory,
    pub values: Vec<(String, String)>,
}

impl MonitoringLine {
    fn new(unit: u16, category: MonitorCategory) -> Self {
        Self {
            unit,
            category,
            values: Vec::new(),
        }
    }

    fn push(&mut self, key: &str, value: impl Into<String>) {
        self.values.push((key.to_string(), value.into()));
    }

    /// Value for `key`, if present
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Renders `key=value;key=value`; unit and category travel in the struct
impl fmt::Display for MonitoringLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        Ok(())
    }
}

/// One line per category that has data
pub fn monitoring_lines(state: &UnitState) -> Vec<MonitoringLine> {
    let unit = state.unit();
    let mut lines = Vec::new();

    if let Some(us) = state.unit_status() {
        let mut line = MonitoringLine::new(unit, MonitorCategory::Power);
        line.push("inputvolts", decimal(us.input_volts, 1));
        line.push("backupvolts", decimal(us.backup_volts, 1));
        line.push("tempc", decimal(us.temperature_c, 1));
        line.push("tempf", decimal(us.temperature_f(), 1));
        lines.push(line);
    }

    if let Some(dk) = state.disk() {
        let mut line = MonitoringLine::new(unit, MonitorCategory::Disk);
        line.push("disk1pct", dk.percent_used(0).to_string());
        line.push("disk2pct", dk.percent_used(1).to_string());
        line.push("curdisk", integer(dk.current_disk));
        lines.push(line);
    }

    if let Some(xc) = state.clock() {
        let mut line = MonitoringLine::new(unit, MonitorCategory::Gps);
        line.push("gpslock", xc.lock.code().to_string());
        line.push("gpsmode", xc.mode.to_string());
        line.push("gpssats", integer(xc.satellites));
        line.push("lat", decimal(xc.latitude_degrees(), 5));
        line.push("long", decimal(xc.longitude_degrees(), 5));
        line.push("elev", integer(xc.elevation_m));
        lines.push(line);
    }

    if let Some(aq) = state.acquisition() {
        let mut line = MonitoringLine::new(unit, MonitorCategory::Acquisition);
        line.push("acq", if aq.acquiring { "Y" } else { "N" });
        line.push("events", integer(aq.events));
        line.push("rampct", aq.percent_available().to_string());
        lines.push(line);
    }

    let mut mass = MonitoringLine::new(unit, MonitorCategory::Mass);
    for n in 1..=crate::records::sensor::MAX_SENSORS {
        if let Some(ad) = state.sensor(n) {
            let values: Vec<String> = ad.mass_positions.iter().map(|m| decimal(*m, 1)).collect();
            mass.push(&format!("mass{}", n), values.join(","));
        }
    }
    if !mass.values.is_empty() {
        lines.push(mass);
    }

    lines
}

fn decimal(value: Option<f64>, precision: usize) -> String {
    value
        .map(|v| format!("{:.*}", precision, v))
        .unwrap_or_else(|| "-".to_string())
}

fn integer(value: Option<i64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
