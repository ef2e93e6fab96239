//! Core types for the RT130 decoder library
//!
//! This module defines the fundamental types shared by the codecs, the record
//! decoders and the per-unit state tracker: the timestamp type, the record kind
//! codes, the error taxonomy and the outbound messages a unit produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timestamp type used throughout the decoder
pub type Timestamp = DateTime<Utc>;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors that can occur while decoding records or applying them to a unit
///
/// Only [`RecordError::ResourceExhausted`] is fatal. Every other variant is
/// recovered by the caller: the record is dropped, a warning is logged and
/// processing resumes at the next record boundary.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("Malformed field '{field}': {reason} (raw: {raw:?})")]
    MalformedField {
        field: &'static str,
        raw: String,
        reason: String,
    },

    #[error("Truncated {kind} record: need {needed} bytes, got {got}")]
    Truncated {
        kind: &'static str,
        needed: usize,
        got: usize,
    },

    #[error("Wrong record kind: expected {expected}, found {found:?}")]
    WrongKind { expected: RecordKind, found: String },

    #[error("Unknown record kind: {0:?}")]
    UnknownKind(String),

    #[error("Unconfigured {what} {index}")]
    UnconfiguredReference { what: &'static str, index: usize },

    #[error("Unrecognized log line: {0}")]
    UnrecognizedLogLine(String),

    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("Unit {0:04X} task has stopped")]
    UnitStopped(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RecordError {
    /// Build a `MalformedField` error from the raw bytes of the sub-field
    pub fn malformed(field: &'static str, raw: &[u8], reason: impl Into<String>) -> Self {
        RecordError::MalformedField {
            field,
            raw: String::from_utf8_lossy(raw).into_owned(),
            reason: reason.into(),
        }
    }

    /// True for errors that must stop the unit instead of skipping a record
    pub fn is_fatal(&self) -> bool {
        matches!(self, RecordError::ResourceExhausted(_))
    }
}

impl From<std::collections::TryReserveError> for RecordError {
    fn from(e: std::collections::TryReserveError) -> Self {
        RecordError::ResourceExhausted(e.to_string())
    }
}

/// Two-letter record kind codes understood by the decoder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    /// External clock / GPS status
    Clock,
    /// Disk usage status
    Disk,
    /// Unit power and temperature status
    Unit,
    /// Acquisition status
    Acquisition,
    /// Sensor mass position (auxiliary data)
    Sensor,
    /// Event header packet
    EventHeader,
    /// Event trailer packet
    EventTrailer,
    /// Data stream definition packet
    DataStream,
    /// Station/channel definition packet
    StationChannel,
    /// Operating mode packet
    OperatingMode,
}

impl RecordKind {
    /// All kinds, in dispatch order
    pub const ALL: [RecordKind; 10] = [
        RecordKind::Clock,
        RecordKind::Disk,
        RecordKind::Unit,
        RecordKind::Acquisition,
        RecordKind::Sensor,
        RecordKind::EventHeader,
        RecordKind::EventTrailer,
        RecordKind::DataStream,
        RecordKind::StationChannel,
        RecordKind::OperatingMode,
    ];

    /// The two-letter wire code
    pub fn code(&self) -> &'static str {
        match self {
            RecordKind::Clock => "XC",
            RecordKind::Disk => "DK",
            RecordKind::Unit => "US",
            RecordKind::Acquisition => "AQ",
            RecordKind::Sensor => "AD",
            RecordKind::EventHeader => "EH",
            RecordKind::EventTrailer => "ET",
            RecordKind::DataStream => "DS",
            RecordKind::StationChannel => "SC",
            RecordKind::OperatingMode => "OM",
        }
    }

    /// Look up a kind from its two-letter wire code
    pub fn from_code(code: &str) -> Result<Self> {
        RecordKind::ALL
            .iter()
            .copied()
            .find(|k| k.code() == code)
            .ok_or_else(|| RecordError::UnknownKind(code.to_string()))
    }

    /// Declared byte length of a record of this kind
    pub fn record_len(&self) -> usize {
        match self {
            RecordKind::Clock => crate::records::clock::XC_LEN,
            RecordKind::Disk => crate::records::disk::DK_LEN,
            RecordKind::Unit => crate::records::unit::US_LEN,
            RecordKind::Acquisition => crate::records::acquisition::AQ_LEN,
            RecordKind::Sensor => crate::records::sensor::AD_LEN,
            RecordKind::EventHeader | RecordKind::EventTrailer => crate::records::event::EVENT_LEN,
            RecordKind::DataStream => crate::records::stream::DS_LEN,
            RecordKind::StationChannel => crate::records::station::SC_LEN,
            RecordKind::OperatingMode => crate::records::mode::OM_LEN,
        }
    }
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::str::FromStr for RecordKind {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self> {
        RecordKind::from_code(&s.to_ascii_uppercase())
    }
}

/// Trigger observed in an event header, persisted downstream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    /// 12-character SEED channel identifier of the triggering stream
    pub seedname: String,
    /// Trigger time from the event header
    pub trigger_time: Timestamp,
    /// Source event file name (`YYYYDDD/UNIT/S/HHMMSSTTT_EEEE`)
    pub source_file: String,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TRIGGER {} {} {}",
            self.seedname,
            self.trigger_time.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.source_file
        )
    }
}
