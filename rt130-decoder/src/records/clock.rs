//! XC: external clock / GPS status
//!
//! ```text
//! kind(2) time(17) lock(1) mode(1) sats(2) lat(11) lon(12) elev(7)
//! phase_sign(1) phase_ms(3) phase_us(3) lock_duration(11)
//! ```

use super::{format_time, open_status};
use crate::types::{RecordError, RecordKind, Result, Timestamp};
use serde::Serialize;
use std::fmt;

/// Declared length of an XC record
pub const XC_LEN: usize = 71;

/// GPS lock state reported by the clock
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LockState {
    Locked,
    Unlocked,
    Off,
}

impl LockState {
    fn from_flag(flag: char) -> Result<Self> {
        match flag {
            'L' => Ok(LockState::Locked),
            'U' => Ok(LockState::Unlocked),
            'O' | ' ' => Ok(LockState::Off),
            other => Err(RecordError::malformed(
                "lock",
                other.to_string().as_bytes(),
                "expected L, U or O",
            )),
        }
    }

    /// Single-letter code as sent on the wire
    pub fn code(&self) -> char {
        match self {
            LockState::Locked => 'L',
            LockState::Unlocked => 'U',
            LockState::Off => 'O',
        }
    }
}

/// Decoded XC record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClockStatus {
    /// Record time
    pub time: Timestamp,
    pub lock: LockState,
    /// Fix mode: `3` 3-D, `2` 2-D, `1` time only, `N` no fix
    pub mode: char,
    pub satellites: Option<i64>,
    /// Latitude as sent, e.g. `N34:04.3550`
    pub latitude: String,
    /// Longitude as sent, e.g. `W118:26.4080`
    pub longitude: String,
    /// Antenna elevation in metres
    pub elevation_m: Option<i64>,
    /// Signed phase error in microseconds
    pub phase_error_us: i64,
    /// Time since the last confirmed lock, in seconds
    pub lock_seconds: Option<i64>,
}

impl ClockStatus {
    /// Decode an XC record
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (mut c, time) = open_status(RecordKind::Clock, bytes, XC_LEN)?;

        let lock = LockState::from_flag(c.flag()?)?;
        let mode = c.flag()?;
        let satellites = c.int("satellites", 2)?;
        let latitude = c.text(11)?;
        let longitude = c.text(12)?;
        let elevation_m = c.int("elevation", 7)?;

        let sign = match c.flag()? {
            '-' | '1' => -1,
            '+' | '0' | ' ' => 1,
            other => {
                return Err(RecordError::malformed(
                    "phase_sign",
                    other.to_string().as_bytes(),
                    "expected sign",
                ))
            }
        };
        let ms = c.int("phase_ms", 3)?.unwrap_or(0);
        let us = c.int("phase_us", 3)?.unwrap_or(0);
        let phase_error_us = sign * (ms * 1000 + us);

        let lock_seconds = parse_lock_duration(c.take(11)?)?;

        debug_assert_eq!(c.position(), XC_LEN);
        Ok(Self {
            time,
            lock,
            mode,
            satellites,
            latitude,
            longitude,
            elevation_m,
            phase_error_us,
            lock_seconds,
        })
    }

    /// Embedded record timestamp
    pub fn timestamp(&self) -> Timestamp {
        self.time
    }

    /// Clock quality from the lock duration: `max(0, 100 - seconds / 1000)`
    pub fn time_quality(&self) -> Option<i64> {
        self.lock_seconds.map(|secs| (100 - secs / 1000).max(0))
    }

    pub fn is_locked(&self) -> bool {
        self.lock == LockState::Locked
    }

    pub fn is_3d_fix(&self) -> bool {
        self.mode == '3'
    }

    /// Latitude in signed decimal degrees
    pub fn latitude_degrees(&self) -> Option<f64> {
        hemisphere_degrees(&self.latitude)
    }

    /// Longitude in signed decimal degrees
    pub fn longitude_degrees(&self) -> Option<f64> {
        hemisphere_degrees(&self.longitude)
    }
}

impl fmt::Display for ClockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "XC {} lock={} mode={} sats={} lat={} lon={} elev={} phase={}us",
            format_time(&self.time),
            self.lock.code(),
            self.mode,
            opt(self.satellites),
            self.latitude,
            self.longitude,
            opt(self.elevation_m),
            self.phase_error_us
        )?;
        match (self.lock_seconds, self.time_quality()) {
            (Some(secs), Some(q)) => write!(f, " locked_for={}s quality={}", secs, q),
            _ => write!(f, " locked_for=-"),
        }
    }
}

fn opt(v: Option<i64>) -> String {
    v.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

/// Parse the lock-duration sub-field into seconds
///
/// Accepted forms: `HH:MM`, `DD:HH:MM`, `DD:HH:MM:SS`. Units locked for more
/// than 99 days write a non-digit in the leading days position; that
/// character is dropped and the remaining digit gets an implicit trailing zero
/// (`:5:01:02:03` reads as 50 days). Downstream consumers rely on that output,
/// so it is kept as-is.
pub fn parse_lock_duration(raw: &[u8]) -> Result<Option<i64>> {
    let text = crate::codec::trim_text(raw);
    if text.is_empty() {
        return Ok(None);
    }
    if !text.is_ascii() {
        return Err(RecordError::malformed("lock_duration", raw, "non-ASCII text"));
    }

    let number = |s: &str| -> Result<i64> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(RecordError::malformed(
                "lock_duration",
                raw,
                format!("bad component {:?}", s),
            ));
        }
        s.parse::<i64>()
            .map_err(|e| RecordError::malformed("lock_duration", raw, e.to_string()))
    };

    let overflowed = text.len() == 11 && !text.as_bytes()[0].is_ascii_digit();
    let (days, rest) = if overflowed {
        let days = number(&format!("{}0", &text[1..2]))?;
        (Some(days), &text[3..])
    } else {
        (None, text.as_str())
    };

    let parts: Vec<&str> = rest.split(':').collect();
    let (d, h, m, s) = match (days, parts.as_slice()) {
        (Some(d), &[h, m, s]) => (d, number(h)?, number(m)?, number(s)?),
        (None, &[h, m]) => (0, number(h)?, number(m)?, 0),
        (None, &[d, h, m]) => (number(d)?, number(h)?, number(m)?, 0),
        (None, &[d, h, m, s]) => (number(d)?, number(h)?, number(m)?, number(s)?),
        _ => {
            return Err(RecordError::malformed(
                "lock_duration",
                raw,
                "expected [DD:]HH:MM[:SS]",
            ))
        }
    };

    Ok(Some(d * 86_400 + h * 3_600 + m * 60 + s))
}

/// Convert `N34:04.3550` style coordinates into signed decimal degrees
fn hemisphere_degrees(text: &str) -> Option<f64> {
    let mut chars = text.chars();
    let sign = match chars.next()? {
        'N' | 'E' => 1.0,
        'S' | 'W' => -1.0,
        _ => return None,
    };
    let (deg, min) = chars.as_str().split_once(':')?;
    let deg: f64 = deg.trim().parse().ok()?;
    let min: f64 = min.trim().parse().ok()?;
    Some(sign * (deg + min / 60.0))
}

#[cfg(test)]
mod tests {
    use super::super::testdata::{xc, T0};
    use super::*;

    #[test]
    fn test_decode_clock_record() {
        let status = ClockStatus::decode(&xc(T0, 'L', "00:12:45:00")).unwrap();
        assert!(status.is_locked());
        assert!(status.is_3d_fix());
        assert_eq!(status.satellites, Some(7));
        assert_eq!(status.latitude, "N34:04.3550");
        assert_eq!(status.longitude, "W118:26.4080");
        assert_eq!(status.elevation_m, Some(93));
        assert_eq!(status.phase_error_us, -1234);
        assert_eq!(status.lock_seconds, Some(12 * 3600 + 45 * 60));
    }

    #[test]
    fn test_time_quality_from_short_lock_field() {
        let status = ClockStatus::decode(&xc(T0, 'L', "12:45")).unwrap();
        assert_eq!(status.lock_seconds, Some(45_900));
        assert_eq!(status.time_quality(), Some(100 - (12 * 3600 + 45 * 60) / 1000));
        assert_eq!(status.time_quality(), Some(55));
    }

    #[test]
    fn test_time_quality_clamps_at_zero() {
        let status = ClockStatus::decode(&xc(T0, 'U', "03:12:45")).unwrap();
        assert_eq!(status.lock_seconds, Some(3 * 86_400 + 12 * 3600 + 45 * 60));
        assert_eq!(status.time_quality(), Some(0));
    }

    #[test]
    fn test_blank_lock_duration_has_no_quality() {
        let status = ClockStatus::decode(&xc(T0, 'O', "")).unwrap();
        assert_eq!(status.lock_seconds, None);
        assert_eq!(status.time_quality(), None);
        assert!(status.to_string().contains("locked_for=-"));
    }

    #[test]
    fn test_lock_duration_overflow_quirk() {
        // 105 days written by firmware as ':5' in the two-digit days field.
        // The implicit trailing zero reads it back as 50 days.
        let secs = parse_lock_duration(b":5:01:02:03").unwrap().unwrap();
        assert_eq!(secs, 50 * 86_400 + 3_600 + 2 * 60 + 3);

        let secs = parse_lock_duration(b"?7:00:00:00").unwrap().unwrap();
        assert_eq!(secs, 70 * 86_400);
    }

    #[test]
    fn test_lock_duration_rejects_garbage() {
        assert!(parse_lock_duration(b"12").is_err());
        assert!(parse_lock_duration(b"1x:00").is_err());
        assert!(parse_lock_duration(b":x:00:00:00").is_err());
    }

    #[test]
    fn test_bad_lock_flag_aborts_record() {
        assert!(ClockStatus::decode(&xc(T0, 'Q', "12:45")).is_err());
    }

    #[test]
    fn test_coordinates_in_degrees() {
        let status = ClockStatus::decode(&xc(T0, 'L', "12:45")).unwrap();
        let lat = status.latitude_degrees().unwrap();
        let lon = status.longitude_degrees().unwrap();
        assert!((lat - (34.0 + 4.355 / 60.0)).abs() < 1e-9);
        assert!((lon + (118.0 + 26.408 / 60.0)).abs() < 1e-9);
    }
}
