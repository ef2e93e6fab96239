//! Fixed-width field cursor
//!
//! Every RT130 record is a fixed layout of ASCII and packed-decimal
//! sub-fields. [`FieldCursor`] walks such a layout front to back; each read
//! consumes exactly the declared width so a decoder can never drift past its
//! own field list.

use super::bcd;
use crate::types::{RecordError, Result, Timestamp};
use byteorder::{BigEndian, ByteOrder};
use chrono::{NaiveDate, TimeZone, Utc};

/// Positioned reader over one record's bytes
pub struct FieldCursor<'a> {
    kind: &'static str,
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    /// Create a cursor at the start of a record
    pub fn new(kind: &'static str, data: &'a [u8]) -> Self {
        Self { kind, data, pos: 0 }
    }

    /// Current byte offset
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the current position
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Take the next `width` raw bytes
    pub fn take(&mut self, width: usize) -> Result<&'a [u8]> {
        let end = self.pos + width;
        if end > self.data.len() {
            return Err(RecordError::Truncated {
                kind: self.kind,
                needed: end,
                got: self.data.len(),
            });
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    /// Skip reserved bytes
    pub fn skip(&mut self, width: usize) -> Result<()> {
        self.take(width).map(|_| ())
    }

    /// Text sub-field, trimmed of spaces and NUL padding
    pub fn text(&mut self, width: usize) -> Result<String> {
        Ok(trim_text(self.take(width)?))
    }

    /// Single-character flag field; a blank flag reads as a space
    pub fn flag(&mut self) -> Result<char> {
        let raw = self.take(1)?;
        Ok(match raw[0] {
            0 => ' ',
            b => char::from(b),
        })
    }

    /// Signed ASCII decimal integer
    pub fn int(&mut self, field: &'static str, width: usize) -> Result<Option<i64>> {
        parse_int(field, self.take(width)?)
    }

    /// Signed ASCII decimal with optional fraction
    pub fn decimal(&mut self, field: &'static str, width: usize) -> Result<Option<f64>> {
        parse_decimal(field, self.take(width)?)
    }

    /// `yyyy:ddd:hh:mm:ss[.fff]` time sub-field
    pub fn time(&mut self, field: &'static str, width: usize) -> Result<Option<Timestamp>> {
        parse_time(field, self.take(width)?)
    }

    /// Packed decimal integer
    pub fn bcd(&mut self, width: usize) -> Result<u32> {
        bcd::decode(self.take(width)?)
    }

    /// Packed decimal as a zero-padded digit string
    pub fn bcd_string(&mut self, width: usize) -> Result<String> {
        bcd::decode_string(self.take(width)?)
    }

    /// Big-endian 16-bit binary field
    pub fn u16_be(&mut self) -> Result<u16> {
        Ok(BigEndian::read_u16(self.take(2)?))
    }
}

/// Trim space and NUL padding from a text field
pub fn trim_text(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .trim_matches(|c: char| c == ' ' || c == '\0')
        .to_string()
}

/// Parse an optionally signed ASCII decimal integer; blank yields `None`
pub fn parse_int(field: &'static str, raw: &[u8]) -> Result<Option<i64>> {
    let text = trim_text(raw);
    if text.is_empty() {
        return Ok(None);
    }
    text.parse::<i64>()
        .map(Some)
        .map_err(|e| RecordError::malformed(field, raw, e.to_string()))
}

/// Parse an optionally signed ASCII decimal number; blank yields `None`
pub fn parse_decimal(field: &'static str, raw: &[u8]) -> Result<Option<f64>> {
    let text = trim_text(raw);
    if text.is_empty() {
        return Ok(None);
    }
    // f64::from_str also takes "inf"/"NaN", which never appear on the wire
    if !text
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '.'))
    {
        return Err(RecordError::malformed(field, raw, "invalid character in number"));
    }
    text.parse::<f64>()
        .map(Some)
        .map_err(|e| RecordError::malformed(field, raw, e.to_string()))
}

/// Parse a `yyyy:ddd:hh:mm:ss[.fff]` time; blank yields `None`
pub fn parse_time(field: &'static str, raw: &[u8]) -> Result<Option<Timestamp>> {
    let text = trim_text(raw);
    if text.is_empty() {
        return Ok(None);
    }

    let (main, fraction) = match text.split_once('.') {
        Some((main, frac)) => (main, Some(frac)),
        None => (text.as_str(), None),
    };

    let parts: Vec<&str> = main.split(':').collect();
    if parts.len() != 5 {
        return Err(RecordError::malformed(field, raw, "expected yyyy:ddd:hh:mm:ss"));
    }

    let number = |s: &str| -> Result<u32> {
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(RecordError::malformed(field, raw, format!("bad time part {:?}", s)));
        }
        s.parse::<u32>()
            .map_err(|e| RecordError::malformed(field, raw, e.to_string()))
    };

    let year = number(parts[0])? as i32;
    let doy = number(parts[1])?;
    let hour = number(parts[2])?;
    let minute = number(parts[3])?;
    let second = number(parts[4])?;

    let millis = match fraction {
        Some(f) if f.len() <= 3 => {
            // ".5" is 500 ms, ".05" is 50 ms
            number(f)? * 10u32.pow(3 - f.len() as u32)
        }
        Some(_) => {
            return Err(RecordError::malformed(field, raw, "fraction longer than 3 digits"));
        }
        None => 0,
    };

    timestamp_from_parts(year, doy, hour, minute, second, millis)
        .map(Some)
        .ok_or_else(|| RecordError::malformed(field, raw, "time out of range"))
}

/// Convert a day-of-year into a calendar date
pub fn date_from_day_of_year(year: i32, doy: u32) -> Option<NaiveDate> {
    NaiveDate::from_yo_opt(year, doy)
}

/// Build a UTC timestamp from year, day-of-year and time of day
pub fn timestamp_from_parts(
    year: i32,
    doy: u32,
    hour: u32,
    minute: u32,
    second: u32,
    millis: u32,
) -> Option<Timestamp> {
    let date = date_from_day_of_year(year, doy)?;
    let naive = date.and_hms_milli_opt(hour, minute, second, millis)?;
    Some(Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_cursor_walks_fields() {
        let data = b"XC 42-17abc";
        let mut cursor = FieldCursor::new("XC", data);
        assert_eq!(cursor.text(2).unwrap(), "XC");
        assert_eq!(cursor.int("a", 3).unwrap(), Some(42));
        assert_eq!(cursor.int("b", 3).unwrap(), Some(-17));
        assert_eq!(cursor.position(), 8);
        assert_eq!(cursor.remaining(), 3);
        assert!(cursor.take(4).is_err());
        assert_eq!(cursor.text(3).unwrap(), "abc");
    }

    #[test]
    fn test_blank_numeric_is_sentinel_not_error() {
        assert_eq!(parse_int("n", b"     ").unwrap(), None);
        assert_eq!(parse_decimal("n", b"  ").unwrap(), None);
        assert_eq!(parse_time("t", b"                 ").unwrap(), None);
    }

    #[test]
    fn test_malformed_numbers() {
        assert!(parse_int("n", b" 1x ").is_err());
        assert!(parse_decimal("n", b"inf").is_err());
        assert!(parse_decimal("n", b"1.2.3").is_err());
        assert_eq!(parse_decimal("n", b"+13.5").unwrap(), Some(13.5));
        assert_eq!(parse_int("n", b"+0007").unwrap(), Some(7));
    }

    #[test]
    fn test_parse_time_day_of_year() {
        let ts = parse_time("t", b"2024:060:12:34:56").unwrap().unwrap();
        // 2024 is a leap year: day 60 is Feb 29
        assert_eq!(ts.month(), 2);
        assert_eq!(ts.day(), 29);
        assert_eq!(ts.hour(), 12);
        assert_eq!(ts.minute(), 34);
        assert_eq!(ts.second(), 56);

        let ts = parse_time("t", b"2023:365:23:59:59.250").unwrap().unwrap();
        assert_eq!(ts.month(), 12);
        assert_eq!(ts.day(), 31);
        assert_eq!(ts.timestamp_subsec_millis(), 250);

        let ts = parse_time("t", b"2023:001:00:00:00.5").unwrap().unwrap();
        assert_eq!(ts.timestamp_subsec_millis(), 500);
    }

    #[test]
    fn test_parse_time_rejects_bad_values() {
        assert!(parse_time("t", b"2023:366:00:00:00").is_err());
        assert!(parse_time("t", b"2023:100:24:00:00").is_err());
        assert!(parse_time("t", b"2023:100:00:00").is_err());
        assert!(parse_time("t", b"2023:1x0:00:00:00").is_err());
    }

    #[test]
    fn test_bcd_and_binary_fields() {
        let data = [0x12, 0x34, 0x9C, 0x3E];
        let mut cursor = FieldCursor::new("EH", &data);
        assert_eq!(cursor.bcd(2).unwrap(), 1234);
        assert_eq!(cursor.u16_be().unwrap(), 0x9C3E);
    }
}
