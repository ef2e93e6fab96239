//! SEED channel identifier mapping
//!
//! Maps (stream, channel position) onto the 12-character identifier used by
//! downstream storage and monitoring:
//!
//! ```text
//! NN SSSSS BBC LL
//! |  |     |   +- location (2)
//! |  |     +----- band + instrument (2) and component (1)
//! |  +----------- station (5, space padded)
//! +-------------- network (2, space padded)
//! ```
//!
//! A stream carrying two 3-component sensors uses a 4-character band
//! (`HHHN`) and location (`0010`); channel positions 3 and up take the second
//! half of each.

use super::DataStream;
use serde::Serialize;
use std::fmt;

/// Length of every identifier the mapping produces
pub const SEEDNAME_LEN: usize = 12;

/// Result of a seedname lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeedName {
    /// 12-character identifier, never empty
    pub id: String,
    /// False when the fallback identifier was produced
    pub resolved: bool,
}

impl fmt::Display for SeedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Map a stream/channel pair to its identifier
///
/// Never fails: when the stream is missing or its naming is incomplete the
/// fallback identifier from [`fallback_seedname`] is returned with
/// `resolved = false`.
pub fn map_seedname(
    network: &str,
    station: &str,
    unit: u16,
    stream_index: usize,
    stream: Option<&DataStream>,
    channel: usize,
) -> SeedName {
    match stream.and_then(|s| resolve(network, station, s, channel)) {
        Some(id) => SeedName { id, resolved: true },
        None => SeedName {
            id: fallback_seedname(unit, stream_index, channel),
            resolved: false,
        },
    }
}

/// Deterministic identifier for a channel that cannot be named
///
/// `ZZ` + unit hex id (5) + `UN` + channel digit + 2-digit stream.
pub fn fallback_seedname(unit: u16, stream: usize, channel: usize) -> String {
    format!(
        "ZZ{:<5}UN{}{:02}",
        format!("{:04X}", unit),
        channel % 10,
        stream % 100
    )
}

fn resolve(network: &str, station: &str, stream: &DataStream, channel: usize) -> Option<String> {
    let band: Vec<char> = stream.band.chars().collect();
    let components: Vec<char> = stream.components.chars().collect();
    let location: Vec<char> = stream.location.chars().collect();
    let second_sensor = channel >= 3;

    let channel_code: String = if second_sensor && band.len() == 4 {
        let letter = components.get(channel)?;
        band[2..4].iter().chain(std::iter::once(letter)).collect()
    } else {
        if band.len() < 2 {
            return None;
        }
        let letter = components.get(channel % 3)?;
        band[0..2].iter().chain(std::iter::once(letter)).collect()
    };

    let location_code: &[char] =
        if second_sensor && stream.channels.chars().count() > 3 && location.len() == 4 {
            &location[2..4]
        } else {
            &location[..location.len().min(2)]
        };
    let location_code: String = location_code
        .iter()
        .map(|&c| if c == '-' { ' ' } else { c })
        .collect();

    Some(format!(
        "{}{}{}{}",
        fixed(network, 2),
        fixed(station, 5),
        channel_code,
        fixed(&location_code, 2)
    ))
}

/// Space-pad or truncate to exactly `width` characters
fn fixed(text: &str, width: usize) -> String {
    format!("{:<w$.w$}", text, w = width)
}
