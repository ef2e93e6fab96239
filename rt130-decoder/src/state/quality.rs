//! Clock quality derived from the state-of-health log

use crate::codec::timestamp_from_parts;
use crate::soh::LogTime;
use crate::types::Timestamp;
use chrono::Datelike;

/// Quality reported before any lock has been seen in the log
pub const NO_LOCK_QUALITY: i64 = 90;

/// Resolve a year-less log time against `now`
///
/// The lock is placed in `now`'s year, or the previous year when that would
/// put it in the future (a lock logged on day 365 read back on day 2).
pub fn resolve_log_time(lock: &LogTime, now: Timestamp) -> Option<Timestamp> {
    let at = |year: i32| timestamp_from_parts(year, lock.day_of_year, lock.hour, lock.minute, lock.second, 0);
    match at(now.year()) {
        Some(t) if t <= now => Some(t),
        _ => at(now.year() - 1),
    }
}

/// `max(0, 100 - minutes since lock)`, or 90 without a lock time
pub fn log_time_quality(lock: Option<&LogTime>, now: Timestamp) -> i64 {
    let Some(locked_at) = lock.and_then(|l| resolve_log_time(l, now)) else {
        return NO_LOCK_QUALITY;
    };
    let minutes = (now - locked_at).num_minutes().max(0);
    (100 - minutes).max(0)
}
