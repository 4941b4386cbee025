//! HEC-RAS time formats.
//!
//! RAS writes wall-clock timestamps without a zone in two shapes:
//! - `01JAN2020 12:30:00` (run times, computation windows)
//! - `01JAN2020 1230` (simulation windows)
//!
//! End-of-day is written as hour `24` (`31DEC2019 2400`), which rolls over
//! to midnight of the following day.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static RAS_DATETIME_HMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}\w{3}\d{4}) (\d{2}):(\d{2}):(\d{2})$").expect("static regex")
});

static RAS_DATETIME_HM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2}\w{3}\d{4}) (\d{2})(\d{2})$").expect("static regex"));

/// ISO-8601 format used for naive RAS timestamps in catalog documents.
pub const ISO_NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse a single RAS timestamp in either shape.
///
/// Returns `None` when the text does not have a timestamp shape or names an
/// impossible date; callers keep such text as-is.
pub fn parse_ras_datetime(s: &str) -> Option<NaiveDateTime> {
    if let Some(caps) = RAS_DATETIME_HMS.captures(s) {
        return build_datetime(&caps[1], &caps[2], &caps[3], &caps[4]);
    }
    if let Some(caps) = RAS_DATETIME_HM.captures(s) {
        return build_datetime(&caps[1], &caps[2], &caps[3], "00");
    }
    None
}

/// Parse a RAS window `"<timestamp> to <timestamp>"`.
pub fn parse_ras_window(s: &str) -> Option<(NaiveDateTime, NaiveDateTime)> {
    let (start, end) = s.split_once(" to ")?;
    Some((parse_ras_datetime(start)?, parse_ras_datetime(end)?))
}

/// Parse a RAS duration `HH:MM:SS`. Hours may exceed 24.
pub fn parse_ras_duration(s: &str) -> Option<Duration> {
    let mut parts = s.trim().split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: i64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 || hours < 0 {
        return None;
    }
    Some(Duration::hours(hours) + Duration::minutes(minutes) + Duration::seconds(seconds))
}

/// Format a naive timestamp as ISO-8601 (`2020-01-01T12:30:00`).
pub fn to_iso(dt: &NaiveDateTime) -> String {
    dt.format(ISO_NAIVE_FORMAT).to_string()
}

fn build_datetime(date: &str, hour: &str, minute: &str, second: &str) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date, "%d%b%Y").ok()?;
    let hour: u32 = hour.parse().ok()?;
    let minute: u32 = minute.parse().ok()?;
    let second: u32 = second.parse().ok()?;

    if hour == 24 && minute == 0 && second == 0 {
        return Some(date.succ_opt()?.and_time(NaiveTime::MIN));
    }
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;
    Some(NaiveDateTime::new(date, time))
}
