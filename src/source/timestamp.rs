use chrono::{Datelike, NaiveDateTime, Utc};
use regex::Regex;
use std::sync::OnceLock;

use crate::entry::LogLevel;

fn iso_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?P<date>\d{4}-\d{2}-\d{2})[T ](?P<time>\d{2}:\d{2}:\d{2})(?P<frac>\.\d{1,9})?(?P<zone>Z|[+-]\d{2}:?\d{2})?",
        )
        .expect("iso timestamp pattern is valid")
    })
}

fn monthday_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?P<md>\d{2}-\d{2}) (?P<time>\d{2}:\d{2}:\d{2})(?P<frac>\.\d{1,3})?")
            .expect("month-day timestamp pattern is valid")
    })
}

/// Extract an epoch-millisecond timestamp from a raw log line.
///
/// Attempts, in order: an ISO-8601-like pattern (date, time, optional
/// fractional seconds, optional zone), then a bare `MM-DD HH:MM:SS[.mmm]`
/// pattern with the year assumed to be the current calendar year. Returns
/// `None` if neither matches; callers treat that as "timestamp unknown".
///
/// Pure function, safe to call concurrently on different lines.
pub fn extract_timestamp(line: &str) -> Option<i64> {
    if let Some(caps) = iso_pattern().captures(line) {
        let date = caps.name("date").map(|m| m.as_str())?;
        let time = caps.name("time").map(|m| m.as_str())?;
        let frac = caps.name("frac").map(|m| m.as_str()).unwrap_or("");
        let naive =
            NaiveDateTime::parse_from_str(&format!("{date} {time}{frac}"), "%Y-%m-%d %H:%M:%S%.f")
                .ok()?;
        let offset_minutes = match caps.name("zone").map(|m| m.as_str()) {
            None | Some("Z") => 0,
            Some(zone) => parse_zone_minutes(zone)?,
        };
        return Some(naive.and_utc().timestamp_millis() - offset_minutes * 60_000);
    }

    if let Some(caps) = monthday_pattern().captures(line) {
        let md = caps.name("md").map(|m| m.as_str())?;
        let time = caps.name("time").map(|m| m.as_str())?;
        let frac = caps.name("frac").map(|m| m.as_str()).unwrap_or("");
        let year = Utc::now().year();
        let naive = NaiveDateTime::parse_from_str(
            &format!("{year}-{md} {time}{frac}"),
            "%Y-%m-%d %H:%M:%S%.f",
        )
        .ok()?;
        return Some(naive.and_utc().timestamp_millis());
    }

    None
}

/// Parse a `+HH:MM` / `+HHMM` style zone suffix into minutes east of UTC.
fn parse_zone_minutes(zone: &str) -> Option<i64> {
    let (sign, rest) = match zone.split_at(1) {
        ("+", rest) => (1i64, rest),
        ("-", rest) => (-1i64, rest),
        _ => return None,
    };
    let digits: String = rest.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 4 {
        return None;
    }
    let hours: i64 = digits[..2].parse().ok()?;
    let minutes: i64 = digits[2..].parse().ok()?;
    Some(sign * (hours * 60 + minutes))
}

/// Infer a severity level by scanning the line for keyword groups.
///
/// Precedence: fatal/error/fail, then warn, then debug/trace, else info.
pub fn infer_level(line: &str) -> LogLevel {
    let lower = line.to_ascii_lowercase();
    if lower.contains("fatal") || lower.contains("error") || lower.contains("fail") {
        LogLevel::Error
    } else if lower.contains("warn") {
        LogLevel::Warn
    } else if lower.contains("debug") || lower.contains("trace") {
        LogLevel::Debug
    } else {
        LogLevel::Info
    }
}
