//! Publish-date parsing.
//!
//! Feeds are supposed to use RFC 2822 (RSS) or RFC 3339 (Atom) but plenty of
//! generators emit something else.  [`parse_any`] accepts the formats seen in
//! practice and normalises everything to UTC.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TimestampError {
    #[error("missing publish date")]
    Missing,

    #[error("unrecognised date format: {0:?}")]
    Unrecognised(String),

    #[error("date out of range: {0:?}")]
    OutOfRange(String),
}

/// Latest year accepted.  Anything later is a misread number, and storing it
/// as a watermark would silence the feed for good.
const MAX_YEAR: i32 = 9999;

/// Offset-carrying layouts that are neither strict RFC 2822 nor RFC 3339.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%a, %d %b %Y %H:%M %z",
];

/// Layouts without an offset.  These are taken as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse a feed date in any supported format.
///
/// All-digit text is read by length: 8 digits `YYYYMMDD`, 10 digits unix
/// seconds, 13 digits unix milliseconds, 14 digits `YYYYMMDDhhmmss`.
pub fn parse_any(text: &str) -> Result<DateTime<Utc>, TimestampError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TimestampError::Missing);
    }

    let parsed = if text.bytes().all(|b| b.is_ascii_digit()) {
        parse_digits(text)
    } else {
        parse_formatted(text)
    };

    match parsed {
        Some(dt) if dt.year() <= MAX_YEAR => Ok(dt),
        Some(_) => Err(TimestampError::OutOfRange(text.to_string())),
        None => Err(TimestampError::Unrecognised(text.to_string())),
    }
}

fn parse_digits(text: &str) -> Option<DateTime<Utc>> {
    match text.len() {
        8 => NaiveDate::parse_from_str(text, "%Y%m%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc()),
        10 => DateTime::from_timestamp(text.parse().ok()?, 0),
        13 => DateTime::from_timestamp_millis(text.parse().ok()?),
        14 => NaiveDateTime::parse_from_str(text, "%Y%m%d%H%M%S")
            .ok()
            .map(|naive| naive.and_utc()),
        _ => None,
    }
}

fn parse_formatted(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Parse an optional date, treating `None` as [`TimestampError::Missing`].
pub fn parse_opt(text: Option<&str>) -> Result<DateTime<Utc>, TimestampError> {
    parse_any(text.ok_or(TimestampError::Missing)?)
}
