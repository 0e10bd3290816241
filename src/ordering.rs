//! Chronological ordering of feed entries.
//!
//! Sequence numbers are derived from position, so the order produced here must
//! be reproducible across runs: entries are sorted oldest-first by a best-effort
//! timestamp with a stable sort, and entries without any usable date sort first
//! in their original relative order.

use crate::feed::FeedEntry;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use std::fmt;
use tracing::debug;

/// A publish timestamp, with or without a UTC offset
///
/// Naive values are compared as if they were UTC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Timestamp {
    /// Timestamp carrying an explicit offset
    Zoned(DateTime<FixedOffset>),
    /// Timestamp without offset information
    Naive(NaiveDateTime),
}

impl Timestamp {
    /// The instant used for ordering
    pub fn sort_key(&self) -> NaiveDateTime {
        match self {
            Timestamp::Zoned(dt) => dt.naive_utc(),
            Timestamp::Naive(dt) => *dt,
        }
    }

    /// ISO-8601 rendering: `YYYY-MM-DDTHH:MM:SS[.ffffff][±HH:MM]`
    ///
    /// Fractional seconds appear only when non-zero and the offset only for
    /// zoned values.
    pub fn to_iso8601(&self) -> String {
        match self {
            Timestamp::Zoned(dt) => {
                format!("{}{}", format_naive(&dt.naive_local()), dt.format("%:z"))
            }
            Timestamp::Naive(dt) => format_naive(dt),
        }
    }
}

fn format_naive(dt: &NaiveDateTime) -> String {
    if dt.nanosecond() == 0 {
        dt.format("%Y-%m-%dT%H:%M:%S").to_string()
    } else {
        dt.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

/// A free-form date string that matched none of the known formats
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized date format: {input:?}")]
pub struct DateParseError {
    /// The rejected input, trimmed
    pub input: String,
}

/// The entry field a timestamp was taken from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DateField {
    /// Free-form `published`
    Published,
    /// Free-form `updated`
    Updated,
    /// Free-form `created`
    Created,
    /// Free-form `date`
    Date,
    /// Pre-parsed `published_parsed`
    PublishedParsed,
    /// Pre-parsed `updated_parsed`
    UpdatedParsed,
}

/// Formats with an explicit numeric offset, tried after RFC 2822/3339
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%d %b %Y %H:%M:%S %z",
    "%d %b %Y %H:%M %z",
];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d %b %Y %H:%M:%S",
    "%d %b %Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d", "%d %b %Y"];

/// Parse a date string in any of the formats podcast feeds commonly use
///
/// Accepts RFC 2822, RFC 3339, ISO-like date-times with or without an offset
/// (a trailing `Z` counts as UTC), bare dates and the German `DD.MM.YYYY` form.
///
/// The leading weekday name is informational only: a weekday that does not
/// match the date is ignored. A trailing zone abbreviation outside the RFC 2822
/// set (`CEST`, `MEZ`, ...) is dropped and the rest parsed as a naive value.
pub fn parse_free_form(input: &str) -> Result<Timestamp, DateParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(DateParseError {
            input: trimmed.to_string(),
        });
    }

    let without_weekday = strip_weekday(trimmed);
    let mut candidates = vec![trimmed];
    if without_weekday != trimmed {
        candidates.push(without_weekday);
    }

    for candidate in &candidates {
        if let Some(ts) = parse_zoned(candidate) {
            return Ok(ts);
        }
    }

    if let Some(rest) = strip_zone_name(without_weekday) {
        candidates.push(rest);
    }
    candidates
        .iter()
        .find_map(|candidate| parse_naive(candidate))
        .ok_or_else(|| DateParseError {
            input: trimmed.to_string(),
        })
}

fn parse_zoned(input: &str) -> Option<Timestamp> {
    if let Ok(dt) = DateTime::parse_from_rfc2822(input) {
        return Some(Timestamp::Zoned(dt));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(Timestamp::Zoned(dt));
    }

    let zoned_input = match input.strip_suffix('Z').or_else(|| input.strip_suffix('z')) {
        Some(rest) => format!("{}+00:00", rest),
        None => input.to_string(),
    };
    ZONED_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(&zoned_input, fmt).ok())
        .map(Timestamp::Zoned)
}

fn parse_naive(input: &str) -> Option<Timestamp> {
    if let Some(dt) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
    {
        return Some(Timestamp::Naive(dt));
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(input, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(Timestamp::Naive)
}

/// `"Tue, 02 Jan 2024 ..."` -> `"02 Jan 2024 ..."`
fn strip_weekday(input: &str) -> &str {
    match input.split_once(',') {
        Some((day, rest)) if !day.is_empty() && day.chars().all(|c| c.is_ascii_alphabetic()) => {
            rest.trim_start()
        }
        _ => input,
    }
}

/// `"02 Jan 2024 10:00:00 CEST"` -> `"02 Jan 2024 10:00:00"`
fn strip_zone_name(input: &str) -> Option<&str> {
    let (rest, zone) = input.rsplit_once(char::is_whitespace)?;
    if zone.is_empty() || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(rest.trim_end())
}

/// Best-effort timestamp of an entry
///
/// Free-form fields are tried first (`published`, `updated`, `created`,
/// `date`), then the pre-parsed ones. The first field that yields a timestamp
/// wins; absent fields are skipped and unparseable ones are logged and skipped.
pub fn resolve_timestamp(entry: &FeedEntry) -> Option<(DateField, Timestamp)> {
    let free_form = [
        (DateField::Published, &entry.published),
        (DateField::Updated, &entry.updated),
        (DateField::Created, &entry.created),
        (DateField::Date, &entry.date),
    ];

    for (field, value) in free_form {
        let Some(raw) = value else { continue };
        match parse_free_form(raw) {
            Ok(ts) => return Some((field, ts)),
            Err(e) => debug!(?field, title = ?entry.title, "Skipping date field: {}", e),
        }
    }

    let pre_parsed = [
        (DateField::PublishedParsed, entry.published_parsed),
        (DateField::UpdatedParsed, entry.updated_parsed),
    ];

    pre_parsed
        .into_iter()
        .find_map(|(field, value)| value.map(|dt| (field, Timestamp::Zoned(dt))))
}

/// A feed entry paired with its resolved timestamp
#[derive(Clone, Debug)]
pub struct DatedEntry {
    /// The entry as parsed from the feed
    pub entry: FeedEntry,
    /// Best-effort timestamp, `None` when no field was usable
    pub timestamp: Option<Timestamp>,
}

impl DatedEntry {
    /// Resolve the timestamp of `entry`
    pub fn new(entry: FeedEntry) -> Self {
        let timestamp = resolve_timestamp(&entry).map(|(_, ts)| ts);
        Self { entry, timestamp }
    }
}

/// Sort entries oldest-first
///
/// Undated entries compare as the minimum timestamp. The sort is stable, so
/// entries with equal keys keep their feed order.
pub fn order_entries(entries: Vec<FeedEntry>) -> Vec<DatedEntry> {
    let mut dated: Vec<DatedEntry> = entries.into_iter().map(DatedEntry::new).collect();
    dated.sort_by_key(|e| e.timestamp.map(|ts| ts.sort_key()));

    let undated = dated.iter().filter(|e| e.timestamp.is_none()).count();
    if undated > 0 {
        debug!(undated, "Entries without a usable date sorted first");
    }

    dated
}
