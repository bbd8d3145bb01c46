//! Canonical file names for activities.
//!
//! The same name is used to write a download and to recognise it on the next
//! run, so [`generate_name`] must stay a pure function of its inputs.

use chrono::NaiveDateTime;
use garmin_connect_client::ActivityId;
use thiserror::Error;

/// Title used when an activity has no name.
pub const UNTITLED: &str = "Untitled";

/// Characters removed from titles because common filesystems reject them.
pub const FORBIDDEN_CHARS: [char; 10] = ['\\', '/', ':', '*', '?', '"', '<', '>', '|', '\0'];

const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

// Minute-precision shapes with an offset, which RFC 3339 parsing rejects.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M%:z", "%Y-%m-%d %H:%M%:z"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamingError {
    #[error("cannot parse start time `{0}`")]
    InvalidTimestamp(String),
}

/// Parse a local start time.
///
/// Accepts `YYYY-MM-DDTHH:MM` with optional seconds and fraction, a space
/// instead of `T`, and a trailing `Z` or UTC offset (`+02:00`), with or
/// without seconds. The wall-clock fields are kept as written; offsets are
/// not applied.
pub fn parse_start_time(s: &str) -> Result<NaiveDateTime, NamingError> {
    let trimmed = s.trim();
    let local = trimmed.strip_suffix('Z').unwrap_or(trimmed);
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(local, fmt) {
            return Ok(dt);
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.naive_local());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = chrono::DateTime::parse_from_str(trimmed, fmt) {
            return Ok(dt.naive_local());
        }
    }
    Err(NamingError::InvalidTimestamp(s.to_string()))
}

/// Spaces become underscores, forbidden characters are dropped.
pub fn sanitize_title(title: Option<&str>) -> String {
    title
        .unwrap_or(UNTITLED)
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .map(|c| if c == ' ' { '_' } else { c })
        .collect()
}

/// `YYYY-MM-DD_HH.MM_{id}-{title}`, with no extension.
pub fn generate_name(
    start_time: &str,
    title: Option<&str>,
    id: &ActivityId,
) -> Result<String, NamingError> {
    let start = parse_start_time(start_time)?;
    Ok(format!(
        "{}_{}-{}",
        start.format("%Y-%m-%d_%H.%M"),
        id,
        sanitize_title(title)
    ))
}
