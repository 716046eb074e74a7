//! Feed timestamp parsing.
//!
//! The feed reports local wall-clock times as `YYYY-MM-DDTHH:MM:SS` with no
//! zone.  Both timestamps of a prediction are in the same zone, so only
//! their difference matters and a naive datetime is enough.

use chrono::NaiveDateTime;

use crate::error::TimestampError;

const FEED_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Parse one feed timestamp.  Surrounding whitespace is ignored; anything
/// else that is not an exact `YYYY-MM-DDTHH:MM:SS` calendar time fails.
pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, TimestampError> {
    NaiveDateTime::parse_from_str(s.trim(), FEED_FORMAT).map_err(|_| TimestampError::Malformed)
}

/// Signed seconds from `earlier` to `later`.
pub fn seconds_between(later: &NaiveDateTime, earlier: &NaiveDateTime) -> i64 {
    later.signed_duration_since(*earlier).num_seconds()
}
