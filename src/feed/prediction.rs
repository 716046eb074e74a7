//! Upstream prediction records and their conversion to arrival minutes.

use serde::{Deserialize, Deserializer};

use super::timestamp::{parse_timestamp, seconds_between};
use crate::error::TimestampError;

/// One entry of the feed's `eta` list, as decoded.
///
/// Only the fields the tracker consumes are kept.  Missing fields decode to
/// empty defaults; an empty timestamp then fails to parse for this entry
/// alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RawPrediction {
    #[serde(rename = "destNm", default)]
    pub destination: String,
    #[serde(rename = "isApp", default, deserialize_with = "de_flag")]
    pub approaching: bool,
    #[serde(rename = "isSch", default, deserialize_with = "de_flag")]
    pub scheduled: bool,
    /// Predicted arrival time.
    #[serde(rename = "arrT", default)]
    pub arrival_time: String,
    /// Time the prediction was generated.
    #[serde(rename = "prdt", default)]
    pub prediction_time: String,
}

/// A displayable estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    /// Whole minutes until arrival (floor).  May be negative for a stale
    /// prediction; the builder drops those.
    pub eta_minutes: i64,
    pub approaching: bool,
}

/// Convert one record into an arrival estimate.
///
/// - destination mismatch → `Ok(None)`
/// - approaching and not scheduled → ETA 0, timestamps are not read
/// - otherwise floor((arrT - prdt) / 60)
pub fn normalize(raw: &RawPrediction, destination: &str) -> Result<Option<Arrival>, TimestampError> {
    if raw.destination != destination {
        return Ok(None);
    }

    if raw.approaching && !raw.scheduled {
        return Ok(Some(Arrival {
            eta_minutes: 0,
            approaching: true,
        }));
    }

    let arrival = parse_timestamp(&raw.arrival_time)?;
    let predicted = parse_timestamp(&raw.prediction_time)?;
    let secs = seconds_between(&arrival, &predicted);

    Ok(Some(Arrival {
        eta_minutes: secs.div_euclid(60),
        approaching: raw.approaching,
    }))
}

/// Feed flags are the strings `"1"` / `"0"`.  Numbers and booleans are
/// tolerated; anything else reads as false.
fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Text(String),
        Number(i64),
        Bool(bool),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Text(s)) => s.trim() == "1",
        Some(Flag::Number(n)) => n == 1,
        Some(Flag::Bool(b)) => b,
        None => false,
    })
}
