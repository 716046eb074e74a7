//! Arrival Set Builder: one feed request in, one set of ETA minutes out.
//!
//! Nothing in here propagates an error.  A failed request, a body that is
//! not the expected JSON, or an upstream error code all collapse into
//! [`FetchOutcome::Failure`] with an empty set; individual predictions with
//! bad timestamps are dropped and the rest still count.

use core::time::Duration;

use log::{debug, warn};
use serde::Deserialize;

use super::prediction::{RawPrediction, normalize};
use crate::app::ports::FeedPort;
use crate::config::{MAX_INDICATORS, TrackerConfig};
use crate::error::FetchError;

// ---------------------------------------------------------------------------
// EtaSet
// ---------------------------------------------------------------------------

/// Set of distinct ETA minutes in `[0, MAX_INDICATORS)`, as a bitmask.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct EtaSet {
    bits: u32,
}

impl EtaSet {
    pub const fn new() -> Self {
        Self { bits: 0 }
    }

    pub const fn from_bits(bits: u32) -> Self {
        Self { bits }
    }

    pub const fn bits(&self) -> u32 {
        self.bits
    }

    #[inline]
    const fn mask(minute: usize) -> u32 {
        1 << minute
    }

    /// Add `minute`.  Returns `false` if it is outside the mask.
    pub fn insert(&mut self, minute: usize) -> bool {
        if minute >= MAX_INDICATORS {
            return false;
        }
        self.bits |= Self::mask(minute);
        true
    }

    pub fn contains(&self, minute: usize) -> bool {
        minute < MAX_INDICATORS && self.bits & Self::mask(minute) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Members in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_INDICATORS).filter(move |&m| self.contains(m))
    }
}

impl FromIterator<usize> for EtaSet {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut set = Self::new();
        for m in iter {
            set.insert(m);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Feed envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Success,
    Failure,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "errCd", default)]
    err_code: Option<serde_json::Value>,
    #[serde(rename = "errNm", default)]
    err_name: Option<String>,
    #[serde(default)]
    eta: Option<OneOrMany>,
}

/// The feed sends a bare object instead of a one-element list when only
/// one prediction is available.
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<RawPrediction>),
    One(RawPrediction),
}

/// Decode a feed body into its prediction list.
pub fn parse_feed_body(body: &str) -> Result<Vec<RawPrediction>, FetchError> {
    let value: serde_json::Value = serde_json::from_str(body).map_err(|_| FetchError::Decode)?;

    let ctatt = value
        .get("ctatt")
        .filter(|v| v.is_object())
        .ok_or(FetchError::UnexpectedShape)?;
    let envelope = Envelope::deserialize(ctatt).map_err(|_| FetchError::UnexpectedShape)?;

    if let Some(code) = envelope.err_code {
        let code = match code {
            serde_json::Value::String(s) => s,
            serde_json::Value::Null => String::from("0"),
            other => other.to_string(),
        };
        if code.trim() != "0" {
            return Err(FetchError::Api {
                code,
                message: envelope.err_name.unwrap_or_default(),
            });
        }
    }

    Ok(match envelope.eta {
        Some(OneOrMany::Many(list)) => list,
        Some(OneOrMany::One(p)) => vec![p],
        None => Vec::new(),
    })
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Result of one fetch cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrivalSnapshot {
    pub etas: EtaSet,
    pub outcome: FetchOutcome,
    /// Predictions for our destination that could not be displayed
    /// (bad timestamp, negative ETA, or beyond the bank).
    pub dropped: usize,
    /// Set when `outcome` is `Failure`.
    pub error: Option<FetchError>,
}

impl ArrivalSnapshot {
    fn failed(error: FetchError) -> Self {
        Self {
            etas: EtaSet::new(),
            outcome: FetchOutcome::Failure,
            dropped: 0,
            error: Some(error),
        }
    }
}

pub struct ArrivalSetBuilder {
    url: String,
    destination: String,
    indicator_count: usize,
    timeout: Duration,
}

impl ArrivalSetBuilder {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            url: config.feed_url(),
            destination: config.destination_name.clone(),
            indicator_count: config.indicator_count().min(MAX_INDICATORS),
            timeout: Duration::from_millis(u64::from(config.fetch_timeout_ms)),
        }
    }

    /// Request the feed once and reduce it to the set of displayable ETAs.
    pub fn build(&self, feed: &mut impl FeedPort) -> ArrivalSnapshot {
        let predictions = match feed
            .get(&self.url, self.timeout)
            .map_err(FetchError::from)
            .and_then(|body| parse_feed_body(&body))
        {
            Ok(p) => p,
            Err(e) => {
                warn!("Feed: fetch failed: {}", e);
                return ArrivalSnapshot::failed(e);
            }
        };

        let mut etas = EtaSet::new();
        let mut dropped = 0;
        for raw in &predictions {
            match normalize(raw, &self.destination) {
                Ok(Some(arrival)) => {
                    let in_range = usize::try_from(arrival.eta_minutes)
                        .ok()
                        .filter(|&m| m < self.indicator_count);
                    match in_range {
                        Some(m) => {
                            etas.insert(m);
                        }
                        None => {
                            debug!("Feed: ETA {} min outside the bank", arrival.eta_minutes);
                            dropped += 1;
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        "Feed: dropping prediction ({}): arrT={:?} prdt={:?}",
                        e, raw.arrival_time, raw.prediction_time
                    );
                    dropped += 1;
                }
            }
        }

        debug!(
            "Feed: {} predictions, ETAs={:?}, dropped={}",
            predictions.len(),
            etas.iter().collect::<heapless::Vec<usize, MAX_INDICATORS>>(),
            dropped
        );

        ArrivalSnapshot {
            etas,
            outcome: FetchOutcome::Success,
            dropped,
            error: None,
        }
    }
}
