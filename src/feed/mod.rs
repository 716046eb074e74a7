//! Transit feed decoding: timestamps, predictions, and the per-cycle
//! arrival set.

pub mod arrivals;
pub mod prediction;
pub mod timestamp;

pub use arrivals::{ArrivalSetBuilder, ArrivalSnapshot, EtaSet, FetchOutcome, parse_feed_body};
pub use prediction::{Arrival, RawPrediction, normalize};
pub use timestamp::{parse_timestamp, seconds_between};
