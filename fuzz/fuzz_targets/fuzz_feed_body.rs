//! Fuzz target: feed body decoding and the arrival set builder.
//!
//! Drives arbitrary bodies through `parse_feed_body` and the full builder
//! and asserts that neither panics and that the builder never reports a
//! minute outside the bank.
//!
//! cargo fuzz run fuzz_feed_body

#![no_main]

use core::time::Duration;

use libfuzzer_sys::fuzz_target;
use train_tracker::app::ports::FeedPort;
use train_tracker::config::TrackerConfig;
use train_tracker::error::TransportError;
use train_tracker::feed::{ArrivalSetBuilder, FetchOutcome, parse_feed_body};

struct Body(String);

impl FeedPort for Body {
    fn get(&mut self, _url: &str, _timeout: Duration) -> Result<String, TransportError> {
        Ok(self.0.clone())
    }
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    let _ = parse_feed_body(text);

    let config = TrackerConfig::default();
    let snapshot = ArrivalSetBuilder::new(&config).build(&mut Body(text.to_owned()));
    assert!(snapshot.etas.iter().all(|m| m < config.indicator_count()));
    if snapshot.outcome == FetchOutcome::Failure {
        assert!(snapshot.etas.is_empty(), "failed fetch must show nothing");
        assert!(snapshot.error.is_some());
    }
});
