//! Fuzz target: `parse_timestamp`
//!
//! Any string that parses must format back to the same instant.
//!
//! cargo fuzz run fuzz_timestamp

#![no_main]

use libfuzzer_sys::fuzz_target;
use train_tracker::feed::{parse_timestamp, seconds_between};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = core::str::from_utf8(data) else {
        return;
    };
    if let Ok(t) = parse_timestamp(text) {
        let again = parse_timestamp(&t.format("%Y-%m-%dT%H:%M:%S").to_string())
            .expect("formatted timestamp must parse");
        assert_eq!(seconds_between(&t, &again), 0);
    }
});
