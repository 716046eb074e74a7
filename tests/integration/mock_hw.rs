//! Mock adapters for integration tests.
//!
//! Records every indicator and speaker call so tests can assert on the full
//! command history, serves scripted feed bodies, and runs a virtual clock
//! that only advances when the code under test delays.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use embedded_hal::delay::DelayNs;

use train_tracker::app::events::AppEvent;
use train_tracker::app::ports::{
    AudioPort, ClockPort, EventSink, FeedPort, IndicatorPort, MemoryUsage, SystemPort,
    WatchdogPort,
};
use train_tracker::drivers::led_patterns::Animation;
use train_tracker::error::TransportError;
use train_tracker::events::{ButtonEdge, EdgeQueue};
use train_tracker::melody::Tone;

// ── Output call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum HwCall {
    On(usize),
    Off(usize),
    Animate(usize, Animation, bool),
    Play(Vec<Tone>, bool),
    AudioOff,
}

// ── MockHardware ──────────────────────────────────────────────

pub struct MockHardware {
    pub calls: Vec<HwCall>,
    count: usize,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new(count: usize) -> Self {
        Self {
            calls: Vec::new(),
            count,
        }
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn melodies(&self) -> Vec<Vec<Tone>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Play(tones, _) => Some(tones.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn animations_on(&self, slot: usize) -> Vec<Animation> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Animate(s, a, _) if *s == slot => Some(*a),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, call: &HwCall) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl IndicatorPort for MockHardware {
    fn indicator_count(&self) -> usize {
        self.count
    }

    fn on(&mut self, slot: usize) {
        self.calls.push(HwCall::On(slot));
    }

    fn off(&mut self, slot: usize) {
        self.calls.push(HwCall::Off(slot));
    }

    fn animate(&mut self, slot: usize, animation: Animation, blocking: bool) {
        self.calls.push(HwCall::Animate(slot, animation, blocking));
    }

    fn is_active(&self, slot: usize) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                HwCall::On(s) | HwCall::Animate(s, _, _) if *s == slot => Some(true),
                HwCall::Off(s) if *s == slot => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }
}

impl AudioPort for MockHardware {
    fn play(&mut self, tones: &[Tone], blocking: bool) {
        self.calls.push(HwCall::Play(tones.to_vec(), blocking));
    }

    fn off(&mut self) {
        self.calls.push(HwCall::AudioOff);
    }
}

// ── MockFeed ──────────────────────────────────────────────────

/// Serves queued responses in order, then `fallback` forever.
pub struct MockFeed {
    pub responses: VecDeque<Result<String, TransportError>>,
    pub fallback: Result<String, TransportError>,
    pub requests: Vec<(String, Duration)>,
    pub releases: usize,
    pub release_bytes: usize,
}

#[allow(dead_code)]
impl MockFeed {
    pub fn failing() -> Self {
        Self {
            responses: VecDeque::new(),
            fallback: Err(TransportError::Timeout),
            requests: Vec::new(),
            releases: 0,
            release_bytes: 4096,
        }
    }

    pub fn always(body: String) -> Self {
        Self {
            fallback: Ok(body),
            ..Self::failing()
        }
    }

    pub fn then(mut self, response: Result<String, TransportError>) -> Self {
        self.responses.push_back(response);
        self
    }
}

impl FeedPort for MockFeed {
    fn get(&mut self, url: &str, timeout: Duration) -> Result<String, TransportError> {
        self.requests.push((url.to_owned(), timeout));
        self.responses
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone())
    }

    fn release_buffers(&mut self) -> usize {
        self.releases += 1;
        self.release_bytes
    }
}

// ── Feed bodies ───────────────────────────────────────────────

pub const PREDICTION_TIME: &str = "2024-05-01T12:00:00";

/// A feed body with one `Loop`-bound prediction per entry, arriving that
/// many seconds after the prediction time.
pub fn feed_body(arrivals_secs: &[i64]) -> String {
    feed_body_for("Loop", arrivals_secs)
}

pub fn feed_body_for(destination: &str, arrivals_secs: &[i64]) -> String {
    let base = NaiveDateTime::parse_from_str(PREDICTION_TIME, "%Y-%m-%dT%H:%M:%S").unwrap();
    let etas: Vec<String> = arrivals_secs
        .iter()
        .map(|secs| {
            let arr = base + chrono::Duration::seconds(*secs);
            format!(
                r#"{{"destNm":"{}","prdt":"{}","arrT":"{}","isApp":"0","isSch":"0"}}"#,
                destination,
                PREDICTION_TIME,
                arr.format("%Y-%m-%dT%H:%M:%S")
            )
        })
        .collect();
    format!(
        r#"{{"ctatt":{{"tmst":"{}","errCd":"0","errNm":null,"eta":[{}]}}}}"#,
        PREDICTION_TIME,
        etas.join(",")
    )
}

// ── MockPlatform ──────────────────────────────────────────────

/// Virtual clock, watchdog counter, heap probe, and button script.
pub struct MockPlatform {
    pub now_ms: u64,
    /// Hour reported by the wall clock.
    pub hour: Option<u8>,
    /// From this uptime on, the wall clock reports `late_hour` instead.
    pub hour_change: Option<(u64, u8)>,
    pub feeds: u32,
    pub memory: Option<MemoryUsage>,
    pub delayed_ms: u64,
    /// Edges pushed into `edges` once the clock reaches their time.
    pub script: VecDeque<(u64, ButtonEdge)>,
    pub edges: Arc<EdgeQueue>,
    sub_ms_ns: u64,
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn new() -> Self {
        Self {
            now_ms: 0,
            hour: Some(12),
            hour_change: None,
            feeds: 0,
            memory: Some(MemoryUsage {
                used_bytes: 100_000,
                total_bytes: 300_000,
            }),
            delayed_ms: 0,
            script: VecDeque::new(),
            edges: Arc::new(EdgeQueue::new()),
            sub_ms_ns: 0,
        }
    }

    /// Queue a press at `at_ms` held for `held_ms`.
    pub fn press(mut self, at_ms: u64, held_ms: u64) -> Self {
        self.script.push_back((at_ms, ButtonEdge::Pressed));
        self.script.push_back((at_ms + held_ms, ButtonEdge::Released));
        self
    }

    /// Switch the wall clock to `hour` once uptime reaches `at_ms`.
    pub fn hour_at(mut self, at_ms: u64, hour: u8) -> Self {
        self.hour_change = Some((at_ms, hour));
        self
    }

    fn advance(&mut self, ms: u64) {
        self.now_ms += ms;
        self.delayed_ms += ms;
        while let Some(&(at, edge)) = self.script.front() {
            if at > self.now_ms {
                break;
            }
            self.edges.push(edge, at as u32);
            self.script.pop_front();
        }
    }
}

impl ClockPort for MockPlatform {
    fn uptime_ms(&self) -> u64 {
        self.now_ms
    }

    fn local_hour(&self) -> Option<u8> {
        match self.hour_change {
            Some((at, hour)) if self.now_ms >= at => Some(hour),
            _ => self.hour,
        }
    }
}

impl WatchdogPort for MockPlatform {
    fn feed(&mut self) {
        self.feeds += 1;
    }
}

impl SystemPort for MockPlatform {
    fn memory_usage(&self) -> Option<MemoryUsage> {
        self.memory
    }
}

impl DelayNs for MockPlatform {
    fn delay_ns(&mut self, ns: u32) {
        self.sub_ms_ns += u64::from(ns);
        let ms = self.sub_ms_ns / 1_000_000;
        self.sub_ms_ns %= 1_000_000;
        if ms > 0 {
            self.advance(ms);
        }
    }

    fn delay_ms(&mut self, ms: u32) {
        self.advance(u64::from(ms));
    }
}

// ── RecordingSink ─────────────────────────────────────────────

pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Config ────────────────────────────────────────────────────

/// Defaults with a fixed station and destination, independent of any
/// local build-time overrides.
pub fn test_config() -> train_tracker::config::TrackerConfig {
    let mut config = train_tracker::config::TrackerConfig::default();
    config.station_id = "40380".into();
    config.destination_name = "Loop".into();
    config.api_key = "testkey".into();
    config
}
