//! Integration tests for the fetch → display → health pipeline.

use std::time::Duration;

use train_tracker::app::events::AppEvent;
use train_tracker::app::ports::MemoryUsage;
use train_tracker::app::service::TrackerService;
use train_tracker::drivers::led_patterns::{FAILURE_BLINK, HEARTBEAT, SLOW_PULSE};
use train_tracker::error::{FetchError, ResetCause, TransportError};
use train_tracker::feed::{EtaSet, FetchOutcome};

use crate::mock_hw::{
    HwCall, MockFeed, MockHardware, MockPlatform, RecordingSink, feed_body, feed_body_for,
    test_config,
};

fn setup() -> (TrackerService, MockHardware, MockPlatform, RecordingSink) {
    let config = test_config();
    (
        TrackerService::new(&config),
        MockHardware::new(config.indicator_count()),
        MockPlatform::new(),
        RecordingSink::new(),
    )
}

fn etas(minutes: &[usize]) -> EtaSet {
    minutes.iter().copied().collect()
}

#[test]
fn cycle_requests_the_configured_feed() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::always(feed_body(&[]));

    svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();

    let (url, timeout) = &feed.requests[0];
    assert_eq!(url, &test_config().feed_url());
    assert_eq!(*timeout, Duration::from_millis(10_000));
}

#[test]
fn predictions_light_their_minutes() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::always(feed_body(&[150, 560]));

    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();

    assert_eq!(report.outcome, FetchOutcome::Success);
    assert_eq!(report.etas, etas(&[2, 9]));
    assert_eq!(report.activated, etas(&[2, 9]));
    assert_eq!(hw.calls, vec![HwCall::On(2), HwCall::On(9)]);
    assert!(sink.contains(&AppEvent::SlotActivated(2)));
    assert!(sink.contains(&AppEvent::FetchCompleted {
        outcome: FetchOutcome::Success,
        etas: etas(&[2, 9]),
        dropped: 0,
    }));
}

#[test]
fn arriving_train_pulses_slot_zero() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::always(feed_body(&[30]));

    svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();

    assert_eq!(hw.calls, vec![HwCall::Animate(0, SLOW_PULSE, false)]);
}

#[test]
fn lit_slots_are_left_alone_and_stale_ones_go_dark() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::always(feed_body(&[150, 200]))
        .then(Ok(feed_body(&[150, 400])))
        .then(Ok(feed_body(&[150, 400])));

    svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    hw.clear();

    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert!(report.activated.is_empty());
    assert!(hw.calls.is_empty());

    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert_eq!(report.activated, etas(&[3]));
    assert_eq!(hw.calls, vec![HwCall::On(3), HwCall::Off(6)]);
    assert_eq!(svc.display().active(), etas(&[2, 3]));
}

#[test]
fn other_destinations_and_out_of_range_are_ignored() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let body = feed_body_for("95th/Dan Ryan", &[120]);
    let mut feed = MockFeed::always(body);

    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert!(report.etas.is_empty());

    let mut feed = MockFeed::always(feed_body(&[-120, 15 * 60]));
    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert!(report.etas.is_empty());
    assert!(sink.contains(&AppEvent::FetchCompleted {
        outcome: FetchOutcome::Success,
        etas: EtaSet::new(),
        dropped: 2,
    }));
}

#[test]
fn empty_success_gives_a_heartbeat() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::always(feed_body(&[]));

    svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();

    assert_eq!(hw.animations_on(0), vec![HEARTBEAT]);
}

#[test]
fn failure_clears_the_display_and_blinks_the_status_slot() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::failing().then(Ok(feed_body(&[300])));

    svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    hw.clear();
    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();

    assert_eq!(report.outcome, FetchOutcome::Failure);
    // A failed fetch yields an empty set, so the lit slot goes dark.
    assert_eq!(hw.calls, vec![HwCall::Off(5), HwCall::Animate(0, FAILURE_BLINK, false)]);
    assert!(sink.contains(&AppEvent::HealthDegraded { consecutive_errors: 1 }));
}

#[test]
fn body_without_the_envelope_is_an_unexpected_shape() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::always(r#"{"foo":1}"#.to_owned()).then(Ok(feed_body(&[130, 400])));

    let lit = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert_eq!(lit.etas.iter().collect::<Vec<_>>(), vec![2, 6]);
    hw.clear();

    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();

    assert_eq!(report.outcome, FetchOutcome::Failure);
    assert_eq!(report.error, Some(FetchError::UnexpectedShape));
    assert!(report.etas.is_empty());
    assert_eq!(svc.consecutive_errors(), 1);
    assert_eq!(hw.count(&HwCall::Off(2)), 1);
    assert_eq!(hw.count(&HwCall::Off(6)), 1);
    assert_eq!(hw.count(&HwCall::On(2)) + hw.count(&HwCall::On(6)), 0);
}

#[test]
fn upstream_error_code_counts_as_failure() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let body = r#"{"ctatt":{"tmst":"2024-05-01T12:00:00","errCd":"101","errNm":"Invalid API key"}}"#;
    let mut feed = MockFeed::always(body.to_owned());

    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert_eq!(report.outcome, FetchOutcome::Failure);
    assert_eq!(svc.consecutive_errors(), 1);
}

#[test]
fn error_budget_ends_the_run() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::failing();

    for _ in 0..9 {
        assert!(svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).is_ok());
    }
    assert_eq!(
        svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink),
        Err(ResetCause::TooManyConsecutiveErrors(10))
    );
}

#[test]
fn success_resets_the_error_budget() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::failing();
    for _ in 0..9 {
        svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    }
    let mut good = MockFeed::always(feed_body(&[]));
    svc.run_cycle(&mut hw, &mut good, &mut platform, &mut sink).unwrap();
    assert_eq!(svc.consecutive_errors(), 0);
    for _ in 0..9 {
        assert!(svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).is_ok());
    }
}

#[test]
fn scheduled_reset_fires_before_fetching() {
    let (mut svc, mut hw, _, mut sink) = setup();
    let mut platform = MockPlatform::new();
    platform.hour = Some(3);
    platform.now_ms = 2 * 3_600_000;
    let mut feed = MockFeed::always(feed_body(&[]));

    assert_eq!(
        svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink),
        Err(ResetCause::ScheduledReset)
    );
    assert!(feed.requests.is_empty());
}

#[test]
fn scheduled_reset_waits_for_minimum_uptime() {
    let (mut svc, mut hw, _, mut sink) = setup();
    let mut platform = MockPlatform::new();
    platform.hour = Some(3);
    platform.now_ms = 60_000;
    let mut feed = MockFeed::always(feed_body(&[]));

    assert!(svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).is_ok());
}

#[test]
fn unsynced_clock_never_resets() {
    let (mut svc, mut hw, _, mut sink) = setup();
    let mut platform = MockPlatform::new();
    platform.hour = None;
    platform.now_ms = 48 * 3_600_000;
    let mut feed = MockFeed::always(feed_body(&[]));

    assert!(svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).is_ok());
}

#[test]
fn heap_pressure_releases_feed_buffers() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    platform.memory = Some(MemoryUsage {
        used_bytes: 270_000,
        total_bytes: 300_000,
    });
    let mut feed = MockFeed::always(feed_body(&[]));

    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();

    assert_eq!(report.reclaimed, Some(4096));
    assert_eq!(feed.releases, 1);
    assert!(sink.contains(&AppEvent::MemoryReclaimed {
        percent_used: 90,
        released_bytes: 4096,
    }));
}

#[test]
fn normal_heap_is_left_alone() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::always(feed_body(&[]));

    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert_eq!(report.reclaimed, None);
    assert_eq!(feed.releases, 0);
}

#[test]
fn cycle_feeds_the_watchdog() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::failing();
    svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert_eq!(platform.feeds, 1);
}

// ── Full loop ─────────────────────────────────────────────────

#[test]
fn run_polls_on_the_interval_until_the_budget_is_spent() {
    let (mut svc, mut hw, mut platform, mut sink) = setup();
    let mut feed = MockFeed::failing();
    let edges = platform.edges.clone();

    let cause = svc.run(&mut hw, &mut feed, &mut platform, &mut sink, &edges);

    assert_eq!(cause, ResetCause::TooManyConsecutiveErrors(10));
    assert_eq!(svc.cycle_count(), 10);
    assert_eq!(feed.requests.len(), 10);
    // First cycle at t=0, the tenth 9 intervals later.
    assert_eq!(platform.now_ms, 9 * 15_000);
    // One feed per 50 ms slice plus one per cycle.
    assert!(platform.feeds >= (9 * 15_000 / 50) as u32);

    assert_eq!(
        sink.events.first(),
        Some(&AppEvent::Started {
            station_id: "40380".into(),
            destination: "Loop".into(),
        })
    );
    assert_eq!(
        sink.events.last(),
        Some(&AppEvent::ResetRequested(ResetCause::TooManyConsecutiveErrors(10)))
    );
}

#[test]
fn run_stops_at_the_reset_hour() {
    let (mut svc, mut hw, _, mut sink) = setup();
    let mut platform = MockPlatform::new().hour_at(2 * 3_600_000, 3);
    let mut feed = MockFeed::always(feed_body(&[300]));
    let edges = platform.edges.clone();

    let cause = svc.run(&mut hw, &mut feed, &mut platform, &mut sink, &edges);

    assert_eq!(cause, ResetCause::ScheduledReset);
    assert!(platform.now_ms >= 2 * 3_600_000);
    assert!(platform.now_ms < 2 * 3_600_000 + 15_000);
    // Slot 5 was lit once and never re-commanded.
    assert_eq!(hw.count(&HwCall::On(5)), 1);
}
