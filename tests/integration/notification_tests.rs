//! Integration tests for the button → latch → alert melody path.

use std::sync::Arc;
use std::time::Duration;

use train_tracker::app::events::AppEvent;
use train_tracker::app::ports::FeedPort;
use train_tracker::app::service::TrackerService;
use train_tracker::error::{ResetCause, TransportError};
use train_tracker::events::{ButtonEdge, EdgeQueue};
use train_tracker::melody::{ARM_CUE, DISARM_CUE};

use crate::mock_hw::{HwCall, MockFeed, MockHardware, MockPlatform, RecordingSink, feed_body, test_config};

fn setup() -> (TrackerService, MockHardware, RecordingSink) {
    let config = test_config();
    (
        TrackerService::new(&config),
        MockHardware::new(config.indicator_count()),
        RecordingSink::new(),
    )
}

#[test]
fn armed_alert_plays_when_the_trigger_minute_lights() {
    let (mut svc, mut hw, mut sink) = setup();
    // Press at 1 s, release at 1.3 s; hold from 20 s until the reset fires.
    let mut platform = MockPlatform::new().press(1_000, 300).press(20_000, 10_000);
    let mut feed = MockFeed::always(feed_body(&[]))
        .then(Ok(feed_body(&[]))) // t = 0
        .then(Ok(feed_body(&[320]))); // t = 15 s: five minutes out
    let edges = platform.edges.clone();

    let cause = svc.run(&mut hw, &mut feed, &mut platform, &mut sink, &edges);

    assert_eq!(cause, ResetCause::LongPress);
    let melody = test_config().notification_melody.to_vec();
    assert_eq!(hw.melodies(), vec![ARM_CUE.to_vec(), melody]);
    assert!(sink.contains(&AppEvent::NotificationArmed));
    assert!(sink.contains(&AppEvent::NotificationFired(5)));
    assert!(!svc.notifier().is_armed());
}

#[test]
fn long_press_resets_while_still_held() {
    let (mut svc, mut hw, mut sink) = setup();
    let mut platform = MockPlatform::new().press(1_000, 60_000);
    let mut feed = MockFeed::always(feed_body(&[]));
    let edges = platform.edges.clone();

    let cause = svc.run(&mut hw, &mut feed, &mut platform, &mut sink, &edges);

    assert_eq!(cause, ResetCause::LongPress);
    // Edge settles at 1.05 s; the countdown runs from the press edge.
    assert!(platform.now_ms >= 4_000);
    assert!(platform.now_ms < 4_200);
    assert!(hw.melodies().is_empty(), "a long press never toggles the latch");
}

#[test]
fn two_short_presses_arm_then_disarm() {
    let (mut svc, mut hw, mut sink) = setup();
    let mut platform = MockPlatform::new()
        .press(1_000, 200)
        .press(3_000, 200)
        .press(6_000, 5_000);
    let mut feed = MockFeed::always(feed_body(&[]));
    let edges = platform.edges.clone();

    svc.run(&mut hw, &mut feed, &mut platform, &mut sink, &edges);

    assert_eq!(hw.melodies(), vec![ARM_CUE.to_vec(), DISARM_CUE.to_vec()]);
    // Each cue is preceded by silencing whatever was playing.
    assert_eq!(hw.count(&HwCall::AudioOff), 2);
    let latch: Vec<&AppEvent> = sink
        .events
        .iter()
        .filter(|e| matches!(e, AppEvent::NotificationArmed | AppEvent::NotificationDisarmed))
        .collect();
    assert_eq!(latch, vec![&AppEvent::NotificationArmed, &AppEvent::NotificationDisarmed]);
}

#[test]
fn tap_shorter_than_debounce_is_ignored() {
    let (mut svc, mut hw, mut sink) = setup();
    let mut platform = MockPlatform::new().press(1_000, 20).press(5_000, 4_000);
    let mut feed = MockFeed::always(feed_body(&[]));
    let edges = platform.edges.clone();

    svc.run(&mut hw, &mut feed, &mut platform, &mut sink, &edges);

    assert!(hw.melodies().is_empty());
    assert!(!sink.contains(&AppEvent::NotificationArmed));
}

#[test]
fn tap_released_before_the_next_slice_still_arms() {
    let (mut svc, mut hw, mut sink) = setup();
    // 70 ms: past the debounce window, but the release lands before the
    // slice that would have accepted the press on its own.
    let mut platform = MockPlatform::new().press(1_010, 70).press(20_000, 10_000);
    let mut feed = MockFeed::always(feed_body(&[]));
    let edges = platform.edges.clone();

    let cause = svc.run(&mut hw, &mut feed, &mut platform, &mut sink, &edges);

    assert_eq!(cause, ResetCause::LongPress);
    assert_eq!(hw.melodies(), vec![ARM_CUE.to_vec()]);
    assert!(sink.contains(&AppEvent::NotificationArmed));
    assert!(svc.notifier().is_armed());
}

/// Feed whose second request takes long enough for a whole tap to happen
/// while it is in flight.
struct SlowFeed {
    edges: Arc<EdgeQueue>,
    requests: u32,
}

impl FeedPort for SlowFeed {
    fn get(&mut self, _url: &str, _timeout: Duration) -> Result<String, TransportError> {
        self.requests += 1;
        if self.requests == 2 {
            // The virtual clock stands still inside get(), so these stamps
            // are ahead of it, as they would be after a real slow request.
            self.edges.push(ButtonEdge::Pressed, 15_100);
            self.edges.push(ButtonEdge::Released, 15_400);
        }
        Ok(feed_body(&[]))
    }
}

#[test]
fn tap_during_a_slow_fetch_still_arms() {
    let (mut svc, mut hw, mut sink) = setup();
    let mut platform = MockPlatform::new().press(40_000, 10_000);
    let edges = platform.edges.clone();
    let mut feed = SlowFeed {
        edges: edges.clone(),
        requests: 0,
    };

    let cause = svc.run(&mut hw, &mut feed, &mut platform, &mut sink, &edges);

    assert_eq!(cause, ResetCause::LongPress);
    assert!(feed.requests >= 3);
    assert_eq!(hw.melodies(), vec![ARM_CUE.to_vec()]);
    assert!(sink.contains(&AppEvent::NotificationArmed));
}

#[test]
fn unarmed_latch_stays_silent() {
    let (mut svc, mut hw, mut sink) = setup();
    let mut platform = MockPlatform::new();
    let mut feed = MockFeed::always(feed_body(&[320]));

    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();

    assert!(report.activated.contains(5));
    assert!(!report.notified);
    assert!(hw.melodies().is_empty());
}

#[test]
fn alert_fires_only_on_activation() {
    let (mut svc, mut hw, mut sink) = setup();
    let mut platform = MockPlatform::new();
    let mut feed = MockFeed::always(feed_body(&[320]))
        .then(Ok(feed_body(&[320])))
        .then(Ok(feed_body(&[320])))
        .then(Ok(feed_body(&[])));

    // Slot 5 is already lit when the latch is armed.
    svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    svc.notifier().toggle(&mut hw);
    hw.clear();

    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert!(!report.notified);
    assert!(svc.notifier().is_armed());

    // Goes dark, then lights again: that is an activation.
    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert!(report.etas.is_empty());
    let report = svc.run_cycle(&mut hw, &mut feed, &mut platform, &mut sink).unwrap();
    assert!(report.notified);
    assert!(!svc.notifier().is_armed());
    assert_eq!(hw.melodies().len(), 1);
}
