//! Integration tests for the reset procedure.

use train_tracker::app::recovery::{grace_period_ms, recover};
use train_tracker::drivers::led_patterns::RESET_BLINK;
use train_tracker::error::{ConnectivityError, ResetCause, RestartKind};

use crate::mock_hw::{HwCall, MockHardware, MockPlatform, test_config};

fn run(cause: ResetCause, wifi_connected: bool) -> (RestartKind, MockHardware, MockPlatform) {
    let config = test_config();
    let mut hw = MockHardware::new(config.indicator_count());
    let mut platform = MockPlatform::new();
    let kind = recover(cause, &config, &mut hw, &mut platform, wifi_connected);
    (kind, hw, platform)
}

#[test]
fn error_budget_with_network_up_restarts_softly() {
    let (kind, hw, platform) = run(ResetCause::TooManyConsecutiveErrors(10), true);

    assert_eq!(kind, RestartKind::Soft);
    assert_eq!(platform.delayed_ms, 30_000);
    assert!(platform.feeds >= 30, "watchdog fed through the grace period");
    // Bank blinked, then left dark for the new loop.
    for slot in 0..10 {
        assert_eq!(hw.count(&HwCall::Animate(slot, RESET_BLINK, false)), 1);
        assert_eq!(hw.count(&HwCall::Off(slot)), 1);
    }
}

#[test]
fn error_budget_with_network_down_reboots() {
    let (kind, hw, _) = run(ResetCause::TooManyConsecutiveErrors(10), false);
    assert_eq!(kind, RestartKind::Full);
    assert_eq!(hw.count(&HwCall::Off(0)), 0);
}

#[test]
fn scheduled_reset_reboots_after_grace() {
    let (kind, hw, platform) = run(ResetCause::ScheduledReset, true);
    assert_eq!(kind, RestartKind::Full);
    assert_eq!(platform.delayed_ms, 30_000);
    assert_eq!(hw.calls.first(), Some(&HwCall::AudioOff));
}

#[test]
fn long_press_reboots_at_once() {
    let (kind, hw, platform) = run(ResetCause::LongPress, true);
    assert_eq!(kind, RestartKind::Full);
    assert_eq!(platform.delayed_ms, 0);
    assert_eq!(hw.animations_on(9), vec![RESET_BLINK]);
}

#[test]
fn startup_failures_reboot() {
    for cause in [
        ResetCause::ConnectionFailed(ConnectivityError::Timeout),
        ResetCause::TimeSyncFailed,
        ResetCause::Init("button ISR"),
    ] {
        let (kind, _, platform) = run(cause, false);
        assert_eq!(kind, RestartKind::Full, "{cause}");
        assert_eq!(platform.delayed_ms, 30_000);
    }
}

#[test]
fn grace_period_follows_config() {
    let mut config = test_config();
    config.reset_grace_secs = 5;
    assert_eq!(grace_period_ms(ResetCause::ScheduledReset, &config), 5_000);
    assert_eq!(grace_period_ms(ResetCause::LongPress, &config), 0);
}
