//! Reset handling.
//!
//! Every way the tracker can stop (startup failure, error budget, daily
//! reset, long press) ends here: log the cause, blink the whole bank so
//! the stop is visible, wait out the grace period while keeping the
//! watchdog fed, then tell the caller how to restart.

use embedded_hal::delay::DelayNs;
use log::{error, info};

use crate::config::TrackerConfig;
use crate::drivers::led_patterns::RESET_BLINK;
use crate::error::{ResetCause, RestartKind};

use super::ports::{AudioPort, IndicatorPort, WatchdogPort};

/// Longest single sleep while waiting out the grace period.
const GRACE_SLICE_MS: u32 = 1_000;

/// Grace period for `cause`; a long press restarts at once.
pub fn grace_period_ms(cause: ResetCause, config: &TrackerConfig) -> u32 {
    match cause {
        ResetCause::LongPress => 0,
        _ => config.reset_grace_secs.saturating_mul(1000),
    }
}

/// Run the reset procedure and decide between a soft and a full restart.
///
/// On [`RestartKind::Soft`] the bank is left dark so a fresh control loop
/// starts from a known state.  On [`RestartKind::Full`] the reset blink is
/// still running; the caller is expected to reboot.
pub fn recover(
    cause: ResetCause,
    config: &TrackerConfig,
    hw: &mut (impl IndicatorPort + AudioPort),
    platform: &mut (impl WatchdogPort + DelayNs),
    wifi_connected: bool,
) -> RestartKind {
    if cause.is_fatal() {
        error!("{}", cause);
    } else {
        info!("{}", cause);
    }

    let grace_ms = grace_period_ms(cause, config);
    info!("Reset in {} seconds...", grace_ms / 1000);

    AudioPort::off(hw);
    for slot in 0..hw.indicator_count() {
        hw.animate(slot, RESET_BLINK, false);
    }

    let mut remaining = grace_ms;
    while remaining > 0 {
        let step = remaining.min(GRACE_SLICE_MS);
        platform.feed();
        platform.delay_ms(step);
        remaining -= step;
    }
    platform.feed();

    let kind = cause.restart_kind(wifi_connected);
    match kind {
        RestartKind::Soft => {
            info!("Restarting control loop");
            for slot in 0..hw.indicator_count() {
                IndicatorPort::off(hw, slot);
            }
        }
        RestartKind::Full => info!("Calling system restart"),
    }
    kind
}
