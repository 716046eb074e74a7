//! Application service, the hexagonal core.
//!
//! [`TrackerService`] owns the arrival builder, display controller, health
//! supervisor, and notification latch.  All I/O flows through port traits
//! injected at call sites, making the whole loop testable with mock
//! adapters.
//!
//! ```text
//!    FeedPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!                 │      TrackerService       │
//! IndicatorPort ◀─│ Arrivals · Display ·      │◀── EdgeQueue (button)
//!   AudioPort  ◀──│ Notify · Health           │◀── Clock / Watchdog
//!                 └──────────────────────────┘
//! ```

use embedded_hal::delay::DelayNs;
use log::{info, warn};

use crate::config::TrackerConfig;
use crate::display::DisplayController;
use crate::drivers::button::ButtonDriver;
use crate::error::{FetchError, ResetCause};
use crate::events::{ButtonEdge, EdgeQueue};
use crate::feed::{ArrivalSetBuilder, EtaSet, FetchOutcome};
use crate::health::HealthSupervisor;
use crate::melody::Melody;
use crate::notify::{ButtonOutcome, NotificationScheduler};

use super::events::AppEvent;
use super::ports::{AudioPort, ClockPort, EventSink, FeedPort, IndicatorPort, SystemPort, WatchdogPort};

/// What one fetch cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: FetchOutcome,
    pub etas: EtaSet,
    /// Slots that went dark → lit this cycle.
    pub activated: EtaSet,
    /// The alert melody was started.
    pub notified: bool,
    /// Bytes released by a memory reclaim, if one ran.
    pub reclaimed: Option<usize>,
    /// Why the fetch failed, for a `Failure` outcome.
    pub error: Option<FetchError>,
}

// ───────────────────────────────────────────────────────────────
// TrackerService
// ───────────────────────────────────────────────────────────────

pub struct TrackerService {
    builder: ArrivalSetBuilder,
    display: DisplayController,
    health: HealthSupervisor,
    notifier: NotificationScheduler,
    button: ButtonDriver,
    melody: Melody,
    notify_slot: usize,
    poll_interval_ms: u64,
    button_poll_ms: u32,
    station_id: String,
    destination: String,
    cycle_count: u64,
}

impl TrackerService {
    /// Build the loop from a validated configuration.
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            builder: ArrivalSetBuilder::new(config),
            display: DisplayController::new(config.indicator_count(), config.status_slot),
            health: HealthSupervisor::new(config),
            notifier: NotificationScheduler::new(config.long_press_ms),
            button: ButtonDriver::new(config.debounce_ms),
            melody: config.notification_melody.clone(),
            notify_slot: usize::from(config.notify_minutes_out),
            poll_interval_ms: u64::from(config.poll_interval_secs) * 1000,
            button_poll_ms: config.button_poll_ms,
            station_id: config.station_id.clone(),
            destination: config.destination_name.clone(),
            cycle_count: 0,
        }
    }

    // ── Per-cycle orchestration ───────────────────────────────

    /// One fetch cycle: schedule check → fetch → health → display →
    /// notification → watchdog → memory.
    ///
    /// `hw` satisfies both [`IndicatorPort`] and [`AudioPort`], and
    /// `platform` bundles the clock, watchdog, and heap probes, to avoid
    /// double mutable borrows of one board adapter.
    pub fn run_cycle(
        &mut self,
        hw: &mut (impl IndicatorPort + AudioPort),
        feed: &mut impl FeedPort,
        platform: &mut (impl ClockPort + WatchdogPort + SystemPort),
        sink: &mut impl EventSink,
    ) -> Result<CycleReport, ResetCause> {
        self.cycle_count += 1;

        // 1. Daily reset
        self.health
            .check_schedule(platform.local_hour(), platform.uptime_ms())?;

        // 2. Fetch and build the arrival set
        let snapshot = self.builder.build(feed);
        sink.emit(&AppEvent::FetchCompleted {
            outcome: snapshot.outcome,
            etas: snapshot.etas,
            dropped: snapshot.dropped,
        });

        // 3. Error budget
        self.health.record(snapshot.outcome)?;
        if snapshot.outcome == FetchOutcome::Failure {
            sink.emit(&AppEvent::HealthDegraded {
                consecutive_errors: self.health.consecutive_errors(),
            });
        }

        // 4. Display
        let activated = self.display.reconcile(&snapshot.etas, snapshot.outcome, hw);
        for slot in activated.iter() {
            sink.emit(&AppEvent::SlotActivated(slot));
        }

        // 5. Notification (edge-triggered on the trigger slot)
        let notified = activated.contains(self.notify_slot)
            && self.notifier.fire_if_armed(&self.melody, hw);
        if notified {
            sink.emit(&AppEvent::NotificationFired(self.notify_slot));
        }

        // 6. Watchdog
        platform.feed();

        // 7. Heap pressure
        let mut reclaimed = None;
        if let Some(usage) = platform.memory_usage() {
            if self.health.needs_reclaim(usage) {
                let released = feed.release_buffers();
                info!(
                    "Memory: {}% used, released {} bytes",
                    usage.percent_used(),
                    released
                );
                sink.emit(&AppEvent::MemoryReclaimed {
                    percent_used: usage.percent_used(),
                    released_bytes: released,
                });
                reclaimed = Some(released);
            }
        }

        Ok(CycleReport {
            outcome: snapshot.outcome,
            etas: snapshot.etas,
            activated,
            notified,
            reclaimed,
            error: snapshot.error,
        })
    }

    /// Drive the loop until something asks for a reset.
    ///
    /// Time advances in `button_poll_ms` slices.  Every slice handles all
    /// settled button edges, checks the long-press countdown, and feeds the
    /// watchdog; a fetch cycle runs whenever the poll interval has elapsed
    /// since the previous cycle started.
    pub fn run(
        &mut self,
        hw: &mut (impl IndicatorPort + AudioPort),
        feed: &mut impl FeedPort,
        platform: &mut (impl ClockPort + WatchdogPort + SystemPort + DelayNs),
        sink: &mut impl EventSink,
        edges: &EdgeQueue,
    ) -> ResetCause {
        info!(
            "Tracker: station {} → '{}', polling every {} ms",
            self.station_id, self.destination, self.poll_interval_ms
        );
        sink.emit(&AppEvent::Started {
            station_id: self.station_id.clone(),
            destination: self.destination.clone(),
        });

        let mut next_cycle_ms = platform.uptime_ms();
        let cause = loop {
            let now_ms = platform.uptime_ms();

            if let Err(cause) = self.service_button(hw, sink, edges, now_ms as u32) {
                break cause;
            }
            platform.feed();

            if now_ms >= next_cycle_ms {
                next_cycle_ms = now_ms + self.poll_interval_ms;
                if let Err(cause) = self.run_cycle(hw, feed, platform, sink) {
                    break cause;
                }
            }

            platform.delay_ms(self.button_poll_ms);
        };

        warn!("Tracker: stopping after {} cycles: {}", self.cycle_count, cause);
        sink.emit(&AppEvent::ResetRequested(cause));
        cause
    }

    // ── Button ────────────────────────────────────────────────

    fn service_button(
        &mut self,
        audio: &mut impl AudioPort,
        sink: &mut impl EventSink,
        edges: &EdgeQueue,
        now_ms: u32,
    ) -> Result<(), ResetCause> {
        // A whole tap can settle in one slice after a slow fetch.
        while let Some(record) = self.button.service(edges, now_ms) {
            match record.edge {
                ButtonEdge::Pressed => self.notifier.on_press(record.at_ms),
                ButtonEdge::Released => match self.notifier.on_release(record.at_ms, audio) {
                    ButtonOutcome::Toggled(true) => sink.emit(&AppEvent::NotificationArmed),
                    ButtonOutcome::Toggled(false) => sink.emit(&AppEvent::NotificationDisarmed),
                    ButtonOutcome::LongPressReset => return Err(ResetCause::LongPress),
                    ButtonOutcome::Ignored => {}
                },
            }
        }

        if self.notifier.long_press_expired(now_ms) {
            return Err(ResetCause::LongPress);
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn notifier(&self) -> &NotificationScheduler {
        &self.notifier
    }

    pub fn display(&self) -> &DisplayController {
        &self.display
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.health.consecutive_errors()
    }

    /// Fetch cycles run since construction.
    pub fn cycle_count(&self) -> u64 {
        self.cycle_count
    }
}
