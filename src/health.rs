//! Health supervisor.
//!
//! Watches the control loop from the outside: how many fetches in a row
//! have failed, whether the daily reset hour has come round, and whether
//! the heap is filling up.  It never touches the display; its verdicts are
//! [`ResetCause`]s that the loop hands to `app::recovery`.
//!
//! ## Reset triggers
//!
//! 1. `max_consecutive_errors` failed fetches in a row.
//! 2. Local hour equals `reset_hour` and the device has been up for more
//!    than `reset_min_uptime_secs` (so a reset during the reset hour does
//!    not loop).

use log::{info, warn};

use crate::app::ports::MemoryUsage;
use crate::config::TrackerConfig;
use crate::error::ResetCause;
use crate::feed::FetchOutcome;

pub struct HealthSupervisor {
    max_consecutive_errors: u32,
    reset_hour: u8,
    reset_min_uptime_ms: u64,
    memory_reclaim_percent: u8,
    consecutive_errors: u32,
    /// Last hour seen by `check_schedule`, for transition logging.
    last_reset_check_hour: Option<u8>,
}

impl HealthSupervisor {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            max_consecutive_errors: config.max_consecutive_errors,
            reset_hour: config.reset_hour,
            reset_min_uptime_ms: u64::from(config.reset_min_uptime_secs) * 1000,
            memory_reclaim_percent: config.memory_reclaim_percent,
            consecutive_errors: 0,
            last_reset_check_hour: None,
        }
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Account for one fetch.  Success clears the counter; the failure that
    /// reaches the budget is reported as a reset.
    pub fn record(&mut self, outcome: FetchOutcome) -> Result<(), ResetCause> {
        match outcome {
            FetchOutcome::Success => {
                if self.consecutive_errors > 0 {
                    info!("Health: recovered after {} failed fetches", self.consecutive_errors);
                }
                self.consecutive_errors = 0;
                Ok(())
            }
            FetchOutcome::Failure => {
                self.consecutive_errors = self.consecutive_errors.saturating_add(1);
                warn!(
                    "Health: fetch failed ({}/{})",
                    self.consecutive_errors, self.max_consecutive_errors
                );
                if self.consecutive_errors >= self.max_consecutive_errors {
                    return Err(ResetCause::TooManyConsecutiveErrors(self.consecutive_errors));
                }
                Ok(())
            }
        }
    }

    /// Daily reset check.  `hour` is `None` until the wall clock is synced,
    /// in which case nothing happens.
    pub fn check_schedule(&mut self, hour: Option<u8>, uptime_ms: u64) -> Result<(), ResetCause> {
        let Some(hour) = hour else {
            return Ok(());
        };

        if self.last_reset_check_hour != Some(hour) {
            info!("Health: local hour is now {:02}", hour);
            self.last_reset_check_hour = Some(hour);
        }

        if hour == self.reset_hour && uptime_ms > self.reset_min_uptime_ms {
            return Err(ResetCause::ScheduledReset);
        }
        Ok(())
    }

    /// True when heap usage is strictly above the reclaim threshold.
    /// Compared on bytes, so 80.5% exceeds an 80% threshold.
    pub fn needs_reclaim(&self, usage: MemoryUsage) -> bool {
        if usage.total_bytes == 0 {
            return false;
        }
        let used = (usage.used_bytes.min(usage.total_bytes) as u64).saturating_mul(100);
        let limit = (usage.total_bytes as u64).saturating_mul(u64::from(self.memory_reclaim_percent));
        used > limit
    }
}
