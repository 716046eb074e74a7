//! Outbound application events.
//!
//! The [`TrackerService`](super::service::TrackerService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them.

use crate::error::ResetCause;
use crate::feed::{EtaSet, FetchOutcome};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The control loop has started.
    Started { station_id: String, destination: String },

    /// A fetch cycle finished.
    FetchCompleted { outcome: FetchOutcome, etas: EtaSet, dropped: usize },

    /// A slot went from dark to lit this cycle.
    SlotActivated(usize),

    NotificationArmed,
    NotificationDisarmed,

    /// The alert melody played for this ETA minute.
    NotificationFired(usize),

    /// A fetch failed; carries the consecutive failure count.
    HealthDegraded { consecutive_errors: u32 },

    /// The loop is stopping for a reset.
    ResetRequested(ResetCause),

    /// Retained buffers were released under heap pressure.
    MemoryReclaimed { percent_used: u8, released_bytes: usize },
}
