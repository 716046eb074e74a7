//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ TrackerService (domain)
//! ```
//!
//! Driven adapters (indicators, speaker, feed client, clock, watchdog,
//! event sinks) implement these traits.  The
//! [`TrackerService`](super::service::TrackerService) consumes them via
//! generics, so the control loop never touches hardware directly and runs
//! unchanged against the mocks in `tests/integration`.

use core::net::Ipv4Addr;
use core::time::Duration;

use crate::drivers::led_patterns::{Animation, Repeat};
use crate::error::{ConnectivityError, TransportError};
use crate::melody::Tone;

// ───────────────────────────────────────────────────────────────
// Indicator port (driven adapter: domain → LED bank)
// ───────────────────────────────────────────────────────────────

/// The indicator bank: one light per ETA minute.
pub trait IndicatorPort {
    /// Number of slots in the bank.
    fn indicator_count(&self) -> usize;

    /// Steady on at full brightness.  Cancels any animation on the slot.
    fn on(&mut self, slot: usize);

    /// Dark.  Cancels any animation on the slot.
    fn off(&mut self, slot: usize);

    /// Start `animation` on `slot`, replacing whatever it was doing.
    /// With `blocking`, returns once the animation has finished; endless
    /// animations never block.
    fn animate(&mut self, slot: usize, animation: Animation, blocking: bool);

    /// Whether the slot is lit or animating.
    fn is_active(&self, slot: usize) -> bool;

    fn blink(&mut self, slot: usize, on_ms: u32, off_ms: u32, repeat: Repeat, blocking: bool) {
        self.animate(slot, Animation::Blink { on_ms, off_ms, repeat }, blocking);
    }

    fn pulse(&mut self, slot: usize, fade_in_ms: u32, fade_out_ms: u32, repeat: Repeat, blocking: bool) {
        self.animate(
            slot,
            Animation::Pulse {
                fade_in_ms,
                fade_out_ms,
                repeat,
            },
            blocking,
        );
    }
}

// ───────────────────────────────────────────────────────────────
// Audio port (driven adapter: domain → speaker)
// ───────────────────────────────────────────────────────────────

pub trait AudioPort {
    /// Play a tone sequence.  A new call replaces whatever is playing.
    fn play(&mut self, tones: &[Tone], blocking: bool);

    /// Silence the speaker immediately.
    fn off(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Feed port (driven adapter: domain → HTTP)
// ───────────────────────────────────────────────────────────────

pub trait FeedPort {
    /// GET `url` and return the body.  Must give up after `timeout`.
    fn get(&mut self, url: &str, timeout: Duration) -> Result<String, TransportError>;

    /// Drop any retained response buffers.  Returns the bytes released.
    fn release_buffers(&mut self) -> usize {
        0
    }
}

// ───────────────────────────────────────────────────────────────
// Platform ports (clock, watchdog, heap)
// ───────────────────────────────────────────────────────────────

pub trait ClockPort {
    /// Milliseconds since boot.
    fn uptime_ms(&self) -> u64;

    /// Local wall-clock hour (0-23), `None` until the clock is synced.
    fn local_hour(&self) -> Option<u8>;
}

pub trait WatchdogPort {
    fn feed(&mut self);
}

/// Heap occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryUsage {
    pub used_bytes: usize,
    pub total_bytes: usize,
}

impl MemoryUsage {
    /// Whole-percent usage, 0 for an empty heap.
    pub fn percent_used(&self) -> u8 {
        if self.total_bytes == 0 {
            return 0;
        }
        ((self.used_bytes.min(self.total_bytes) * 100) / self.total_bytes) as u8
    }
}

pub trait SystemPort {
    fn memory_usage(&self) -> Option<MemoryUsage>;
}

// ───────────────────────────────────────────────────────────────
// Connectivity port (driven adapter: domain → Wi-Fi)
// ───────────────────────────────────────────────────────────────

pub trait ConnectivityPort {
    /// Associate and wait up to `max_wait_secs` for an address.
    fn connect(&mut self, max_wait_secs: u32) -> Result<Ipv4Addr, ConnectivityError>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
