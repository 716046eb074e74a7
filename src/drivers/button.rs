//! Button driver: ISR edge capture and settle-time debouncing.
//!
//! ## Hardware
//!
//! Active-low momentary switch with internal pull-up.  The GPIO fires on
//! any edge; the ISR reads the pin level, timestamps the edge, and pushes
//! it onto [`BUTTON_EDGES`](crate::events::BUTTON_EDGES).
//!
//! ## Debounce
//!
//! Contacts chatter for a few milliseconds on both press and release.
//! A raw edge is accepted once it has stood for `debounce_ms`, either
//! because no further edge arrived within that window or because the next
//! edge came later than that.  Edges are judged by their ISR timestamps,
//! so a complete tap that happened while the loop was busy (a slow fetch)
//! is still delivered as a press followed by a release.  An accepted edge
//! that repeats the current stable state is discarded, so a tap shorter
//! than the debounce window produces nothing.

use log::warn;

use crate::events::{BUTTON_EDGES, ButtonEdge, EdgeQueue, EdgeRecord};

/// Settled edges waiting for the control loop.
const SETTLED_CAPACITY: usize = 8;

pub struct ButtonDriver {
    debounce_ms: u32,
    pending: Option<EdgeRecord>,
    settled: heapless::Deque<EdgeRecord, SETTLED_CAPACITY>,
    stable: ButtonEdge,
}

impl ButtonDriver {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            debounce_ms,
            pending: None,
            settled: heapless::Deque::new(),
            stable: ButtonEdge::Released,
        }
    }

    /// Record a raw edge from the ISR queue.  The edge it replaces is
    /// accepted if it stood for the full debounce window.
    pub fn ingest(&mut self, record: EdgeRecord) {
        if let Some(previous) = self.pending {
            if record.at_ms.wrapping_sub(previous.at_ms) >= self.debounce_ms {
                self.accept(previous);
            }
        }
        self.pending = Some(record);
    }

    /// Call from the main loop each slice, until it returns `None`.
    /// Yields settled edges that change the stable state, oldest first.
    pub fn poll(&mut self, now_ms: u32) -> Option<EdgeRecord> {
        if let Some(pending) = self.pending {
            if now_ms.wrapping_sub(pending.at_ms) >= self.debounce_ms {
                self.pending = None;
                self.accept(pending);
            }
        }
        self.settled.pop_front()
    }

    /// Pull everything the ISR queued, then [`poll`](Self::poll).
    pub fn service(&mut self, queue: &EdgeQueue, now_ms: u32) -> Option<EdgeRecord> {
        queue.drain(|r| self.ingest(r));
        self.poll(now_ms)
    }

    fn accept(&mut self, record: EdgeRecord) {
        if record.edge == self.stable {
            return;
        }
        self.stable = record.edge;
        if self.settled.push_back(record).is_err() {
            warn!("Button: {:?} at {} ms dropped, loop is behind", record.edge, record.at_ms);
        }
    }
}

/// ISR body: translate the pin level into an edge and queue it.
/// Safe to call from interrupt context (lock-free).
pub fn button_isr_handler(level_low: bool, now_ms: u32) {
    let edge = if level_low {
        ButtonEdge::Pressed
    } else {
        ButtonEdge::Released
    };
    BUTTON_EDGES.push(edge, now_ms);
}

/// Raw GPIO ISR registered by `hw_init::init_isr_service`.  The pin number
/// travels in `arg`.
#[cfg(target_os = "espidf")]
pub(crate) unsafe extern "C" fn button_gpio_isr(arg: *mut core::ffi::c_void) {
    let pin = arg as i32;
    // SAFETY: gpio_get_level is a register read; safe in ISR context.
    let low = unsafe { esp_idf_svc::sys::gpio_get_level(pin) } == 0;
    button_isr_handler(low, crate::drivers::hw_timer::monotonic_ms_u32());
}
