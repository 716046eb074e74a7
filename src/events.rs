//! Interrupt-driven button edge queue.
//!
//! The GPIO ISR produces raw press/release edges; the main loop consumes
//! them at the top of every slice, debounces them, and hands them to the
//! notification scheduler.
//!
//! ```text
//! ┌─────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ GPIO ISR    │────▶│  Edge Queue  │────▶│  Main Loop   │
//! │ (any edge)  │     │  (lock-free) │     │  (consumer)  │
//! └─────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, AtomicU32, Ordering};

/// Maximum number of pending edges.
/// Power of 2 for efficient ring buffer modulo.
const EDGE_QUEUE_CAP: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ButtonEdge {
    Pressed = 1,
    Released = 2,
}

impl ButtonEdge {
    fn from_u8(raw: u8) -> Option<Self> {
        match raw {
            1 => Some(Self::Pressed),
            2 => Some(Self::Released),
            _ => None,
        }
    }
}

/// One edge with its ISR timestamp (ms since boot, truncated to u32).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRecord {
    pub edge: ButtonEdge,
    pub at_ms: u32,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// ISR writes (produce), main loop reads (consume).  Slots are atomics
// themselves, so no unsafe access is needed; the head/tail
// Release/Acquire pair orders the slot writes.

pub struct EdgeQueue {
    head: AtomicU8,
    tail: AtomicU8,
    kinds: [AtomicU8; EDGE_QUEUE_CAP],
    stamps: [AtomicU32; EDGE_QUEUE_CAP],
    dropped: AtomicU32,
}

impl EdgeQueue {
    pub const fn new() -> Self {
        Self {
            head: AtomicU8::new(0),
            tail: AtomicU8::new(0),
            kinds: [const { AtomicU8::new(0) }; EDGE_QUEUE_CAP],
            stamps: [const { AtomicU32::new(0) }; EDGE_QUEUE_CAP],
            dropped: AtomicU32::new(0),
        }
    }

    /// Push an edge.  Safe to call from ISR context (lock-free).
    /// Returns `false` if the queue is full (edge dropped).
    pub fn push(&self, edge: ButtonEdge, at_ms: u32) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        let next_head = (head + 1) % EDGE_QUEUE_CAP as u8;

        if next_head == tail {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            return false; // Queue full, drop the edge.
        }

        self.kinds[head as usize].store(edge as u8, Ordering::Relaxed);
        self.stamps[head as usize].store(at_ms, Ordering::Relaxed);
        self.head.store(next_head, Ordering::Release);
        true
    }

    /// Pop the oldest edge.  Single consumer (main loop).
    pub fn pop(&self) -> Option<EdgeRecord> {
        loop {
            let tail = self.tail.load(Ordering::Relaxed);
            let head = self.head.load(Ordering::Acquire);

            if tail == head {
                return None; // Empty.
            }

            let kind = self.kinds[tail as usize].load(Ordering::Relaxed);
            let at_ms = self.stamps[tail as usize].load(Ordering::Relaxed);
            self.tail.store((tail + 1) % EDGE_QUEUE_CAP as u8, Ordering::Release);

            if let Some(edge) = ButtonEdge::from_u8(kind) {
                return Some(EdgeRecord { edge, at_ms });
            }
        }
    }

    /// Drain all pending edges into a callback, in FIFO order.
    pub fn drain(&self, mut handler: impl FnMut(EdgeRecord)) {
        while let Some(record) = self.pop() {
            handler(record);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Acquire)
    }

    /// Number of pending edges.
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed) as usize;
        let tail = self.tail.load(Ordering::Relaxed) as usize;
        (head + EDGE_QUEUE_CAP - tail) % EDGE_QUEUE_CAP
    }

    /// Edges lost to a full queue since boot.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EdgeQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue fed by the button GPIO ISR.
pub static BUTTON_EDGES: EdgeQueue = EdgeQueue::new();
