//! Crash logging and runtime diagnostics.
//!
//! A custom panic hook formats the panic message and source location into
//! a [`PanicRecord`] and logs it.  Once the log file is mounted the
//! `TeeLogger` mirrors that line to flash, so the cause of the last crash
//! survives the reset that follows.
//!
//! Heap statistics feed the memory-reclaim check in the control loop.

use crate::app::ports::MemoryUsage;

// ───────────────────────────────────────────────────────────────
// Heap statistics
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub total: u32,
    pub free: u32,
    /// Low-water mark since boot.
    pub min_free: u32,
}

impl HeapStats {
    #[cfg(target_os = "espidf")]
    pub fn collect() -> Self {
        use esp_idf_svc::sys::*;
        // SAFETY: heap statistics getters only read allocator counters.
        let (total, free, min_free) = unsafe {
            (
                heap_caps_get_total_size(MALLOC_CAP_DEFAULT) as u32,
                esp_get_free_heap_size(),
                esp_get_minimum_free_heap_size(),
            )
        };
        Self {
            total,
            free,
            min_free,
        }
    }

    /// Synthetic values so simulation runs exercise the same paths as the
    /// device.
    #[cfg(not(target_os = "espidf"))]
    pub fn collect() -> Self {
        Self {
            total: 327_680,
            free: 204_800,
            min_free: 180_224,
        }
    }

    pub fn memory_usage(&self) -> MemoryUsage {
        MemoryUsage {
            used_bytes: self.total.saturating_sub(self.free) as usize,
            total_bytes: self.total as usize,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Panic hook
// ───────────────────────────────────────────────────────────────

/// What a panic left behind, truncated to fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanicRecord {
    pub reason: heapless::String<96>,
    pub location: heapless::String<64>,
}

impl PanicRecord {
    pub fn new(reason: &str, location: &str) -> Self {
        Self {
            reason: truncated(reason),
            location: truncated(location),
        }
    }
}

impl core::fmt::Display for PanicRecord {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} at {}", self.reason, self.location)
    }
}

fn truncated<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// Install a panic hook that logs the panic reason and location.
///
/// Must be called once during init, after the logger is up.  The default
/// runtime abort (and on the device, the reset) follows.
pub fn install_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let reason = if let Some(msg) = info.payload().downcast_ref::<&str>() {
            *msg
        } else if let Some(msg) = info.payload().downcast_ref::<String>() {
            msg.as_str()
        } else {
            "unknown panic"
        };
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_default();

        let record = PanicRecord::new(reason, &location);
        log::error!("PANIC: {}", record);
    }));
}
