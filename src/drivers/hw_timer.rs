//! Monotonic time base.
//!
//! Button ISR timestamps, the control loop's slice clock, and animation
//! phases all read the same counter so their differences are meaningful.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` (microseconds since
//!   boot, safe from ISR context).
//! - **other targets**: a process-wide `Instant` captured on first use.

/// Milliseconds since boot.
#[cfg(target_os = "espidf")]
pub fn monotonic_ms() -> u64 {
    // SAFETY: esp_timer_get_time is a counter read with no side effects.
    (unsafe { esp_idf_svc::sys::esp_timer_get_time() } / 1_000) as u64
}

/// Milliseconds since the first call in this process.
#[cfg(not(target_os = "espidf"))]
pub fn monotonic_ms() -> u64 {
    use std::sync::OnceLock;
    use std::time::Instant;

    static START: OnceLock<Instant> = OnceLock::new();
    START.get_or_init(Instant::now).elapsed().as_millis() as u64
}

/// Truncated form used for ISR timestamps (wraps after ~49 days; all
/// comparisons use `wrapping_sub`).
pub fn monotonic_ms_u32() -> u32 {
    monotonic_ms() as u32
}
