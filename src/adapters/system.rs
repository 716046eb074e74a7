//! Platform adapter: clock, watchdog, heap probe, and loop pacing.
//!
//! Bundles everything the control loop needs from the board besides the
//! outputs and the network, so [`TrackerService`](crate::app::service::TrackerService)
//! takes one `platform` argument instead of four.

use embedded_hal::delay::DelayNs;

use crate::app::ports::{ClockPort, MemoryUsage, SystemPort, WatchdogPort};
use crate::diagnostics::HeapStats;
use crate::drivers::watchdog::Watchdog;

use super::time::TimeAdapter;

pub struct SystemAdapter {
    time: TimeAdapter,
    watchdog: Watchdog,
}

impl SystemAdapter {
    pub fn new(watchdog: Watchdog) -> Self {
        Self {
            time: TimeAdapter::new(),
            watchdog,
        }
    }

    pub fn watchdog(&self) -> &Watchdog {
        &self.watchdog
    }
}

impl ClockPort for SystemAdapter {
    fn uptime_ms(&self) -> u64 {
        self.time.uptime_ms()
    }

    fn local_hour(&self) -> Option<u8> {
        self.time.local_hour()
    }
}

impl WatchdogPort for SystemAdapter {
    fn feed(&mut self) {
        self.watchdog.feed();
    }
}

impl SystemPort for SystemAdapter {
    fn memory_usage(&self) -> Option<MemoryUsage> {
        Some(HeapStats::collect().memory_usage())
    }
}

impl DelayNs for SystemAdapter {
    #[cfg(target_os = "espidf")]
    fn delay_ns(&mut self, ns: u32) {
        esp_idf_hal::delay::FreeRtos::delay_us(ns.div_ceil(1_000));
    }

    #[cfg(target_os = "espidf")]
    fn delay_ms(&mut self, ms: u32) {
        esp_idf_hal::delay::FreeRtos::delay_ms(ms);
    }

    #[cfg(not(target_os = "espidf"))]
    fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(core::time::Duration::from_nanos(u64::from(ns)));
    }
}

/// Restart the chip.
#[cfg(target_os = "espidf")]
pub fn reboot() -> ! {
    log::warn!("System: restarting");
    // SAFETY: esp_restart never returns.
    unsafe { esp_idf_svc::sys::esp_restart() }
}
