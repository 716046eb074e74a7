//! Wall-clock and monotonic time.
//!
//! - **`target_os = "espidf"`**: uptime from `esp_timer`, local time via
//!   `localtime_r` after SNTP has set the clock, SNTP through
//!   `esp_idf_svc::sntp`.
//! - **`not(target_os = "espidf")`**: uptime from `std::time::Instant`; the
//!   wall clock reads the host's UTC time and SNTP is a no-op.

use chrono::{NaiveDateTime, Timelike};
use log::info;

use crate::app::ports::{ClockPort, WatchdogPort};
use crate::drivers::hw_timer;
use crate::error::ResetCause;

/// Anything before 2020-01-01 means SNTP has not run yet.
#[cfg(target_os = "espidf")]
const EPOCH_2020: i64 = 1_577_836_800;

/// SNTP status poll interval while waiting for the first sync.
const SYNC_POLL_MS: u32 = 250;

/// Time adapter for the ESP32-S3 platform.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeAdapter;

impl TimeAdapter {
    pub fn new() -> Self {
        Self
    }
}

impl ClockPort for TimeAdapter {
    fn uptime_ms(&self) -> u64 {
        hw_timer::monotonic_ms()
    }

    fn local_hour(&self) -> Option<u8> {
        local_now().map(|t| t.hour() as u8)
    }
}

// ── Wall clock ────────────────────────────────────────────────

/// Current local time, `None` if the clock has never been synced.
#[cfg(target_os = "espidf")]
pub fn local_now() -> Option<NaiveDateTime> {
    use esp_idf_svc::sys::{localtime_r, time, time_t, tm};

    let mut now: time_t = 0;
    // SAFETY: time() writes one time_t through a valid pointer.
    unsafe {
        time(&mut now);
    }
    if (now as i64) < EPOCH_2020 {
        return None;
    }
    let mut local: tm = unsafe { core::mem::zeroed() };
    // SAFETY: both pointers are valid for the duration of the call.
    if unsafe { localtime_r(&now, &mut local) }.is_null() {
        return None;
    }

    chrono::NaiveDate::from_ymd_opt(
        local.tm_year + 1900,
        (local.tm_mon + 1) as u32,
        local.tm_mday as u32,
    )?
    .and_hms_opt(local.tm_hour as u32, local.tm_min as u32, local.tm_sec as u32)
}

/// Current local time (host: UTC).
#[cfg(not(target_os = "espidf"))]
pub fn local_now() -> Option<NaiveDateTime> {
    Some(chrono::DateTime::<chrono::Utc>::from(std::time::SystemTime::now()).naive_utc())
}

/// Set the POSIX `TZ` used by `localtime_r`.
pub fn set_timezone(tz: &str) {
    info!("Time: timezone {}", tz);
    // SAFETY: called once during single-threaded startup, before any other
    // task reads the environment.
    unsafe {
        std::env::set_var("TZ", tz);
    }
}

// ── SNTP ──────────────────────────────────────────────────────

/// Keeps SNTP running in the background; drop it to stop re-syncing.
pub struct TimeSync {
    #[cfg(target_os = "espidf")]
    _sntp: esp_idf_svc::sntp::EspSntp<'static>,
}

/// Set the timezone and wait up to `max_wait_ms` for the first SNTP sync,
/// feeding the watchdog while waiting.
#[cfg(target_os = "espidf")]
pub fn sync_time(
    tz: &str,
    max_wait_ms: u32,
    watchdog: &mut impl WatchdogPort,
) -> Result<TimeSync, ResetCause> {
    use esp_idf_svc::sntp::{EspSntp, OperatingMode, SntpConf, SyncMode, SyncStatus};

    set_timezone(tz);

    let conf = SntpConf {
        servers: ["pool.ntp.org", "time.nist.gov"],
        sync_mode: SyncMode::Immediate,
        operating_mode: OperatingMode::Poll,
    };
    let sntp = EspSntp::new(&conf).map_err(|e| {
        log::error!("Time: SNTP start failed: {}", e);
        ResetCause::TimeSyncFailed
    })?;

    let mut elapsed_ms = 0u32;
    while elapsed_ms < max_wait_ms {
        if sntp.get_sync_status() == SyncStatus::Completed {
            info!("Time: SNTP synchronized after {} ms", elapsed_ms);
            if let Some(now) = local_now() {
                info!("Time: local time {}", now.format("%Y-%m-%d %H:%M:%S"));
            }
            return Ok(TimeSync { _sntp: sntp });
        }
        watchdog.feed();
        std::thread::sleep(std::time::Duration::from_millis(u64::from(SYNC_POLL_MS)));
        elapsed_ms += SYNC_POLL_MS;
    }

    log::error!("Time: SNTP not synchronized within {} ms", max_wait_ms);
    Err(ResetCause::TimeSyncFailed)
}

#[cfg(not(target_os = "espidf"))]
pub fn sync_time(
    tz: &str,
    _max_wait_ms: u32,
    watchdog: &mut impl WatchdogPort,
) -> Result<TimeSync, ResetCause> {
    set_timezone(tz);
    watchdog.feed();
    info!("Time(sim): using host clock, SNTP skipped (poll {} ms)", SYNC_POLL_MS);
    Ok(TimeSync {})
}
