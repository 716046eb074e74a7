//! System configuration parameters
//!
//! Everything is fixed at startup; there is no runtime reconfiguration.
//! Secrets (Wi-Fi credentials, API key) and the station/destination pair
//! come from `tracker.local.rs` via `build.rs`, falling back to
//! placeholders when that file is absent.

use serde::{Deserialize, Serialize};

use crate::adapters::utils::{validate_password, validate_ssid};
use crate::error::ConfigError;
use crate::melody::{Melody, melody_from_notes};
use crate::pins;

/// Upper bound on the indicator bank (width of the ETA membership mask).
pub const MAX_INDICATORS: usize = 32;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    // --- Feed ---
    /// Station (map) identifier the predictions are requested for.
    pub station_id: String,
    /// Only predictions whose `destNm` equals this exactly are displayed.
    pub destination_name: String,
    pub api_key: String,
    pub api_base_url: String,
    /// Upper bound on one HTTP request (connect + body).
    pub fetch_timeout_ms: u32,

    // --- Network ---
    pub wifi_ssid: String,
    pub wifi_password: String,
    /// How long to wait for association + DHCP at startup.
    pub wifi_max_wait_secs: u32,
    /// POSIX TZ string for the wall clock (reset hour and log timestamps).
    pub timezone: String,
    /// How long startup waits for the first SNTP sync.
    pub time_sync_max_wait_secs: u32,

    // --- Display ---
    /// Indicator GPIOs in slot order; the bank size is this length.
    pub indicator_pins: heapless::Vec<i32, MAX_INDICATORS>,
    /// Slot that shows the failure blink.
    pub status_slot: usize,

    // --- Notification ---
    /// ETA minute whose activation plays the melody when armed.
    pub notify_minutes_out: u8,
    pub notification_melody: Melody,
    pub button_pin: i32,
    pub speaker_pin: i32,
    /// Hold time after which a press resets the device instead of toggling.
    pub long_press_ms: u32,
    pub debounce_ms: u32,

    // --- Health ---
    /// Seconds between feed requests.
    pub poll_interval_secs: u32,
    /// Loop slice: button polling and watchdog feeding cadence.
    pub button_poll_ms: u32,
    pub max_consecutive_errors: u32,
    /// Local hour (0-23) for the daily reset.
    pub reset_hour: u8,
    /// Minimum uptime before the daily reset may fire.
    pub reset_min_uptime_secs: u32,
    /// Wait between the reset signal and the restart.
    pub reset_grace_secs: u32,
    pub watchdog_timeout_ms: u32,
    /// Heap usage (percent of total) above which buffers are released.
    pub memory_reclaim_percent: u8,

    // --- Logging ---
    pub log_path: String,
    /// The log file is rotated once it grows past this size.
    pub max_log_bytes: u32,
}

impl TrackerConfig {
    /// Number of indicator slots.
    pub fn indicator_count(&self) -> usize {
        self.indicator_pins.len()
    }

    /// Full feed URL for the configured station.
    pub fn feed_url(&self) -> String {
        format!(
            "{}?mapid={}&key={}&outputType=JSON",
            self.api_base_url, self.station_id, self.api_key
        )
    }

    /// Reject values the control loop cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let count = self.indicator_count();
        if count == 0 {
            return Err(ConfigError::ValidationFailed("indicator_pins: empty"));
        }
        if usize::from(self.notify_minutes_out) >= count {
            return Err(ConfigError::ValidationFailed(
                "notify_minutes_out: outside the indicator bank",
            ));
        }
        if self.status_slot >= count {
            return Err(ConfigError::ValidationFailed("status_slot: outside the indicator bank"));
        }
        if self.reset_hour > 23 {
            return Err(ConfigError::ValidationFailed("reset_hour: must be 0-23"));
        }
        if self.poll_interval_secs == 0 {
            return Err(ConfigError::ValidationFailed("poll_interval_secs: must be > 0"));
        }
        if self.button_poll_ms == 0
            || self.button_poll_ms > self.poll_interval_secs.saturating_mul(1000)
        {
            return Err(ConfigError::ValidationFailed(
                "button_poll_ms: must be > 0 and within the poll interval",
            ));
        }
        if self.max_consecutive_errors == 0 {
            return Err(ConfigError::ValidationFailed("max_consecutive_errors: must be > 0"));
        }
        if self.fetch_timeout_ms == 0 || self.fetch_timeout_ms >= self.watchdog_timeout_ms {
            return Err(ConfigError::ValidationFailed(
                "fetch_timeout_ms: must be > 0 and below watchdog_timeout_ms",
            ));
        }
        if self.memory_reclaim_percent == 0 || self.memory_reclaim_percent > 100 {
            return Err(ConfigError::ValidationFailed("memory_reclaim_percent: must be 1-100"));
        }
        if self.station_id.is_empty() || self.destination_name.is_empty() {
            return Err(ConfigError::ValidationFailed("station_id/destination_name: empty"));
        }
        validate_ssid(&self.wifi_ssid)
            .map_err(|_| ConfigError::ValidationFailed("wifi_ssid: invalid"))?;
        validate_password(&self.wifi_password)
            .map_err(|_| ConfigError::ValidationFailed("wifi_password: invalid"))?;
        Ok(())
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        let mut indicator_pins = heapless::Vec::new();
        for pin in pins::INDICATOR_GPIOS {
            // INDICATOR_GPIOS is shorter than MAX_INDICATORS.
            let _ = indicator_pins.push(pin);
        }

        Self {
            // Feed
            station_id: option_env!("LOCAL_STATION_ID").unwrap_or("40380").into(),
            destination_name: option_env!("LOCAL_DEST_NAME").unwrap_or("Loop").into(),
            api_key: option_env!("LOCAL_API_KEY").unwrap_or("YOUR_API_KEY_HERE").into(),
            api_base_url: "http://lapi.transitchicago.com/api/1.0/ttarrivals.aspx".into(),
            fetch_timeout_ms: 10_000,

            // Network
            wifi_ssid: option_env!("LOCAL_WIFI_SSID").unwrap_or("YOUR_WIFI_SSID").into(),
            wifi_password: option_env!("LOCAL_WIFI_PASS").unwrap_or("").into(),
            wifi_max_wait_secs: 10,
            timezone: "CST6CDT,M3.2.0,M11.1.0".into(),
            time_sync_max_wait_secs: 20,

            // Display
            indicator_pins,
            status_slot: 0,

            // Notification
            notify_minutes_out: 5,
            notification_melody: melody_from_notes(&[
                ("e6", 150),
                ("r", 50),
                ("e6", 150),
                ("r", 50),
                ("c6", 150),
                ("g6", 400),
            ]),
            button_pin: pins::BUTTON_GPIO,
            speaker_pin: pins::SPEAKER_GPIO,
            long_press_ms: 3_000,
            debounce_ms: 50,

            // Health
            poll_interval_secs: 15,
            button_poll_ms: 50,
            max_consecutive_errors: 10,
            reset_hour: 3,
            reset_min_uptime_secs: 3_600,
            reset_grace_secs: 30,
            watchdog_timeout_ms: 30_000,
            memory_reclaim_percent: 80,

            // Logging
            log_path: "/spiffs/tracker.log".into(),
            max_log_bytes: 64 * 1024,
        }
    }
}
