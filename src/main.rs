//! Train Tracker Firmware: Main Entry Point
//!
//! Hexagonal architecture: a pure control loop driven through port traits.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      HttpFeedClient   SystemAdapter           │
//! │  (Indicator+Audio)    (FeedPort)       (Clock+Watchdog+Heap)   │
//! │  WifiAdapter          LogEventSink     TeeLogger               │
//! │  (Connectivity)       (EventSink)      (console + flash log)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             TrackerService (pure logic)                │    │
//! │  │  Arrivals · Display · Notify · Health                  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  Recovery (grace blink → soft restart or reboot)               │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Imports ───────────────────────────────────────────────────
use anyhow::{Result, anyhow};
use embedded_hal::delay::DelayNs;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use log::{LevelFilter, error, info, warn};

use train_tracker::adapters::hardware::HardwareAdapter;
use train_tracker::adapters::http::HttpFeedClient;
use train_tracker::adapters::log_sink::{LogEventSink, TeeLogger, mount_log_partition};
use train_tracker::adapters::system::{SystemAdapter, reboot};
use train_tracker::adapters::time::sync_time;
use train_tracker::adapters::wifi::WifiAdapter;
use train_tracker::app::ports::{ConnectivityPort, IndicatorPort};
use train_tracker::app::recovery::recover;
use train_tracker::app::service::TrackerService;
use train_tracker::config::TrackerConfig;
use train_tracker::diagnostics;
use train_tracker::drivers::hw_init;
use train_tracker::drivers::indicator::IndicatorBank;
use train_tracker::drivers::led_patterns::{SELF_TEST, SWEEP_FLASH};
use train_tracker::drivers::speaker::Speaker;
use train_tracker::drivers::watchdog::Watchdog;
use train_tracker::error::{ResetCause, RestartKind};
use train_tracker::events::BUTTON_EDGES;

/// Pause after the lamp test so it reads as a distinct step.
const SELF_TEST_PAUSE_MS: u32 = 2_000;

// ── Startup animations ────────────────────────────────────────

/// Light the whole bank once, then go dark.
fn lamp_test(hw: &mut impl IndicatorPort) {
    let count = hw.indicator_count();
    for slot in 0..count {
        hw.animate(slot, SELF_TEST, slot + 1 == count);
    }
}

/// Flash slots in pairs `(i, i + n/2)` from the ends of the bank inward.
fn network_up_sweep(hw: &mut impl IndicatorPort) {
    let half = hw.indicator_count() / 2;
    for i in 0..half {
        hw.animate(i, SWEEP_FLASH, false);
        hw.animate(i + half, SWEEP_FLASH, true);
    }
}

/// Run recovery for a startup failure and reboot.
fn fail_startup(
    cause: ResetCause,
    config: &TrackerConfig,
    hw: &mut HardwareAdapter,
    platform: &mut SystemAdapter,
) -> ! {
    let _ = recover(cause, config, hw, platform, false);
    reboot()
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    let logger = TeeLogger::install(LevelFilter::Info).map_err(|e| anyhow!("logger: {e}"))?;
    diagnostics::install_panic_handler();

    info!("╔══════════════════════════════════════╗");
    info!("║  Train Tracker v{}                ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = TrackerConfig::default();
    config.validate().map_err(|e| anyhow!("config: {e}"))?;
    info!(
        "Config: station {} → '{}', {} indicators, alert at {} min",
        config.station_id,
        config.destination_name,
        config.indicator_count(),
        config.notify_minutes_out
    );

    // ── 3. Hardware ───────────────────────────────────────────
    if let Err(e) = hw_init::init_peripherals(
        &config.indicator_pins,
        config.speaker_pin,
        config.button_pin,
    ) {
        // Without outputs there is nothing to show a reset on.
        error!("HAL init failed: {}, rebooting", e);
        reboot();
    }
    let bank = IndicatorBank::new(&config.indicator_pins);
    bank.start_render_thread()?;
    let mut hw = HardwareAdapter::new(bank, Speaker::start()?);
    let mut platform = SystemAdapter::new(Watchdog::new(config.watchdog_timeout_ms));

    lamp_test(&mut hw);
    platform.delay_ms(SELF_TEST_PAUSE_MS);

    // ── 4. Network ────────────────────────────────────────────
    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let mut wifi = match WifiAdapter::new(peripherals.modem, sysloop, Some(nvs)) {
        Ok(w) => w,
        Err(e) => fail_startup(e.into(), &config, &mut hw, &mut platform),
    };
    if let Err(e) = wifi.set_credentials(&config.wifi_ssid, &config.wifi_password) {
        fail_startup(e.into(), &config, &mut hw, &mut platform);
    }
    match wifi.connect(config.wifi_max_wait_secs) {
        Ok(ip) => info!("Network: up at {}", ip),
        Err(e) => fail_startup(e.into(), &config, &mut hw, &mut platform),
    }
    network_up_sweep(&mut hw);

    // ── 5. Wall clock ─────────────────────────────────────────
    let _time_sync = match sync_time(
        &config.timezone,
        config.time_sync_max_wait_secs * 1000,
        &mut platform,
    ) {
        Ok(sync) => sync,
        Err(cause) => fail_startup(cause, &config, &mut hw, &mut platform),
    };

    // ── 6. Flash log ──────────────────────────────────────────
    match mount_log_partition(c"/spiffs") {
        Ok(()) => {
            if let Err(e) = logger.attach_file(&config.log_path, config.max_log_bytes) {
                warn!("Log: cannot open {} ({}), console only", config.log_path, e);
            }
        }
        Err(rc) => warn!("Log: SPIFFS mount failed (rc={}), console only", rc),
    }

    // ── 7. Button interrupt ───────────────────────────────────
    if let Err(e) = hw_init::init_isr_service(config.button_pin) {
        error!("{}", e);
        fail_startup(ResetCause::Init("button ISR"), &config, &mut hw, &mut platform);
    }

    // ── 8. Control loop ───────────────────────────────────────
    let mut feed = HttpFeedClient::new();
    let mut sink = LogEventSink::new();
    info!("System ready. Entering control loop.");

    loop {
        let mut service = TrackerService::new(&config);
        let cause = service.run(&mut hw, &mut feed, &mut platform, &mut sink, &BUTTON_EDGES);
        match recover(cause, &config, &mut hw, &mut platform, wifi.is_connected()) {
            RestartKind::Soft => continue,
            RestartKind::Full => {
                wifi.disconnect();
                reboot()
            }
        }
    }
}
