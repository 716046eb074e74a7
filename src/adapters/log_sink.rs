//! Logging adapters.
//!
//! - [`LogEventSink`] implements [`EventSink`] by writing structured
//!   application events through the `log` facade.
//! - [`TeeLogger`] is the global `log` backend: every record goes to the
//!   console, and once [`TeeLogger::attach_file`] has been called it is
//!   also appended, timestamped, to a size-capped file on flash.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::sync::{Mutex, OnceLock};

use log::{Level, LevelFilter, Log, Metadata, Record, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::feed::FetchOutcome;

// ───────────────────────────────────────────────────────────────
// Event sink
// ───────────────────────────────────────────────────────────────

/// Adapter that logs every [`AppEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { station_id, destination } => {
                info!("START | station={} destination='{}'", station_id, destination);
            }
            AppEvent::FetchCompleted { outcome: FetchOutcome::Success, etas, dropped } => {
                let minutes: Vec<usize> = etas.iter().collect();
                info!("FETCH | ok | etas={:?} | dropped={}", minutes, dropped);
            }
            AppEvent::FetchCompleted { outcome: FetchOutcome::Failure, .. } => {
                warn!("FETCH | failed");
            }
            AppEvent::SlotActivated(slot) => {
                info!("SLOT  | {} min lit", slot);
            }
            AppEvent::NotificationArmed => info!("ALERT | armed"),
            AppEvent::NotificationDisarmed => info!("ALERT | disarmed"),
            AppEvent::NotificationFired(slot) => {
                info!("ALERT | train {} min out, melody played", slot);
            }
            AppEvent::HealthDegraded { consecutive_errors } => {
                warn!("HEALTH | consecutive errors={}", consecutive_errors);
            }
            AppEvent::ResetRequested(cause) => {
                warn!("RESET | {}", cause);
            }
            AppEvent::MemoryReclaimed { percent_used, released_bytes } => {
                info!("MEM   | {}% used, released {} bytes", percent_used, released_bytes);
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Log file
// ───────────────────────────────────────────────────────────────

/// Append-only log file rotated once (`<path>.1`) when it passes `max_bytes`.
#[derive(Debug)]
pub struct LogFile {
    path: String,
    max_bytes: u64,
    written: u64,
    file: File,
}

impl LogFile {
    pub fn open(path: &str, max_bytes: u32) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path: path.to_owned(),
            max_bytes: u64::from(max_bytes),
            written,
            file,
        })
    }

    pub fn rotated_path(&self) -> String {
        format!("{}.1", self.path)
    }

    /// Bytes in the current file.
    pub fn len(&self) -> u64 {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    pub fn append(&mut self, line: &str) -> io::Result<()> {
        if self.written > 0 && self.written + line.len() as u64 + 1 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(line.as_bytes())?;
        self.file.write_all(b"\n")?;
        self.written += line.len() as u64 + 1;
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        let rotated = self.rotated_path();
        // Only one generation is kept.
        let _ = std::fs::remove_file(&rotated);
        std::fs::rename(&self.path, &rotated)?;
        self.file = OpenOptions::new()
            .create(true)
            .append(true)
            .truncate(false)
            .open(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Global logger
// ───────────────────────────────────────────────────────────────

static LOGGER: OnceLock<TeeLogger> = OnceLock::new();

pub struct TeeLogger {
    level: LevelFilter,
    file: Mutex<Option<LogFile>>,
}

impl TeeLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self {
            level,
            file: Mutex::new(None),
        }
    }

    /// Install as the global `log` backend.  Call once, first thing in `main`.
    pub fn install(level: LevelFilter) -> Result<&'static TeeLogger, log::SetLoggerError> {
        let logger = LOGGER.get_or_init(|| TeeLogger::new(level));
        log::set_logger(logger)?;
        log::set_max_level(level);
        Ok(logger)
    }

    /// Start mirroring records into `path`.
    pub fn attach_file(&self, path: &str, max_bytes: u32) -> io::Result<()> {
        let file = LogFile::open(path, max_bytes)?;
        let existing = file.len();
        if let Ok(mut slot) = self.file.lock() {
            *slot = Some(file);
        }
        info!("Log: mirroring to {} ({} bytes present, cap {})", path, existing, max_bytes);
        Ok(())
    }

    /// Whether a log file is attached.
    pub fn has_file(&self) -> bool {
        self.file.lock().map(|f| f.is_some()).unwrap_or(false)
    }
}

/// One log line: wall-clock timestamp when synced, uptime otherwise.
pub fn format_line(level: Level, target: &str, args: &core::fmt::Arguments<'_>) -> String {
    let stamp = match crate::adapters::time::local_now() {
        Some(now) => now.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => {
            let ms = crate::drivers::hw_timer::monotonic_ms();
            format!("+{}.{:03}", ms / 1000, ms % 1000)
        }
    };
    format!("{} {:<5} {}: {}", stamp, level, target, args)
}

impl Log for TeeLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(record.level(), record.target(), record.args());
        println!("{}", line);

        // try_lock: a record logged while the file is being written (or
        // rotated) goes to the console only.
        if let Ok(mut slot) = self.file.try_lock() {
            if let Some(file) = slot.as_mut() {
                if let Err(e) = file.append(&line) {
                    println!("log file write failed ({}), detaching", e);
                    *slot = None;
                }
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut slot) = self.file.lock() {
            if let Some(file) = slot.as_mut() {
                let _ = file.file.flush();
            }
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Flash partition
// ───────────────────────────────────────────────────────────────

/// Mount the SPIFFS log partition at `base_path`, formatting it if the
/// mount fails.
#[cfg(target_os = "espidf")]
pub fn mount_log_partition(base_path: &core::ffi::CStr) -> Result<(), i32> {
    use esp_idf_svc::sys::{ESP_OK, esp_vfs_spiffs_conf_t, esp_vfs_spiffs_register};

    let conf = esp_vfs_spiffs_conf_t {
        base_path: base_path.as_ptr(),
        partition_label: core::ptr::null(),
        max_files: 4,
        format_if_mount_failed: true,
    };
    // SAFETY: conf and base_path outlive the call; the VFS copies the path.
    let ret = unsafe { esp_vfs_spiffs_register(&conf) };
    if ret != ESP_OK {
        return Err(ret);
    }
    info!("Log: SPIFFS mounted at {:?}", base_path);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn mount_log_partition(base_path: &core::ffi::CStr) -> Result<(), i32> {
    info!("Log(sim): SPIFFS mount at {:?} skipped", base_path);
    Ok(())
}
