//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements                        | Connects to                  |
//! |-------------|-----------------------------------|------------------------------|
//! | `hardware`  | IndicatorPort, AudioPort          | LEDC / GPIO indicator bank, speaker |
//! | `http`      | FeedPort                          | ESP-IDF HTTP client          |
//! | `log_sink`  | EventSink, `log::Log`             | Console + SPIFFS log file    |
//! | `system`    | ClockPort, WatchdogPort, SystemPort, DelayNs | esp_timer, TWDT, heap, FreeRTOS |
//! | `time`      | ClockPort                         | esp_timer, SNTP, `localtime_r` |
//! | `wifi`      | ConnectivityPort                  | ESP-IDF WiFi STA             |

pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod system;
pub mod time;
pub(crate) mod utils;
pub mod wifi;
