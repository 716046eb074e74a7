//! Unified error types for the tracker firmware.
//!
//! Per-cycle errors (`FetchError`, `TimestampError`) are recoverable and
//! never leave the arrival builder.  Anything that ends a run is a
//! [`ResetCause`], and every reset funnels through one recovery procedure
//! (`app::recovery`).

use core::fmt;

// ---------------------------------------------------------------------------
// Network association
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    /// The station never reached the connected state; carries the last
    /// driver status seen.
    ConnectionFailed(i32),
    Timeout,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed(status) => write!(f, "connection failed ({})", status),
            Self::Timeout => write!(f, "timed out waiting for an IP address"),
        }
    }
}

// ---------------------------------------------------------------------------
// HTTP transport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Connection could not be opened or the request could not be sent.
    Connect,
    /// No complete response within the request timeout.
    Timeout,
    /// Server answered with a non-200 status.
    Status(u16),
    /// Body exceeded the receive buffer.
    TooLarge,
    /// Body was not valid UTF-8.
    Body,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect failed"),
            Self::Timeout => write!(f, "request timed out"),
            Self::Status(code) => write!(f, "HTTP status {}", code),
            Self::TooLarge => write!(f, "response too large"),
            Self::Body => write!(f, "response body is not UTF-8"),
        }
    }
}

// ---------------------------------------------------------------------------
// Feed decoding
// ---------------------------------------------------------------------------

/// Why a fetch cycle produced no usable prediction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Transport(TransportError),
    /// Body is not JSON.
    Decode,
    /// Body is JSON but lacks the `ctatt` envelope.
    UnexpectedShape,
    /// Upstream reported an error in the envelope (bad key, bad station).
    Api { code: String, message: String },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Decode => write!(f, "body is not valid JSON"),
            Self::UnexpectedShape => write!(f, "unexpected response shape"),
            Self::Api { code, message } => write!(f, "API error {code}: {message}"),
        }
    }
}

impl From<TransportError> for FetchError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampError {
    /// Not `YYYY-MM-DDTHH:MM:SS`, or not a real calendar date.
    Malformed,
}

impl fmt::Display for TimestampError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed timestamp"),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A field failed range validation; the message names the field.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Reset causes
// ---------------------------------------------------------------------------

/// Why the control loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCause {
    /// Wi-Fi association failed at startup.
    ConnectionFailed(ConnectivityError),
    /// SNTP did not complete at startup.
    TimeSyncFailed,
    /// The consecutive-error budget was spent.
    TooManyConsecutiveErrors(u32),
    /// Daily reset hour reached.
    ScheduledReset,
    /// Button held past the long-press threshold.
    LongPress,
    /// Peripheral initialisation failed.
    Init(&'static str),
}

/// How much state a restart rebuilds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartKind {
    /// Rebuild the control loop in-process; Wi-Fi and SNTP stay up.
    Soft,
    /// Reboot the chip.
    Full,
}

impl ResetCause {
    /// `ScheduledReset` and `LongPress` are intentional; everything else is a
    /// failure of the current run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ScheduledReset | Self::LongPress)
    }

    /// Soft restart only when the network is known good and the cause lives
    /// entirely in the control loop.
    pub fn restart_kind(&self, wifi_connected: bool) -> RestartKind {
        match self {
            Self::TooManyConsecutiveErrors(_) if wifi_connected => RestartKind::Soft,
            _ => RestartKind::Full,
        }
    }
}

impl fmt::Display for ResetCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionFailed(e) => write!(f, "WiFi: {e}"),
            Self::TimeSyncFailed => write!(f, "SNTP sync failed"),
            Self::TooManyConsecutiveErrors(n) => write!(f, "too many consecutive errors ({n})"),
            Self::ScheduledReset => write!(f, "performing scheduled reset"),
            Self::LongPress => write!(f, "button long press"),
            Self::Init(msg) => write!(f, "init: {msg}"),
        }
    }
}

impl From<ConnectivityError> for ResetCause {
    fn from(e: ConnectivityError) -> Self {
        Self::ConnectionFailed(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intentional_resets_are_not_fatal() {
        assert!(!ResetCause::ScheduledReset.is_fatal());
        assert!(!ResetCause::LongPress.is_fatal());
        assert!(ResetCause::TooManyConsecutiveErrors(5).is_fatal());
        assert!(ResetCause::TimeSyncFailed.is_fatal());
    }

    #[test]
    fn soft_restart_only_with_network_up() {
        let cause = ResetCause::TooManyConsecutiveErrors(10);
        assert_eq!(cause.restart_kind(true), RestartKind::Soft);
        assert_eq!(cause.restart_kind(false), RestartKind::Full);
        assert_eq!(ResetCause::ScheduledReset.restart_kind(true), RestartKind::Full);
        assert_eq!(ResetCause::LongPress.restart_kind(true), RestartKind::Full);
    }

    #[test]
    fn fetch_error_display_names_the_layer() {
        let e: FetchError = TransportError::Status(503).into();
        assert_eq!(e.to_string(), "transport: HTTP status 503");
        let api = FetchError::Api {
            code: "101".into(),
            message: "Invalid API key".into(),
        };
        assert_eq!(api.to_string(), "API error 101: Invalid API key");
    }
}
