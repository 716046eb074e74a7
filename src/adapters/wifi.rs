//! WiFi station-mode adapter.
//!
//! Implements [`ConnectivityPort`], the hexagonal boundary for network
//! connectivity.  The tracker connects once at startup; a failed or lost
//! association is handled by the reset path, not by reconnect logic here.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.

use core::net::Ipv4Addr;

use log::{error, info, warn};

use crate::app::ports::ConnectivityPort;
use crate::error::ConnectivityError;

use super::utils::{validate_password, validate_ssid};

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting,
    Connected(Ipv4Addr),
    Failed,
}

/// Interval between link checks while waiting for an address.
#[cfg(target_os = "espidf")]
const LINK_POLL_MS: u64 = 1_000;

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    #[cfg(target_os = "espidf")]
    wifi: Box<esp_idf_svc::wifi::EspWifi<'static>>,
    /// Simulation: next connect fails with this driver status.
    #[cfg(not(target_os = "espidf"))]
    sim_failure: Option<ConnectivityError>,
    #[cfg(not(target_os = "espidf"))]
    sim_connect_counter: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: esp_idf_hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
    ) -> Result<Self, ConnectivityError> {
        let wifi = esp_idf_svc::wifi::EspWifi::new(modem, sysloop, nvs)
            .map_err(|e| ConnectivityError::ConnectionFailed(e.code()))?;
        Ok(Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            wifi: Box::new(wifi),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            sim_failure: None,
            sim_connect_counter: 0,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Store validated credentials for the next [`connect`](ConnectivityPort::connect).
    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials updated (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Simulation: make subsequent connects fail with `err`.
    #[cfg(not(target_os = "espidf"))]
    pub fn simulate_failure(&mut self, err: Option<ConnectivityError>) {
        self.sim_failure = err;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, max_wait_secs: u32) -> Result<Ipv4Addr, ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let failed = |e: esp_idf_svc::sys::EspError| ConnectivityError::ConnectionFailed(e.code());

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        self.wifi
            .set_configuration(&Configuration::Client(ClientConfiguration {
                ssid: self.ssid.clone(),
                password: self.password.clone(),
                auth_method,
                ..Default::default()
            }))
            .map_err(failed)?;
        self.wifi.start().map_err(failed)?;
        self.wifi.connect().map_err(failed)?;

        let mut waited_secs = 0;
        loop {
            if self.wifi.is_up().map_err(failed)? {
                let ip_info = self.wifi.sta_netif().get_ip_info().map_err(failed)?;
                return Ok(Ipv4Addr::from(ip_info.ip.octets()));
            }
            if waited_secs >= max_wait_secs {
                return Err(ConnectivityError::Timeout);
            }
            info!("WiFi: waiting for connection ({}s)", waited_secs);
            std::thread::sleep(std::time::Duration::from_millis(LINK_POLL_MS));
            waited_secs += 1;
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, _max_wait_secs: u32) -> Result<Ipv4Addr, ConnectivityError> {
        self.sim_connect_counter = self.sim_connect_counter.wrapping_add(1);
        if let Some(err) = self.sim_failure {
            warn!("WiFi(sim): simulated failure (attempt {})", self.sim_connect_counter);
            return Err(err);
        }
        info!("WiFi(sim): connected to '{}' (attempt {})", self.ssid, self.sim_connect_counter);
        Ok(Ipv4Addr::new(192, 168, 1, 50))
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        let _ = self.wifi.disconnect();
        let _ = self.wifi.stop();
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        info!("WiFi(sim): disconnected");
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        matches!(self.state, WifiState::Connected(_)) && self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        matches!(self.state, WifiState::Connected(_))
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// ConnectivityPort
// ───────────────────────────────────────────────────────────────

impl ConnectivityPort for WifiAdapter {
    fn connect(&mut self, max_wait_secs: u32) -> Result<Ipv4Addr, ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        if let WifiState::Connected(ip) = self.state {
            return Ok(ip);
        }

        info!("WiFi: connecting to '{}' (up to {}s)", self.ssid, max_wait_secs);
        self.state = WifiState::Connecting;

        match self.platform_connect(max_wait_secs) {
            Ok(ip) => {
                self.state = WifiState::Connected(ip);
                info!("WiFi: connected, IP {}", ip);
                Ok(ip)
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.state = WifiState::Failed;
                Err(e)
            }
        }
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.platform_is_connected()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
