//! WiFi station-mode adapter.
//!
//! Brings the station up at boot and keeps the pump's connectivity
//! interlock fed: [`LinkMonitor::poll`] probes the association, publishes
//! the result to a [`LinkStatus`] and retries the connection with an
//! exponential backoff (2 s → 4 s → 8 s … capped at 60 s).
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls.
//! - **all other targets**: a settable simulated station.

use core::fmt;

use log::{info, warn};

use crate::app::ports::Timestamp;
use crate::pump::interlock::{LinkProbe, LinkStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

/// Validated station credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiCredentials {
    ssid: heapless::String<32>,
    password: heapless::String<64>,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        if ssid.is_empty() || !is_printable_ascii(ssid) {
            return Err(ConnectivityError::InvalidSsid);
        }
        if !password.is_empty() && password.len() < 8 {
            return Err(ConnectivityError::InvalidPassword);
        }
        let mut creds = Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
        };
        creds.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        creds.password.push_str(password).map_err(|_| ConnectivityError::InvalidPassword)?;
        Ok(creds)
    }

    /// Credentials baked in at build time through `WIFI_SSID` / `WIFI_PASS`.
    pub fn from_build_env() -> Result<Self, ConnectivityError> {
        let ssid = option_env!("WIFI_SSID").ok_or(ConnectivityError::NoCredentials)?;
        Self::new(ssid, option_env!("WIFI_PASS").unwrap_or(""))
    }

    pub fn ssid(&self) -> &str {
        &self.ssid
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn is_open(&self) -> bool {
        self.password.is_empty()
    }
}

// ───────────────────────────────────────────────────────────────
// Link monitor
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Connected,
    Reconnecting { attempt: u32 },
}

const INITIAL_BACKOFF_SECS: u64 = 2;
const MAX_BACKOFF_SECS: u64 = 60;

/// Tracks station association and drives the connectivity flag.
pub struct LinkMonitor {
    link: LinkStatus,
    state: WifiState,
    backoff_secs: u64,
    next_retry_at: Timestamp,
    #[cfg(not(target_os = "espidf"))]
    sim_station_up: bool,
}

impl LinkMonitor {
    /// Start in `Reconnecting` until the first probe says otherwise.
    pub fn new(link: LinkStatus) -> Self {
        Self {
            link,
            state: WifiState::Reconnecting { attempt: 0 },
            backoff_secs: INITIAL_BACKOFF_SECS,
            next_retry_at: 0,
            #[cfg(not(target_os = "espidf"))]
            sim_station_up: true,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn link(&self) -> &LinkStatus {
        &self.link
    }

    /// Probe the station and update the link flag.
    pub fn poll(&mut self, now: Timestamp) {
        let up = self.platform_station_up();
        self.link.set_connected(up);

        match (self.state, up) {
            (WifiState::Connected, true) => {}
            (WifiState::Connected, false) => {
                warn!("WiFi: connection lost, entering reconnect");
                self.state = WifiState::Reconnecting { attempt: 0 };
                self.backoff_secs = INITIAL_BACKOFF_SECS;
                self.next_retry_at = now;
            }
            (WifiState::Reconnecting { .. }, true) => {
                info!("WiFi: connected");
                self.state = WifiState::Connected;
                self.backoff_secs = INITIAL_BACKOFF_SECS;
            }
            (WifiState::Reconnecting { attempt }, false) => {
                if now < self.next_retry_at {
                    return;
                }
                info!("WiFi: reconnect attempt {} (backoff {}s)", attempt, self.backoff_secs);
                self.platform_reconnect();
                self.next_retry_at = now + self.backoff_secs * 1000;
                self.backoff_secs = (self.backoff_secs * 2).min(MAX_BACKOFF_SECS);
                self.state = WifiState::Reconnecting { attempt: attempt + 1 };
            }
        }
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_station_up(&self) -> bool {
        let mut ap_info = esp_idf_svc::sys::wifi_ap_record_t::default();
        // SAFETY: fills a caller-owned record; fails when not associated.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_sta_get_ap_info(&mut ap_info) };
        ret == esp_idf_svc::sys::ESP_OK
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_station_up(&self) -> bool {
        self.sim_station_up
    }

    #[cfg(target_os = "espidf")]
    fn platform_reconnect(&mut self) {
        // SAFETY: the driver was started at boot; connect is asynchronous.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_connect() };
        if ret != esp_idf_svc::sys::ESP_OK {
            warn!("WiFi: esp_wifi_connect returned {}", ret);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_reconnect(&mut self) {
        info!("WiFi(sim): reconnect requested");
    }

    /// Simulation: make the station appear (dis)associated.
    #[cfg(not(target_os = "espidf"))]
    pub fn set_sim_station_up(&mut self, up: bool) {
        self.sim_station_up = up;
    }
}

impl LinkProbe for LinkMonitor {
    fn is_connected(&self) -> bool {
        self.link.is_connected()
    }
}

// ───────────────────────────────────────────────────────────────
// Station bring-up (device only)
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn connect_station(
    modem: esp_idf_svc::hal::modem::Modem,
    sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
    nvs: esp_idf_svc::nvs::EspDefaultNvsPartition,
    creds: &WifiCredentials,
) -> anyhow::Result<esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>> {
    use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), Some(nvs))?, sysloop)?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: creds.ssid().try_into().map_err(|_| anyhow::anyhow!("SSID too long"))?,
        password: creds.password().try_into().map_err(|_| anyhow::anyhow!("password too long"))?,
        auth_method: if creds.is_open() { AuthMethod::None } else { AuthMethod::WPA2Personal },
        ..Default::default()
    }))?;
    wifi.start()?;
    info!("WiFi: connecting to '{}'", creds.ssid());
    if let Err(e) = wifi.connect().and_then(|()| wifi.wait_netif_up()) {
        // The link monitor keeps retrying; the pump stays interlocked meanwhile.
        warn!("WiFi: initial connect failed: {:?}", e);
    }
    Ok(wifi)
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────
