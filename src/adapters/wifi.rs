//! WiFi manager: station connection with a captive-portal fallback.
//!
//! Implements [`ConnectivityPort`]. The radio sits behind the small
//! [`WifiDriver`] trait so the state machine runs unchanged on the host.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: [`EspWifiDriver`] over `esp_idf_svc::wifi`,
//!   starting the [`PortalServer`](super::portal) with the access point.
//! - **all other targets**: [`SimWifiDriver`], a shared handle whose
//!   network availability and AP clients tests control.
//!
//! ## State machine
//!
//! ```text
//!  Idle ──init──► Connecting ──associated──► Connected
//!   │               │  ▲ 30 s timeout,            │ link lost
//!   │ unprovisioned │  │ retry (max 3)            ▼
//!   ▼               ▼  └────────────────── Disconnected (reconnect after 30 s)
//!  ApMode ◄──── Failed
//!   │ credentials submitted
//!   └──── +2 s ────► Connecting
//! ```
//!
//! `update` runs at most every 100 ms.

use core::fmt;

use heapless::{Deque, String};
use log::{error, info, warn};

use super::device_id::ApNameString;
use super::portal::{self, Credentials, PortalLink, PortalReply};
use crate::app::ports::{ConnectivityPort, StorageError, StoragePort, WifiState};

pub const UPDATE_INTERVAL_MS: u32 = 100;
pub const CONNECT_TIMEOUT_MS: u32 = 30_000;
pub const RECONNECT_DELAY_MS: u32 = 30_000;
/// Delay between accepting portal credentials and the connect attempt,
/// so the HTTP reply reaches the phone before the AP goes away.
pub const CONNECT_DELAY_MS: u32 = 2_000;
pub const MAX_CONNECT_ATTEMPTS: u8 = 3;

pub const WIFI_NAMESPACE: &str = "wifi";
const KEY_CONFIGURED: &str = "configured";
const KEY_SSID: &str = "ssid";
const KEY_PASSWORD: &str = "password";

// ───────────────────────────────────────────────────────────────
// Errors + events
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    Storage,
}

impl ConnectivityError {
    /// Short text shown to the user on the portal page.
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoCredentials => "No network configured",
            Self::InvalidSsid => "Network name must be 1-32 printable characters",
            Self::InvalidPassword => "Password must be empty or 8-63 characters",
            Self::ConnectionFailed => "Could not start WiFi",
            Self::Storage => "Could not save credentials",
        }
    }
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(f, "password invalid (must be 8-63 bytes, or empty for open)"),
            Self::ConnectionFailed => write!(f, "WiFi driver refused the request"),
            Self::Storage => write!(f, "credential storage failed"),
        }
    }
}

impl From<StorageError> for ConnectivityError {
    fn from(_: StorageError) -> Self {
        Self::Storage
    }
}

pub use crate::app::ports::WifiEvent;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 63 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

pub fn validate_credentials(ssid: &str, password: &str) -> Result<(), ConnectivityError> {
    validate_ssid(ssid)?;
    validate_password(password)
}

// ───────────────────────────────────────────────────────────────
// Radio seam
// ───────────────────────────────────────────────────────────────

/// What the manager needs from the radio.
pub trait WifiDriver {
    /// Switch to station mode and begin associating. Returns once the
    /// attempt is under way; progress is observed via [`is_connected`].
    ///
    /// [`is_connected`]: WifiDriver::is_connected
    fn start_station(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError>;
    /// Open access point plus portal servers.
    fn start_access_point(&mut self, ssid: &str) -> Result<(), ConnectivityError>;
    fn stop(&mut self);
    /// Associated and holding an address.
    fn is_connected(&self) -> bool;
    fn station_ip(&self) -> Option<String<16>>;
    /// Stations currently joined to our AP.
    fn ap_clients(&self) -> usize;
}

// ───────────────────────────────────────────────────────────────
// Manager
// ───────────────────────────────────────────────────────────────

pub struct WifiManager<D, S> {
    driver: D,
    storage: S,
    link: PortalLink,
    state: WifiState,
    ap_name: ApNameString,
    credentials: Option<Credentials>,
    ip: String<16>,
    retry_count: u8,
    last_attempt_ms: u32,
    last_update_ms: Option<u32>,
    pending_connect_since: Option<u32>,
    ap_clients: usize,
    events: Deque<WifiEvent, 8>,
}

impl<D: WifiDriver, S: StoragePort> WifiManager<D, S> {
    pub fn new(driver: D, storage: S, link: PortalLink, ap_name: ApNameString) -> Self {
        Self {
            driver,
            storage,
            link,
            state: WifiState::Idle,
            ap_name,
            credentials: None,
            ip: String::new(),
            retry_count: 0,
            last_attempt_ms: 0,
            last_update_ms: None,
            pending_connect_since: None,
            ap_clients: 0,
            events: Deque::new(),
        }
    }

    /// Load stored credentials and either connect or open the portal.
    pub fn init(&mut self, now_ms: u32) {
        self.credentials = self.load_credentials();
        match &self.credentials {
            Some(c) => {
                info!("WIFI: stored network '{}'", c.ssid);
                self.connect(now_ms);
            }
            None => {
                info!("WIFI: not provisioned");
                self.start_portal();
            }
        }
    }

    pub fn update(&mut self, now_ms: u32) {
        if self
            .last_update_ms
            .is_some_and(|last| now_ms.wrapping_sub(last) < UPDATE_INTERVAL_MS)
        {
            return;
        }
        self.last_update_ms = Some(now_ms);

        if let Some(creds) = portal::take_pending(&self.link) {
            let reply = self.submit_credentials(&creds.ssid, &creds.password, now_ms);
            if !reply.success {
                warn!("WIFI: portal credentials rejected: {}", reply.message);
            }
        }

        if self
            .pending_connect_since
            .is_some_and(|since| now_ms.wrapping_sub(since) >= CONNECT_DELAY_MS)
        {
            self.pending_connect_since = None;
            self.retry_count = 0;
            self.connect(now_ms);
            return;
        }

        match self.state {
            WifiState::ApMode => {
                let clients = self.driver.ap_clients();
                if clients > self.ap_clients {
                    info!("WIFI: portal client joined ({} total)", clients);
                    self.push_event(WifiEvent::ClientConnected);
                }
                self.ap_clients = clients;
            }
            WifiState::Connecting => self.poll_connecting(now_ms),
            WifiState::Connected => {
                if !self.driver.is_connected() {
                    warn!("WIFI: connection lost");
                    self.ip.clear();
                    self.last_attempt_ms = now_ms;
                    self.set_state(WifiState::Disconnected);
                    self.push_event(WifiEvent::Disconnected);
                }
            }
            WifiState::Disconnected => {
                if now_ms.wrapping_sub(self.last_attempt_ms) >= RECONNECT_DELAY_MS {
                    info!("WIFI: reconnecting");
                    self.connect(now_ms);
                }
            }
            WifiState::Idle | WifiState::Failed => {}
        }
    }

    fn poll_connecting(&mut self, now_ms: u32) {
        if self.driver.is_connected() {
            self.ip = self.driver.station_ip().unwrap_or_default();
            self.retry_count = 0;
            info!("WIFI: connected, ip {}", self.ip);
            self.set_state(WifiState::Connected);
            self.push_event(WifiEvent::Connected);
            return;
        }
        if now_ms.wrapping_sub(self.last_attempt_ms) < CONNECT_TIMEOUT_MS {
            return;
        }

        self.retry_count = self.retry_count.saturating_add(1);
        warn!(
            "WIFI: connect attempt {}/{} timed out",
            self.retry_count, MAX_CONNECT_ATTEMPTS
        );
        if self.retry_count >= MAX_CONNECT_ATTEMPTS {
            error!("WIFI: giving up, opening portal");
            self.set_state(WifiState::Failed);
            self.push_event(WifiEvent::Failed);
            self.start_portal();
        } else {
            self.begin_attempt(now_ms);
        }
    }

    /// Start associating with the stored network.
    pub fn connect(&mut self, now_ms: u32) {
        if self.credentials.is_none() {
            warn!("WIFI: connect requested without credentials");
            self.set_state(WifiState::Failed);
            return;
        }
        self.set_state(WifiState::Connecting);
        self.begin_attempt(now_ms);
    }

    fn begin_attempt(&mut self, now_ms: u32) {
        self.last_attempt_ms = now_ms;
        let Some(creds) = &self.credentials else {
            return;
        };
        info!("WIFI: connecting to '{}'", creds.ssid);
        // A refused start is handled like an attempt that never associates.
        if let Err(e) = self.driver.start_station(&creds.ssid, &creds.password) {
            warn!("WIFI: station start failed: {}", e);
        }
    }

    pub fn disconnect(&mut self) {
        self.driver.stop();
        self.ip.clear();
        self.pending_connect_since = None;
        self.set_state(WifiState::Idle);
        info!("WIFI: stopped");
    }

    pub fn start_portal(&mut self) {
        if let Err(e) = self.driver.start_access_point(&self.ap_name) {
            error!("WIFI: access point failed: {}", e);
        }
        self.ap_clients = 0;
        self.pending_connect_since = None;
        info!("WIFI: portal up as '{}'", self.ap_name);
        self.set_state(WifiState::ApMode);
        self.push_event(WifiEvent::ApStarted);
    }

    /// Validate, persist and schedule a connection. Runs for portal
    /// submissions and is public for the host simulator.
    pub fn submit_credentials(&mut self, ssid: &str, password: &str, now_ms: u32) -> PortalReply {
        PortalReply::from_result(self.store_credentials(ssid, password, now_ms))
    }

    fn store_credentials(&mut self, ssid: &str, password: &str, now_ms: u32) -> Result<(), ConnectivityError> {
        let creds = Credentials::new(ssid, password)?;
        self.storage.write(WIFI_NAMESPACE, KEY_SSID, creds.ssid.as_bytes())?;
        self.storage.write(WIFI_NAMESPACE, KEY_PASSWORD, creds.password.as_bytes())?;
        self.storage.write(WIFI_NAMESPACE, KEY_CONFIGURED, &[1])?;
        info!("WIFI: credentials saved for '{}'", creds.ssid);
        self.credentials = Some(creds);
        self.pending_connect_since = Some(now_ms);
        self.push_event(WifiEvent::CredentialsSaved);
        Ok(())
    }

    /// Forget the stored network and drop the connection.
    pub fn clear_credentials(&mut self) -> Result<(), ConnectivityError> {
        self.storage.erase_namespace(WIFI_NAMESPACE)?;
        self.credentials = None;
        self.disconnect();
        info!("WIFI: credentials cleared");
        Ok(())
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn portal_link(&self) -> &PortalLink {
        &self.link
    }

    // ── internals ─────────────────────────────────────────────

    fn load_credentials(&self) -> Option<Credentials> {
        let mut flag = [0u8; 1];
        match self.storage.read(WIFI_NAMESPACE, KEY_CONFIGURED, &mut flag) {
            Ok(1) if flag[0] == 1 => {}
            _ => return None,
        }
        let mut ssid = [0u8; 32];
        let mut password = [0u8; 64];
        let ssid_len = self.storage.read(WIFI_NAMESPACE, KEY_SSID, &mut ssid).ok()?;
        let password_len = self
            .storage
            .read(WIFI_NAMESPACE, KEY_PASSWORD, &mut password)
            .unwrap_or(0);
        let ssid = core::str::from_utf8(&ssid[..ssid_len]).ok()?;
        let password = core::str::from_utf8(&password[..password_len]).ok()?;
        match Credentials::new(ssid, password) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("WIFI: stored credentials ignored: {}", e);
                None
            }
        }
    }

    fn set_state(&mut self, next: WifiState) {
        if self.state == next {
            return;
        }
        self.state = next;
        let ip = self.ip_address().unwrap_or("");
        let ssid = self.credentials.as_ref().map_or("", |c| c.ssid.as_str());
        portal::publish_status(&self.link, next, &self.ap_name, ssid, ip);
    }

    fn push_event(&mut self, event: WifiEvent) {
        if self.events.is_full() {
            self.events.pop_front();
        }
        let _ = self.events.push_back(event);
    }
}

impl<D: WifiDriver, S: StoragePort> ConnectivityPort for WifiManager<D, S> {
    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    fn state(&self) -> WifiState {
        self.state
    }

    fn ap_name(&self) -> &str {
        &self.ap_name
    }

    fn ssid(&self) -> &str {
        self.credentials.as_ref().map_or("", |c| c.ssid.as_str())
    }

    fn ip_address(&self) -> Option<&str> {
        match self.state {
            WifiState::Connected => Some(self.ip.as_str()),
            WifiState::ApMode => Some(portal::AP_ADDRESS_STR),
            _ => None,
        }
    }

    fn start_portal(&mut self) {
        WifiManager::start_portal(self);
    }

    fn update(&mut self, now_ms: u32) {
        WifiManager::update(self, now_ms);
    }

    fn pop_event(&mut self) -> Option<WifiEvent> {
        self.events.pop_front()
    }
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF driver
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub struct EspWifiDriver {
    wifi: esp_idf_svc::wifi::EspWifi<'static>,
    link: PortalLink,
    portal: Option<portal::PortalServer>,
}

#[cfg(target_os = "espidf")]
impl EspWifiDriver {
    pub fn new(
        modem: esp_idf_svc::hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        link: PortalLink,
    ) -> anyhow::Result<Self> {
        let wifi = esp_idf_svc::wifi::EspWifi::new(modem, sysloop, None)?;
        Ok(Self {
            wifi,
            link,
            portal: None,
        })
    }

    fn restart_with(&mut self, conf: &esp_idf_svc::wifi::Configuration) -> Result<(), ConnectivityError> {
        if self.wifi.is_started().unwrap_or(false) {
            let _ = self.wifi.disconnect();
            let _ = self.wifi.stop();
        }
        self.wifi
            .set_configuration(conf)
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi.start().map_err(|_| ConnectivityError::ConnectionFailed)
    }
}

#[cfg(target_os = "espidf")]
impl WifiDriver for EspWifiDriver {
    fn start_station(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        self.portal = None;
        let conf = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: password
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method: if password.is_empty() {
                AuthMethod::None
            } else {
                AuthMethod::WPA2Personal
            },
            ..Default::default()
        });
        self.restart_with(&conf)?;
        self.wifi
            .connect()
            .map_err(|_| ConnectivityError::ConnectionFailed)
    }

    fn start_access_point(&mut self, ssid: &str) -> Result<(), ConnectivityError> {
        use esp_idf_svc::wifi::{AccessPointConfiguration, AuthMethod, Configuration};

        self.portal = None;
        let conf = Configuration::AccessPoint(AccessPointConfiguration {
            ssid: ssid.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            auth_method: AuthMethod::None,
            channel: 1,
            max_connections: 4,
            ..Default::default()
        });
        self.restart_with(&conf)?;
        match portal::PortalServer::start(self.link.clone()) {
            Ok(server) => self.portal = Some(server),
            Err(e) => error!("WIFI: portal server failed: {:?}", e),
        }
        Ok(())
    }

    fn stop(&mut self) {
        self.portal = None;
        let _ = self.wifi.disconnect();
        let _ = self.wifi.stop();
    }

    fn is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    fn station_ip(&self) -> Option<String<16>> {
        use core::fmt::Write as _;

        let info = self.wifi.sta_netif().get_ip_info().ok()?;
        let mut out = String::new();
        write!(out, "{}", info.ip).ok()?;
        Some(out)
    }

    fn ap_clients(&self) -> usize {
        let mut list: esp_idf_svc::sys::wifi_sta_list_t = unsafe { core::mem::zeroed() };
        // SAFETY: out-pointer to a zeroed local.
        let ret = unsafe { esp_idf_svc::sys::esp_wifi_ap_get_sta_list(&mut list) };
        if ret == esp_idf_svc::sys::ESP_OK {
            list.num.max(0) as usize
        } else {
            0
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Simulation driver
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};

    use super::*;

    #[derive(Debug)]
    struct Radio {
        network_available: AtomicBool,
        station: AtomicBool,
        access_point: AtomicBool,
        clients: AtomicUsize,
        station_starts: AtomicU32,
    }

    /// Host stand-in for the radio. Clones share one radio, so a test
    /// keeps a clone to flip availability after handing one to the manager.
    #[derive(Debug, Clone)]
    pub struct SimWifiDriver {
        radio: Arc<Radio>,
    }

    impl Default for SimWifiDriver {
        fn default() -> Self {
            Self::new()
        }
    }

    impl SimWifiDriver {
        /// A network that accepts any credentials.
        pub fn new() -> Self {
            Self {
                radio: Arc::new(Radio {
                    network_available: AtomicBool::new(true),
                    station: AtomicBool::new(false),
                    access_point: AtomicBool::new(false),
                    clients: AtomicUsize::new(0),
                    station_starts: AtomicU32::new(0),
                }),
            }
        }

        pub fn set_network_available(&self, available: bool) {
            self.radio.network_available.store(available, Ordering::Release);
        }

        pub fn join_ap_client(&self) {
            self.radio.clients.fetch_add(1, Ordering::AcqRel);
        }

        pub fn is_access_point(&self) -> bool {
            self.radio.access_point.load(Ordering::Acquire)
        }

        pub fn station_starts(&self) -> u32 {
            self.radio.station_starts.load(Ordering::Acquire)
        }
    }

    impl WifiDriver for SimWifiDriver {
        fn start_station(&mut self, ssid: &str, _password: &str) -> Result<(), ConnectivityError> {
            log::info!("WIFI(sim): station start '{}'", ssid);
            self.radio.access_point.store(false, Ordering::Release);
            self.radio.clients.store(0, Ordering::Release);
            self.radio.station.store(true, Ordering::Release);
            self.radio.station_starts.fetch_add(1, Ordering::AcqRel);
            Ok(())
        }

        fn start_access_point(&mut self, ssid: &str) -> Result<(), ConnectivityError> {
            log::info!("WIFI(sim): access point '{}'", ssid);
            self.radio.station.store(false, Ordering::Release);
            self.radio.access_point.store(true, Ordering::Release);
            Ok(())
        }

        fn stop(&mut self) {
            self.radio.station.store(false, Ordering::Release);
            self.radio.access_point.store(false, Ordering::Release);
        }

        fn is_connected(&self) -> bool {
            self.radio.station.load(Ordering::Acquire)
                && self.radio.network_available.load(Ordering::Acquire)
        }

        fn station_ip(&self) -> Option<String<16>> {
            self.is_connected()
                .then(|| String::try_from("192.168.1.50").unwrap_or_default())
        }

        fn ap_clients(&self) -> usize {
            self.radio.clients.load(Ordering::Acquire)
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use sim::SimWifiDriver;

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::nvs::NvsAdapter;

    fn manager() -> (WifiManager<SimWifiDriver, NvsAdapter>, SimWifiDriver, NvsAdapter) {
        let radio = SimWifiDriver::new();
        let nvs = NvsAdapter::new().unwrap();
        let name = ApNameString::try_from("coompel-CAFE").unwrap();
        let m = WifiManager::new(radio.clone(), nvs.clone(), portal::new_link(), name);
        (m, radio, nvs)
    }

    fn drain(m: &mut WifiManager<SimWifiDriver, NvsAdapter>) -> Vec<WifiEvent> {
        std::iter::from_fn(|| m.pop_event()).collect()
    }

    #[test]
    fn credential_validation() {
        assert_eq!(validate_credentials("", "password123"), Err(ConnectivityError::InvalidSsid));
        assert_eq!(validate_credentials(&"x".repeat(33), ""), Err(ConnectivityError::InvalidSsid));
        assert_eq!(validate_credentials("Net\u{7}", ""), Err(ConnectivityError::InvalidSsid));
        assert_eq!(validate_credentials("MyNet", "short"), Err(ConnectivityError::InvalidPassword));
        assert_eq!(
            validate_credentials("MyNet", &"p".repeat(64)),
            Err(ConnectivityError::InvalidPassword)
        );
        assert!(validate_credentials("OpenCafe", "").is_ok());
        assert!(validate_credentials("HomeWiFi", "mysecret8").is_ok());
    }

    #[test]
    fn unprovisioned_boot_opens_portal() {
        let (mut m, radio, _) = manager();
        m.init(0);
        assert_eq!(m.state(), WifiState::ApMode);
        assert!(radio.is_access_point());
        assert_eq!(m.ip_address(), Some("192.168.4.1"));
        assert_eq!(drain(&mut m), vec![WifiEvent::ApStarted]);
    }

    #[test]
    fn portal_submission_connects_after_delay() {
        let (mut m, radio, _) = manager();
        m.init(0);
        radio.join_ap_client();
        m.update(100);
        assert!(portal::submit(m.portal_link(), br#"{"ssid":"Home","password":"secret123"}"#).success);
        m.update(200);
        assert_eq!(m.state(), WifiState::ApMode);
        m.update(2_100);
        assert_eq!(m.state(), WifiState::ApMode);
        m.update(2_200);
        assert_eq!(m.state(), WifiState::Connecting);
        m.update(2_300);
        assert_eq!(m.state(), WifiState::Connected);
        assert_eq!(m.ssid(), "Home");
        assert_eq!(m.ip_address(), Some("192.168.1.50"));
        assert_eq!(
            drain(&mut m),
            vec![
                WifiEvent::ApStarted,
                WifiEvent::ClientConnected,
                WifiEvent::CredentialsSaved,
                WifiEvent::Connected
            ]
        );
    }

    #[test]
    fn stored_credentials_survive_restart() {
        let (mut m, _, nvs) = manager();
        assert!(m.submit_credentials("Home", "secret123", 0).success);
        let mut again = WifiManager::new(
            SimWifiDriver::new(),
            nvs,
            portal::new_link(),
            ApNameString::new(),
        );
        again.init(0);
        assert_eq!(again.state(), WifiState::Connecting);
        again.update(100);
        assert!(again.is_connected());
    }

    #[test]
    fn rejected_submission_keeps_portal() {
        let (mut m, _, _) = manager();
        m.init(0);
        let reply = m.submit_credentials("Home", "short", 10);
        assert!(!reply.success);
        m.update(5_000);
        assert_eq!(m.state(), WifiState::ApMode);
        assert!(!m.is_configured());
    }

    #[test]
    fn three_timeouts_fall_back_to_portal() {
        let (mut m, radio, _) = manager();
        radio.set_network_available(false);
        assert!(m.submit_credentials("Home", "secret123", 0).success);
        m.update(2_000);
        assert_eq!(m.state(), WifiState::Connecting);
        let mut now = 2_000;
        for _ in 0..MAX_CONNECT_ATTEMPTS {
            now += CONNECT_TIMEOUT_MS;
            m.update(now);
        }
        assert_eq!(m.state(), WifiState::ApMode);
        assert_eq!(radio.station_starts(), u32::from(MAX_CONNECT_ATTEMPTS));
        let events = drain(&mut m);
        assert!(events.contains(&WifiEvent::Failed));
        assert_eq!(events.last(), Some(&WifiEvent::ApStarted));
    }

    #[test]
    fn lost_link_reconnects_after_delay() {
        let (mut m, radio, _) = manager();
        m.submit_credentials("Home", "secret123", 0);
        m.update(2_000);
        m.update(2_100);
        assert!(m.is_connected());

        radio.set_network_available(false);
        m.update(3_000);
        assert_eq!(m.state(), WifiState::Disconnected);
        assert_eq!(m.ip_address(), None);

        radio.set_network_available(true);
        m.update(3_000 + RECONNECT_DELAY_MS - 100);
        assert_eq!(m.state(), WifiState::Disconnected);
        m.update(3_000 + RECONNECT_DELAY_MS);
        assert_eq!(m.state(), WifiState::Connecting);
        m.update(3_100 + RECONNECT_DELAY_MS);
        assert!(m.is_connected());
    }

    #[test]
    fn updates_are_throttled() {
        let (mut m, radio, _) = manager();
        m.submit_credentials("Home", "secret123", 0);
        m.update(2_000);
        assert_eq!(m.state(), WifiState::Connecting);
        assert!(radio.is_connected());
        m.update(2_050);
        assert_eq!(m.state(), WifiState::Connecting);
        m.update(2_100);
        assert_eq!(m.state(), WifiState::Connected);
    }

    #[test]
    fn clearing_credentials_forgets_network() {
        let (mut m, _, nvs) = manager();
        m.submit_credentials("Home", "secret123", 0);
        m.clear_credentials().unwrap();
        assert!(!m.is_configured());
        assert_eq!(m.state(), WifiState::Idle);
        assert!(!nvs.exists(WIFI_NAMESPACE, KEY_SSID));
    }
}
