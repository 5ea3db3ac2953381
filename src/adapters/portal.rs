//! Captive portal for WiFi provisioning.
//!
//! While the access point runs, a phone that joins `coompel-XXYY` is sent
//! to `http://192.168.4.1/`: a DNS responder answers every A query with
//! the AP address and the HTTP server serves a one-page form.
//!
//! | Route            | Method | Behaviour                                   |
//! |------------------|--------|---------------------------------------------|
//! | `/`              | GET    | setup page                                  |
//! | `/connect`       | POST   | `{"ssid","password"}` → `{"success","message"}` |
//! | `/status`        | GET    | current WiFi state as JSON                  |
//! | OS probe URLs    | GET    | 302 to `/`                                  |
//!
//! Handlers run on the HTTP server task. They only validate and queue the
//! credentials in the shared [`PortalLink`]; the WiFi manager picks them
//! up on the main loop, persists them and connects.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use heapless::String;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::wifi::{ConnectivityError, validate_credentials};
use crate::app::ports::WifiState;

pub const AP_ADDRESS: [u8; 4] = [192, 168, 4, 1];
pub const AP_ADDRESS_STR: &str = "192.168.4.1";
/// Largest request body the portal accepts.
pub const MAX_BODY: usize = 256;
const DNS_TTL_SECS: u32 = 60;

/// Station credentials, already validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub ssid: String<32>,
    pub password: String<64>,
}

impl Credentials {
    pub fn new(ssid: &str, password: &str) -> Result<Self, ConnectivityError> {
        validate_credentials(ssid, password)?;
        Ok(Self {
            ssid: String::try_from(ssid).map_err(|_| ConnectivityError::InvalidSsid)?,
            password: String::try_from(password).map_err(|_| ConnectivityError::InvalidPassword)?,
        })
    }
}

/// Answer to a credential submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PortalReply {
    pub success: bool,
    pub message: &'static str,
}

impl PortalReply {
    pub fn from_result(result: Result<(), ConnectivityError>) -> Self {
        match result {
            Ok(()) => Self {
                success: true,
                message: "Credentials saved, connecting...",
            },
            Err(e) => Self {
                success: false,
                message: e.message(),
            },
        }
    }

    pub fn to_json(&self) -> std::string::String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"success":false}"#.into())
    }
}

#[derive(Deserialize)]
struct ConnectRequest {
    ssid: std::string::String,
    #[serde(default)]
    password: std::string::String,
}

#[derive(Serialize)]
struct StatusBody<'a> {
    state: &'static str,
    ap: &'a str,
    ssid: &'a str,
    ip: &'a str,
}

// ───────────────────────────────────────────────────────────────
// Shared state between the HTTP task and the main loop
// ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct PortalShared {
    pending: Option<Credentials>,
    state: WifiState,
    ap_name: String<16>,
    ssid: String<32>,
    ip: String<16>,
}

pub type PortalLink = Arc<Mutex<PortalShared>>;

pub fn new_link() -> PortalLink {
    Arc::new(Mutex::new(PortalShared {
        pending: None,
        state: WifiState::Idle,
        ap_name: String::new(),
        ssid: String::new(),
        ip: String::new(),
    }))
}

fn lock(link: &PortalLink) -> MutexGuard<'_, PortalShared> {
    link.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle a `/connect` body: validate and queue for the main loop. A
/// second submission before the first is picked up replaces it.
pub fn submit(link: &PortalLink, body: &[u8]) -> PortalReply {
    let request: ConnectRequest = match serde_json::from_slice(body) {
        Ok(r) => r,
        Err(_) => {
            warn!("PORTAL: malformed request body");
            return PortalReply {
                success: false,
                message: "Invalid JSON",
            };
        }
    };
    let result = Credentials::new(&request.ssid, &request.password).map(|creds| {
        info!("PORTAL: credentials received for '{}'", creds.ssid);
        lock(link).pending = Some(creds);
    });
    PortalReply::from_result(result)
}

/// Taken by the WiFi manager on the main loop.
pub fn take_pending(link: &PortalLink) -> Option<Credentials> {
    lock(link).pending.take()
}

pub fn publish_status(link: &PortalLink, state: WifiState, ap_name: &str, ssid: &str, ip: &str) {
    let mut s = lock(link);
    s.state = state;
    s.ap_name = crate::weather::bounded(ap_name, 16);
    s.ssid = crate::weather::bounded(ssid, 32);
    s.ip = crate::weather::bounded(ip, 16);
}

pub fn status_json(link: &PortalLink) -> std::string::String {
    let s = lock(link);
    let body = StatusBody {
        state: s.state.label(),
        ap: &s.ap_name,
        ssid: &s.ssid,
        ip: &s.ip,
    };
    serde_json::to_string(&body).unwrap_or_default()
}

// ───────────────────────────────────────────────────────────────
// DNS catch-all
// ───────────────────────────────────────────────────────────────

/// Build a response that resolves the first question of `query` to `ip`.
/// Returns `None` for anything that is not a well-formed standard query.
pub fn dns_answer(query: &[u8], ip: [u8; 4]) -> Option<Vec<u8>> {
    if query.len() < 12 {
        return None;
    }
    let flags = u16::from_be_bytes([query[2], query[3]]);
    let qdcount = u16::from_be_bytes([query[4], query[5]]);
    // QR=0, OPCODE=0
    if flags & 0xF800 != 0 || qdcount == 0 {
        return None;
    }

    // Walk the QNAME labels.
    let mut pos = 12;
    loop {
        let len = usize::from(*query.get(pos)?);
        pos += 1;
        if len == 0 {
            break;
        }
        if len & 0xC0 != 0 {
            return None;
        }
        pos += len;
    }
    let question_end = pos + 4;
    if question_end > query.len() {
        return None;
    }

    let mut reply = Vec::with_capacity(question_end + 16);
    reply.extend_from_slice(&query[..2]);
    reply.extend_from_slice(&[0x81, 0x80]);
    reply.extend_from_slice(&[0, 1, 0, 1, 0, 0, 0, 0]);
    reply.extend_from_slice(&query[12..question_end]);
    reply.extend_from_slice(&[0xC0, 0x0C, 0, 1, 0, 1]);
    reply.extend_from_slice(&DNS_TTL_SECS.to_be_bytes());
    reply.extend_from_slice(&[0, 4]);
    reply.extend_from_slice(&ip);
    Some(reply)
}

// ───────────────────────────────────────────────────────────────
// ESP-IDF servers
// ───────────────────────────────────────────────────────────────

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const SETUP_PAGE: &str = r#"<!DOCTYPE html><html><head><meta name="viewport" content="width=device-width,initial-scale=1"><title>Coompel WiFi</title>
<style>body{font-family:sans-serif;max-width:22em;margin:2em auto}input,button{width:100%;padding:.6em;margin:.3em 0}</style></head>
<body><h2>Coompel WiFi setup</h2><form id="f"><input id="s" placeholder="Network name" maxlength="32" required>
<input id="p" type="password" placeholder="Password" maxlength="63"><button>Connect</button></form><p id="m"></p>
<script>document.getElementById('f').onsubmit=async e=>{e.preventDefault();
const r=await fetch('/connect',{method:'POST',headers:{'Content-Type':'application/json'},
body:JSON.stringify({ssid:document.getElementById('s').value,password:document.getElementById('p').value})});
const j=await r.json();document.getElementById('m').textContent=j.message;};</script></body></html>"#;

/// OS connectivity probes that should land on the setup page.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const PROBE_PATHS: [&str; 4] = [
    "/generate_204",
    "/hotspot-detect.html",
    "/connecttest.txt",
    "/ncsi.txt",
];

/// The running HTTP server and DNS responder. Dropping it stops both.
#[cfg(target_os = "espidf")]
pub struct PortalServer {
    _http: esp_idf_svc::http::server::EspHttpServer<'static>,
    dns_running: Arc<std::sync::atomic::AtomicBool>,
}

#[cfg(target_os = "espidf")]
impl PortalServer {
    pub fn start(link: PortalLink) -> anyhow::Result<Self> {
        use embedded_svc::http::Method;
        use embedded_svc::io::{Read, Write};
        use esp_idf_svc::http::server::{Configuration, EspHttpServer};

        let conf = Configuration {
            stack_size: 8 * 1024,
            ..Default::default()
        };
        let mut http = EspHttpServer::new(&conf)?;

        http.fn_handler::<anyhow::Error, _>("/", Method::Get, |req| {
            req.into_ok_response()?.write_all(SETUP_PAGE.as_bytes())?;
            Ok(())
        })?;

        {
            let link = link.clone();
            http.fn_handler::<anyhow::Error, _>("/connect", Method::Post, move |mut req| {
                let mut body = [0u8; MAX_BODY];
                let mut len = 0;
                while len < body.len() {
                    let n = req.read(&mut body[len..])?;
                    if n == 0 {
                        break;
                    }
                    len += n;
                }
                let reply = submit(&link, &body[..len]);
                let status = if reply.success { 200 } else { 400 };
                req.into_response(status, None, &[("Content-Type", "application/json")])?
                    .write_all(reply.to_json().as_bytes())?;
                Ok(())
            })?;
        }

        {
            let link = link.clone();
            http.fn_handler::<anyhow::Error, _>("/status", Method::Get, move |req| {
                req.into_response(200, None, &[("Content-Type", "application/json")])?
                    .write_all(status_json(&link).as_bytes())?;
                Ok(())
            })?;
        }

        for path in PROBE_PATHS {
            http.fn_handler::<anyhow::Error, _>(path, Method::Get, |req| {
                req.into_response(302, None, &[("Location", "http://192.168.4.1/")])?;
                Ok(())
            })?;
        }

        let dns_running = Arc::new(std::sync::atomic::AtomicBool::new(true));
        {
            let running = dns_running.clone();
            crate::drivers::task_pin::spawn_on_core(
                crate::drivers::task_pin::Core::Any,
                2,
                4,
                "dns\0",
                move || run_dns(&running),
            )
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        }

        info!("PORTAL: serving on http://{}/", AP_ADDRESS_STR);
        Ok(Self {
            _http: http,
            dns_running,
        })
    }
}

#[cfg(target_os = "espidf")]
impl Drop for PortalServer {
    fn drop(&mut self) {
        self.dns_running
            .store(false, std::sync::atomic::Ordering::Release);
        info!("PORTAL: stopped");
    }
}

#[cfg(target_os = "espidf")]
fn run_dns(running: &std::sync::atomic::AtomicBool) {
    use std::net::UdpSocket;
    use std::sync::atomic::Ordering;

    let socket = match UdpSocket::bind("0.0.0.0:53") {
        Ok(s) => s,
        Err(e) => {
            warn!("PORTAL: DNS bind failed: {}", e);
            return;
        }
    };
    let _ = socket.set_read_timeout(Some(std::time::Duration::from_millis(500)));
    let mut buf = [0u8; 512];
    while running.load(Ordering::Acquire) {
        let Ok((n, peer)) = socket.recv_from(&mut buf) else {
            continue;
        };
        if let Some(reply) = dns_answer(&buf[..n], AP_ADDRESS) {
            let _ = socket.send_to(&reply, peer);
        }
    }
}
