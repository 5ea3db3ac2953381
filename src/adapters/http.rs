//! HTTPS client behind [`HttpPort`].
//!
//! - **`target_os = "espidf"`**: one `EspHttpConnection` per request,
//!   certificates from the ESP-IDF CA bundle, body read in 1 KB chunks.
//! - **all other targets**: [`CannedHttp`], which answers from a table of
//!   URL prefixes so the host build can run the weather pipeline offline.
//!
//! Non-200 statuses are returned as responses, not errors; the caller
//! decides what they mean.

use crate::app::ports::{HttpError, HttpPort, HttpResponse};

/// Bodies larger than this are refused with [`HttpError::TooLarge`].
pub const MAX_BODY_BYTES: usize = 32 * 1024;

#[cfg(target_os = "espidf")]
#[derive(Debug, Default, Clone, Copy)]
pub struct EspHttp;

#[cfg(target_os = "espidf")]
impl EspHttp {
    pub fn new() -> Self {
        Self
    }

    fn fetch(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout_ms: u32,
    ) -> anyhow::Result<Result<HttpResponse, HttpError>> {
        use embedded_svc::http::Method;
        use embedded_svc::http::client::Client;
        use embedded_svc::io::Read;
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

        let config = Configuration {
            timeout: Some(std::time::Duration::from_millis(u64::from(timeout_ms))),
            use_global_ca_store: true,
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let connection = EspHttpConnection::new(&config)?;
        let mut client = Client::wrap(connection);
        let mut response = client.request(Method::Get, url, headers)?.submit()?;
        let status = response.status();
        log::debug!("HTTP: GET {} -> {}", url.chars().take(80).collect::<String>(), status);

        let mut body = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = response.read(&mut buf)?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&buf[..n]);
            if body.len() > MAX_BODY_BYTES {
                return Ok(Err(HttpError::TooLarge));
            }
        }
        let body = String::from_utf8(body).map_err(|_| anyhow::anyhow!("body is not UTF-8"))?;
        Ok(Ok(HttpResponse { status, body }))
    }
}

#[cfg(target_os = "espidf")]
impl HttpPort for EspHttp {
    fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout_ms: u32,
    ) -> Result<HttpResponse, HttpError> {
        match self.fetch(url, headers, timeout_ms) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("HTTP: request failed: {:?}", e);
                Err(classify(&format!("{:?}", e)))
            }
        }
    }
}

/// Map an ESP-IDF error description to a transport error.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
fn classify(description: &str) -> HttpError {
    if description.contains("TIMEOUT") || description.contains("timed out") {
        HttpError::Timeout
    } else if description.contains("CONNECT") || description.contains("ESP_ERR_HTTP") {
        HttpError::ConnectionFailed
    } else {
        HttpError::Other
    }
}

// ───────────────────────────────────────────────────────────────
// Host stand-in
// ───────────────────────────────────────────────────────────────

/// Answers requests from a fixed table. The first entry whose prefix
/// matches the URL wins; an unmatched URL fails to connect.
#[derive(Debug, Default, Clone)]
pub struct CannedHttp {
    routes: Vec<(String, Result<HttpResponse, HttpError>)>,
}

impl CannedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url_prefix: &str, status: u16, body: &str) -> Self {
        self.routes.push((
            url_prefix.to_string(),
            Ok(HttpResponse {
                status,
                body: body.to_string(),
            }),
        ));
        self
    }

    pub fn fail(mut self, url_prefix: &str, error: HttpError) -> Self {
        self.routes.push((url_prefix.to_string(), Err(error)));
        self
    }
}

impl HttpPort for CannedHttp {
    fn get(
        &self,
        url: &str,
        _headers: &[(&str, &str)],
        _timeout_ms: u32,
    ) -> Result<HttpResponse, HttpError> {
        let Some((_, answer)) = self.routes.iter().find(|(prefix, _)| url.starts_with(prefix)) else {
            log::debug!("HTTP(sim): no route for {}", url);
            return Err(HttpError::ConnectionFailed);
        };
        match answer {
            Ok(r) if r.body.len() > MAX_BODY_BYTES => Err(HttpError::TooLarge),
            other => other.clone(),
        }
    }
}
