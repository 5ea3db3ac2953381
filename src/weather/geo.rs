//! IP geolocation client.
//!
//! Providers are tried in order until one answers with usable
//! coordinates. Both answer plain JSON; only a handful of leaf fields are
//! read and everything else is ignored.

use log::{info, warn};
use serde::Deserialize;

use super::{CITY_MAX_CHARS, FetchError, Location, bounded};
use crate::app::ports::HttpPort;

pub const PROVIDERS: [&str; 2] = ["https://ipwho.is/", "https://ipapi.co/json/"];
pub const TIMEOUT_MS: u32 = 10_000;

/// Union of the fields both providers use.
#[derive(Debug, Deserialize)]
struct GeoReply {
    /// ipwho.is only.
    success: Option<bool>,
    latitude: Option<f32>,
    lat: Option<f32>,
    longitude: Option<f32>,
    lon: Option<f32>,
    city: Option<String>,
    country_code: Option<String>,
    /// ipapi.co puts the two-letter code here.
    country: Option<String>,
}

/// Parse one provider's reply.
pub fn parse_location(body: &str) -> Result<Location, FetchError> {
    let reply: GeoReply = serde_json::from_str(body).map_err(|_| FetchError::ParseFailed)?;
    if reply.success == Some(false) {
        return Err(FetchError::InvalidResponse);
    }
    let latitude = reply.latitude.or(reply.lat).ok_or(FetchError::InvalidResponse)?;
    let longitude = reply.longitude.or(reply.lon).ok_or(FetchError::InvalidResponse)?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(FetchError::InvalidResponse);
    }
    let country = reply.country_code.or(reply.country).unwrap_or_default();
    Ok(Location {
        latitude,
        longitude,
        city: bounded(reply.city.as_deref().unwrap_or(""), CITY_MAX_CHARS),
        country: bounded(&country, 2),
        valid: true,
        fetched_at: 0,
    })
}

/// Ask each provider in turn. Returns the error of the last attempt when
/// all of them fail.
pub fn fetch_location<H: HttpPort + ?Sized>(http: &H, now_secs: u32) -> Result<Location, FetchError> {
    let mut last = FetchError::Other;
    for url in PROVIDERS {
        info!("GEO: trying {}", url);
        let resp = match http.get(url, &[("Accept", "application/json")], TIMEOUT_MS) {
            Ok(r) => r,
            Err(e) => {
                warn!("GEO: {} unreachable: {}", url, e);
                last = e.into();
                continue;
            }
        };
        if let Some(e) = FetchError::from_status(resp.status) {
            warn!("GEO: {} answered HTTP {}", url, resp.status);
            last = e;
            continue;
        }
        match parse_location(&resp.body) {
            Ok(mut loc) => {
                loc.fetched_at = now_secs;
                info!(
                    "GEO: {:.4}, {:.4} ({}, {})",
                    loc.latitude, loc.longitude, loc.city, loc.country
                );
                return Ok(loc);
            }
            Err(e) => {
                warn!("GEO: {} reply rejected: {}", url, e);
                last = e;
            }
        }
    }
    Err(last)
}
