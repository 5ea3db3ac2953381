//! Weather and geolocation pipeline.
//!
//! ```text
//!  main loop ── WeatherService::update() ──▶ TaskSpawner ──▶ worker thread
//!      ▲                                                         │
//!      │                         geo::fetch_location ◀───────────┤
//!      │                         forecast::fetch_forecast ◀──────┤
//!      │                         cache::save_* (NVS) ◀───────────┤
//!      └──── FetchOutcome over embassy-sync Channel ◀────────────┘
//! ```
//!
//! The worker is the only code that blocks on the network. Everything the
//! views read (location, forecast, state, last error) lives in a
//! mutex-guarded snapshot inside [`service::WeatherService`].

pub mod cache;
pub mod forecast;
pub mod geo;
pub mod icons;
pub mod service;

use core::fmt;

use heapless::{String, Vec};

use crate::app::ports::HttpError;

pub use service::{WeatherService, WeatherSnapshot};

/// Days kept from the forecast.
pub const MAX_FORECAST_DAYS: usize = 4;
/// City names are cut to this many characters.
pub const CITY_MAX_CHARS: usize = 31;
/// Bytes reserved for a condition code such as `partlycloudy_polartwilight`.
pub const SYMBOL_CAPACITY: usize = 32;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

/// Why a location or forecast fetch failed. Kept as readable state after
/// the fact so the Weather view can show it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchError {
    WifiDisconnected,
    Timeout,
    ConnectionFailed,
    /// 4xx other than 429.
    HttpClient(u16),
    RateLimited,
    /// 5xx.
    HttpServer(u16),
    ParseFailed,
    /// Well-formed JSON with missing or out-of-range fields.
    InvalidResponse,
    Other,
}

impl FetchError {
    /// Classify a non-success HTTP status. `None` for 2xx.
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            200..=299 => None,
            429 => Some(Self::RateLimited),
            400..=499 => Some(Self::HttpClient(status)),
            500..=599 => Some(Self::HttpServer(status)),
            _ => Some(Self::Other),
        }
    }

    /// Short text for the 21-column Weather view.
    pub fn reason(self) -> &'static str {
        match self {
            Self::WifiDisconnected => "WiFi disconnected",
            Self::Timeout => "Connection timeout",
            Self::ConnectionFailed => "Connection failed",
            Self::HttpClient(400) => "Bad request",
            Self::HttpClient(403) => "Access forbidden",
            Self::HttpClient(404) => "Not found",
            Self::HttpClient(_) => "HTTP error",
            Self::RateLimited => "Rate limited",
            Self::HttpServer(_) => "Server error",
            Self::ParseFailed => "Parse failed",
            Self::InvalidResponse => "Invalid response",
            Self::Other => "Unknown error",
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::HttpClient(code) | Self::HttpServer(code) => {
                write!(f, "{} ({})", self.reason(), code)
            }
            _ => f.write_str(self.reason()),
        }
    }
}

impl From<HttpError> for FetchError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Timeout => Self::Timeout,
            HttpError::ConnectionFailed => Self::ConnectionFailed,
            HttpError::TooLarge => Self::InvalidResponse,
            HttpError::Other => Self::Other,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Cached records
// ───────────────────────────────────────────────────────────────

/// IP-derived location. `fetched_at` is uptime seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Location {
    pub latitude: f32,
    pub longitude: f32,
    pub city: String<32>,
    /// Two-letter country code.
    pub country: String<2>,
    pub valid: bool,
    pub fetched_at: u32,
}

/// One day of the aggregated forecast.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DayForecast {
    /// `YYYY-MM-DD`.
    pub date: String<10>,
    pub temp_min: f32,
    pub temp_max: f32,
    /// Mean relative humidity, percent.
    pub humidity: f32,
    /// Most frequent MET symbol code of the day.
    pub symbol: String<SYMBOL_CAPACITY>,
}

impl DayForecast {
    /// The `DD` part of the date, or the whole string if it is short.
    pub fn day_of_month(&self) -> &str {
        self.date.get(8..10).unwrap_or(self.date.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Forecast {
    pub days: Vec<DayForecast, MAX_FORECAST_DAYS>,
    pub valid: bool,
    pub fetched_at: u32,
}

/// Copy `src` into a fixed string, keeping at most `max_chars` characters
/// and never splitting a code point.
pub fn bounded<const N: usize>(src: &str, max_chars: usize) -> String<N> {
    let mut out = String::new();
    for c in src.chars().take(max_chars) {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

// ───────────────────────────────────────────────────────────────
// State + events
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WeatherState {
    #[default]
    Idle,
    FetchingLocation,
    FetchingWeather,
    /// Fresh location and forecast.
    Cached,
    /// Only part of the cache could be loaded, or it has aged out.
    Stale,
    /// Retry ceiling hit; waiting a full interval.
    Error,
}

impl WeatherState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::FetchingLocation => "FetchingLocation",
            Self::FetchingWeather => "FetchingWeather",
            Self::Cached => "Cached",
            Self::Stale => "Stale",
            Self::Error => "Error",
        }
    }

    pub const fn is_fetching(self) -> bool {
        matches!(self, Self::FetchingLocation | Self::FetchingWeather)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherEvent {
    LocationUpdated,
    WeatherUpdated,
    LocationFailed,
    WeatherFailed,
    CacheLoaded,
    CacheStale,
}
