//! Unified error types for the Coompel firmware.
//!
//! Every subsystem error converts into [`Error`], so the boot path in
//! `main` and the application service can report failures uniformly.
//! Runtime failures (network, storage) never cross the main loop as
//! panics; they are returned to the immediate caller and either retried
//! or kept as readable state (see `WeatherService::last_error`).

use core::fmt;

use crate::adapters::wifi::ConnectivityError;
use crate::app::ports::{ConfigError, DisplayError, StorageError};
use crate::weather::FetchError;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The OLED panel could not be initialised or flushed.
    Display(DisplayError),
    /// Non-volatile storage failed.
    Storage(StorageError),
    /// Persisted settings failed validation or decoding.
    Settings(ConfigError),
    /// A weather or geolocation fetch failed.
    Network(FetchError),
    /// WiFi provisioning or connection failed.
    Wifi(ConnectivityError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// A compile-time or provisioned value is unusable.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Display(e) => write!(f, "display: {e}"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::Settings(e) => write!(f, "settings: {e}"),
            Self::Network(e) => write!(f, "network: {e}"),
            Self::Wifi(e) => write!(f, "wifi: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<DisplayError> for Error {
    fn from(e: DisplayError) -> Self {
        Self::Display(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Settings(e)
    }
}

impl From<FetchError> for Error {
    fn from(e: FetchError) -> Self {
        Self::Network(e)
    }
}

impl From<ConnectivityError> for Error {
    fn from(e: ConnectivityError) -> Self {
        Self::Wifi(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
