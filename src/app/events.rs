//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) and the weather service
//! emit these through the [`EventSink`](super::ports::EventSink) port.
//! The log sink prints them; tests collect them.

use crate::app::ports::{WifiEvent, WifiState};
use crate::fsm::ModeId;
use crate::weather::{WeatherEvent, WeatherState};

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries the initial mode).
    Started(ModeId),

    /// The dispatcher switched top-level mode.
    ModeChanged { from: ModeId, to: ModeId },

    /// Weather pipeline notification.
    Weather(WeatherEvent),

    /// The weather pipeline moved between states.
    WeatherStateChanged { from: WeatherState, to: WeatherState },

    /// The WiFi manager reported a new connection state.
    WifiStateChanged { from: WifiState, to: WifiState },

    /// WiFi manager notification (portal, credentials, link).
    Wifi(WifiEvent),

    /// User settings were persisted.
    SettingsSaved,

    /// Persisting the settings failed; they stay dirty.
    SettingsSaveFailed,

    /// The panel was switched off after the inactivity timeout.
    DisplaySleep,

    /// User activity switched the panel back on.
    DisplayWake,

    /// The panel rejected a frame.
    DisplayFault,
}
