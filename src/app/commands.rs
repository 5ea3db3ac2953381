//! Side effects requested by the modes.
//!
//! Mode handlers only see the [`ApplicationContext`](crate::fsm::context::ApplicationContext),
//! so anything that touches a port (storage, WiFi, the weather worker)
//! is queued here and carried out by the
//! [`AppService`](super::service::AppService) after the handlers return.

use crate::animation::AnimId;
use crate::fsm::ModeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppCommand {
    /// Switch mode from outside the mode handlers (e.g. the WiFi
    /// manager falling back to its portal).
    EnterMode(ModeId),

    /// Play a one-shot animation once the Animations mode is showing.
    PlayAnimation(AnimId),

    /// Settings edits from the menu. Applied live, saved later.
    SetBrightness(u8),
    SetSound(bool),
    SetSensitivity(u8),
    SetSleepMinutes(u8),

    /// Weather auto-update on/off.
    SetWeatherEnabled(bool),

    /// Fetch weather now, ignoring the schedule.
    ForceWeatherUpdate,

    /// Drop the cached location and forecast.
    ClearWeatherCache,

    /// Bring up the captive provisioning portal.
    StartWifiPortal,
}
