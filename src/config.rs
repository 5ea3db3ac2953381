//! User settings
//!
//! Everything the Settings menu can change. Persisted as a single postcard
//! blob through [`SettingsPort`](crate::app::ports::SettingsPort) and
//! validated before every save.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Lowest accepted motion sensitivity.
pub const SENSITIVITY_MIN: u8 = 1;
/// Highest accepted motion sensitivity.
pub const SENSITIVITY_MAX: u8 = 10;
/// Display-sleep timeout bounds (minutes).
pub const SLEEP_MINUTES_MIN: u8 = 1;
pub const SLEEP_MINUTES_MAX: u8 = 60;

/// Device-wide user settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    /// OLED contrast (0-255)
    pub brightness: u8,
    /// Buzzer feedback on/off
    pub sound_enabled: bool,
    /// Shake sensitivity (1 = hard shake needed, 10 = light touch)
    pub motion_sensitivity: u8,
    /// Minutes without input before the panel is switched off
    pub display_sleep_minutes: u8,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            brightness: 255,
            sound_enabled: true,
            motion_sensitivity: 5,
            display_sleep_minutes: 5,
        }
    }
}

impl DeviceSettings {
    /// Shake threshold (m/s²) derived from the sensitivity setting.
    pub fn shake_threshold(&self) -> f32 {
        30.0 - f32::from(self.motion_sensitivity) * 2.0
    }

    /// Display-sleep timeout in milliseconds.
    pub fn display_sleep_ms(&self) -> u64 {
        u64::from(self.display_sleep_minutes) * 60_000
    }
}

/// Range-check settings before they reach storage.
pub fn validate_settings(s: &DeviceSettings) -> Result<(), ConfigError> {
    if !(SENSITIVITY_MIN..=SENSITIVITY_MAX).contains(&s.motion_sensitivity) {
        return Err(ConfigError::ValidationFailed(
            "motion_sensitivity must be 1-10",
        ));
    }
    if !(SLEEP_MINUTES_MIN..=SLEEP_MINUTES_MAX).contains(&s.display_sleep_minutes) {
        return Err(ConfigError::ValidationFailed(
            "display_sleep_minutes must be 1-60",
        ));
    }
    Ok(())
}
