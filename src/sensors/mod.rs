//! Sensor subsystem: the shake detector and the aggregating [`SensorHub`].
//!
//! The hub polls the slow environment sensors on their own cadence and
//! produces an [`EnvironmentSnapshot`] that views read. Individual read
//! failures keep the previous good value; a missing sensor never stops
//! the main loop.

pub mod motion;

use crate::app::ports::SensorPort;

/// DHT11 needs at least two seconds between conversions.
pub const DHT_INTERVAL_MS: u32 = 2_000;
/// Sound level sampling period.
pub const ANALOG_INTERVAL_MS: u32 = 100;
pub const SOUND_SAMPLES: usize = 16;
const ADC_MAX: u32 = 4095;

/// Latest environment readings.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EnvironmentSnapshot {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    /// `false` until the DHT11 has produced a good reading, and again
    /// after any failed one.
    pub climate_valid: bool,
    /// Moving average of the last 16 raw samples (0-4095).
    pub sound_level: u16,
    pub sound_peak: u16,
    /// Rough dB estimate, 30-90.
    pub sound_db: u8,
}

impl EnvironmentSnapshot {
    pub fn sound_percent(&self) -> u8 {
        (u32::from(self.sound_level) * 100 / ADC_MAX).min(100) as u8
    }
}

pub struct SensorHub {
    snapshot: EnvironmentSnapshot,
    sound_ring: [u16; SOUND_SAMPLES],
    sound_idx: usize,
    last_dht_ms: Option<u32>,
    last_analog_ms: Option<u32>,
    climate_enabled: bool,
    sound_enabled: bool,
}

impl SensorHub {
    pub fn new() -> Self {
        Self {
            snapshot: EnvironmentSnapshot::default(),
            sound_ring: [0; SOUND_SAMPLES],
            sound_idx: 0,
            last_dht_ms: None,
            last_analog_ms: None,
            climate_enabled: true,
            sound_enabled: true,
        }
    }

    /// Poll whatever is due. Cheap when nothing is.
    pub fn update<S: SensorPort>(&mut self, sensors: &mut S, now_ms: u32) {
        if self.climate_enabled && due(self.last_dht_ms, DHT_INTERVAL_MS, now_ms) {
            self.last_dht_ms = Some(now_ms);
            self.read_climate(sensors);
        }
        if self.sound_enabled && due(self.last_analog_ms, ANALOG_INTERVAL_MS, now_ms) {
            self.last_analog_ms = Some(now_ms);
            if let Some(raw) = sensors.read_sound() {
                self.push_sound(raw);
            }
        }
    }

    fn read_climate<S: SensorPort>(&mut self, sensors: &mut S) {
        match sensors.read_climate() {
            Some(c) if c.temperature_c.is_finite() && c.humidity_pct.is_finite() => {
                self.snapshot.temperature_c = c.temperature_c;
                self.snapshot.humidity_pct = c.humidity_pct;
                self.snapshot.climate_valid = true;
            }
            _ => {
                if self.snapshot.climate_valid {
                    log::warn!("SENSORS: DHT11 read failed");
                }
                self.snapshot.climate_valid = false;
            }
        }
    }

    fn push_sound(&mut self, raw: u16) {
        self.sound_ring[self.sound_idx] = raw.min(ADC_MAX as u16);
        self.sound_idx = (self.sound_idx + 1) % SOUND_SAMPLES;

        let sum: u32 = self.sound_ring.iter().map(|&s| u32::from(s)).sum();
        let level = (sum / SOUND_SAMPLES as u32) as u16;
        self.snapshot.sound_level = level;
        self.snapshot.sound_peak = self.snapshot.sound_peak.max(level);
        self.snapshot.sound_db = (30 + u32::from(level) * 60 / ADC_MAX) as u8;
    }

    pub fn snapshot(&self) -> EnvironmentSnapshot {
        self.snapshot
    }

    pub fn reset_sound_peak(&mut self) {
        self.snapshot.sound_peak = 0;
    }

    /// Disable a sensor that failed to initialise.
    pub fn set_climate_enabled(&mut self, enabled: bool) {
        self.climate_enabled = enabled;
    }

    pub fn set_sound_enabled(&mut self, enabled: bool) {
        self.sound_enabled = enabled;
    }
}

impl Default for SensorHub {
    fn default() -> Self {
        Self::new()
    }
}

fn due(last: Option<u32>, interval: u32, now_ms: u32) -> bool {
    last.is_none_or(|at| now_ms.wrapping_sub(at) >= interval)
}
