//! MPU6050 shake detection.
//!
//! The accelerometer is read through [`SensorPort`]; this module only
//! turns offset-corrected samples into discrete [`MotionEvent`]s.
//!
//! A shake fires when |a| rises above the threshold, at most once per
//! 500 ms, and re-arms only after |a| has dropped back below it. A sample
//! with any axis above 12 m/s² (and no shake) reports `SuddenMovement`.
//!
//! [`SensorPort`]: crate::app::ports::SensorPort

use crate::app::ports::Acceleration;

pub const GRAVITY: f32 = 9.81;
pub const DEFAULT_SHAKE_THRESHOLD: f32 = 20.0;
pub const SHAKE_COOLDOWN_MS: u32 = 500;
pub const SUDDEN_AXIS_LIMIT: f32 = 12.0;
/// Axis magnitude that counts as "pointing down" for orientation.
const ORIENTATION_AXIS: f32 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionEvent {
    Shake,
    SuddenMovement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Unknown,
    Flat,
    UpsideDown,
    Portrait,
    PortraitInverted,
    LandscapeLeft,
    LandscapeRight,
}

#[derive(Debug, Clone)]
pub struct MotionDetector {
    threshold: f32,
    enabled: bool,
    last: Acceleration,
    magnitude: f32,
    shaking: bool,
    last_shake_ms: Option<u32>,
}

impl MotionDetector {
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_SHAKE_THRESHOLD,
            enabled: true,
            last: Acceleration::default(),
            magnitude: 0.0,
            shaking: false,
            last_shake_ms: None,
        }
    }

    /// Feed one sample. Returns at most one event.
    pub fn update(&mut self, accel: Acceleration, now_ms: u32) -> Option<MotionEvent> {
        if !self.enabled {
            return None;
        }
        self.last = accel;
        self.magnitude = (accel.x * accel.x + accel.y * accel.y + accel.z * accel.z).sqrt();

        if self.detect_shake(now_ms) {
            return Some(MotionEvent::Shake);
        }
        let sudden = [accel.x, accel.y, accel.z]
            .iter()
            .any(|a| a.abs() > SUDDEN_AXIS_LIMIT);
        sudden.then_some(MotionEvent::SuddenMovement)
    }

    fn detect_shake(&mut self, now_ms: u32) -> bool {
        if let Some(at) = self.last_shake_ms {
            if now_ms.wrapping_sub(at) < SHAKE_COOLDOWN_MS {
                return false;
            }
        }
        if self.magnitude > self.threshold {
            if !self.shaking {
                self.shaking = true;
                self.last_shake_ms = Some(now_ms);
                log::debug!("MOTION: shake |a|={:.1}", self.magnitude);
                return true;
            }
        } else {
            self.shaking = false;
        }
        false
    }

    /// Whether |a| is currently above the threshold (latched until it
    /// drops below after the cooldown).
    pub fn is_shaking(&self) -> bool {
        self.shaking
    }

    pub fn magnitude(&self) -> f32 {
        self.magnitude
    }

    pub fn acceleration(&self) -> Acceleration {
        self.last
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// |a| within 1 m/s² of gravity.
    pub fn is_stationary(&self) -> bool {
        (self.magnitude - GRAVITY).abs() < 1.0
    }

    pub fn orientation(&self) -> Orientation {
        let Acceleration { x, y, z } = self.last;
        let (ax, ay, az) = (x.abs(), y.abs(), z.abs());
        if az > ax && az > ay {
            if z > ORIENTATION_AXIS {
                return Orientation::Flat;
            }
            if z < -ORIENTATION_AXIS {
                return Orientation::UpsideDown;
            }
        }
        if ay > ax && ay > az {
            if y > ORIENTATION_AXIS {
                return Orientation::Portrait;
            }
            if y < -ORIENTATION_AXIS {
                return Orientation::PortraitInverted;
            }
        }
        if ax > ay && ax > az {
            if x > ORIENTATION_AXIS {
                return Orientation::LandscapeRight;
            }
            if x < -ORIENTATION_AXIS {
                return Orientation::LandscapeLeft;
            }
        }
        Orientation::Unknown
    }

    pub fn reset(&mut self) {
        self.shaking = false;
        self.last_shake_ms = None;
    }
}

impl Default for MotionDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Average resting samples into per-axis offsets, removing gravity from Z
/// so a flat board reads ~0 on X/Y and ~g on Z after correction.
pub fn calibration_offsets(samples: &[Acceleration]) -> Acceleration {
    if samples.is_empty() {
        return Acceleration::default();
    }
    let n = samples.len() as f32;
    let (sx, sy, sz) = samples.iter().fold((0.0, 0.0, 0.0), |(x, y, z), s| {
        (x + s.x, y + s.y, z + s.z - GRAVITY)
    });
    Acceleration {
        x: sx / n,
        y: sy / n,
        z: sz / n,
    }
}
