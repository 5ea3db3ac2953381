//! TTP223 capacitive touch pad.
//!
//! Same debounce + gesture machine as the push button (see
//! [`GestureDetector`]), with touch-specific timing: the pad's output
//! driver is clean so debounce is shorter, and a long touch is quicker.

use super::button::{ButtonEvent, GestureDetector, GestureTiming};

/// TTP223 outputs are push-pull; 20 ms is plenty.
pub const TOUCH_DEBOUNCE_MS: u32 = 20;
pub const LONG_TOUCH_MS: u32 = 800;
pub const DOUBLE_TAP_WINDOW_MS: u32 = 400;

const TOUCH_TIMING: GestureTiming = GestureTiming {
    debounce_ms: TOUCH_DEBOUNCE_MS,
    long_press_ms: LONG_TOUCH_MS,
    double_click_ms: DOUBLE_TAP_WINDOW_MS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TouchEvent {
    #[default]
    None,
    Touch,
    Release,
    Tap,
    DoubleTap,
    LongTouch,
    LongTouchHold,
}

impl From<ButtonEvent> for TouchEvent {
    fn from(ev: ButtonEvent) -> Self {
        match ev {
            ButtonEvent::None => Self::None,
            ButtonEvent::Pressed => Self::Touch,
            ButtonEvent::Released => Self::Release,
            ButtonEvent::Click => Self::Tap,
            ButtonEvent::DoubleClick => Self::DoubleTap,
            ButtonEvent::LongPress => Self::LongTouch,
            ButtonEvent::LongPressHold => Self::LongTouchHold,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TouchSensor {
    core: GestureDetector,
    enabled: bool,
}

impl TouchSensor {
    pub fn new() -> Self {
        Self {
            core: GestureDetector::new(TOUCH_TIMING),
            enabled: true,
        }
    }

    /// Call once per tick with the pad level (`true` = touched).
    /// A disabled pad reports nothing.
    pub fn update(&mut self, touched: bool, now_ms: u32) -> TouchEvent {
        if !self.enabled {
            return TouchEvent::None;
        }
        self.core.update(touched, now_ms).into()
    }

    pub fn event(&self) -> TouchEvent {
        if self.enabled {
            self.core.last_event().into()
        } else {
            TouchEvent::None
        }
    }

    pub fn is_touched(&self) -> bool {
        self.enabled && self.core.is_active()
    }

    pub fn was_touched(&mut self) -> bool {
        self.core.take_pressed()
    }

    pub fn was_released(&mut self) -> bool {
        self.core.take_released()
    }

    pub fn touched_duration(&self, now_ms: u32) -> u32 {
        self.core.held_ms(now_ms)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.core.reset();
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_timing(&mut self, debounce_ms: u32, long_touch_ms: u32, double_tap_ms: u32) {
        self.core.set_timing(GestureTiming {
            debounce_ms,
            long_press_ms: long_touch_ms,
            double_click_ms: double_tap_ms,
        });
    }
}

impl Default for TouchSensor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(pad: &mut TouchSensor, level: bool, from: u32, to: u32) -> Vec<TouchEvent> {
        (from..=to)
            .step_by(10)
            .map(|t| pad.update(level, t))
            .filter(|e| *e != TouchEvent::None)
            .collect()
    }

    #[test]
    fn tap_after_double_tap_window() {
        let mut pad = TouchSensor::new();
        let mut evs = run(&mut pad, true, 0, 100);
        evs.extend(run(&mut pad, false, 110, 700));
        assert_eq!(
            evs,
            vec![TouchEvent::Touch, TouchEvent::Release, TouchEvent::Tap]
        );
    }

    #[test]
    fn double_tap_within_400ms() {
        let mut pad = TouchSensor::new();
        let mut evs = run(&mut pad, true, 0, 60);
        evs.extend(run(&mut pad, false, 70, 300));
        evs.extend(run(&mut pad, true, 310, 370));
        evs.extend(run(&mut pad, false, 380, 1000));
        assert!(evs.contains(&TouchEvent::DoubleTap));
        assert!(!evs.contains(&TouchEvent::Tap));
    }

    #[test]
    fn long_touch_at_800ms() {
        let mut pad = TouchSensor::new();
        let evs = run(&mut pad, true, 0, 700);
        assert!(!evs.contains(&TouchEvent::LongTouch));
        let evs = run(&mut pad, true, 710, 900);
        assert_eq!(evs.first(), Some(&TouchEvent::LongTouch));
    }

    #[test]
    fn disabled_pad_is_silent() {
        let mut pad = TouchSensor::new();
        run(&mut pad, true, 0, 100);
        pad.set_enabled(false);
        assert!(!pad.is_touched());
        assert!(run(&mut pad, true, 110, 2000).is_empty());
        assert_eq!(pad.event(), TouchEvent::None);
    }
}
