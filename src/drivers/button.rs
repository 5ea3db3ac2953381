//! Debounced push-button driver with click, double-click and long-press
//! detection.
//!
//! ## Hardware
//!
//! Active-low momentary switch with internal pull-up (the encoder push
//! switch). The main loop samples the pin once per tick and hands the
//! normalised level (`true` = pressed) to [`Button::update`]; the driver
//! itself never touches GPIO so it runs unchanged on the host.
//!
//! ## Gesture detection
//!
//! | Gesture      | Condition                                   | Event           |
//! |--------------|---------------------------------------------|-----------------|
//! | Click        | Release, no second release within 300 ms    | `Click`         |
//! | Double click | Second release within 300 ms of the first   | `DoubleClick`   |
//! | Long press   | Held ≥ 1000 ms (fires once)                 | `LongPress`     |
//! | Hold         | Every tick after `LongPress` while held     | `LongPressHold` |
//!
//! A click is only reported once the double-click window has closed, so a
//! double click never produces a stray `Click` first. A release that ends
//! a long press is not classified at all. When a new edge lands on the tick
//! the window closes, `Click` goes out first and the edge follows on the
//! next tick.

/// Default debounce interval.
pub const DEBOUNCE_MS: u32 = 50;
/// Default hold time before `LongPress`.
pub const LONG_PRESS_MS: u32 = 1000;
/// Default window in which a second release counts as a double click.
pub const DOUBLE_CLICK_WINDOW_MS: u32 = 300;

/// Events reported by [`Button::update`]. One per tick; `None` when
/// nothing happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonEvent {
    #[default]
    None,
    Pressed,
    Released,
    Click,
    DoubleClick,
    LongPress,
    LongPressHold,
}

/// Timing knobs shared by the button and the touch pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GestureTiming {
    pub debounce_ms: u32,
    pub long_press_ms: u32,
    pub double_click_ms: u32,
}

impl GestureTiming {
    pub const BUTTON: Self = Self {
        debounce_ms: DEBOUNCE_MS,
        long_press_ms: LONG_PRESS_MS,
        double_click_ms: DOUBLE_CLICK_WINDOW_MS,
    };
}

// ── Shared gesture core ───────────────────────────────────────

/// Debounce + gesture state machine. The button and the touch pad both
/// wrap one of these and translate its events into their own vocabulary.
#[derive(Debug, Clone)]
pub struct GestureDetector {
    timing: GestureTiming,
    last_raw: bool,
    debounced: bool,
    last_change_ms: u32,
    pressed_at_ms: u32,
    long_fired: bool,
    /// Release time of a click still waiting for its double-click window.
    pending_click_ms: Option<u32>,
    pressed_edge: bool,
    released_edge: bool,
    /// Edge event held back one tick behind an expiring click.
    deferred: Option<ButtonEvent>,
    last_event: ButtonEvent,
}

impl GestureDetector {
    pub fn new(timing: GestureTiming) -> Self {
        Self {
            timing,
            last_raw: false,
            debounced: false,
            last_change_ms: 0,
            pressed_at_ms: 0,
            long_fired: false,
            pending_click_ms: None,
            pressed_edge: false,
            released_edge: false,
            deferred: None,
            last_event: ButtonEvent::None,
        }
    }

    /// Feed one raw sample. Returns the event for this tick.
    pub fn update(&mut self, raw: bool, now_ms: u32) -> ButtonEvent {
        self.pressed_edge = false;
        self.released_edge = false;
        let mut event = self.deferred.take().unwrap_or(ButtonEvent::None);

        // A single click is only final once the window has closed. Checked
        // before the edge so a release on the closing tick starts a new
        // window instead of swallowing the old click.
        let click_expired = match self.pending_click_ms {
            Some(released_at)
                if now_ms.wrapping_sub(released_at) > self.timing.double_click_ms =>
            {
                self.pending_click_ms = None;
                true
            }
            _ => false,
        };

        if raw != self.last_raw {
            self.last_change_ms = now_ms;
        }
        self.last_raw = raw;

        let stable = now_ms.wrapping_sub(self.last_change_ms) > self.timing.debounce_ms;
        if stable && raw != self.debounced {
            self.debounced = raw;
            if raw {
                self.pressed_edge = true;
                self.pressed_at_ms = now_ms;
                self.long_fired = false;
                event = ButtonEvent::Pressed;
            } else {
                self.released_edge = true;
                event = ButtonEvent::Released;
                if !self.long_fired {
                    event = self.classify_release(now_ms).unwrap_or(event);
                }
            }
        }

        if click_expired {
            if event != ButtonEvent::None {
                self.deferred = Some(event);
            }
            event = ButtonEvent::Click;
        }

        if self.debounced {
            if !self.long_fired
                && now_ms.wrapping_sub(self.pressed_at_ms) >= self.timing.long_press_ms
            {
                self.long_fired = true;
                event = ButtonEvent::LongPress;
            } else if self.long_fired {
                event = ButtonEvent::LongPressHold;
            }
        }

        self.last_event = event;
        event
    }

    fn classify_release(&mut self, now_ms: u32) -> Option<ButtonEvent> {
        match self.pending_click_ms {
            Some(first) if now_ms.wrapping_sub(first) <= self.timing.double_click_ms => {
                self.pending_click_ms = None;
                Some(ButtonEvent::DoubleClick)
            }
            _ => {
                self.pending_click_ms = Some(now_ms);
                None
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.debounced
    }

    pub fn last_event(&self) -> ButtonEvent {
        self.last_event
    }

    /// Rising edge this tick. Clears on read.
    pub fn take_pressed(&mut self) -> bool {
        core::mem::take(&mut self.pressed_edge)
    }

    /// Falling edge this tick. Clears on read.
    pub fn take_released(&mut self) -> bool {
        core::mem::take(&mut self.released_edge)
    }

    /// How long the input has been held, 0 when released.
    pub fn held_ms(&self, now_ms: u32) -> u32 {
        if self.debounced {
            now_ms.wrapping_sub(self.pressed_at_ms)
        } else {
            0
        }
    }

    pub fn timing(&self) -> GestureTiming {
        self.timing
    }

    pub fn set_timing(&mut self, timing: GestureTiming) {
        self.timing = timing;
    }

    /// Forget everything except the timing configuration.
    pub fn reset(&mut self) {
        *self = Self::new(self.timing);
    }
}

// ── Button ────────────────────────────────────────────────────

/// Debounced push button.
#[derive(Debug, Clone)]
pub struct Button {
    core: GestureDetector,
}

impl Button {
    pub fn new() -> Self {
        Self {
            core: GestureDetector::new(GestureTiming::BUTTON),
        }
    }

    /// Call once per main-loop tick with the pressed level.
    pub fn update(&mut self, pressed: bool, now_ms: u32) -> ButtonEvent {
        self.core.update(pressed, now_ms)
    }

    /// Event produced by the most recent `update`.
    pub fn event(&self) -> ButtonEvent {
        self.core.last_event()
    }

    pub fn is_pressed(&self) -> bool {
        self.core.is_active()
    }

    pub fn was_pressed(&mut self) -> bool {
        self.core.take_pressed()
    }

    pub fn was_released(&mut self) -> bool {
        self.core.take_released()
    }

    pub fn pressed_duration(&self, now_ms: u32) -> u32 {
        self.core.held_ms(now_ms)
    }

    pub fn set_timing(&mut self, debounce_ms: u32, long_press_ms: u32, double_click_ms: u32) {
        self.core.set_timing(GestureTiming {
            debounce_ms,
            long_press_ms,
            double_click_ms,
        });
    }

    pub fn reset(&mut self) {
        self.core.reset();
    }
}

impl Default for Button {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive `btn` with a constant level from `from` to `to` (inclusive)
    /// in 10 ms ticks, collecting every non-`None` event.
    fn hold(btn: &mut Button, level: bool, from: u32, to: u32, out: &mut Vec<ButtonEvent>) {
        let mut t = from;
        while t <= to {
            let ev = btn.update(level, t);
            if ev != ButtonEvent::None {
                out.push(ev);
            }
            t += 10;
        }
    }

    #[test]
    fn no_events_without_press() {
        let mut btn = Button::new();
        let mut evs = Vec::new();
        hold(&mut btn, false, 0, 500, &mut evs);
        assert!(evs.is_empty());
    }

    #[test]
    fn debounce_filters_short_glitch() {
        let mut btn = Button::new();
        let mut evs = Vec::new();
        hold(&mut btn, true, 100, 130, &mut evs);
        hold(&mut btn, false, 140, 600, &mut evs);
        assert!(evs.is_empty());
        assert!(!btn.is_pressed());
    }

    #[test]
    fn single_click_reported_after_window() {
        let mut btn = Button::new();
        let mut evs = Vec::new();
        hold(&mut btn, true, 0, 150, &mut evs);
        hold(&mut btn, false, 160, 700, &mut evs);
        assert_eq!(
            evs,
            vec![ButtonEvent::Pressed, ButtonEvent::Released, ButtonEvent::Click]
        );
    }

    #[test]
    fn press_on_closing_tick_follows_the_click() {
        let mut btn = Button::new();
        let mut evs = Vec::new();
        hold(&mut btn, true, 0, 100, &mut evs);
        // Release commits at 170; the window closes at 480, the same tick
        // the second press clears debounce.
        hold(&mut btn, false, 110, 410, &mut evs);
        hold(&mut btn, true, 420, 600, &mut evs);
        assert_eq!(
            evs,
            vec![
                ButtonEvent::Pressed,
                ButtonEvent::Released,
                ButtonEvent::Click,
                ButtonEvent::Pressed,
            ]
        );
        assert!(btn.is_pressed());
    }

    #[test]
    fn double_click_suppresses_single() {
        let mut btn = Button::new();
        let mut evs = Vec::new();
        hold(&mut btn, true, 0, 100, &mut evs);
        hold(&mut btn, false, 110, 200, &mut evs);
        hold(&mut btn, true, 210, 300, &mut evs);
        hold(&mut btn, false, 310, 900, &mut evs);
        assert_eq!(
            evs.iter().filter(|e| **e == ButtonEvent::DoubleClick).count(),
            1
        );
        assert!(!evs.contains(&ButtonEvent::Click));
    }

    #[test]
    fn long_press_fires_once_then_holds() {
        let mut btn = Button::new();
        let mut evs = Vec::new();
        hold(&mut btn, true, 0, 1500, &mut evs);
        assert_eq!(
            evs.iter().filter(|e| **e == ButtonEvent::LongPress).count(),
            1
        );
        assert_eq!(evs.last(), Some(&ButtonEvent::LongPressHold));
        assert!(btn.pressed_duration(1500) >= 1000);

        let mut after = Vec::new();
        hold(&mut btn, false, 1510, 2200, &mut after);
        assert!(after.contains(&ButtonEvent::Released));
        assert!(!after.contains(&ButtonEvent::Click));
    }

    #[test]
    fn edge_flags_clear_on_read() {
        let mut btn = Button::new();
        let mut evs = Vec::new();
        hold(&mut btn, true, 0, 60, &mut evs);
        assert!(btn.was_pressed());
        assert!(!btn.was_pressed());
    }

    #[test]
    fn custom_timing_applies() {
        let mut btn = Button::new();
        btn.set_timing(10, 200, 100);
        let mut evs = Vec::new();
        hold(&mut btn, true, 0, 300, &mut evs);
        assert!(evs.contains(&ButtonEvent::LongPress));
    }
}
