//! KY-040 rotary encoder: quadrature decoder plus push switch.
//!
//! ## Decoding
//!
//! CLK and DT are packed into a 2-bit state `(clk << 1) | dt`. Each change
//! of state is looked up in a 4×4 transition table yielding +1, −1 or 0
//! (invalid / bounce). Unit steps accumulate until a full detent's worth
//! has been seen; the committed delta is then clamped to exactly one
//! detent so a burst of noisy transitions can never skip positions.
//!
//! ## Acceleration
//!
//! When enabled, detents arriving less than `threshold` ms apart grow the
//! step multiplier by one per detent up to 8×; a slower detent resets it
//! to 1×.

use super::button::{Button, ButtonEvent};

/// Steps per physical detent on the KY-040.
pub const DEFAULT_STEPS_PER_DETENT: u8 = 4;
pub const DEFAULT_ACCEL_THRESHOLD_MS: u32 = 50;
pub const MAX_ACCEL_FACTOR: i32 = 8;

/// Transition table indexed by `[previous][current]`.
const TRANSITIONS: [[i8; 4]; 4] = [
    [0, 1, -1, 0],
    [-1, 0, 0, 1],
    [1, 0, 0, -1],
    [0, -1, 1, 0],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    None,
    Clockwise,
    CounterClockwise,
}

/// One tick's worth of encoder activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderEvent {
    RotatedCw,
    RotatedCcw,
    ButtonPressed,
    ButtonReleased,
    ButtonClick,
    ButtonDoubleClick,
    ButtonLongPress,
}

/// Everything the encoder reported during one `update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EncoderTick {
    /// Signed position change this tick (already multiplied by the
    /// acceleration factor). Zero when nothing rotated.
    pub delta: i32,
    /// Raw push-switch event. `LongPressHold` is kept here for consumers
    /// that care; it is not forwarded as an [`EncoderEvent`].
    pub button: ButtonEvent,
}

impl EncoderTick {
    pub fn rotation_event(&self) -> Option<EncoderEvent> {
        match self.delta.signum() {
            1 => Some(EncoderEvent::RotatedCw),
            -1 => Some(EncoderEvent::RotatedCcw),
            _ => None,
        }
    }

    pub fn button_event(&self) -> Option<EncoderEvent> {
        match self.button {
            ButtonEvent::Pressed => Some(EncoderEvent::ButtonPressed),
            ButtonEvent::Released => Some(EncoderEvent::ButtonReleased),
            ButtonEvent::Click => Some(EncoderEvent::ButtonClick),
            ButtonEvent::DoubleClick => Some(EncoderEvent::ButtonDoubleClick),
            ButtonEvent::LongPress => Some(EncoderEvent::ButtonLongPress),
            ButtonEvent::None | ButtonEvent::LongPressHold => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RotaryEncoder {
    steps_per_detent: i8,
    position: i32,
    last_reported: i32,
    last_encoded: u8,
    accumulator: i8,
    direction: Direction,
    accel_enabled: bool,
    accel_threshold_ms: u32,
    accel_factor: i32,
    last_rotation_ms: u32,
    button: Button,
}

impl RotaryEncoder {
    pub fn new() -> Self {
        Self {
            steps_per_detent: DEFAULT_STEPS_PER_DETENT as i8,
            position: 0,
            last_reported: 0,
            last_encoded: 0b11,
            accumulator: 0,
            direction: Direction::None,
            accel_enabled: false,
            accel_threshold_ms: DEFAULT_ACCEL_THRESHOLD_MS,
            accel_factor: 1,
            last_rotation_ms: 0,
            button: Button::new(),
        }
    }

    /// Seed the decoder with the idle line levels read at boot.
    pub fn begin(&mut self, clk: bool, dt: bool) {
        self.last_encoded = encode(clk, dt);
    }

    /// Sample both quadrature lines and the push switch.
    pub fn update(&mut self, clk: bool, dt: bool, switch_pressed: bool, now_ms: u32) -> EncoderTick {
        let delta = self.decode(encode(clk, dt), now_ms);
        let button = self.button.update(switch_pressed, now_ms);
        EncoderTick { delta, button }
    }

    fn decode(&mut self, encoded: u8, now_ms: u32) -> i32 {
        if encoded == self.last_encoded {
            return 0;
        }
        let step = TRANSITIONS[usize::from(self.last_encoded)][usize::from(encoded)];
        self.last_encoded = encoded;
        if step == 0 {
            return 0;
        }

        self.accumulator += step;
        if self.accumulator.abs() < self.steps_per_detent {
            return 0;
        }

        let detents = i32::from((self.accumulator / self.steps_per_detent).signum());
        self.accumulator %= self.steps_per_detent;

        let mut multiplier = 1;
        if self.accel_enabled {
            if now_ms.wrapping_sub(self.last_rotation_ms) < self.accel_threshold_ms {
                self.accel_factor = (self.accel_factor + 1).min(MAX_ACCEL_FACTOR);
                multiplier = self.accel_factor;
            } else {
                self.accel_factor = 1;
            }
            self.last_rotation_ms = now_ms;
        }

        let delta = detents * multiplier;
        self.position += delta;
        self.direction = if detents > 0 {
            Direction::Clockwise
        } else {
            Direction::CounterClockwise
        };
        log::debug!("ENCODER: {:+} -> {}", delta, self.position);
        delta
    }

    pub fn position(&self) -> i32 {
        self.position
    }

    /// Change since the last call. Clears on read.
    pub fn delta(&mut self) -> i32 {
        let delta = self.position - self.last_reported;
        self.last_reported = self.position;
        delta
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn set_position(&mut self, position: i32) {
        self.position = position;
        self.last_reported = position;
    }

    pub fn reset(&mut self) {
        self.position = 0;
        self.last_reported = 0;
        self.accumulator = 0;
        self.direction = Direction::None;
    }

    /// Accepts 1, 2 or 4; anything else is ignored.
    pub fn set_steps_per_detent(&mut self, steps: u8) {
        if matches!(steps, 1 | 2 | 4) {
            self.steps_per_detent = steps as i8;
            self.accumulator = 0;
        }
    }

    pub fn set_acceleration(&mut self, enabled: bool, threshold_ms: u32) {
        self.accel_enabled = enabled;
        self.accel_threshold_ms = threshold_ms;
        self.accel_factor = 1;
    }

    pub fn button(&self) -> &Button {
        &self.button
    }

    pub fn button_mut(&mut self) -> &mut Button {
        &mut self.button
    }
}

impl Default for RotaryEncoder {
    fn default() -> Self {
        Self::new()
    }
}

fn encode(clk: bool, dt: bool) -> u8 {
    (u8::from(clk) << 1) | u8::from(dt)
}

/// Full clockwise quadrature cycle starting from the idle `11` state.
#[cfg(test)]
pub(crate) const CW_CYCLE: [(bool, bool); 4] =
    [(true, false), (false, false), (false, true), (true, true)];

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(enc: &mut RotaryEncoder, cycle: &[(bool, bool)], t: &mut u32) -> i32 {
        let mut total = 0;
        for &(clk, dt) in cycle {
            total += enc.update(clk, dt, false, *t).delta;
            *t += 5;
        }
        total
    }

    fn ccw() -> Vec<(bool, bool)> {
        let mut c: Vec<_> = CW_CYCLE[..3].iter().rev().copied().collect();
        c.push((true, true));
        c
    }

    #[test]
    fn one_cw_cycle_is_one_detent() {
        let mut enc = RotaryEncoder::new();
        let mut t = 0;
        assert_eq!(turn(&mut enc, &CW_CYCLE, &mut t), 1);
        assert_eq!(enc.position(), 1);
        assert_eq!(enc.direction(), Direction::Clockwise);
    }

    #[test]
    fn ccw_cycle_goes_negative() {
        let mut enc = RotaryEncoder::new();
        let mut t = 0;
        assert_eq!(turn(&mut enc, &ccw(), &mut t), -1);
        assert_eq!(enc.delta(), -1);
        assert_eq!(enc.delta(), 0);
    }

    #[test]
    fn bounce_back_and_forth_commits_nothing() {
        let mut enc = RotaryEncoder::new();
        let mut t = 0;
        let jitter = [(true, false), (true, true), (true, false), (true, true)];
        assert_eq!(turn(&mut enc, &jitter, &mut t), 0);
        assert_eq!(enc.position(), 0);
    }

    #[test]
    fn single_step_mode_counts_every_transition() {
        let mut enc = RotaryEncoder::new();
        enc.set_steps_per_detent(1);
        let mut t = 0;
        assert_eq!(turn(&mut enc, &CW_CYCLE, &mut t), 4);
    }

    #[test]
    fn invalid_steps_per_detent_ignored() {
        let mut enc = RotaryEncoder::new();
        enc.set_steps_per_detent(3);
        let mut t = 0;
        assert_eq!(turn(&mut enc, &CW_CYCLE, &mut t), 1);
    }

    #[test]
    fn acceleration_ramps_and_caps() {
        let mut enc = RotaryEncoder::new();
        enc.set_acceleration(true, 50);
        let mut t = 1_000;
        let mut deltas = Vec::new();
        for _ in 0..12 {
            deltas.push(turn(&mut enc, &CW_CYCLE, &mut t));
        }
        assert_eq!(deltas[0], 1);
        assert_eq!(deltas[1], 2);
        assert_eq!(*deltas.last().unwrap(), MAX_ACCEL_FACTOR);

        // Slow detent resets to 1×.
        t += 500;
        assert_eq!(turn(&mut enc, &CW_CYCLE, &mut t), 1);
    }

    #[test]
    fn push_switch_forwarded() {
        let mut enc = RotaryEncoder::new();
        let mut events = Vec::new();
        for t in (0..=1_200).step_by(10) {
            if let Some(ev) = enc.update(true, true, true, t).button_event() {
                events.push(ev);
            }
        }
        assert_eq!(
            events,
            vec![EncoderEvent::ButtonPressed, EncoderEvent::ButtonLongPress]
        );
    }

    #[test]
    fn set_position_resets_delta() {
        let mut enc = RotaryEncoder::new();
        enc.set_position(10);
        assert_eq!(enc.position(), 10);
        assert_eq!(enc.delta(), 0);
    }
}
