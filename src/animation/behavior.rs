//! Autonomous and reactive face behaviour.
//!
//! Sits between the Animations mode and the [`AnimationEngine`]:
//!
//! - At rest the face shows the idle base frame (Idle, frame 0).
//! - A blink is scheduled 3–8 s out; a wink check 15–45 s out fires with
//!   a 30 % chance. Both reschedule after firing or not firing.
//! - A shake starts Dizzy as a forced priority loop. Further shakes keep it
//!   alive; 1 s without one lets the current cycle finish.
//! - Whenever the engine stops playing, the face goes back to the base
//!   frame, unless a shake is still active, in which case Dizzy restarts.
//!
//! Only one of {autonomous blink/wink} and {reaction} drives the engine at
//! a time; nothing autonomous happens outside `IdleBase`.

use super::AnimId;
use super::engine::AnimationEngine;
use crate::app::ports::EntropyPort;
use crate::drivers::touch::TouchEvent;

pub const BLINK_MIN_MS: u32 = 3_000;
pub const BLINK_MAX_MS: u32 = 8_000;
pub const WINK_CHECK_MIN_MS: u32 = 15_000;
pub const WINK_CHECK_MAX_MS: u32 = 45_000;
/// Percent chance that a due wink check actually winks.
pub const WINK_CHANCE_PCT: u32 = 30;
/// Quiet time after the last shake before Dizzy winds down.
pub const SHAKE_COOLDOWN_MS: u32 = 1_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BehaviorState {
    /// Resting on the static base frame; autonomous timers armed.
    IdleBase,
    Blinking,
    /// Wink, touch reaction or an animation picked from the menu.
    RandomAction,
    /// Shake reaction looping.
    Reacting,
    /// Shake reaction finishing its last cycle.
    Transitioning,
}

#[derive(Debug)]
pub struct BehaviorController {
    state: BehaviorState,
    last_blink_ms: u32,
    blink_delay_ms: u32,
    last_wink_check_ms: u32,
    wink_delay_ms: u32,
    shaking: bool,
    last_shake_ms: u32,
}

impl BehaviorController {
    pub fn new() -> Self {
        Self {
            state: BehaviorState::IdleBase,
            last_blink_ms: 0,
            blink_delay_ms: BLINK_MAX_MS,
            last_wink_check_ms: 0,
            wink_delay_ms: WINK_CHECK_MAX_MS,
            shaking: false,
            last_shake_ms: 0,
        }
    }

    /// Show the base frame and arm both timers from `now_ms`.
    pub fn start<R: EntropyPort + ?Sized>(&mut self, engine: &mut AnimationEngine, rng: &mut R, now_ms: u32) {
        self.shaking = false;
        self.return_to_base(engine);
        self.last_blink_ms = now_ms;
        self.last_wink_check_ms = now_ms;
        self.schedule_blink(rng);
        self.schedule_wink(rng);
    }

    /// Per-tick step. Call after `engine.update`.
    pub fn tick<R: EntropyPort + ?Sized>(&mut self, engine: &mut AnimationEngine, rng: &mut R, now_ms: u32) {
        if self.shaking && now_ms.wrapping_sub(self.last_shake_ms) > SHAKE_COOLDOWN_MS {
            self.shaking = false;
            engine.stop_looping_gracefully();
            if self.state == BehaviorState::Reacting {
                self.state = BehaviorState::Transitioning;
            }
            log::debug!("BEHAVIOR: shake cooled down");
        }

        if self.state != BehaviorState::IdleBase {
            if !engine.is_playing() {
                if self.shaking {
                    engine.play(AnimId::Dizzy, true, true, now_ms);
                    self.state = BehaviorState::Reacting;
                } else {
                    self.return_to_base(engine);
                }
            }
            return;
        }

        if engine.is_playing() {
            return;
        }

        if now_ms.wrapping_sub(self.last_blink_ms) >= self.blink_delay_ms {
            self.last_blink_ms = now_ms;
            self.schedule_blink(rng);
            if engine.play(AnimId::Idle, true, false, now_ms) {
                self.state = BehaviorState::Blinking;
            }
            return;
        }

        if now_ms.wrapping_sub(self.last_wink_check_ms) >= self.wink_delay_ms {
            self.last_wink_check_ms = now_ms;
            self.schedule_wink(rng);
            if rng.random_range(0, 100) < WINK_CHANCE_PCT
                && engine.play(AnimId::Wink, true, false, now_ms)
            {
                self.state = BehaviorState::RandomAction;
            }
        }
    }

    pub fn on_shake(&mut self, engine: &mut AnimationEngine, now_ms: u32) {
        self.last_shake_ms = now_ms;
        self.shaking = true;
        let dizzy_running = engine.is_playing() && engine.current_anim() == Some(AnimId::Dizzy);
        if dizzy_running {
            // Re-arm the loop in case it was already winding down.
            if self.state == BehaviorState::Transitioning {
                engine.play(AnimId::Dizzy, true, true, now_ms);
            }
        } else {
            engine.play(AnimId::Dizzy, true, true, now_ms);
            log::info!("BEHAVIOR: shake -> dizzy");
        }
        self.state = BehaviorState::Reacting;
    }

    /// Tap → Surprised, double tap → Happy, only from rest.
    pub fn on_touch(&mut self, event: TouchEvent, engine: &mut AnimationEngine, now_ms: u32) {
        if self.state != BehaviorState::IdleBase {
            return;
        }
        let anim = match event {
            TouchEvent::Tap => AnimId::Surprised,
            TouchEvent::DoubleTap => AnimId::Happy,
            _ => return,
        };
        self.play_action(anim, engine, now_ms);
    }

    /// Play an animation on request (menu pick, touch reaction).
    pub fn play_action(&mut self, anim: AnimId, engine: &mut AnimationEngine, now_ms: u32) {
        if engine.play(anim, true, false, now_ms) {
            self.state = BehaviorState::RandomAction;
        }
    }

    fn return_to_base(&mut self, engine: &mut AnimationEngine) {
        engine.show_static_frame(AnimId::Idle, 0);
        self.state = BehaviorState::IdleBase;
    }

    fn schedule_blink<R: EntropyPort + ?Sized>(&mut self, rng: &mut R) {
        self.blink_delay_ms = rng.random_range(BLINK_MIN_MS, BLINK_MAX_MS);
    }

    fn schedule_wink<R: EntropyPort + ?Sized>(&mut self, rng: &mut R) {
        self.wink_delay_ms = rng.random_range(WINK_CHECK_MIN_MS, WINK_CHECK_MAX_MS);
    }

    pub fn state(&self) -> BehaviorState {
        self.state
    }

    pub fn is_shaking(&self) -> bool {
        self.shaking
    }

    pub fn blink_delay_ms(&self) -> u32 {
        self.blink_delay_ms
    }

    pub fn wink_delay_ms(&self) -> u32 {
        self.wink_delay_ms
    }
}

impl Default for BehaviorController {
    fn default() -> Self {
        Self::new()
    }
}
