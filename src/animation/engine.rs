//! Frame-timed animation playback.
//!
//! ## States
//!
//! | State   | `playing` | `paused` | Frame index             |
//! |---------|-----------|----------|-------------------------|
//! | Stopped | false     | –        | frozen (static frame)   |
//! | Playing | true      | false    | advances on frame delay |
//! | Paused  | true      | true     | frozen                  |
//!
//! Completion of a non-looping animation holds the last frame and clears
//! `playing`; the engine never chooses the next animation itself. The
//! behaviour layer watches [`AnimationEngine::is_playing`] and decides.
//!
//! Invariant: `frame < frame_count` of the current animation whenever one
//! is selected.

use super::faces::draw_face;
use super::{AnimId, Animation, AnimationRegistry};
use crate::app::ports::DisplayPort;

pub const GLOBAL_FPS_MAX: u8 = 30;

pub struct AnimationEngine {
    registry: AnimationRegistry,
    current: Option<AnimId>,
    previous: Option<AnimId>,
    frame: usize,
    last_frame_ms: u32,
    playing: bool,
    paused: bool,
    /// Keep wrapping even though the animation itself doesn't loop.
    continuous_loop: bool,
    /// 0 = use each animation's own fps.
    global_fps: u8,
}

impl AnimationEngine {
    pub fn new(registry: AnimationRegistry) -> Self {
        Self {
            registry,
            current: None,
            previous: None,
            frame: 0,
            last_frame_ms: 0,
            playing: false,
            paused: false,
            continuous_loop: false,
            global_fps: 0,
        }
    }

    /// Start `id` from frame 0.
    ///
    /// Without `priority` this is a no-op when `id` is already playing, or
    /// when a non-looping animation is mid-playback, so autonomous
    /// triggers can't cut short a reaction. Returns whether playback
    /// (re)started.
    pub fn play(&mut self, id: AnimId, priority: bool, force_loop: bool, now_ms: u32) -> bool {
        if !priority && self.playing {
            if self.current == Some(id) {
                return false;
            }
            if self.current_animation().is_some_and(|a| !a.looping) {
                return false;
            }
        }
        let Some(anim) = self.registry.get(id) else {
            return false;
        };

        self.previous = self.current;
        self.current = Some(id);
        self.frame = 0;
        self.last_frame_ms = now_ms;
        self.playing = true;
        self.paused = false;
        self.continuous_loop = force_loop;
        log::debug!(
            "ANIM: play {} ({} frames, loop={}, force={})",
            anim.name,
            anim.frame_count(),
            anim.looping,
            force_loop
        );
        true
    }

    /// Present one frame without running the timer.
    pub fn show_static_frame(&mut self, id: AnimId, frame: usize) {
        let Some(anim) = self.registry.get(id) else {
            return;
        };
        if self.current != Some(id) {
            self.previous = self.current;
        }
        self.current = Some(id);
        self.frame = frame.min(anim.frame_count() - 1);
        self.playing = false;
        self.paused = false;
        self.continuous_loop = false;
    }

    pub fn stop(&mut self) {
        self.playing = false;
        self.continuous_loop = false;
        self.frame = 0;
    }

    pub fn set_paused(&mut self, paused: bool, now_ms: u32) {
        self.paused = paused;
        if !paused {
            self.last_frame_ms = now_ms;
        }
    }

    /// Let a forced loop finish its current cycle, then complete.
    pub fn stop_looping_gracefully(&mut self) {
        self.continuous_loop = false;
    }

    /// Advance the frame if its delay has elapsed. Returns `true` when the
    /// visible frame changed.
    pub fn update(&mut self, now_ms: u32) -> bool {
        if !self.playing || self.paused {
            return false;
        }
        let Some(delay) = self.frame_delay_ms() else {
            return false;
        };
        if now_ms.wrapping_sub(self.last_frame_ms) < delay {
            return false;
        }
        self.last_frame_ms = now_ms;
        self.advance_frame()
    }

    fn advance_frame(&mut self) -> bool {
        let Some(anim) = self.current_animation() else {
            return false;
        };
        let count = anim.frame_count();
        let looping = anim.looping || self.continuous_loop;
        let before = self.frame;

        if self.frame + 1 < count {
            self.frame += 1;
        } else if looping {
            self.frame = 0;
        } else {
            self.frame = count - 1;
            self.on_complete(anim);
        }
        self.frame != before
    }

    fn on_complete(&mut self, anim: &Animation) {
        log::debug!("ANIM: {} complete", anim.name);
        self.playing = false;
        self.continuous_loop = false;
    }

    fn frame_delay_ms(&self) -> Option<u32> {
        let anim = self.current_animation()?;
        if let Some(delay) = anim.frame_delays.and_then(|d| d.get(self.frame)) {
            return Some((delay * 1000.0).round() as u32);
        }
        let fps = if self.global_fps > 0 {
            self.global_fps
        } else {
            anim.fps.max(1)
        };
        Some(1000 / u32::from(fps))
    }

    /// Override every animation's fps (clamped to 1–30); 0 clears.
    pub fn set_global_fps(&mut self, fps: u8) {
        self.global_fps = if fps == 0 {
            0
        } else {
            fps.clamp(1, GLOBAL_FPS_MAX)
        };
    }

    /// Render the current frame. Nothing is drawn before the first play.
    pub fn draw<D: DisplayPort + ?Sized>(&self, display: &mut D) {
        if let Some(face) = self
            .current_animation()
            .and_then(|a| a.frames.get(self.frame))
        {
            draw_face(display, face);
        }
    }

    fn current_animation(&self) -> Option<&'static Animation> {
        self.current.and_then(|id| self.registry.get(id))
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_looping(&self) -> bool {
        self.continuous_loop
    }

    pub fn current_anim(&self) -> Option<AnimId> {
        self.current
    }

    pub fn previous_anim(&self) -> Option<AnimId> {
        self.previous
    }

    pub fn current_frame(&self) -> usize {
        self.frame
    }

    pub fn frame_count(&self) -> usize {
        self.current_animation().map_or(0, Animation::frame_count)
    }
}

impl Default for AnimationEngine {
    fn default() -> Self {
        Self::new(AnimationRegistry::builtin())
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn any_anim() -> impl Strategy<Value = AnimId> {
        (0usize..8).prop_map(|i| AnimId::ALL[i])
    }

    proptest! {
        #[test]
        fn frame_index_always_in_bounds(
            ops in proptest::collection::vec((any_anim(), any::<bool>(), any::<bool>(), 0u32..400), 1..80),
        ) {
            let mut e = AnimationEngine::default();
            let mut t = 0u32;
            for (id, priority, force, dt) in ops {
                t += dt;
                if dt % 7 == 0 {
                    e.show_static_frame(id, dt as usize);
                } else {
                    e.play(id, priority, force, t);
                }
                for _ in 0..5 {
                    t += 17;
                    e.update(t);
                    prop_assert!(e.current_frame() < e.frame_count());
                }
            }
        }

        /// Without looping, playback halts after exactly `frame_count - 1`
        /// advances past frame 0.
        #[test]
        fn non_looping_halts_after_frame_count(id in any_anim()) {
            let anim = crate::animation::faces::builtin(id);
            prop_assume!(!anim.looping);
            let mut e = AnimationEngine::default();
            e.play(id, true, false, 0);
            let mut advances = 0;
            let mut t = 0;
            while e.is_playing() && t < 60_000 {
                t += 1;
                let before = e.current_frame();
                e.update(t);
                if e.current_frame() != before {
                    advances += 1;
                }
            }
            prop_assert!(!e.is_playing());
            prop_assert_eq!(advances, anim.frame_count() - 1);
        }

        /// A forced loop keeps going until told to stop, then ends within
        /// one more cycle.
        #[test]
        fn forced_loop_runs_until_graceful_stop(run_ms in 500u32..5_000) {
            let mut e = AnimationEngine::default();
            e.play(AnimId::Dizzy, true, true, 0);
            let mut t = 0;
            while t < run_ms {
                t += 10;
                e.update(t);
                prop_assert!(e.is_playing());
            }
            e.stop_looping_gracefully();
            let frames = AnimationEngine::default().registry.get(AnimId::Dizzy).map_or(0, Animation::frame_count);
            let mut advances = 0;
            while e.is_playing() {
                t += 10;
                let before = e.current_frame();
                e.update(t);
                if e.current_frame() != before {
                    advances += 1;
                }
                prop_assert!(advances <= frames);
            }
        }
    }
}
