//! Face animations: immutable frame data, the playback engine and the
//! idle/reaction behaviour layered on top.
//!
//! ```text
//!   BehaviorController ──play()──▶ AnimationEngine ──draw()──▶ DisplayPort
//!          ▲                              │
//!          └──── is_playing() ◀───────────┘
//! ```
//!
//! Animations are registered once into a fixed 8-slot [`AnimationRegistry`]
//! keyed by [`AnimId`]. The engine holds only the key of the animation it
//! is playing, never the data.

pub mod behavior;
pub mod engine;
pub mod faces;

use faces::Face;

/// Registry capacity.
pub const MAX_ANIMATIONS: usize = 8;

/// Registry key. The discriminant is the slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AnimId {
    Idle = 0,
    Wink = 1,
    Surprised = 2,
    Dizzy = 3,
    Sleeping = 4,
    Thinking = 5,
    Sad = 6,
    Happy = 7,
}

impl AnimId {
    pub const ALL: [Self; MAX_ANIMATIONS] = [
        Self::Idle,
        Self::Wink,
        Self::Surprised,
        Self::Dizzy,
        Self::Sleeping,
        Self::Thinking,
        Self::Sad,
        Self::Happy,
    ];

    pub const fn slot(self) -> usize {
        self as usize
    }
}

/// One registered animation.
#[derive(Debug)]
pub struct Animation {
    pub name: &'static str,
    pub frames: &'static [Face],
    /// Intrinsic playback rate, used when there is no delay table.
    pub fps: u8,
    /// Per-frame hold times in seconds. Overrides `fps` when present.
    pub frame_delays: Option<&'static [f32]>,
    /// Wrap to frame 0 at the end instead of completing.
    pub looping: bool,
}

impl Animation {
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

/// Fixed-capacity table of animations.
#[derive(Debug, Clone, Copy)]
pub struct AnimationRegistry {
    slots: [Option<&'static Animation>; MAX_ANIMATIONS],
}

impl AnimationRegistry {
    pub const fn empty() -> Self {
        Self {
            slots: [None; MAX_ANIMATIONS],
        }
    }

    /// Registry with every built-in face animation.
    pub fn builtin() -> Self {
        let mut reg = Self::empty();
        for id in AnimId::ALL {
            reg.register(id, faces::builtin(id));
        }
        reg
    }

    /// Animations without frames are refused.
    pub fn register(&mut self, id: AnimId, anim: &'static Animation) {
        if anim.frames.is_empty() {
            log::warn!("ANIM: refusing empty animation '{}'", anim.name);
            return;
        }
        if let Some(slot) = self.slots.get_mut(id.slot()) {
            *slot = Some(anim);
        }
    }

    pub fn get(&self, id: AnimId) -> Option<&'static Animation> {
        self.slots.get(id.slot()).copied().flatten()
    }
}

impl Default for AnimationRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
