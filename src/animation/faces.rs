//! Built-in face frames.
//!
//! A frame is a compact vector description of the face (eye shape per
//! side, pupil offset, mouth) rendered with display primitives, so an
//! eight-frame animation costs a few dozen bytes of flash instead of 8 KB
//! of bitmaps.

use super::{AnimId, Animation};
use crate::app::ports::DisplayPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eye {
    Open,
    /// Upper lid half down.
    Half,
    Closed,
    /// Large outline, tiny pupil.
    Wide,
    /// Upturned arc, "^".
    Happy,
    /// Concentric rings; the pupil offset orbits to suggest spinning.
    Spiral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mouth {
    None,
    Flat,
    Smile,
    Frown,
    /// Round "O", radius in pixels.
    Open(u8),
    Wavy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face {
    pub left: Eye,
    pub right: Eye,
    /// Pupil displacement from the eye centre.
    pub look: (i8, i8),
    pub mouth: Mouth,
}

impl Face {
    const fn both(eye: Eye, look: (i8, i8), mouth: Mouth) -> Self {
        Self {
            left: eye,
            right: eye,
            look,
            mouth,
        }
    }
}

use Eye::{Closed, Half, Happy, Open, Spiral, Wide};

// ── Frame tables ──────────────────────────────────────────────

const IDLE_FRAMES: [Face; 5] = [
    Face::both(Open, (0, 0), Mouth::Smile),
    Face::both(Half, (0, 0), Mouth::Smile),
    Face::both(Closed, (0, 0), Mouth::Smile),
    Face::both(Half, (0, 0), Mouth::Smile),
    Face::both(Open, (0, 0), Mouth::Smile),
];
const IDLE_DELAYS: [f32; 5] = [0.06, 0.04, 0.08, 0.04, 0.06];

const WINK_FRAMES: [Face; 6] = [
    Face::both(Open, (0, 0), Mouth::Smile),
    Face { left: Open, right: Half, look: (1, 0), mouth: Mouth::Smile },
    Face { left: Open, right: Closed, look: (2, 0), mouth: Mouth::Smile },
    Face { left: Open, right: Closed, look: (2, 0), mouth: Mouth::Smile },
    Face { left: Open, right: Half, look: (1, 0), mouth: Mouth::Smile },
    Face::both(Open, (0, 0), Mouth::Smile),
];
const WINK_DELAYS: [f32; 6] = [0.05, 0.05, 0.30, 0.10, 0.05, 0.05];

const SURPRISED_FRAMES: [Face; 4] = [
    Face::both(Open, (0, 0), Mouth::Open(3)),
    Face::both(Wide, (0, -1), Mouth::Open(6)),
    Face::both(Wide, (0, -2), Mouth::Open(7)),
    Face::both(Open, (0, 0), Mouth::Open(4)),
];

const DIZZY_FRAMES: [Face; 8] = [
    Face::both(Spiral, (3, 0), Mouth::Wavy),
    Face::both(Spiral, (2, 2), Mouth::Wavy),
    Face::both(Spiral, (0, 3), Mouth::Wavy),
    Face::both(Spiral, (-2, 2), Mouth::Wavy),
    Face::both(Spiral, (-3, 0), Mouth::Wavy),
    Face::both(Spiral, (-2, -2), Mouth::Wavy),
    Face::both(Spiral, (0, -3), Mouth::Wavy),
    Face::both(Spiral, (2, -2), Mouth::Wavy),
];

const SLEEPING_FRAMES: [Face; 4] = [
    Face::both(Closed, (0, 0), Mouth::Open(2)),
    Face::both(Closed, (0, 0), Mouth::Open(3)),
    Face::both(Closed, (0, 0), Mouth::Open(4)),
    Face::both(Closed, (0, 0), Mouth::Open(3)),
];

const THINKING_FRAMES: [Face; 6] = [
    Face::both(Open, (0, 0), Mouth::Flat),
    Face::both(Open, (-3, -3), Mouth::Flat),
    Face::both(Open, (-4, -4), Mouth::Flat),
    Face::both(Half, (-4, -4), Mouth::Flat),
    Face::both(Open, (3, -3), Mouth::Flat),
    Face::both(Open, (4, -4), Mouth::Flat),
];

const SAD_FRAMES: [Face; 3] = [
    Face::both(Open, (0, 2), Mouth::Flat),
    Face::both(Half, (0, 3), Mouth::Frown),
    Face::both(Half, (0, 4), Mouth::Frown),
];

const HAPPY_FRAMES: [Face; 4] = [
    Face::both(Open, (0, 0), Mouth::Smile),
    Face::both(Happy, (0, 0), Mouth::Smile),
    Face::both(Happy, (0, 0), Mouth::Open(5)),
    Face::both(Happy, (0, 0), Mouth::Smile),
];

// ── Registry entries ──────────────────────────────────────────

static IDLE: Animation = Animation {
    name: "idle",
    frames: &IDLE_FRAMES,
    fps: 12,
    frame_delays: Some(&IDLE_DELAYS),
    looping: false,
};

static WINK: Animation = Animation {
    name: "wink",
    frames: &WINK_FRAMES,
    fps: 10,
    frame_delays: Some(&WINK_DELAYS),
    looping: false,
};

static SURPRISED: Animation = Animation {
    name: "surprised",
    frames: &SURPRISED_FRAMES,
    fps: 6,
    frame_delays: None,
    looping: false,
};

static DIZZY: Animation = Animation {
    name: "dizzy",
    frames: &DIZZY_FRAMES,
    fps: 12,
    frame_delays: None,
    looping: false,
};

static SLEEPING: Animation = Animation {
    name: "sleeping",
    frames: &SLEEPING_FRAMES,
    fps: 2,
    frame_delays: None,
    looping: true,
};

static THINKING: Animation = Animation {
    name: "thinking",
    frames: &THINKING_FRAMES,
    fps: 4,
    frame_delays: None,
    looping: true,
};

static SAD: Animation = Animation {
    name: "sad",
    frames: &SAD_FRAMES,
    fps: 3,
    frame_delays: None,
    looping: false,
};

static HAPPY: Animation = Animation {
    name: "happy",
    frames: &HAPPY_FRAMES,
    fps: 6,
    frame_delays: None,
    looping: false,
};

/// Built-in animation for a registry slot.
pub fn builtin(id: AnimId) -> &'static Animation {
    match id {
        AnimId::Idle => &IDLE,
        AnimId::Wink => &WINK,
        AnimId::Surprised => &SURPRISED,
        AnimId::Dizzy => &DIZZY,
        AnimId::Sleeping => &SLEEPING,
        AnimId::Thinking => &THINKING,
        AnimId::Sad => &SAD,
        AnimId::Happy => &HAPPY,
    }
}

// ── Rendering ─────────────────────────────────────────────────

const EYE_RADIUS: i32 = 11;
const EYE_Y: i32 = 24;
const EYE_SPACING: i32 = 24;
const MOUTH_Y: i32 = 46;
const MOUTH_HALF_WIDTH: i32 = 10;

/// Draw `face` centred on the panel. Leaves the bottom text row free.
pub fn draw_face<D: DisplayPort + ?Sized>(display: &mut D, face: &Face) {
    let cx = display.width() / 2;
    let (dx, dy) = (i32::from(face.look.0), i32::from(face.look.1));
    draw_eye(display, cx - EYE_SPACING, EYE_Y, face.left, dx, dy);
    draw_eye(display, cx + EYE_SPACING, EYE_Y, face.right, dx, dy);
    draw_mouth(display, cx, MOUTH_Y, face.mouth);
}

fn draw_eye<D: DisplayPort + ?Sized>(d: &mut D, x: i32, y: i32, eye: Eye, dx: i32, dy: i32) {
    let r = EYE_RADIUS;
    match eye {
        Eye::Open => {
            d.draw_circle(x, y, r as u32, false);
            d.draw_circle(x + dx, y + dy, 5, true);
        }
        Eye::Half => {
            d.draw_line(x - r, y - 2, x + r, y - 2);
            d.draw_rect(x - r, y - 2, (2 * r) as u32, (r / 2 + 4) as u32, false);
            d.draw_circle(x + dx, y + 2 + dy / 2, 3, true);
        }
        Eye::Closed => {
            d.draw_line(x - r, y, x + r, y);
            d.draw_line(x - r, y, x - r + 3, y - 2);
        }
        Eye::Wide => {
            d.draw_circle(x, y, (r + 3) as u32, false);
            d.draw_circle(x + dx, y + dy, 2, true);
        }
        Eye::Happy => {
            d.draw_line(x - r, y + 4, x, y - 5);
            d.draw_line(x, y - 5, x + r, y + 4);
        }
        Eye::Spiral => {
            d.draw_circle(x, y, r as u32, false);
            d.draw_circle(x, y, (r / 2) as u32, false);
            d.draw_circle(x + dx, y + dy, 2, true);
        }
    }
}

fn draw_mouth<D: DisplayPort + ?Sized>(d: &mut D, x: i32, y: i32, mouth: Mouth) {
    let w = MOUTH_HALF_WIDTH;
    match mouth {
        Mouth::None => {}
        Mouth::Flat => d.draw_line(x - w, y, x + w, y),
        Mouth::Smile => {
            d.draw_line(x - w, y - 2, x - w / 2, y + 2);
            d.draw_line(x - w / 2, y + 2, x + w / 2, y + 2);
            d.draw_line(x + w / 2, y + 2, x + w, y - 2);
        }
        Mouth::Frown => {
            d.draw_line(x - w, y + 3, x - w / 2, y);
            d.draw_line(x - w / 2, y, x + w / 2, y);
            d.draw_line(x + w / 2, y, x + w, y + 3);
        }
        Mouth::Open(r) => d.draw_circle(x, y, u32::from(r), false),
        Mouth::Wavy => {
            let step = w / 2;
            let mut px = x - w;
            let mut up = true;
            while px < x + w {
                let (y0, y1) = if up { (y + 2, y - 2) } else { (y - 2, y + 2) };
                d.draw_line(px, y0, px + step, y1);
                px += step;
                up = !up;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_starts_and_ends_open() {
        let idle = builtin(AnimId::Idle);
        assert_eq!(idle.frames[0].left, Eye::Open);
        assert_eq!(idle.frames[idle.frames.len() - 1].left, Eye::Open);
    }

    #[test]
    fn dizzy_relies_on_forced_looping() {
        assert!(!builtin(AnimId::Dizzy).looping);
    }

    #[test]
    fn wink_closes_one_eye_only() {
        let wink = builtin(AnimId::Wink);
        assert!(
            wink.frames
                .iter()
                .any(|f| f.right == Eye::Closed && f.left == Eye::Open)
        );
    }
}
