//! Pomodoro focus timer.
//!
//! Work and break phases alternate while the timer runs; each finished
//! work phase counts one cycle. Click starts or pauses, double click
//! resets, and rotating while stopped changes the work length.

use crate::app::ports::{DisplayPort, TextAlign, TextSize};
use crate::drivers::button::ButtonEvent;
use crate::drivers::touch::TouchEvent;
use crate::events::InputEvent;
use crate::fsm::context::ApplicationContext;
use crate::fsm::ModeId;

use super::{draw_title, fmt, is_long_press};

pub const WORK_MINUTES_DEFAULT: u8 = 25;
pub const BREAK_MINUTES_DEFAULT: u8 = 5;
pub const WORK_MINUTES_MIN: u8 = 5;
pub const WORK_MINUTES_MAX: u8 = 60;
/// Minutes per encoder detent.
pub const WORK_MINUTES_STEP: i32 = 1;
const REFRESH_MS: u32 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Work,
    Break,
}

#[derive(Debug, Clone)]
pub struct Pomodoro {
    phase: Phase,
    running: bool,
    work_minutes: u8,
    break_minutes: u8,
    remaining_ms: u32,
    last_ms: u32,
    cycles: u16,
}

impl Pomodoro {
    pub fn new() -> Self {
        Self {
            phase: Phase::Work,
            running: false,
            work_minutes: WORK_MINUTES_DEFAULT,
            break_minutes: BREAK_MINUTES_DEFAULT,
            remaining_ms: minutes_ms(WORK_MINUTES_DEFAULT),
            last_ms: 0,
            cycles: 0,
        }
    }

    pub fn toggle(&mut self, now_ms: u32) {
        self.running = !self.running;
        self.last_ms = now_ms;
        log::info!("POMODORO: {}", if self.running { "running" } else { "paused" });
    }

    /// Back to a stopped, full work phase. The cycle count is kept.
    pub fn reset(&mut self) {
        self.running = false;
        self.phase = Phase::Work;
        self.remaining_ms = self.phase_ms();
    }

    /// Change the work length. Ignored while running.
    pub fn adjust_work(&mut self, detents: i32) {
        if self.running || detents == 0 {
            return;
        }
        let next = (i32::from(self.work_minutes) + detents * WORK_MINUTES_STEP)
            .clamp(i32::from(WORK_MINUTES_MIN), i32::from(WORK_MINUTES_MAX));
        self.work_minutes = next as u8;
        self.reset();
    }

    /// Advance the countdown. Returns the phase that just finished, if any.
    pub fn update(&mut self, now_ms: u32) -> Option<Phase> {
        if !self.running {
            return None;
        }
        let elapsed = now_ms.wrapping_sub(self.last_ms);
        self.last_ms = now_ms;
        self.remaining_ms = self.remaining_ms.saturating_sub(elapsed);
        if self.remaining_ms > 0 {
            return None;
        }
        let finished = self.phase;
        self.phase = match finished {
            Phase::Work => {
                self.cycles = self.cycles.saturating_add(1);
                Phase::Break
            }
            Phase::Break => Phase::Work,
        };
        self.remaining_ms = self.phase_ms();
        log::info!("POMODORO: {:?} finished, cycles={}", finished, self.cycles);
        Some(finished)
    }

    fn phase_ms(&self) -> u32 {
        match self.phase {
            Phase::Work => minutes_ms(self.work_minutes),
            Phase::Break => minutes_ms(self.break_minutes),
        }
    }

    /// Fraction of the current phase already elapsed.
    pub fn progress(&self) -> f32 {
        let total = self.phase_ms();
        if total == 0 {
            return 1.0;
        }
        1.0 - self.remaining_ms as f32 / total as f32
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn remaining_ms(&self) -> u32 {
        self.remaining_ms
    }

    pub fn work_minutes(&self) -> u8 {
        self.work_minutes
    }

    pub fn cycles(&self) -> u16 {
        self.cycles
    }
}

impl Default for Pomodoro {
    fn default() -> Self {
        Self::new()
    }
}

fn minutes_ms(minutes: u8) -> u32 {
    u32::from(minutes) * 60_000
}

// ───────────────────────────────────────────────────────────────
// Mode handlers
// ───────────────────────────────────────────────────────────────

pub fn on_event(ctx: &mut ApplicationContext, event: InputEvent) -> Option<ModeId> {
    if is_long_press(event) {
        return Some(ModeId::Menu);
    }
    let now = ctx.now_ms;
    match event {
        InputEvent::Button(ButtonEvent::Click) | InputEvent::Touch(TouchEvent::Tap) => {
            ctx.pomodoro.toggle(now)
        }
        InputEvent::Button(ButtonEvent::DoubleClick) | InputEvent::Touch(TouchEvent::DoubleTap) => {
            ctx.pomodoro.reset()
        }
        InputEvent::Rotate(d) => ctx.pomodoro.adjust_work(d),
        _ => return None,
    }
    ctx.redraw = true;
    None
}

pub fn on_update(ctx: &mut ApplicationContext) -> Option<ModeId> {
    if ctx.pomodoro.update(ctx.now_ms).is_some() {
        ctx.redraw = true;
    }
    if ctx.pomodoro.is_running() && ctx.refresh_due(REFRESH_MS) {
        ctx.redraw = true;
    }
    None
}

pub fn render(ctx: &ApplicationContext, d: &mut dyn DisplayPort) {
    let p = &ctx.pomodoro;
    let (w, cx) = (d.width(), d.width() / 2);
    draw_title(d, if p.phase() == Phase::Work { "FOCUS" } else { "BREAK" });

    let secs = p.remaining_ms().div_ceil(1000);
    let mmss: heapless::String<8> = fmt(format_args!("{:02}:{:02}", secs / 60, secs % 60));
    d.draw_text(&mmss, cx, 14, TextSize::Large, TextAlign::Center);
    d.draw_progress_bar(4, 37, (w - 8) as u32, 6, p.progress());

    let cycles: heapless::String<12> = fmt(format_args!("Cycles: {}", p.cycles()));
    d.draw_text(&cycles, 0, 46, TextSize::Small, TextAlign::Left);
    let hint = if p.is_running() { "Click=Pause" } else { "Click=Start" };
    d.draw_text(hint, cx, 54, TextSize::Small, TextAlign::Center);
}
