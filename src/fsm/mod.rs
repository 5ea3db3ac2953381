//! Application mode dispatcher.
//!
//! Function-pointer state table, one row per top-level mode:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  ModeTable                                                        │
//! │  ┌─────────────┬──────────┬─────────┬──────────┬──────────┬──────┐ │
//! │  │ ModeId      │ on_enter │ on_exit │ on_event │ on_update│render│ │
//! │  ├─────────────┼──────────┼─────────┼──────────┼──────────┼──────┤ │
//! │  │ Animations  │ fn(ctx)  │ fn(ctx) │ fn(ctx,e)│ fn(ctx)  │fn(..)│ │
//! │  │ Menu        │   ...    │         │          │          │      │ │
//! │  │ ... Pong    │          │         │          │          │      │ │
//! │  └─────────────┴──────────┴─────────┴──────────┴──────────┴──────┘ │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Exactly one mode is current. Each tick the service feeds the queued
//! input events to the current mode's `on_event`, then calls `on_update`
//! once, then `render` if the context is flagged for redraw. Any handler
//! may return `Some(next)`; the dispatcher then runs `on_exit` for the
//! current mode, switches, and runs `on_enter` for the next one. Modes
//! never stack; the menu keeps its own submenu stack internally.

pub mod context;
pub mod modes;

use context::ApplicationContext;
use log::info;

use crate::app::ports::DisplayPort;
use crate::events::InputEvent;

// ---------------------------------------------------------------------------
// Mode identity
// ---------------------------------------------------------------------------

/// Every top-level view. Must stay in sync with [`modes::build_mode_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ModeId {
    Animations = 0,
    Menu = 1,
    Sensors = 2,
    MotionTest = 3,
    WifiSetup = 4,
    WifiInfo = 5,
    WeatherView = 6,
    Clock = 7,
    Pomodoro = 8,
    Pong = 9,
}

impl ModeId {
    pub const COUNT: usize = 10;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Animations,
        Self::Menu,
        Self::Sensors,
        Self::MotionTest,
        Self::WifiSetup,
        Self::WifiInfo,
        Self::WeatherView,
        Self::Clock,
        Self::Pomodoro,
        Self::Pong,
    ];

    /// Convert a table index back to `ModeId`. Out-of-range indices
    /// assert in debug builds and fall back to `Animations`.
    pub fn from_index(idx: usize) -> Self {
        Self::ALL.get(idx).copied().unwrap_or_else(|| {
            debug_assert!(false, "invalid mode index: {idx}");
            Self::Animations
        })
    }
}

// ---------------------------------------------------------------------------
// Handler signatures
// ---------------------------------------------------------------------------

/// `on_enter` / `on_exit`: run exactly once per transition.
pub type ModeActionFn = fn(&mut ApplicationContext);

/// One input event. `Some(next)` switches mode.
pub type ModeEventFn = fn(&mut ApplicationContext, InputEvent) -> Option<ModeId>;

/// Once per tick after the events. `Some(next)` switches mode.
pub type ModeUpdateFn = fn(&mut ApplicationContext) -> Option<ModeId>;

/// Draw the whole frame. Only the current mode draws.
pub type ModeRenderFn = fn(&ApplicationContext, &mut dyn DisplayPort);

/// One row in the table.
pub struct ModeDescriptor {
    pub id: ModeId,
    pub name: &'static str,
    pub on_enter: Option<ModeActionFn>,
    pub on_exit: Option<ModeActionFn>,
    pub on_event: ModeEventFn,
    pub on_update: ModeUpdateFn,
    pub render: ModeRenderFn,
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct ModeDispatcher {
    /// Indexed by `ModeId as usize`.
    table: [ModeDescriptor; ModeId::COUNT],
    current: usize,
    tick_count: u64,
    mode_entry_tick: u64,
}

impl ModeDispatcher {
    pub fn new(table: [ModeDescriptor; ModeId::COUNT], initial: ModeId) -> Self {
        Self {
            table,
            current: initial as usize,
            tick_count: 0,
            mode_entry_tick: 0,
        }
    }

    /// Run the initial mode's `on_enter`. Call once before the first tick.
    pub fn start(&mut self, ctx: &mut ApplicationContext) {
        info!("MODE: starting in {}", self.table[self.current].name);
        ctx.mode_entered_ms = ctx.now_ms;
        ctx.redraw = true;
        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }

    /// Route one input event to the current mode.
    pub fn handle_event(&mut self, event: InputEvent, ctx: &mut ApplicationContext) {
        if let Some(next) = (self.table[self.current].on_event)(ctx, event) {
            self.force_transition(next, ctx);
        }
    }

    /// Per-tick update of the current mode.
    pub fn tick(&mut self, ctx: &mut ApplicationContext) {
        self.tick_count += 1;
        ctx.ticks_in_mode = self.tick_count - self.mode_entry_tick;
        ctx.total_ticks = self.tick_count;

        if let Some(next) = (self.table[self.current].on_update)(ctx) {
            self.force_transition(next, ctx);
        }
    }

    /// Draw the current mode if anything asked for it. Returns `true`
    /// when a frame was drawn.
    pub fn render(&self, ctx: &mut ApplicationContext, display: &mut dyn DisplayPort) -> bool {
        if !ctx.redraw {
            return false;
        }
        ctx.redraw = false;
        (self.table[self.current].render)(ctx, display);
        true
    }

    /// Switch to `next` now. Re-entering the current mode is a no-op.
    pub fn force_transition(&mut self, next: ModeId, ctx: &mut ApplicationContext) {
        if next as usize != self.current {
            self.transition(next, ctx);
        }
    }

    pub fn current_mode(&self) -> ModeId {
        ModeId::from_index(self.current)
    }

    pub fn mode_name(&self, id: ModeId) -> &'static str {
        self.table[id as usize].name
    }

    pub fn ticks_in_current_mode(&self) -> u64 {
        self.tick_count - self.mode_entry_tick
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn transition(&mut self, next: ModeId, ctx: &mut ApplicationContext) {
        let next_idx = next as usize;
        info!(
            "MODE: {} -> {}",
            self.table[self.current].name, self.table[next_idx].name
        );

        if let Some(exit) = self.table[self.current].on_exit {
            exit(ctx);
        }

        self.current = next_idx;
        self.mode_entry_tick = self.tick_count;
        ctx.ticks_in_mode = 0;
        ctx.mode_entered_ms = ctx.now_ms;
        ctx.last_refresh_ms = None;
        ctx.redraw = true;

        if let Some(enter) = self.table[self.current].on_enter {
            enter(ctx);
        }
    }
}
