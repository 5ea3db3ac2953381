//! Shared mutable context threaded through every mode handler.
//!
//! `ApplicationContext` is the blackboard the modes read from and write
//! to. The service fills in the inputs (time, sensor snapshot, WiFi and
//! weather status) before dispatching; handlers keep their own view state
//! here and queue side effects in [`commands`](ApplicationContext::commands).
//! Handlers never touch a port directly.

use heapless::{Deque, String};

use crate::animation::behavior::BehaviorController;
use crate::animation::engine::AnimationEngine;
use crate::animation::AnimationRegistry;
use crate::app::commands::AppCommand;
use crate::app::ports::{EntropyPort, WallTime, WifiState};
use crate::config::DeviceSettings;
use crate::games::Pong;
use crate::menu::navigator::MenuNavigator;
use crate::menu::tree::MenuTree;
use crate::menu::build_main_menu;
use crate::sensors::EnvironmentSnapshot;
use crate::weather::WeatherSnapshot;

use super::modes::pomodoro::Pomodoro;

/// Pending side effects per tick.
pub const COMMAND_QUEUE_CAP: usize = 8;

// ---------------------------------------------------------------------------
// Inputs (written by the service each tick)
// ---------------------------------------------------------------------------

/// Accelerometer view for the motion test screen.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MotionStatus {
    pub shaking: bool,
    /// |a| in m/s².
    pub magnitude: f32,
}

/// Copy of the WiFi manager's state for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct WifiStatus {
    pub state: WifiState,
    pub ssid: String<32>,
    pub ip: String<16>,
    pub ap_name: String<16>,
}

impl Default for WifiStatus {
    fn default() -> Self {
        Self {
            state: WifiState::Idle,
            ssid: String::new(),
            ip: String::new(),
            ap_name: String::new(),
        }
    }
}

impl WifiStatus {
    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }
}

// ---------------------------------------------------------------------------
// ApplicationContext
// ---------------------------------------------------------------------------

pub struct ApplicationContext {
    // ── timing ────────────────────────────────────────────────
    /// Uptime in milliseconds, truncated. All UI timers use wrapping
    /// arithmetic on this.
    pub now_ms: u32,
    /// Full uptime for display; never wraps in practice.
    pub uptime_ms: u64,
    /// Ticks since the current mode was entered.
    pub ticks_in_mode: u64,
    pub total_ticks: u64,
    /// `now_ms` when the current mode was entered.
    pub mode_entered_ms: u32,
    /// Last periodic redraw of a polled view. `None` forces one.
    pub last_refresh_ms: Option<u32>,

    // ── inputs ────────────────────────────────────────────────
    pub env: EnvironmentSnapshot,
    pub motion: MotionStatus,
    pub wifi: WifiStatus,
    pub wall_time: Option<WallTime>,
    pub weather: WeatherSnapshot,
    pub settings: DeviceSettings,

    // ── per-mode state ────────────────────────────────────────
    pub engine: AnimationEngine,
    pub behavior: BehaviorController,
    pub menu: MenuTree,
    pub nav: MenuNavigator,
    /// Last input seen while the menu was open.
    pub menu_activity_ms: u32,
    pub pong: Pong,
    pub pomodoro: Pomodoro,
    /// Forecast view: 0 = overview, 1..=N = day N detail.
    pub weather_page: u8,
    /// The setup screen has seen the portal come up.
    pub portal_seen: bool,

    pub rng: Box<dyn EntropyPort>,

    // ── outputs ───────────────────────────────────────────────
    pub commands: Deque<AppCommand, COMMAND_QUEUE_CAP>,
    /// Set by any handler whose view changed; cleared by the render pass.
    pub redraw: bool,
}

impl ApplicationContext {
    pub fn new(
        settings: DeviceSettings,
        weather_enabled: bool,
        display_height: i32,
        rng: Box<dyn EntropyPort>,
    ) -> Self {
        let menu = build_main_menu(&settings, weather_enabled);
        Self {
            now_ms: 0,
            uptime_ms: 0,
            ticks_in_mode: 0,
            total_ticks: 0,
            mode_entered_ms: 0,
            last_refresh_ms: None,
            env: EnvironmentSnapshot::default(),
            motion: MotionStatus::default(),
            wifi: WifiStatus::default(),
            wall_time: None,
            weather: WeatherSnapshot::default(),
            settings,
            engine: AnimationEngine::new(AnimationRegistry::builtin()),
            behavior: BehaviorController::new(),
            menu,
            nav: MenuNavigator::new(display_height),
            menu_activity_ms: 0,
            pong: Pong::new(),
            pomodoro: Pomodoro::new(),
            weather_page: 0,
            portal_seen: false,
            rng,
            commands: Deque::new(),
            redraw: true,
        }
    }

    /// Queue a side effect for the service. A full queue drops the command
    /// with a warning; the user can simply repeat the action.
    pub fn push_command(&mut self, cmd: AppCommand) {
        if self.commands.push_back(cmd).is_err() {
            log::warn!("MODE: command queue full, dropped {:?}", cmd);
        }
    }

    /// Milliseconds since the current mode was entered.
    pub fn ms_in_mode(&self) -> u32 {
        self.now_ms.wrapping_sub(self.mode_entered_ms)
    }

    /// `true` at most once per `period_ms`, and always right after entry.
    /// Used by the polled views (sensors, clock).
    pub fn refresh_due(&mut self, period_ms: u32) -> bool {
        let due = match self.last_refresh_ms {
            None => true,
            Some(last) => self.now_ms.wrapping_sub(last) >= period_ms,
        };
        if due {
            self.last_refresh_ms = Some(self.now_ms);
        }
        due
    }

}

#[cfg(test)]
impl ApplicationContext {
    /// Default settings, a seeded generator and a 64 px panel.
    pub(crate) fn for_tests() -> Self {
        Self::new(
            DeviceSettings::default(),
            false,
            64,
            Box::new(crate::adapters::entropy::XorShift32::new(0x1234_5678)),
        )
    }
}
