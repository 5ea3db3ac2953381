//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the mode dispatcher, the shared context, the input
//! edge detectors and the weather pipeline. Hardware is handed in per
//! tick through port traits, so the whole service runs against mocks.
//!
//! ```text
//!   InputPort ──▶ ┌──────────────────────────┐ ──▶ DisplayPort
//!  SensorPort ──▶ │        AppService         │ ──▶ EventSink
//! Connectivity ◀─▶│ dispatcher · ctx · weather│ ◀─▶ SettingsPort
//!                 └──────────────────────────┘
//! ```
//!
//! One tick, in order:
//!
//! 1. sample inputs, sensors and WiFi into the event queue and context
//! 2. wake the panel on activity (the waking events are consumed)
//! 3. feed queued events to the current mode, then its `on_update`
//! 4. carry out the commands the modes queued
//! 5. advance the weather pipeline
//! 6. render and flush if the mode asked for it
//! 7. auto-save settings, then check the display-sleep timeout

use log::{info, warn};

use crate::adapters::entropy::XorShift32;
use crate::app::ports::{HttpPort, StoragePort};
use crate::config::{
    DeviceSettings, SENSITIVITY_MAX, SENSITIVITY_MIN, SLEEP_MINUTES_MAX, SLEEP_MINUTES_MIN,
};
use crate::drivers::button::ButtonEvent;
use crate::drivers::encoder::RotaryEncoder;
use crate::drivers::touch::{TouchEvent, TouchSensor};
use crate::events::{EventQueue, InputEvent};
use crate::fsm::context::{ApplicationContext, MotionStatus, WifiStatus};
use crate::fsm::modes::build_mode_table;
use crate::fsm::{ModeDispatcher, ModeId};
use crate::menu::build_main_menu;
use crate::sensors::motion::MotionDetector;
use crate::sensors::SensorHub;
use crate::weather::bounded;
use crate::weather::service::WeatherService;

use super::commands::AppCommand;
use super::events::AppEvent;
use super::ports::{
    ClockPort, ConnectivityPort, DisplayPort, EntropyPort, EventSink, InputPort, SensorPort,
    SettingsPort, TaskSpawner, WifiState,
};

/// Settings are written this long after the last change.
pub const AUTO_SAVE_DELAY_MS: u32 = 5_000;

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

pub struct AppService<H, S> {
    dispatcher: ModeDispatcher,
    ctx: ApplicationContext,
    queue: EventQueue,

    encoder: RotaryEncoder,
    touch: TouchSensor,
    motion: MotionDetector,
    sensors: SensorHub,

    weather: WeatherService<H, S>,
    settings_store: Box<dyn SettingsPort>,
    clock: Box<dyn ClockPort>,
    spawner: Box<dyn TaskSpawner>,

    display_on: bool,
    last_activity_ms: u32,
    /// Time of the last unsaved settings change.
    settings_dirty_since: Option<u32>,
    wifi_state: WifiState,
    tick_count: u64,
}

impl<H, S> AppService<H, S>
where
    H: HttpPort + 'static,
    S: StoragePort + Clone + Send + 'static,
{
    /// Build the service and load the persisted settings. Does **not**
    /// start anything; call [`start`](Self::start) next.
    pub fn new(
        settings_store: Box<dyn SettingsPort>,
        weather: WeatherService<H, S>,
        clock: Box<dyn ClockPort>,
        spawner: Box<dyn TaskSpawner>,
        rng: Box<dyn EntropyPort>,
        display_height: i32,
    ) -> Self {
        let settings = settings_store.load().unwrap_or_else(|e| {
            warn!("SETTINGS: load failed ({}), using defaults", e);
            DeviceSettings::default()
        });
        let ctx = ApplicationContext::new(settings, weather.is_enabled(), display_height, rng);
        let mut motion = MotionDetector::new();
        motion.set_threshold(ctx.settings.shake_threshold());

        Self {
            dispatcher: ModeDispatcher::new(build_mode_table(), ModeId::Animations),
            ctx,
            queue: EventQueue::new(),
            encoder: RotaryEncoder::new(),
            touch: TouchSensor::new(),
            motion,
            sensors: SensorHub::new(),
            weather,
            settings_store,
            clock,
            spawner,
            display_on: true,
            last_activity_ms: 0,
            settings_dirty_since: None,
            wifi_state: WifiState::Idle,
            tick_count: 0,
        }
    }

    /// Seeded generator for hosts without a hardware RNG.
    pub fn default_rng(seed: u32) -> Box<dyn EntropyPort> {
        Box::new(XorShift32::new(seed))
    }

    /// Turn features off for sensors that failed to initialise.
    pub fn set_sensor_presence(&mut self, touch: bool, climate: bool, sound: bool) {
        self.touch.set_enabled(touch);
        self.sensors.set_climate_enabled(climate);
        self.sensors.set_sound_enabled(sound);
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Prime the edge detectors, load the weather cache and enter the
    /// initial mode.
    pub fn start(
        &mut self,
        uptime_ms: u64,
        inputs: &mut impl InputPort,
        display: &mut dyn DisplayPort,
        sink: &mut impl EventSink,
    ) {
        self.set_time(uptime_ms);
        let raw = inputs.sample();
        self.encoder.begin(raw.encoder_clk, raw.encoder_dt);
        self.last_activity_ms = self.ctx.now_ms;

        display.set_brightness(self.ctx.settings.brightness);
        display.set_power(true);
        self.display_on = true;

        self.weather.init(uptime_ms, sink);
        self.ctx.menu = build_main_menu(&self.ctx.settings, self.weather.is_enabled());
        self.ctx.weather = self.weather.snapshot();

        self.dispatcher.start(&mut self.ctx);
        let mode = self.dispatcher.current_mode();
        sink.emit(&AppEvent::Started(mode));
        info!("APP: started in {:?}", mode);
    }

    // ── Per-tick orchestration ────────────────────────────────

    pub fn tick(
        &mut self,
        uptime_ms: u64,
        inputs: &mut impl InputPort,
        sensors: &mut impl SensorPort,
        display: &mut dyn DisplayPort,
        wifi: &mut impl ConnectivityPort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;
        self.set_time(uptime_ms);
        let now = self.ctx.now_ms;
        let mode_before = self.dispatcher.current_mode();

        // 1. Hardware and connectivity
        self.poll_inputs(inputs);
        self.poll_sensors(sensors);
        wifi.update(now);
        self.refresh_context(wifi, sink);

        // 2. Activity and wake
        self.handle_activity(display, sink);

        // 3. Current mode
        let (dispatcher, ctx) = (&mut self.dispatcher, &mut self.ctx);
        self.queue.drain_events(|event| dispatcher.handle_event(event, ctx));
        self.dispatcher.tick(&mut self.ctx);

        // 4. Side effects
        while let Some(cmd) = self.ctx.commands.pop_front() {
            self.execute(cmd, uptime_ms, display, wifi, sink);
        }

        // 5. Background fetches
        self.weather
            .update(uptime_ms, wifi.is_connected(), &*self.spawner, sink);
        self.ctx.weather = self.weather.snapshot();

        // 6. Render
        if self.display_on && self.dispatcher.render(&mut self.ctx, display) {
            if let Err(e) = display.flush() {
                warn!("DISPLAY: flush failed: {:?}", e);
                sink.emit(&AppEvent::DisplayFault);
            }
        }

        let mode_after = self.dispatcher.current_mode();
        if mode_after != mode_before {
            sink.emit(&AppEvent::ModeChanged {
                from: mode_before,
                to: mode_after,
            });
        }

        // 7. Persistence and power
        self.auto_save_if_needed(sink);
        self.sleep_if_idle(display, sink);
    }

    /// Queue an input event as if it had come from the hardware.
    pub fn push_input(&mut self, event: InputEvent) -> bool {
        self.queue.push_event(event)
    }

    // ── Command handling ──────────────────────────────────────

    fn execute(
        &mut self,
        cmd: AppCommand,
        uptime_ms: u64,
        display: &mut dyn DisplayPort,
        wifi: &mut impl ConnectivityPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::EnterMode(mode) => self.dispatcher.force_transition(mode, &mut self.ctx),
            AppCommand::PlayAnimation(anim) => {
                self.dispatcher
                    .force_transition(ModeId::Animations, &mut self.ctx);
                let now = self.ctx.now_ms;
                self.ctx.behavior.play_action(anim, &mut self.ctx.engine, now);
                self.ctx.redraw = true;
            }
            AppCommand::SetBrightness(level) => {
                self.ctx.settings.brightness = level;
                if self.display_on {
                    display.set_brightness(level);
                }
                self.mark_settings_dirty();
            }
            AppCommand::SetSound(on) => {
                self.ctx.settings.sound_enabled = on;
                self.mark_settings_dirty();
            }
            AppCommand::SetSensitivity(level) => {
                self.ctx.settings.motion_sensitivity = level.clamp(SENSITIVITY_MIN, SENSITIVITY_MAX);
                self.motion.set_threshold(self.ctx.settings.shake_threshold());
                self.mark_settings_dirty();
            }
            AppCommand::SetSleepMinutes(minutes) => {
                self.ctx.settings.display_sleep_minutes =
                    minutes.clamp(SLEEP_MINUTES_MIN, SLEEP_MINUTES_MAX);
                self.mark_settings_dirty();
            }
            AppCommand::SetWeatherEnabled(on) => self.weather.set_enabled(on, uptime_ms),
            AppCommand::ForceWeatherUpdate => {
                let started =
                    self.weather
                        .force_update(uptime_ms, wifi.is_connected(), &*self.spawner, sink);
                if !started {
                    info!("APP: weather update not started");
                }
            }
            AppCommand::ClearWeatherCache => {
                if !self.weather.clear_cache(sink) {
                    info!("APP: cache clear refused while fetching");
                }
            }
            AppCommand::StartWifiPortal => {
                wifi.start_portal();
                self.dispatcher
                    .force_transition(ModeId::WifiSetup, &mut self.ctx);
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn current_mode(&self) -> ModeId {
        self.dispatcher.current_mode()
    }

    pub fn context(&self) -> &ApplicationContext {
        &self.ctx
    }

    pub fn settings(&self) -> &DeviceSettings {
        &self.ctx.settings
    }

    pub fn weather(&self) -> &WeatherService<H, S> {
        &self.weather
    }

    pub fn weather_mut(&mut self) -> &mut WeatherService<H, S> {
        &mut self.weather
    }

    pub fn is_display_on(&self) -> bool {
        self.display_on
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Input events lost to a full queue since boot.
    pub fn dropped_events(&self) -> u32 {
        self.queue.dropped()
    }

    // ── Internal ──────────────────────────────────────────────

    fn set_time(&mut self, uptime_ms: u64) {
        self.ctx.uptime_ms = uptime_ms;
        // Truncation is intended; UI timers use wrapping arithmetic.
        self.ctx.now_ms = uptime_ms as u32;
    }

    fn poll_inputs(&mut self, inputs: &mut impl InputPort) {
        let now = self.ctx.now_ms;
        let raw = inputs.sample();

        let enc = self
            .encoder
            .update(raw.encoder_clk, raw.encoder_dt, raw.button_pressed, now);
        if enc.delta != 0 {
            self.queue.push_event(InputEvent::Rotate(enc.delta));
        }
        if matches!(
            enc.button,
            ButtonEvent::Click | ButtonEvent::DoubleClick | ButtonEvent::LongPress
        ) {
            self.queue.push_event(InputEvent::Button(enc.button));
        }

        let touch = self.touch.update(raw.touch_active, now);
        if matches!(
            touch,
            TouchEvent::Tap | TouchEvent::DoubleTap | TouchEvent::LongTouch
        ) {
            self.queue.push_event(InputEvent::Touch(touch));
        }
    }

    fn poll_sensors(&mut self, sensors: &mut impl SensorPort) {
        let now = self.ctx.now_ms;
        if let Some(accel) = sensors.read_acceleration() {
            if let Some(event) = self.motion.update(accel, now) {
                self.queue.push_event(InputEvent::Motion(event));
            }
            self.ctx.motion = MotionStatus {
                shaking: self.motion.is_shaking(),
                magnitude: self.motion.magnitude(),
            };
        }
        self.sensors.update(sensors, now);
        self.ctx.env = self.sensors.snapshot();
    }

    fn refresh_context(&mut self, wifi: &mut impl ConnectivityPort, sink: &mut impl EventSink) {
        self.ctx.wall_time = self.clock.wall_time();

        while let Some(event) = wifi.pop_event() {
            sink.emit(&AppEvent::Wifi(event));
        }
        let state = wifi.state();
        self.ctx.wifi = WifiStatus {
            state,
            ssid: bounded(wifi.ssid(), 32),
            ip: bounded(wifi.ip_address().unwrap_or(""), 16),
            ap_name: bounded(wifi.ap_name(), 16),
        };
        if state != self.wifi_state {
            sink.emit(&AppEvent::WifiStateChanged {
                from: self.wifi_state,
                to: state,
            });
            self.wifi_state = state;
            self.ctx.redraw = true;
            // Provisioning needs the instructions on screen whatever
            // the user was doing.
            if state == WifiState::ApMode {
                self.dispatcher
                    .force_transition(ModeId::WifiSetup, &mut self.ctx);
            }
        }
    }

    fn handle_activity(&mut self, display: &mut dyn DisplayPort, sink: &mut impl EventSink) {
        let mut active = false;
        let mut remaining = EventQueue::new();
        self.queue.drain_events(|event| {
            active |= event.is_activity();
            remaining.push_event(event);
        });
        if !active {
            self.queue = remaining;
            return;
        }
        self.last_activity_ms = self.ctx.now_ms;
        if self.display_on {
            self.queue = remaining;
            return;
        }

        display.set_power(true);
        display.set_brightness(self.ctx.settings.brightness);
        self.display_on = true;
        self.ctx.redraw = true;
        info!("DISPLAY: wake");
        sink.emit(&AppEvent::DisplayWake);
        // `remaining` is dropped: the waking input does nothing else.
    }

    fn sleep_if_idle(&mut self, display: &mut dyn DisplayPort, sink: &mut impl EventSink) {
        if !self.display_on {
            return;
        }
        let idle = u64::from(self.ctx.now_ms.wrapping_sub(self.last_activity_ms));
        if idle < self.ctx.settings.display_sleep_ms() {
            return;
        }
        self.force_save_if_dirty(sink);
        display.set_power(false);
        self.display_on = false;
        info!("DISPLAY: sleep after {} s idle", idle / 1_000);
        sink.emit(&AppEvent::DisplaySleep);
    }

    // ── Settings dirty-flag management ────────────────────────

    /// Restart the auto-save countdown.
    pub fn mark_settings_dirty(&mut self) {
        self.settings_dirty_since = Some(self.ctx.now_ms);
    }

    pub fn is_settings_dirty(&self) -> bool {
        self.settings_dirty_since.is_some()
    }

    /// Save once [`AUTO_SAVE_DELAY_MS`] have passed since the last change.
    /// Returns `true` if the settings were saved.
    pub fn auto_save_if_needed(&mut self, sink: &mut impl EventSink) -> bool {
        match self.settings_dirty_since {
            Some(since) if self.ctx.now_ms.wrapping_sub(since) >= AUTO_SAVE_DELAY_MS => {
                self.save_settings(sink)
            }
            _ => false,
        }
    }

    /// Save now if anything is pending (before the panel powers down).
    pub fn force_save_if_dirty(&mut self, sink: &mut impl EventSink) {
        if self.settings_dirty_since.is_some() {
            self.save_settings(sink);
        }
    }

    fn save_settings(&mut self, sink: &mut impl EventSink) -> bool {
        match self.settings_store.save(&self.ctx.settings) {
            Ok(()) => {
                self.settings_dirty_since = None;
                info!("SETTINGS: saved");
                sink.emit(&AppEvent::SettingsSaved);
                true
            }
            Err(e) => {
                // Retry after another full delay.
                self.settings_dirty_since = Some(self.ctx.now_ms);
                warn!("SETTINGS: save failed: {}", e);
                sink.emit(&AppEvent::SettingsSaveFailed);
                false
            }
        }
    }
}
