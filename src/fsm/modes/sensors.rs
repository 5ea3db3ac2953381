//! Sensor readout and the accelerometer test screen.

use crate::app::ports::{DisplayPort, TextAlign, TextSize};
use crate::fsm::context::ApplicationContext;
use crate::fsm::ModeId;

use super::{HOLD_FOR_MENU, draw_footer, draw_title, fmt};

pub const SENSORS_REFRESH_MS: u32 = 500;
pub const MOTION_REFRESH_MS: u32 = 100;
/// Magnitude that fills the motion bar.
const MOTION_BAR_FULL: f32 = 30.0;

pub fn on_update_sensors(ctx: &mut ApplicationContext) -> Option<ModeId> {
    if ctx.refresh_due(SENSORS_REFRESH_MS) {
        ctx.redraw = true;
    }
    None
}

pub fn render_sensors(ctx: &ApplicationContext, d: &mut dyn DisplayPort) {
    draw_title(d, "SENSORS");
    let env = &ctx.env;
    if env.climate_valid {
        let t: heapless::String<20> = fmt(format_args!("Temp: {:.1}C", env.temperature_c));
        let h: heapless::String<20> = fmt(format_args!("Hum: {:.1}%", env.humidity_pct));
        d.draw_text(&t, 0, 12, TextSize::Small, TextAlign::Left);
        d.draw_text(&h, 0, 22, TextSize::Small, TextAlign::Left);
    } else {
        d.draw_text("DHT: Reading...", 0, 12, TextSize::Small, TextAlign::Left);
    }
    let pct = env.sound_percent();
    let s: heapless::String<20> = fmt(format_args!("Sound: {}% {}dB", pct, env.sound_db));
    d.draw_text(&s, 0, 32, TextSize::Small, TextAlign::Left);
    d.draw_progress_bar(0, 43, d.width() as u32, 6, f32::from(pct) / 100.0);
    draw_footer(d, HOLD_FOR_MENU);
}

pub fn on_update_motion(ctx: &mut ApplicationContext) -> Option<ModeId> {
    if ctx.refresh_due(MOTION_REFRESH_MS) {
        ctx.redraw = true;
    }
    None
}

pub fn render_motion(ctx: &ApplicationContext, d: &mut dyn DisplayPort) {
    let w = d.width();
    draw_title(d, "MOTION TEST");
    if ctx.motion.shaking {
        d.draw_text("SHAKING!", w / 2, 16, TextSize::Large, TextAlign::Center);
    } else {
        d.draw_text("Shake me!", w / 2, 20, TextSize::Small, TextAlign::Center);
    }
    let a: heapless::String<20> = fmt(format_args!("Accel: {:.1}", ctx.motion.magnitude));
    d.draw_text(&a, 0, 40, TextSize::Small, TextAlign::Left);
    d.draw_progress_bar(0, 52, w as u32, 6, ctx.motion.magnitude / MOTION_BAR_FULL);
}
