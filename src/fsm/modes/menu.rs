//! Menu mode: routes input to the navigator and turns its actions into
//! mode switches and queued commands.

use crate::animation::AnimId;
use crate::app::commands::AppCommand;
use crate::app::ports::DisplayPort;
use crate::drivers::button::ButtonEvent;
use crate::drivers::touch::TouchEvent;
use crate::events::InputEvent;
use crate::fsm::context::ApplicationContext;
use crate::fsm::ModeId;
use crate::menu::navigator::{MenuAction, MenuNav};
use crate::menu::{draw_menu, ids};
use crate::sensors::motion::MotionEvent;

/// Inactivity before the menu closes itself.
pub const MENU_TIMEOUT_MS: u32 = 10_000;

pub fn on_enter(ctx: &mut ApplicationContext) {
    ctx.nav.return_to_root();
    ctx.menu_activity_ms = ctx.now_ms;
}

pub fn on_event(ctx: &mut ApplicationContext, event: InputEvent) -> Option<ModeId> {
    ctx.menu_activity_ms = ctx.now_ms;
    ctx.redraw = true;

    let action = match event {
        InputEvent::Rotate(detents) => ctx.nav.rotate(detents, &mut ctx.menu),
        InputEvent::Button(ButtonEvent::Click) | InputEvent::Touch(TouchEvent::Tap) => {
            ctx.nav.navigate(MenuNav::Select, &mut ctx.menu)
        }
        InputEvent::Button(ButtonEvent::LongPress)
        | InputEvent::Touch(TouchEvent::LongTouch)
        | InputEvent::Motion(MotionEvent::Shake) => {
            if ctx.nav.is_at_root() {
                return Some(ModeId::Animations);
            }
            ctx.nav.navigate(MenuNav::Back, &mut ctx.menu)
        }
        _ => None,
    };
    action.and_then(|a| apply_action(ctx, a))
}

pub fn on_update(ctx: &mut ApplicationContext) -> Option<ModeId> {
    (ctx.now_ms.wrapping_sub(ctx.menu_activity_ms) >= MENU_TIMEOUT_MS).then(|| {
        log::info!("MENU: timed out");
        ModeId::Animations
    })
}

pub fn render(ctx: &ApplicationContext, d: &mut dyn DisplayPort) {
    draw_menu(d, &ctx.menu, &ctx.nav);
}

fn apply_action(ctx: &mut ApplicationContext, action: MenuAction) -> Option<ModeId> {
    match action {
        MenuAction::Activated(id) => activate(ctx, id),
        MenuAction::ValueChanged(id, value) => {
            if let Some(cmd) = setting_command(id, value) {
                ctx.push_command(cmd);
            }
            None
        }
        MenuAction::EnteredSubmenu(_)
        | MenuAction::WentBack
        | MenuAction::EditStarted(_)
        | MenuAction::EditFinished(_) => None,
    }
}

fn activate(ctx: &mut ApplicationContext, id: crate::menu::tree::ItemId) -> Option<ModeId> {
    let play = |ctx: &mut ApplicationContext, anim| {
        ctx.push_command(AppCommand::PlayAnimation(anim));
        Some(ModeId::Animations)
    };
    match id {
        ids::ANIM_IDLE => play(ctx, AnimId::Idle),
        ids::ANIM_WINK => play(ctx, AnimId::Wink),
        ids::ANIM_DIZZY => play(ctx, AnimId::Dizzy),
        ids::ANIM_SURPRISED => play(ctx, AnimId::Surprised),
        ids::SENSOR_CLIMATE | ids::SENSOR_SOUND => Some(ModeId::Sensors),
        ids::MOTION_TEST => Some(ModeId::MotionTest),
        ids::WEATHER_FORECAST => Some(ModeId::WeatherView),
        ids::WEATHER_UPDATE => {
            ctx.push_command(AppCommand::ForceWeatherUpdate);
            Some(ModeId::WeatherView)
        }
        ids::WEATHER_CLEAR => {
            ctx.push_command(AppCommand::ClearWeatherCache);
            None
        }
        ids::CLOCK => Some(ModeId::Clock),
        ids::POMODORO => Some(ModeId::Pomodoro),
        ids::PONG => Some(ModeId::Pong),
        ids::WIFI_STATUS => Some(ModeId::WifiInfo),
        ids::WIFI_PORTAL => {
            ctx.push_command(AppCommand::StartWifiPortal);
            Some(ModeId::WifiSetup)
        }
        other => {
            log::debug!("MENU: no handler for item {}", other);
            None
        }
    }
}

/// Map an edited menu value to the settings command it stands for.
fn setting_command(id: crate::menu::tree::ItemId, value: i32) -> Option<AppCommand> {
    let byte = || u8::try_from(value).ok();
    match id {
        ids::BRIGHTNESS => byte().map(AppCommand::SetBrightness),
        ids::SOUND => Some(AppCommand::SetSound(value != 0)),
        ids::SENSITIVITY => byte().map(AppCommand::SetSensitivity),
        ids::SLEEP_MINUTES => byte().map(AppCommand::SetSleepMinutes),
        ids::WEATHER_AUTO => Some(AppCommand::SetWeatherEnabled(value != 0)),
        _ => None,
    }
}
