//! Pong against the AI paddle. The encoder steers, a click serves or
//! pauses.

use crate::app::ports::DisplayPort;
use crate::drivers::button::ButtonEvent;
use crate::drivers::touch::TouchEvent;
use crate::events::InputEvent;
use crate::fsm::context::ApplicationContext;
use crate::fsm::ModeId;

use super::is_long_press;

pub fn on_enter(ctx: &mut ApplicationContext) {
    ctx.pong.reset(ctx.now_ms);
}

pub fn on_event(ctx: &mut ApplicationContext, event: InputEvent) -> Option<ModeId> {
    if is_long_press(event) {
        return Some(ModeId::Menu);
    }
    let now = ctx.now_ms;
    match event {
        InputEvent::Button(ButtonEvent::Click) | InputEvent::Touch(TouchEvent::Tap) => {
            ctx.pong.on_click(&mut *ctx.rng, now)
        }
        InputEvent::Rotate(d) => ctx.pong.move_player(d),
        _ => return None,
    }
    ctx.redraw = true;
    None
}

pub fn on_update(ctx: &mut ApplicationContext) -> Option<ModeId> {
    if ctx.pong.update(&mut *ctx.rng, ctx.now_ms) {
        ctx.redraw = true;
    }
    None
}

pub fn render(ctx: &ApplicationContext, d: &mut dyn DisplayPort) {
    ctx.pong.draw(d);
}
