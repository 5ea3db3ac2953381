//! Idle face. The behaviour controller blinks, winks and reacts to touch
//! and shakes; the button opens the menu.

use crate::app::ports::DisplayPort;
use crate::drivers::button::ButtonEvent;
use crate::drivers::touch::TouchEvent;
use crate::events::InputEvent;
use crate::fsm::context::ApplicationContext;
use crate::fsm::ModeId;
use crate::sensors::motion::MotionEvent;

use super::{draw_footer, HOLD_FOR_MENU};

pub fn on_enter(ctx: &mut ApplicationContext) {
    let now = ctx.now_ms;
    ctx.behavior.start(&mut ctx.engine, &mut *ctx.rng, now);
}

pub fn on_event(ctx: &mut ApplicationContext, event: InputEvent) -> Option<ModeId> {
    let now = ctx.now_ms;
    match event {
        InputEvent::Button(ButtonEvent::Click | ButtonEvent::LongPress)
        | InputEvent::Touch(TouchEvent::LongTouch) => return Some(ModeId::Menu),
        InputEvent::Touch(ev @ (TouchEvent::Tap | TouchEvent::DoubleTap)) => {
            ctx.behavior.on_touch(ev, &mut ctx.engine, now);
        }
        InputEvent::Motion(MotionEvent::Shake) => ctx.behavior.on_shake(&mut ctx.engine, now),
        _ => {}
    }
    ctx.redraw = true;
    None
}

pub fn on_update(ctx: &mut ApplicationContext) -> Option<ModeId> {
    let now = ctx.now_ms;
    let before = (ctx.engine.current_anim(), ctx.engine.current_frame());
    let advanced = ctx.engine.update(now);
    ctx.behavior.tick(&mut ctx.engine, &mut *ctx.rng, now);
    if advanced || before != (ctx.engine.current_anim(), ctx.engine.current_frame()) {
        ctx.redraw = true;
    }
    None
}

pub fn render(ctx: &ApplicationContext, d: &mut dyn DisplayPort) {
    d.clear();
    ctx.engine.draw(d);
    draw_footer(d, HOLD_FOR_MENU);
}
