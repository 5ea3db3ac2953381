//! Digital clock. Shows uptime until the wall clock has synchronised.

use crate::app::ports::{DisplayPort, TextAlign, TextSize};
use crate::fsm::context::ApplicationContext;
use crate::fsm::ModeId;

use super::{HOLD_FOR_MENU, draw_footer, fmt};

pub const CLOCK_REFRESH_MS: u32 = 1_000;

pub fn on_update(ctx: &mut ApplicationContext) -> Option<ModeId> {
    if ctx.refresh_due(CLOCK_REFRESH_MS) {
        ctx.redraw = true;
    }
    None
}

pub fn render(ctx: &ApplicationContext, d: &mut dyn DisplayPort) {
    let cx = d.width() / 2;
    d.clear();
    match ctx.wall_time {
        Some(t) => {
            let hm: heapless::String<8> = fmt(format_args!("{:02}:{:02}", t.hour, t.minute));
            d.draw_text(&hm, cx, 12, TextSize::Large, TextAlign::Center);
            let s: heapless::String<4> = fmt(format_args!(":{:02}", t.second));
            d.draw_text(&s, cx, 36, TextSize::Small, TextAlign::Center);
        }
        None => {
            d.draw_text("--:--", cx, 12, TextSize::Large, TextAlign::Center);
            let up = uptime_text(ctx.uptime_ms);
            d.draw_text(&up, cx, 36, TextSize::Small, TextAlign::Center);
        }
    }
    draw_footer(d, HOLD_FOR_MENU);
}

/// `Up H:MM:SS`, hours unbounded.
pub fn uptime_text(uptime_ms: u64) -> heapless::String<20> {
    let secs = uptime_ms / 1000;
    fmt(format_args!("Up {}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::oled::Framebuffer;
    use crate::app::ports::WallTime;

    #[test]
    fn wall_time_when_synced() {
        let mut ctx = ApplicationContext::for_tests();
        ctx.wall_time = Some(WallTime { hour: 7, minute: 5, second: 9 });
        let mut fb = Framebuffer::new();
        render(&ctx, &mut fb);
        assert!(fb.text_log().iter().any(|t| t == "07:05"));
        assert!(fb.text_log().iter().any(|t| t == ":09"));
    }

    #[test]
    fn uptime_before_sync() {
        let mut ctx = ApplicationContext::for_tests();
        ctx.uptime_ms = (26 * 3600 + 3 * 60 + 4) * 1000;
        let mut fb = Framebuffer::new();
        render(&ctx, &mut fb);
        assert!(fb.text_log().iter().any(|t| t == "--:--"));
        assert!(fb.text_log().iter().any(|t| t == "Up 26:03:04"));
    }
}
