//! Handlers for every top-level mode, and the table that wires them
//! into the dispatcher.

pub mod animations;
pub mod clock;
pub mod menu;
pub mod pomodoro;
pub mod pong;
pub mod sensors;
pub mod weather;
pub mod wifi;

use super::{ModeDescriptor, ModeId};
use crate::app::ports::{DisplayPort, TextAlign, TextSize};
use crate::drivers::button::ButtonEvent;
use crate::events::InputEvent;

/// Footer hint shown by the views that leave on a long press.
pub const HOLD_FOR_MENU: &str = "Hold=Menu";

/// Build the mode table. Row order must match `ModeId` discriminants.
pub fn build_mode_table() -> [ModeDescriptor; ModeId::COUNT] {
    [
        ModeDescriptor {
            id: ModeId::Animations,
            name: "Animations",
            on_enter: Some(animations::on_enter),
            on_exit: None,
            on_event: animations::on_event,
            on_update: animations::on_update,
            render: animations::render,
        },
        ModeDescriptor {
            id: ModeId::Menu,
            name: "Menu",
            on_enter: Some(menu::on_enter),
            on_exit: None,
            on_event: menu::on_event,
            on_update: menu::on_update,
            render: menu::render,
        },
        ModeDescriptor {
            id: ModeId::Sensors,
            name: "Sensors",
            on_enter: None,
            on_exit: None,
            on_event: leave_on_long_press,
            on_update: sensors::on_update_sensors,
            render: sensors::render_sensors,
        },
        ModeDescriptor {
            id: ModeId::MotionTest,
            name: "MotionTest",
            on_enter: None,
            on_exit: None,
            on_event: leave_on_long_press,
            on_update: sensors::on_update_motion,
            render: sensors::render_motion,
        },
        ModeDescriptor {
            id: ModeId::WifiSetup,
            name: "WifiSetup",
            on_enter: Some(wifi::on_enter_setup),
            on_exit: None,
            on_event: leave_on_long_press,
            on_update: wifi::on_update_setup,
            render: wifi::render_setup,
        },
        ModeDescriptor {
            id: ModeId::WifiInfo,
            name: "WifiInfo",
            on_enter: None,
            on_exit: None,
            on_event: leave_on_long_press,
            on_update: wifi::on_update_info,
            render: wifi::render_info,
        },
        ModeDescriptor {
            id: ModeId::WeatherView,
            name: "WeatherView",
            on_enter: Some(weather::on_enter),
            on_exit: None,
            on_event: weather::on_event,
            on_update: weather::on_update,
            render: weather::render,
        },
        ModeDescriptor {
            id: ModeId::Clock,
            name: "Clock",
            on_enter: None,
            on_exit: None,
            on_event: leave_on_long_press,
            on_update: clock::on_update,
            render: clock::render,
        },
        ModeDescriptor {
            id: ModeId::Pomodoro,
            name: "Pomodoro",
            on_enter: None,
            on_exit: None,
            on_event: pomodoro::on_event,
            on_update: pomodoro::on_update,
            render: pomodoro::render,
        },
        ModeDescriptor {
            id: ModeId::Pong,
            name: "Pong",
            on_enter: Some(pong::on_enter),
            on_exit: None,
            on_event: pong::on_event,
            on_update: pong::on_update,
            render: pong::render,
        },
    ]
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

pub(crate) fn is_long_press(event: InputEvent) -> bool {
    matches!(event, InputEvent::Button(ButtonEvent::LongPress))
}

/// Event handler for the read-only views.
pub(crate) fn leave_on_long_press(
    _ctx: &mut super::context::ApplicationContext,
    event: InputEvent,
) -> Option<ModeId> {
    is_long_press(event).then_some(ModeId::Menu)
}

/// Clear and draw a centred title with a rule under it.
pub(crate) fn draw_title(d: &mut dyn DisplayPort, title: &str) {
    let w = d.width();
    d.clear();
    d.draw_text(title, w / 2, 0, TextSize::Small, TextAlign::Center);
    d.draw_line(0, 10, w - 1, 10);
}

pub(crate) fn draw_footer(d: &mut dyn DisplayPort, text: &str) {
    let (w, h) = (d.width(), d.height());
    d.draw_text(text, w / 2, h - 10, TextSize::Small, TextAlign::Center);
}

/// Format into a small stack string. Overlong output is cut at the last
/// whole character that fits.
pub(crate) fn fmt<const N: usize>(args: core::fmt::Arguments<'_>) -> heapless::String<N> {
    let mut out = Truncating(heapless::String::new());
    let _ = core::fmt::write(&mut out, args);
    out.0
}

struct Truncating<const N: usize>(heapless::String<N>);

impl<const N: usize> core::fmt::Write for Truncating<N> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        for c in s.chars() {
            if self.0.push(c).is_err() {
                return Err(core::fmt::Error);
            }
        }
        Ok(())
    }
}
