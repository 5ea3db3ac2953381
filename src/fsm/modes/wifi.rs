//! WiFi provisioning instructions and connection status.

use crate::app::ports::{DisplayPort, TextAlign, TextSize, WifiState};
use crate::fsm::context::ApplicationContext;
use crate::fsm::ModeId;

use super::{HOLD_FOR_MENU, draw_footer, draw_title, fmt};

pub const WIFI_REFRESH_MS: u32 = 500;
/// Address of the captive portal while the access point is up.
pub const PORTAL_ADDRESS: &str = "192.168.4.1";

pub fn on_enter_setup(ctx: &mut ApplicationContext) {
    ctx.portal_seen = false;
}

/// Returns to the face once credentials submitted through the portal
/// have produced a connection.
pub fn on_update_setup(ctx: &mut ApplicationContext) -> Option<ModeId> {
    if ctx.refresh_due(WIFI_REFRESH_MS) {
        ctx.redraw = true;
    }
    match ctx.wifi.state {
        WifiState::ApMode | WifiState::Connecting => ctx.portal_seen = true,
        WifiState::Connected if ctx.portal_seen => {
            log::info!("WIFI: provisioned, leaving setup");
            return Some(ModeId::Animations);
        }
        _ => {}
    }
    None
}

pub fn render_setup(ctx: &ApplicationContext, d: &mut dyn DisplayPort) {
    let w = d.width();
    draw_title(d, "WiFi Setup");
    d.draw_text("Connect to:", 0, 13, TextSize::Small, TextAlign::Left);
    let ap = if ctx.wifi.ap_name.is_empty() { "-" } else { ctx.wifi.ap_name.as_str() };
    d.draw_text(ap, w / 2, 23, TextSize::Small, TextAlign::Center);
    let open: heapless::String<24> = fmt(format_args!("Open {}", PORTAL_ADDRESS));
    d.draw_text(&open, 0, 34, TextSize::Small, TextAlign::Left);
    d.draw_text(ctx.wifi.state.label(), w / 2, 44, TextSize::Small, TextAlign::Center);
    draw_footer(d, HOLD_FOR_MENU);
}

pub fn on_update_info(ctx: &mut ApplicationContext) -> Option<ModeId> {
    if ctx.refresh_due(WIFI_REFRESH_MS) {
        ctx.redraw = true;
    }
    None
}

pub fn render_info(ctx: &ApplicationContext, d: &mut dyn DisplayPort) {
    draw_title(d, "WiFi Status");
    let wifi = &ctx.wifi;
    let state: heapless::String<24> = fmt(format_args!("State: {}", wifi.state.label()));
    d.draw_text(&state, 0, 13, TextSize::Small, TextAlign::Left);
    match wifi.state {
        WifiState::ApMode => {
            let ap: heapless::String<24> = fmt(format_args!("AP: {}", wifi.ap_name));
            d.draw_text(&ap, 0, 24, TextSize::Small, TextAlign::Left);
            d.draw_text(PORTAL_ADDRESS, 0, 35, TextSize::Small, TextAlign::Left);
        }
        _ => {
            let ssid = if wifi.ssid.is_empty() { "(none)" } else { wifi.ssid.as_str() };
            let ssid: heapless::String<40> = fmt(format_args!("SSID: {}", ssid));
            d.draw_text(&ssid, 0, 24, TextSize::Small, TextAlign::Left);
            if wifi.is_connected() && !wifi.ip.is_empty() {
                let ip: heapless::String<24> = fmt(format_args!("IP: {}", wifi.ip));
                d.draw_text(&ip, 0, 35, TextSize::Small, TextAlign::Left);
            }
        }
    }
    draw_footer(d, HOLD_FOR_MENU);
}
