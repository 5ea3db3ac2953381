//! Forecast view. Page 0 lists every day, pages 1..=N show one day in
//! detail; the encoder pages through them.

use crate::app::ports::{DisplayPort, TextAlign, TextSize};
use crate::events::InputEvent;
use crate::fsm::context::ApplicationContext;
use crate::fsm::ModeId;
use crate::weather::icons::WeatherIcon;
use crate::weather::{DayForecast, WeatherSnapshot, WeatherState, service::MAX_RETRIES};

use super::{draw_title, fmt, is_long_press};

/// Pick up fresh service snapshots at this rate.
pub const WEATHER_REFRESH_MS: u32 = 1_000;
const ROW_HEIGHT: i32 = 12;
const SYMBOL_CHARS: usize = 15;

pub fn on_enter(ctx: &mut ApplicationContext) {
    ctx.weather_page = 0;
}

pub fn on_event(ctx: &mut ApplicationContext, event: InputEvent) -> Option<ModeId> {
    if is_long_press(event) {
        return Some(ModeId::Menu);
    }
    if let InputEvent::Rotate(detents) = event {
        let pages = ctx.weather.forecast.days.len() as i32;
        let next = (i32::from(ctx.weather_page) + detents).clamp(0, pages);
        if next != i32::from(ctx.weather_page) {
            ctx.weather_page = next as u8;
            ctx.redraw = true;
        }
    }
    None
}

pub fn on_update(ctx: &mut ApplicationContext) -> Option<ModeId> {
    // The forecast may have shrunk under us after a cache clear.
    let pages = ctx.weather.forecast.days.len() as u8;
    if ctx.weather_page > pages {
        ctx.weather_page = 0;
    }
    if ctx.refresh_due(WEATHER_REFRESH_MS) {
        ctx.redraw = true;
    }
    None
}

pub fn render(ctx: &ApplicationContext, d: &mut dyn DisplayPort) {
    let w = &ctx.weather;
    if !(w.location.valid && w.forecast.valid) || w.forecast.days.is_empty() {
        render_status(w, ctx.wifi.is_connected(), d);
        return;
    }
    match ctx.weather_page {
        0 => render_overview(w, d),
        n => match w.forecast.days.get(usize::from(n) - 1) {
            Some(day) => render_day(day, n, w.forecast.days.len(), d),
            None => render_overview(w, d),
        },
    }
}

/// Nothing to show yet: say why.
fn render_status(w: &WeatherSnapshot, wifi_connected: bool, d: &mut dyn DisplayPort) {
    let cx = d.width() / 2;
    draw_title(d, "Weather");
    let mut line = |text: &str, y: i32| d.draw_text(text, cx, y, TextSize::Small, TextAlign::Center);
    match w.state {
        WeatherState::FetchingLocation => {
            line("Getting", 20);
            line("location...", 32);
        }
        WeatherState::FetchingWeather => {
            line("Getting", 20);
            line("forecast...", 32);
        }
        WeatherState::Error => {
            line("Error:", 16);
            line(w.last_error.map_or("Unknown", |e| e.reason()), 28);
            let retry: heapless::String<16> =
                fmt(format_args!("Retry {}/{}", w.retry_count, MAX_RETRIES));
            line(&retry, 42);
        }
        WeatherState::Cached | WeatherState::Stale => line("No fresh data", 26),
        WeatherState::Idle if !w.enabled => {
            line("Weather off", 20);
            line("Menu > Auto Update", 32);
        }
        WeatherState::Idle if !wifi_connected => {
            line("No WiFi", 20);
            line("connection", 32);
        }
        WeatherState::Idle => {
            line("No data", 20);
            line("available", 32);
        }
    }
}

fn render_overview(w: &WeatherSnapshot, d: &mut dyn DisplayPort) {
    let city = if w.location.city.is_empty() { "Weather" } else { w.location.city.as_str() };
    draw_title(d, city);
    for (i, day) in w.forecast.days.iter().enumerate() {
        let y = 14 + i as i32 * ROW_HEIGHT;
        WeatherIcon::classify(&day.symbol).draw(d, 0, y);
        d.draw_text(day.day_of_month(), 12, y, TextSize::Small, TextAlign::Left);
        let temps: heapless::String<16> =
            fmt(format_args!("{:.0}/{:.0}", day.temp_min, day.temp_max));
        d.draw_text(&temps, 30, y, TextSize::Small, TextAlign::Left);
        let hum: heapless::String<8> = fmt(format_args!("{:.0}%", day.humidity));
        d.draw_text(&hum, 80, y, TextSize::Small, TextAlign::Left);
    }
    if w.state == WeatherState::Stale {
        d.draw_text("*", d.width() - 1, 0, TextSize::Small, TextAlign::Right);
    }
}

fn render_day(day: &DayForecast, page: u8, total: usize, d: &mut dyn DisplayPort) {
    let small = |d: &mut dyn DisplayPort, text: &str, y: i32| {
        d.draw_text(text, 0, y, TextSize::Small, TextAlign::Left);
    };
    draw_title(d, &day.date);
    WeatherIcon::classify(&day.symbol).draw(d, 60, 12);
    let temp: heapless::String<24> =
        fmt(format_args!("Temp: {:.1} - {:.1} C", day.temp_min, day.temp_max));
    small(d, &temp, 22);
    let hum: heapless::String<20> = fmt(format_args!("Humidity: {:.0}%", day.humidity));
    small(d, &hum, 32);
    let symbol: heapless::String<24> = fmt(format_args!(
        "Cond: {}",
        day.symbol.get(..SYMBOL_CHARS.min(day.symbol.len())).unwrap_or(day.symbol.as_str())
    ));
    small(d, &symbol, 42);
    let footer: heapless::String<24> = fmt(format_args!("Day {}/{}  Rotate:nav", page, total));
    small(d, &footer, 54);
}
