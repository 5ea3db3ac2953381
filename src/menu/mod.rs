//! Hierarchical settings/launcher menu.
//!
//! [`tree`] holds the static node arena, [`navigator`] the cursor state
//! machine. This module builds the firmware's menu and renders the
//! navigator's view of it.

pub mod navigator;
pub mod tree;

use crate::app::ports::{DisplayPort, TextAlign, TextSize};
use crate::config::{DeviceSettings, SENSITIVITY_MAX, SENSITIVITY_MIN, SLEEP_MINUTES_MAX, SLEEP_MINUTES_MIN};
use navigator::{ITEM_HEIGHT, MenuNavigator, TITLE_HEIGHT};
use tree::{ItemId, ItemKind, MenuTree, TreeError};

/// Stable item IDs. Dispatch matches on these, never on labels.
pub mod ids {
    use super::ItemId;

    pub const MAIN: ItemId = 1;

    pub const ANIMATIONS: ItemId = 10;
    pub const ANIM_IDLE: ItemId = 11;
    pub const ANIM_WINK: ItemId = 12;
    pub const ANIM_DIZZY: ItemId = 13;
    pub const ANIM_SURPRISED: ItemId = 14;

    pub const SENSORS: ItemId = 20;
    pub const SENSOR_CLIMATE: ItemId = 21;
    pub const SENSOR_SOUND: ItemId = 22;

    pub const MOTION_TEST: ItemId = 30;

    pub const SETTINGS: ItemId = 40;
    pub const BRIGHTNESS: ItemId = 41;
    pub const SOUND: ItemId = 42;
    pub const SENSITIVITY: ItemId = 43;
    pub const SLEEP_MINUTES: ItemId = 44;
    pub const ABOUT: ItemId = 45;

    pub const WEATHER: ItemId = 50;
    pub const WEATHER_FORECAST: ItemId = 51;
    pub const WEATHER_UPDATE: ItemId = 52;
    pub const WEATHER_AUTO: ItemId = 53;
    pub const WEATHER_CLEAR: ItemId = 54;

    pub const CLOCK: ItemId = 60;
    pub const POMODORO: ItemId = 70;
    pub const PONG: ItemId = 80;

    pub const WIFI: ItemId = 90;
    pub const WIFI_STATUS: ItemId = 91;
    pub const WIFI_PORTAL: ItemId = 92;
}

const BRIGHTNESS_STEP: i32 = 10;

/// Build the firmware menu with editable items primed from `settings`.
pub fn build_main_menu(settings: &DeviceSettings, weather_enabled: bool) -> MenuTree {
    match try_build(settings, weather_enabled) {
        Ok(tree) => tree,
        Err(e) => {
            // Static layout; only reachable if the capacities shrink.
            log::error!("MENU: build failed: {:?}", e);
            MenuTree::new(ids::MAIN, "Menu")
        }
    }
}

fn try_build(settings: &DeviceSettings, weather_enabled: bool) -> Result<MenuTree, TreeError> {
    use ItemKind::{Action, Submenu, Toggle};

    let mut t = MenuTree::new(ids::MAIN, "Main Menu");
    let root = MenuTree::ROOT;

    let anims = t.add(root, ids::ANIMATIONS, "Animations", Submenu)?;
    t.add(anims, ids::ANIM_IDLE, "Idle Blink", Action)?;
    t.add(anims, ids::ANIM_WINK, "Wink", Action)?;
    t.add(anims, ids::ANIM_DIZZY, "Dizzy", Action)?;
    t.add(anims, ids::ANIM_SURPRISED, "Surprised", Action)?;

    let sensors = t.add(root, ids::SENSORS, "Sensors", Submenu)?;
    t.add(sensors, ids::SENSOR_CLIMATE, "Temp/Humidity", Action)?;
    t.add(sensors, ids::SENSOR_SOUND, "Sound Level", Action)?;

    t.add(root, ids::MOTION_TEST, "Motion Test", Action)?;

    let weather = t.add(root, ids::WEATHER, "Weather", Submenu)?;
    t.add(weather, ids::WEATHER_FORECAST, "Forecast", Action)?;
    t.add(weather, ids::WEATHER_UPDATE, "Update Now", Action)?;
    let auto = t.add(weather, ids::WEATHER_AUTO, "Auto Update", Toggle)?;
    t.set_value(auto, i32::from(weather_enabled));
    t.add(weather, ids::WEATHER_CLEAR, "Clear Cache", Action)?;

    t.add(root, ids::CLOCK, "Clock", Action)?;
    t.add(root, ids::POMODORO, "Pomodoro", Action)?;
    t.add(root, ids::PONG, "Pong", Action)?;

    let wifi = t.add(root, ids::WIFI, "WiFi", Submenu)?;
    t.add(wifi, ids::WIFI_STATUS, "Status", Action)?;
    t.add(wifi, ids::WIFI_PORTAL, "Setup Portal", Action)?;

    let settings_node = t.add(root, ids::SETTINGS, "Settings", Submenu)?;
    let b = t.add(
        settings_node,
        ids::BRIGHTNESS,
        "Brightness",
        ItemKind::Value { min: 0, max: 255, step: BRIGHTNESS_STEP },
    )?;
    t.set_value(b, i32::from(settings.brightness));
    let s = t.add(settings_node, ids::SOUND, "Sound", Toggle)?;
    t.set_value(s, i32::from(settings.sound_enabled));
    let m = t.add(
        settings_node,
        ids::SENSITIVITY,
        "Sensitivity",
        ItemKind::Value {
            min: i32::from(SENSITIVITY_MIN),
            max: i32::from(SENSITIVITY_MAX),
            step: 1,
        },
    )?;
    t.set_value(m, i32::from(settings.motion_sensitivity));
    let z = t.add(
        settings_node,
        ids::SLEEP_MINUTES,
        "Sleep (min)",
        ItemKind::Value {
            min: i32::from(SLEEP_MINUTES_MIN),
            max: i32::from(SLEEP_MINUTES_MAX),
            step: 1,
        },
    )?;
    t.set_value(z, i32::from(settings.display_sleep_minutes));
    t.add(
        settings_node,
        ids::ABOUT,
        "About",
        ItemKind::Info(concat!("v", env!("CARGO_PKG_VERSION"))),
    )?;

    Ok(t)
}

/// Render the navigator's current submenu.
pub fn draw_menu<D: DisplayPort + ?Sized>(d: &mut D, tree: &MenuTree, nav: &MenuNavigator) {
    let w = d.width();
    d.clear();
    d.draw_text(nav.current_title(tree), w / 2, 0, TextSize::Small, TextAlign::Center);
    d.draw_line(0, TITLE_HEIGHT - 1, w - 1, TITLE_HEIGHT - 1);

    let current = nav.current_node();
    let count = tree.child_count(current);
    if count == 0 {
        d.draw_text("Empty", w / 2, 30, TextSize::Small, TextAlign::Center);
        return;
    }

    let first = nav.scroll_offset();
    let last = (first + nav.viewport()).min(count);
    for (row, nth) in (first..last).enumerate() {
        let Some(item) = tree.child(current, nth).and_then(|i| tree.node(i)) else {
            continue;
        };
        let y = TITLE_HEIGHT + 2 + row as i32 * ITEM_HEIGHT;
        let selected = nth == nav.selected_index();
        let marker = match (selected, selected && nav.is_editing()) {
            (_, true) => "*",
            (true, false) => ">",
            _ => " ",
        };
        d.draw_text(marker, 0, y, TextSize::Small, TextAlign::Left);
        d.draw_text(item.label, 8, y, TextSize::Small, TextAlign::Left);

        let mut buf: heapless::String<12> = heapless::String::new();
        let detail: &str = match item.kind {
            ItemKind::Submenu => ">",
            ItemKind::Value { .. } => {
                let _ = core::fmt::write(&mut buf, format_args!("{}", item.value()));
                &buf
            }
            ItemKind::Toggle => {
                if item.value() != 0 {
                    "ON"
                } else {
                    "OFF"
                }
            }
            ItemKind::Info(text) => text,
            ItemKind::Action => "",
        };
        if !detail.is_empty() {
            d.draw_text(detail, w - 8, y, TextSize::Small, TextAlign::Right);
        }
    }

    if first > 0 {
        d.draw_text("^", w - 1, TITLE_HEIGHT + 2, TextSize::Small, TextAlign::Right);
    }
    if last < count {
        d.draw_text("v", w - 1, d.height() - 10, TextSize::Small, TextAlign::Right);
    }
}
