//! End-to-end flows through the application service: provisioning,
//! menu navigation with the real button pipeline, display sleep.
//!
//! Everything runs on the host against the simulated radio and flash.

use coompel::adapters::portal;
use coompel::adapters::wifi::{RECONNECT_DELAY_MS, WIFI_NAMESPACE};
use coompel::app::events::AppEvent;
use coompel::app::ports::{ConnectivityPort, StoragePort, WifiEvent, WifiState};
use coompel::drivers::button::ButtonEvent;
use coompel::events::InputEvent;
use coompel::fsm::ModeId;

use crate::mock_hw::Rig;

// ── Provisioning ──────────────────────────────────────────────

#[test]
fn unprovisioned_boot_shows_setup_instructions() {
    let mut rig = Rig::boot();
    rig.tick();

    assert_eq!(rig.wifi.state(), WifiState::ApMode);
    assert!(rig.radio.is_access_point());
    assert_eq!(rig.app.current_mode(), ModeId::WifiSetup);
    assert!(rig.screen_shows("coompel-CAFE"));
    assert!(rig.screen_shows("192.168.4.1"));
    assert!(rig.sink.contains(&AppEvent::Wifi(WifiEvent::ApStarted)));
    assert!(rig.sink.contains(&AppEvent::ModeChanged {
        from: ModeId::Animations,
        to: ModeId::WifiSetup,
    }));
}

#[test]
fn portal_credentials_connect_and_leave_setup() {
    let mut rig = Rig::boot();
    rig.tick();
    assert_eq!(rig.app.current_mode(), ModeId::WifiSetup);

    let reply = portal::submit(
        rig.wifi.portal_link(),
        br#"{"ssid":"HomeNet","password":"secret123"}"#,
    );
    assert!(reply.success);

    rig.run_for(3_000);

    let mut ssid = [0u8; 32];
    let n = rig.nvs.read(WIFI_NAMESPACE, "ssid", &mut ssid).unwrap();
    assert_eq!(&ssid[..n], b"HomeNet");
    assert!(rig.wifi.is_connected());
    assert_eq!(rig.wifi.ip_address(), Some("192.168.1.50"));
    assert_eq!(rig.app.current_mode(), ModeId::Animations);
    assert!(rig.sink.contains(&AppEvent::Wifi(WifiEvent::CredentialsSaved)));
    assert!(rig.sink.contains(&AppEvent::WifiStateChanged {
        from: WifiState::Connecting,
        to: WifiState::Connected,
    }));
    assert!(rig.sink.contains(&AppEvent::ModeChanged {
        from: ModeId::WifiSetup,
        to: ModeId::Animations,
    }));
}

#[test]
fn rejected_credentials_keep_the_portal_open() {
    let mut rig = Rig::boot();
    rig.tick();

    let reply = portal::submit(rig.wifi.portal_link(), br#"{"ssid":"HomeNet","password":"short"}"#);
    assert!(!reply.success);
    let garbage = portal::submit(rig.wifi.portal_link(), b"ssid=HomeNet");
    assert!(!garbage.success);

    rig.run_for(3_000);
    assert!(!rig.nvs.exists(WIFI_NAMESPACE, "configured"));
    assert_eq!(rig.wifi.state(), WifiState::ApMode);
    assert_eq!(rig.app.current_mode(), ModeId::WifiSetup);
}

#[test]
fn stored_network_connects_without_portal() {
    let mut rig = Rig::boot_provisioned();
    rig.run_for(500);

    assert!(rig.wifi.is_connected());
    assert_eq!(rig.wifi.ssid(), "HomeNet");
    assert_eq!(rig.app.current_mode(), ModeId::Animations);
    assert!(rig.app.context().wifi.is_connected());
    assert_eq!(rig.app.context().wifi.ip.as_str(), "192.168.1.50");
}

#[test]
fn dropped_connection_retries_after_delay() {
    let mut rig = Rig::boot_provisioned();
    rig.run_for(500);
    assert!(rig.wifi.is_connected());

    rig.radio.set_network_available(false);
    rig.run_for(500);
    assert_eq!(rig.wifi.state(), WifiState::Disconnected);
    assert!(rig.sink.contains(&AppEvent::Wifi(WifiEvent::Disconnected)));
    let starts = rig.radio.station_starts();

    rig.radio.set_network_available(true);
    rig.run_for(u64::from(RECONNECT_DELAY_MS) + 500);
    assert!(rig.radio.station_starts() > starts);
    assert!(rig.wifi.is_connected());
}

// ── Menu and button ───────────────────────────────────────────

#[test]
fn physical_click_opens_menu() {
    let mut rig = Rig::boot_provisioned();
    rig.run_for(200);

    rig.hold_button(120);
    // The click is only final once the double-click window has closed.
    rig.run_for(400);
    assert_eq!(rig.app.current_mode(), ModeId::Menu);
    assert!(rig.screen_shows("Animations"));
}

#[test]
fn long_press_at_menu_root_returns_to_face() {
    let mut rig = Rig::boot_provisioned();
    rig.run_for(200);
    rig.app.push_input(InputEvent::Button(ButtonEvent::Click));
    rig.tick();
    assert_eq!(rig.app.current_mode(), ModeId::Menu);

    rig.hold_button(1_200);
    assert_eq!(rig.app.current_mode(), ModeId::Animations);
}

#[test]
fn long_press_in_submenu_goes_back_one_level() {
    let mut rig = Rig::boot_provisioned();
    rig.run_for(200);
    rig.app.push_input(InputEvent::Button(ButtonEvent::Click));
    rig.tick();
    rig.app.push_input(InputEvent::Button(ButtonEvent::Click));
    rig.tick();
    assert_eq!(rig.app.context().nav.depth(), 1);

    rig.hold_button(1_200);
    assert_eq!(rig.app.current_mode(), ModeId::Menu);
    assert!(rig.app.context().nav.is_at_root());
}

#[test]
fn short_press_does_not_count_as_long() {
    let mut rig = Rig::boot_provisioned();
    rig.run_for(200);
    rig.app.push_input(InputEvent::Button(ButtonEvent::Click));
    rig.tick();

    rig.hold_button(600);
    rig.run_for(400);
    // A click at the root enters the first submenu instead of leaving.
    assert_eq!(rig.app.current_mode(), ModeId::Menu);
    assert!(!rig.app.context().nav.is_at_root());
}

// ── Power and persistence ─────────────────────────────────────

#[test]
fn idle_panel_sleeps_and_first_input_only_wakes() {
    let mut rig = Rig::boot_provisioned();
    let sleep_ms = rig.app.settings().display_sleep_ms();
    rig.run_for(sleep_ms + 100);
    assert!(!rig.app.is_display_on());
    assert!(!rig.display.is_powered());
    assert!(rig.sink.contains(&AppEvent::DisplaySleep));

    rig.app.push_input(InputEvent::Button(ButtonEvent::Click));
    rig.tick();
    assert!(rig.app.is_display_on());
    assert!(rig.display.is_powered());
    // The waking click did not open the menu.
    assert_eq!(rig.app.current_mode(), ModeId::Animations);
}

#[test]
fn queued_inputs_are_counted_not_lost_silently() {
    let mut rig = Rig::boot_provisioned();
    for _ in 0..100 {
        rig.app.push_input(InputEvent::Rotate(1));
    }
    assert!(rig.app.dropped_events() > 0);
    rig.tick();
    assert_eq!(rig.app.tick_count(), 1);
}
