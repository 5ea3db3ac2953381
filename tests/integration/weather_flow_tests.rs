//! Weather pipeline against recorded HTTP: cache expiry, the single
//! in-flight guard and the retry ceiling.

use std::sync::Arc;

use coompel::adapters::nvs::NvsAdapter;
use coompel::app::events::AppEvent;
use coompel::app::ports::ConnectivityPort;
use coompel::weather::cache;
use coompel::weather::service::{
    DEFAULT_INTERVAL_SECS, MAX_RETRIES, WEATHER_TTL_SECS, WIFI_STABILIZE_MS, WeatherService,
};
use coompel::weather::{
    bounded, DayForecast, FetchError, Forecast, Location, WeatherEvent, WeatherState,
};

use crate::mock_hw::{provision, InlineSpawner, RecordingHttp, RecordingSink, Rig};

const HOUR_MS: u64 = 3_600_000;

fn cached_location(fetched_at: u32) -> Location {
    Location {
        latitude: 59.91,
        longitude: 10.75,
        city: bounded("Oslo", 31),
        country: bounded("NO", 2),
        valid: true,
        fetched_at,
    }
}

fn cached_forecast(fetched_at: u32) -> Forecast {
    let mut fc = Forecast {
        valid: true,
        fetched_at,
        ..Forecast::default()
    };
    fc.days
        .push(DayForecast {
            date: bounded("2024-06-10", 10),
            temp_min: 8.5,
            temp_max: 17.0,
            humidity: 60.0,
            symbol: bounded("cloudy", 32),
        })
        .unwrap();
    fc
}

fn weather_events(sink: &RecordingSink) -> Vec<WeatherEvent> {
    sink.events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Weather(w) => Some(*w),
            _ => None,
        })
        .collect()
}

/// Service with weather enabled, WiFi up and the stabilization window
/// already behind it. Returns the time of the first eligible tick.
fn connected_service(
    http: RecordingHttp,
    spawner: &InlineSpawner,
    sink: &mut RecordingSink,
) -> (WeatherService<RecordingHttp, NvsAdapter>, Arc<RecordingHttp>, u64) {
    let http = Arc::new(http);
    let mut svc = WeatherService::new(Arc::clone(&http), NvsAdapter::new().unwrap());
    svc.init(0, sink);
    svc.set_enabled(true, 0);
    svc.update(0, true, spawner, sink);
    let t = WIFI_STABILIZE_MS;
    (svc, http, t)
}

// ── Cache expiry ──────────────────────────────────────────────

#[test]
fn expired_forecast_with_fresh_location_fetches_weather_only() {
    let mut nvs = NvsAdapter::new().unwrap();
    provision(&mut nvs, "HomeNet", "secret123");
    cache::save_enabled(&mut nvs, true).unwrap();
    cache::save_location(&mut nvs, &cached_location(100)).unwrap();
    cache::save_forecast(&mut nvs, &cached_forecast(100)).unwrap();

    // Five hours after both records were fetched.
    let boot_ms = 100_000 + 5 * HOUR_MS;
    let mut rig = Rig::boot_with(nvs, RecordingHttp::healthy(), boot_ms);
    assert_eq!(rig.app.weather().state(), WeatherState::Cached);
    assert!(rig.app.weather().is_location_cache_valid(boot_ms));
    assert!(!rig.app.weather().is_weather_cache_valid(boot_ms));

    rig.run_for(WIFI_STABILIZE_MS + 2_000);
    assert!(rig.wifi.is_connected());

    assert_eq!(rig.http.location_requests(), 0);
    assert_eq!(rig.http.forecast_requests(), 1);
    let events = weather_events(&rig.sink);
    assert!(events.contains(&WeatherEvent::WeatherUpdated));
    assert!(!events.contains(&WeatherEvent::LocationUpdated));
    assert_eq!(rig.app.weather().forecast().days.len(), 4);
    assert!(rig.app.weather().is_weather_cache_valid(rig.now));
    assert_eq!(rig.app.context().weather.location.city.as_str(), "Oslo");
}

#[test]
fn fresh_cache_is_not_refetched() {
    let mut nvs = NvsAdapter::new().unwrap();
    provision(&mut nvs, "HomeNet", "secret123");
    cache::save_enabled(&mut nvs, true).unwrap();
    cache::save_location(&mut nvs, &cached_location(100)).unwrap();
    cache::save_forecast(&mut nvs, &cached_forecast(100)).unwrap();

    let boot_ms = 100_000 + HOUR_MS;
    let mut rig = Rig::boot_with(nvs, RecordingHttp::healthy(), boot_ms);
    rig.run_for(WIFI_STABILIZE_MS + 10_000);

    assert!(rig.http.urls().is_empty());
    assert_eq!(rig.app.weather().state(), WeatherState::Cached);
}

#[test]
fn weather_ttl_expires_without_invalidation() {
    let spawner = InlineSpawner::new();
    let mut sink = RecordingSink::new();
    let (mut svc, _, t) = connected_service(RecordingHttp::healthy(), &spawner, &mut sink);
    svc.update(t, true, &spawner, &mut sink);
    svc.update(t + 1_000, true, &spawner, &mut sink);
    assert!(svc.is_weather_cache_valid(t + 1_000));

    let expiry = t + u64::from(WEATHER_TTL_SECS) * 1_000;
    assert!(svc.is_weather_cache_valid(expiry - 1_000));
    assert!(!svc.is_weather_cache_valid(expiry + 1_000));
    assert!(svc.is_location_cache_valid(expiry + 1_000));
}

// ── Single in-flight fetch ────────────────────────────────────

#[test]
fn force_update_while_fetching_is_refused() {
    let spawner = InlineSpawner::parking();
    let mut sink = RecordingSink::new();
    let (mut svc, http, t) = connected_service(RecordingHttp::healthy(), &spawner, &mut sink);

    svc.update(t, true, &spawner, &mut sink);
    assert!(svc.is_fetching());
    assert_eq!(spawner.spawned(), 1);

    assert!(!svc.force_update(t + 100, true, &spawner, &mut sink));
    assert_eq!(spawner.spawned(), 1);
    assert_eq!(spawner.parked(), 1);
    assert!(!svc.clear_cache(&mut sink));

    spawner.run_parked();
    svc.update(t + 200, true, &spawner, &mut sink);
    assert!(!svc.is_fetching());
    assert_eq!(svc.state(), WeatherState::Cached);
    assert_eq!(http.location_requests(), 1);

    assert!(svc.force_update(t + 300, true, &spawner, &mut sink));
    assert_eq!(spawner.spawned(), 2);
}

#[test]
fn force_update_without_wifi_reports_disconnected() {
    let spawner = InlineSpawner::new();
    let mut sink = RecordingSink::new();
    let (mut svc, http, t) = connected_service(RecordingHttp::healthy(), &spawner, &mut sink);

    assert!(!svc.force_update(t, false, &spawner, &mut sink));
    assert_eq!(svc.last_error(), Some(FetchError::WifiDisconnected));
    assert!(http.urls().is_empty());
}

// ── Retry ceiling ─────────────────────────────────────────────

#[test]
fn three_failures_back_off_for_a_full_interval() {
    let spawner = InlineSpawner::new();
    let mut sink = RecordingSink::new();
    let (mut svc, _, t0) = connected_service(RecordingHttp::unreachable(), &spawner, &mut sink);

    let mut now = t0;
    while svc.state() != WeatherState::Error {
        assert!(now < t0 + HOUR_MS, "never reached the error state");
        assert!(svc.retry_count() < MAX_RETRIES);
        svc.update(now, true, &spawner, &mut sink);
        now += 1_000;
    }

    assert_eq!(spawner.spawned(), u32::from(MAX_RETRIES));
    assert_eq!(svc.retry_count(), MAX_RETRIES);
    assert_eq!(svc.last_error(), Some(FetchError::Timeout));
    let failures = weather_events(&sink)
        .iter()
        .filter(|e| **e == WeatherEvent::LocationFailed)
        .count();
    assert_eq!(failures, usize::from(MAX_RETRIES));

    // The outcome of the last attempt was applied one tick after it started.
    let wait = svc.seconds_until_update(now - 1_000);
    assert!(wait > DEFAULT_INTERVAL_SECS - 5 && wait <= DEFAULT_INTERVAL_SECS);

    // Nothing else is attempted before then.
    for _ in 0..600 {
        svc.update(now, true, &spawner, &mut sink);
        now += 1_000;
    }
    assert_eq!(spawner.spawned(), u32::from(MAX_RETRIES));
}
