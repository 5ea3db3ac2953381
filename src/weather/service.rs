//! Weather service: decides when to fetch, hands the fetch to a worker,
//! and applies the worker's outcome on the main loop.
//!
//! ```text
//!             update()                      worker
//!   Idle ──────────────▶ FetchingLocation ──────▶ FetchingWeather
//!    ▲                        │ fail                  │ ok      │ fail
//!    │                        ▼                       ▼         ▼
//!    └── retry < 3 ◀──── (retry++) ◀──────────── Cached    (retry++)
//!                             │ retry == 3                      │
//!                             ▼                                 ▼
//!                           Error (wait one full interval) ◀────┘
//! ```
//!
//! Only [`WeatherService::update`] and [`WeatherService::force_update`]
//! start fetches, and only while the in-flight guard is clear. The worker
//! owns the network and the storage writes for the duration of a fetch;
//! the main loop never blocks on either.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use log::{info, warn};

use super::{FetchError, Forecast, Location, WeatherEvent, WeatherState, cache, forecast, geo};
use crate::app::events::AppEvent;
use crate::app::ports::{EventSink, HttpPort, StoragePort, TaskSpawner};

/// Location is re-resolved weekly.
pub const LOCATION_TTL_SECS: u32 = 7 * 24 * 3600;
pub const WEATHER_TTL_SECS: u32 = 4 * 3600;
pub const DEFAULT_INTERVAL_SECS: u32 = 4 * 3600;
pub const MIN_INTERVAL_SECS: u32 = 300;
/// Minimum spacing between two fetch attempts, retries included.
pub const MIN_ATTEMPT_SPACING_SECS: u32 = 300;
pub const RETRY_DELAY_SECS: u32 = 30;
pub const MAX_RETRIES: u8 = 3;
pub const FIRST_CHECK_SECS: u32 = 5;
pub const CACHE_RECHECK_SECS: u32 = 60;
/// Wait after association before the first request (DNS settles late).
pub const WIFI_STABILIZE_MS: u64 = 5_000;

const OUTCOME_DEPTH: usize = 2;

// ───────────────────────────────────────────────────────────────
// Worker ↔ main loop
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Location,
    Weather,
}

/// What the worker reports when it finishes. `started_at` is the uptime
/// second the fetch was launched, used for scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Completed {
        location_refreshed: bool,
        started_at: u32,
    },
    Failed {
        stage: FetchStage,
        error: FetchError,
        location_refreshed: bool,
        started_at: u32,
    },
}

type OutcomeChannel = Channel<CriticalSectionRawMutex, FetchOutcome, OUTCOME_DEPTH>;

/// Everything views read, guarded as one unit.
#[derive(Debug, Clone, Default)]
struct Shared {
    location: Location,
    forecast: Forecast,
    state: WeatherState,
    last_error: Option<FetchError>,
}

fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A consistent copy of the service state for one render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeatherSnapshot {
    pub location: Location,
    pub forecast: Forecast,
    pub state: WeatherState,
    pub last_error: Option<FetchError>,
    pub retry_count: u8,
    pub enabled: bool,
}

/// Body of the worker. Each piece is persisted as soon as it arrives so a
/// failure in the second stage keeps the first.
fn run_fetch<H, S>(
    http: &H,
    storage: &mut S,
    shared: &Mutex<Shared>,
    include_location: bool,
    started_at: u32,
) -> FetchOutcome
where
    H: HttpPort + ?Sized,
    S: StoragePort + ?Sized,
{
    let location = if include_location {
        match geo::fetch_location(http, started_at) {
            Ok(loc) => {
                if let Err(e) = cache::save_location(storage, &loc) {
                    warn!("WEATHER: failed to persist location: {}", e);
                }
                let mut s = lock(shared);
                s.location = loc.clone();
                s.state = WeatherState::FetchingWeather;
                loc
            }
            Err(error) => {
                return FetchOutcome::Failed {
                    stage: FetchStage::Location,
                    error,
                    location_refreshed: false,
                    started_at,
                };
            }
        }
    } else {
        lock(shared).location.clone()
    };

    if !location.valid {
        return FetchOutcome::Failed {
            stage: FetchStage::Location,
            error: FetchError::InvalidResponse,
            location_refreshed: include_location,
            started_at,
        };
    }

    match forecast::fetch_forecast(http, &location, started_at) {
        Ok(fc) => {
            if let Err(e) = cache::save_forecast(storage, &fc) {
                warn!("WEATHER: failed to persist forecast: {}", e);
            }
            lock(shared).forecast = fc;
            FetchOutcome::Completed {
                location_refreshed: include_location,
                started_at,
            }
        }
        Err(error) => FetchOutcome::Failed {
            stage: FetchStage::Weather,
            error,
            location_refreshed: include_location,
            started_at,
        },
    }
}

fn cache_fresh(valid: bool, fetched_at: u32, now_secs: u32, ttl: u32) -> bool {
    // Timestamps are uptime seconds: after a reboot `now` may be smaller
    // than `fetched_at` and the wrapped age reads as expired.
    valid && fetched_at != 0 && now_secs.wrapping_sub(fetched_at) < ttl
}

fn secs(now_ms: u64) -> u32 {
    (now_ms / 1000) as u32
}

// ───────────────────────────────────────────────────────────────
// Service
// ───────────────────────────────────────────────────────────────

/// Non-blocking weather pipeline. `H` is shared with the worker; `S` is
/// cloned into it, so clones must address the same backing store.
pub struct WeatherService<H, S> {
    http: Arc<H>,
    storage: S,
    shared: Arc<Mutex<Shared>>,
    outcomes: Arc<OutcomeChannel>,
    in_flight: Arc<AtomicBool>,

    enabled: bool,
    interval_secs: u32,
    next_update: u32,
    last_attempt: Option<u32>,
    retry_count: u8,
    wifi_since_ms: Option<u64>,
    reported_state: WeatherState,
}

impl<H, S> WeatherService<H, S>
where
    H: HttpPort + 'static,
    S: StoragePort + Clone + Send + 'static,
{
    pub fn new(http: Arc<H>, storage: S) -> Self {
        Self {
            http,
            storage,
            shared: Arc::new(Mutex::new(Shared::default())),
            outcomes: Arc::new(Channel::new()),
            in_flight: Arc::new(AtomicBool::new(false)),
            enabled: false,
            interval_secs: DEFAULT_INTERVAL_SECS,
            next_update: 0,
            last_attempt: None,
            retry_count: 0,
            wifi_since_ms: None,
            reported_state: WeatherState::Idle,
        }
    }

    /// Load settings and the cached records, and schedule the first check.
    pub fn init(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        let (enabled, interval) = cache::load_settings(&self.storage);
        self.enabled = enabled.unwrap_or(false);
        self.interval_secs = interval
            .unwrap_or(DEFAULT_INTERVAL_SECS)
            .max(MIN_INTERVAL_SECS);

        let location = cache::load_location(&self.storage);
        let forecast = cache::load_forecast(&self.storage);
        let state = match (location.valid, forecast.valid) {
            (true, true) => WeatherState::Cached,
            (false, false) => WeatherState::Idle,
            _ => WeatherState::Stale,
        };
        info!(
            "WEATHER: init enabled={} interval={}s location={} forecast={} days",
            self.enabled,
            self.interval_secs,
            location.valid,
            forecast.days.len()
        );
        {
            let mut s = lock(&self.shared);
            s.location = location;
            s.forecast = forecast;
            s.state = state;
            s.last_error = None;
        }
        match state {
            WeatherState::Cached => sink.emit(&AppEvent::Weather(WeatherEvent::CacheLoaded)),
            WeatherState::Stale => sink.emit(&AppEvent::Weather(WeatherEvent::CacheStale)),
            _ => {}
        }
        self.report_state(sink);
        self.next_update = secs(now_ms) + FIRST_CHECK_SECS;
    }

    /// Call every tick. Never blocks.
    pub fn update(
        &mut self,
        now_ms: u64,
        wifi_connected: bool,
        spawner: &dyn TaskSpawner,
        sink: &mut impl EventSink,
    ) {
        self.drain_outcomes(sink);
        self.report_state(sink);

        if !self.enabled || self.is_fetching() {
            return;
        }

        if !wifi_connected {
            self.wifi_since_ms = None;
            return;
        }
        match self.wifi_since_ms {
            None => {
                info!("WEATHER: WiFi up, waiting {} ms", WIFI_STABILIZE_MS);
                self.wifi_since_ms = Some(now_ms);
                return;
            }
            Some(since) if now_ms.saturating_sub(since) < WIFI_STABILIZE_MS => return,
            Some(_) => {}
        }

        let now = secs(now_ms);
        if now < self.next_update {
            return;
        }

        let needs_location = !self.is_location_cache_valid(now_ms);
        let needs_weather = needs_location || !self.is_weather_cache_valid(now_ms);
        if !needs_weather {
            self.next_update = now + CACHE_RECHECK_SECS;
            return;
        }

        if let Some(last) = self.last_attempt {
            if now.saturating_sub(last) < MIN_ATTEMPT_SPACING_SECS {
                self.next_update = last + MIN_ATTEMPT_SPACING_SECS;
                return;
            }
        }

        self.start_fetch(now, needs_location, spawner, sink);
        self.report_state(sink);
    }

    /// Re-fetch location and forecast regardless of cache age. Returns
    /// `false` when a fetch is already running or WiFi is down.
    pub fn force_update(
        &mut self,
        now_ms: u64,
        wifi_connected: bool,
        spawner: &dyn TaskSpawner,
        sink: &mut impl EventSink,
    ) -> bool {
        if self.is_fetching() {
            info!("WEATHER: force update ignored, fetch in progress");
            return false;
        }
        if !wifi_connected {
            warn!("WEATHER: force update without WiFi");
            lock(&self.shared).last_error = Some(FetchError::WifiDisconnected);
            return false;
        }
        let started = self.start_fetch(secs(now_ms), true, spawner, sink);
        self.report_state(sink);
        started
    }

    fn start_fetch(
        &mut self,
        now: u32,
        include_location: bool,
        spawner: &dyn TaskSpawner,
        sink: &mut impl EventSink,
    ) -> bool {
        if self.in_flight.swap(true, Ordering::AcqRel) {
            return false;
        }
        if self.retry_count >= MAX_RETRIES {
            self.retry_count = 0;
        }
        self.last_attempt = Some(now);
        {
            let mut s = lock(&self.shared);
            s.state = if include_location {
                WeatherState::FetchingLocation
            } else {
                WeatherState::FetchingWeather
            };
            s.last_error = None;
        }
        info!(
            "WEATHER: fetch started ({}attempt {})",
            if include_location { "location + forecast, " } else { "forecast, " },
            self.retry_count + 1
        );

        let http = Arc::clone(&self.http);
        let mut storage = self.storage.clone();
        let shared = Arc::clone(&self.shared);
        let outcomes = Arc::clone(&self.outcomes);
        let in_flight = Arc::clone(&self.in_flight);
        let job = Box::new(move || {
            let outcome = run_fetch(&*http, &mut storage, &shared, include_location, now);
            if outcomes.try_send(outcome).is_err() {
                warn!("WEATHER: outcome channel full, result dropped");
            }
            in_flight.store(false, Ordering::Release);
        });

        if let Err(e) = spawner.spawn("weather", job) {
            warn!("WEATHER: {}", e);
            self.in_flight.store(false, Ordering::Release);
            self.apply(
                FetchOutcome::Failed {
                    stage: if include_location { FetchStage::Location } else { FetchStage::Weather },
                    error: FetchError::Other,
                    location_refreshed: false,
                    started_at: now,
                },
                sink,
            );
            return false;
        }
        true
    }

    fn drain_outcomes(&mut self, sink: &mut impl EventSink) {
        while let Ok(outcome) = self.outcomes.try_receive() {
            self.apply(outcome, &mut *sink);
        }
    }

    fn apply(&mut self, outcome: FetchOutcome, sink: &mut impl EventSink) {
        let mut emit = |ev: WeatherEvent| sink.emit(&AppEvent::Weather(ev));
        match outcome {
            FetchOutcome::Completed { location_refreshed, started_at } => {
                self.retry_count = 0;
                self.next_update = started_at + self.interval_secs;
                {
                    let mut s = lock(&self.shared);
                    s.state = WeatherState::Cached;
                    s.last_error = None;
                }
                info!("WEATHER: fetch complete, next in {}s", self.interval_secs);
                if location_refreshed {
                    emit(WeatherEvent::LocationUpdated);
                }
                emit(WeatherEvent::WeatherUpdated);
            }
            FetchOutcome::Failed { stage, error, location_refreshed, started_at } => {
                self.retry_count = self.retry_count.saturating_add(1);
                let mut s = lock(&self.shared);
                s.last_error = Some(error);
                if self.retry_count >= MAX_RETRIES {
                    s.state = WeatherState::Error;
                    self.next_update = started_at + self.interval_secs;
                    warn!(
                        "WEATHER: {:?} fetch failed ({}), giving up for {}s",
                        stage, error, self.interval_secs
                    );
                } else {
                    s.state = if s.location.valid || s.forecast.valid {
                        WeatherState::Stale
                    } else {
                        WeatherState::Idle
                    };
                    self.next_update = started_at + RETRY_DELAY_SECS;
                    warn!(
                        "WEATHER: {:?} fetch failed ({}), retry {}/{} in {}s",
                        stage, error, self.retry_count, MAX_RETRIES, RETRY_DELAY_SECS
                    );
                }
                drop(s);
                if location_refreshed {
                    emit(WeatherEvent::LocationUpdated);
                }
                emit(match stage {
                    FetchStage::Location => WeatherEvent::LocationFailed,
                    FetchStage::Weather => WeatherEvent::WeatherFailed,
                });
            }
        }
    }

    /// Emit a state-change event whenever the shared state moved since the
    /// last report, including moves made by the worker.
    fn report_state(&mut self, sink: &mut impl EventSink) {
        let now = lock(&self.shared).state;
        if now != self.reported_state {
            info!("WEATHER: {} -> {}", self.reported_state.label(), now.label());
            sink.emit(&AppEvent::WeatherStateChanged {
                from: self.reported_state,
                to: now,
            });
            self.reported_state = now;
        }
    }

    // ── Settings ──────────────────────────────────────────────

    pub fn set_enabled(&mut self, enabled: bool, now_ms: u64) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if enabled {
            self.next_update = secs(now_ms) + FIRST_CHECK_SECS;
            self.retry_count = 0;
        }
        info!("WEATHER: auto update {}", if enabled { "on" } else { "off" });
        if let Err(e) = cache::save_enabled(&mut self.storage, enabled) {
            warn!("WEATHER: failed to persist enabled flag: {}", e);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Clamped to at least [`MIN_INTERVAL_SECS`].
    pub fn set_update_interval(&mut self, secs: u32) {
        let secs = secs.max(MIN_INTERVAL_SECS);
        if secs == self.interval_secs {
            return;
        }
        self.interval_secs = secs;
        info!("WEATHER: interval {}s", secs);
        if let Err(e) = cache::save_interval(&mut self.storage, secs) {
            warn!("WEATHER: failed to persist interval: {}", e);
        }
    }

    pub fn update_interval(&self) -> u32 {
        self.interval_secs
    }

    /// Forget both records, in memory and in storage. Refused while a
    /// fetch is running since the worker would write them back.
    pub fn clear_cache(&mut self, sink: &mut impl EventSink) -> bool {
        if self.is_fetching() {
            return false;
        }
        {
            let mut s = lock(&self.shared);
            *s = Shared::default();
        }
        self.retry_count = 0;
        self.last_attempt = None;
        self.next_update = 0;
        if let Err(e) = cache::clear(&mut self.storage, self.enabled, self.interval_secs) {
            warn!("WEATHER: cache clear failed: {}", e);
        }
        info!("WEATHER: cache cleared");
        self.report_state(sink);
        true
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn state(&self) -> WeatherState {
        lock(&self.shared).state
    }

    pub fn last_error(&self) -> Option<FetchError> {
        lock(&self.shared).last_error
    }

    pub fn retry_count(&self) -> u8 {
        self.retry_count
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn location(&self) -> Location {
        lock(&self.shared).location.clone()
    }

    pub fn forecast(&self) -> Forecast {
        lock(&self.shared).forecast.clone()
    }

    pub fn snapshot(&self) -> WeatherSnapshot {
        let s = lock(&self.shared);
        WeatherSnapshot {
            location: s.location.clone(),
            forecast: s.forecast.clone(),
            state: s.state,
            last_error: s.last_error,
            retry_count: self.retry_count,
            enabled: self.enabled,
        }
    }

    pub fn has_valid_data(&self) -> bool {
        let s = lock(&self.shared);
        s.location.valid && s.forecast.valid
    }

    pub fn is_location_cache_valid(&self, now_ms: u64) -> bool {
        let s = lock(&self.shared);
        cache_fresh(s.location.valid, s.location.fetched_at, secs(now_ms), LOCATION_TTL_SECS)
    }

    pub fn is_weather_cache_valid(&self, now_ms: u64) -> bool {
        let s = lock(&self.shared);
        cache_fresh(s.forecast.valid, s.forecast.fetched_at, secs(now_ms), WEATHER_TTL_SECS)
    }

    pub fn seconds_until_update(&self, now_ms: u64) -> u32 {
        self.next_update.saturating_sub(secs(now_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::ports::{HttpError, HttpResponse, Job, SpawnError, StorageError};
    use crate::weather::forecast::tests::five_days;
    use std::cell::RefCell;
    use std::collections::HashMap;

    const GEO: &str = r#"{"success":true,"city":"Oslo","country_code":"NO","latitude":59.91,"longitude":10.75}"#;

    #[derive(Clone, Default)]
    struct Store(Arc<Mutex<HashMap<std::string::String, std::vec::Vec<u8>>>>);

    impl StoragePort for Store {
        fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
            let m = self.0.lock().unwrap();
            let v = m.get(&format!("{ns}::{key}")).ok_or(StorageError::NotFound)?;
            let n = v.len().min(buf.len());
            buf[..n].copy_from_slice(&v[..n]);
            Ok(n)
        }
        fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
            self.0.lock().unwrap().insert(format!("{ns}::{key}"), data.to_vec());
            Ok(())
        }
        fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
            self.0.lock().unwrap().remove(&format!("{ns}::{key}"));
            Ok(())
        }
        fn exists(&self, ns: &str, key: &str) -> bool {
            self.0.lock().unwrap().contains_key(&format!("{ns}::{key}"))
        }
        fn erase_namespace(&mut self, ns: &str) -> Result<(), StorageError> {
            let prefix = format!("{ns}::");
            self.0.lock().unwrap().retain(|k, _| !k.starts_with(&prefix));
            Ok(())
        }
    }

    /// Answers by URL prefix and counts requests.
    #[derive(Default)]
    struct FakeHttp {
        geo_ok: bool,
        forecast_ok: bool,
        calls: Mutex<std::vec::Vec<std::string::String>>,
    }

    impl HttpPort for FakeHttp {
        fn get(&self, url: &str, _: &[(&str, &str)], _: u32) -> Result<HttpResponse, HttpError> {
            self.calls.lock().unwrap().push(url.to_string());
            let ok = if url.starts_with(forecast::API_URL) { self.forecast_ok } else { self.geo_ok };
            if !ok {
                return Err(HttpError::Timeout);
            }
            let body = if url.starts_with(forecast::API_URL) { five_days() } else { GEO.to_string() };
            Ok(HttpResponse { status: 200, body })
        }
    }

    /// Runs jobs inline, or parks them for the test to run later.
    #[derive(Default)]
    struct Spawner {
        park: bool,
        parked: RefCell<std::vec::Vec<Job>>,
    }

    impl TaskSpawner for Spawner {
        fn spawn(&self, _: &'static str, job: Job) -> Result<(), SpawnError> {
            if self.park {
                self.parked.borrow_mut().push(job);
            } else {
                job();
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Events(std::vec::Vec<AppEvent>);

    impl EventSink for Events {
        fn emit(&mut self, event: &AppEvent) {
            self.0.push(event.clone());
        }
    }

    impl Events {
        fn weather(&self) -> std::vec::Vec<WeatherEvent> {
            self.0
                .iter()
                .filter_map(|e| match e {
                    AppEvent::Weather(w) => Some(*w),
                    _ => None,
                })
                .collect()
        }
    }

    fn service(geo_ok: bool, forecast_ok: bool) -> (WeatherService<FakeHttp, Store>, Store) {
        let store = Store::default();
        let http = Arc::new(FakeHttp { geo_ok, forecast_ok, ..Default::default() });
        (WeatherService::new(http, store.clone()), store)
    }

    /// Bring WiFi up at `t0` and tick past the stabilization window.
    fn connect(svc: &mut WeatherService<FakeHttp, Store>, t0: u64, sp: &Spawner, ev: &mut Events) -> u64 {
        svc.update(t0, true, sp, ev);
        let t = t0 + WIFI_STABILIZE_MS;
        svc.update(t, true, sp, ev);
        t
    }

    #[test]
    fn disabled_by_default_never_fetches() {
        let (mut svc, _) = service(true, true);
        let mut ev = Events::default();
        let sp = Spawner::default();
        svc.init(0, &mut ev);
        assert!(!svc.is_enabled());
        for t in (0..120_000).step_by(1000) {
            svc.update(t, true, &sp, &mut ev);
        }
        assert!(svc.http.calls.lock().unwrap().is_empty());
        assert_eq!(svc.state(), WeatherState::Idle);
    }

    #[test]
    fn waits_for_stabilization_then_fetches_everything() {
        let (mut svc, store) = service(true, true);
        let mut ev = Events::default();
        let sp = Spawner::default();
        svc.init(0, &mut ev);
        svc.set_enabled(true, 0);

        svc.update(10_000, true, &sp, &mut ev);
        svc.update(14_999, true, &sp, &mut ev);
        assert!(svc.http.calls.lock().unwrap().is_empty());

        svc.update(15_000, true, &sp, &mut ev);
        // the inline job ran; its outcome is applied on the next tick
        svc.update(15_010, true, &sp, &mut ev);
        assert_eq!(svc.state(), WeatherState::Cached);
        assert_eq!(ev.weather(), vec![WeatherEvent::LocationUpdated, WeatherEvent::WeatherUpdated]);
        assert!(svc.is_location_cache_valid(15_010));
        assert!(svc.is_weather_cache_valid(15_010));
        assert_eq!(svc.forecast().days.len(), 4);
        assert_eq!(svc.seconds_until_update(15_010), DEFAULT_INTERVAL_SECS);
        assert!(store.exists(cache::NAMESPACE, cache::KEY_FC_COUNT));
        assert!(store.exists(cache::NAMESPACE, cache::KEY_LAT));
    }

    #[test]
    fn disconnect_resets_stabilization() {
        let (mut svc, _) = service(true, true);
        let mut ev = Events::default();
        let sp = Spawner::default();
        svc.init(0, &mut ev);
        svc.set_enabled(true, 0);
        svc.update(10_000, true, &sp, &mut ev);
        svc.update(13_000, false, &sp, &mut ev);
        svc.update(14_000, true, &sp, &mut ev);
        svc.update(17_000, true, &sp, &mut ev);
        assert!(svc.http.calls.lock().unwrap().is_empty());
        svc.update(19_000, true, &sp, &mut ev);
        assert!(!svc.http.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn only_one_fetch_in_flight() {
        let (mut svc, _) = service(true, true);
        let mut ev = Events::default();
        let sp = Spawner { park: true, ..Default::default() };
        svc.init(0, &mut ev);
        svc.set_enabled(true, 0);
        let t = connect(&mut svc, 10_000, &sp, &mut ev);
        assert!(svc.is_fetching());
        assert_eq!(svc.state(), WeatherState::FetchingLocation);
        assert!(!svc.force_update(t, true, &sp, &mut ev));
        svc.update(t + 600_000, true, &sp, &mut ev);
        assert_eq!(sp.parked.borrow().len(), 1);

        let job = sp.parked.borrow_mut().pop().unwrap();
        job();
        assert!(!svc.is_fetching());
        svc.update(t + 600_010, true, &sp, &mut ev);
        assert_eq!(svc.state(), WeatherState::Cached);
    }

    #[test]
    fn retry_ceiling_waits_a_full_interval() {
        let (mut svc, _) = service(false, false);
        let mut ev = Events::default();
        let sp = Spawner::default();
        svc.init(0, &mut ev);
        svc.set_enabled(true, 0);
        let mut t = connect(&mut svc, 10_000, &sp, &mut ev);

        for attempt in 1..=MAX_RETRIES {
            svc.update(t + 10, true, &sp, &mut ev);
            assert_eq!(svc.retry_count(), attempt);
            assert_eq!(svc.last_error(), Some(FetchError::Timeout));
            // minimum spacing dominates the 30 s retry delay
            t += u64::from(MIN_ATTEMPT_SPACING_SECS) * 1000;
            svc.update(t, true, &sp, &mut ev);
        }
        assert_eq!(svc.state(), WeatherState::Error);
        assert_eq!(svc.retry_count(), MAX_RETRIES);
        assert!(svc.seconds_until_update(t) > DEFAULT_INTERVAL_SECS - 1000);
        assert_eq!(
            ev.weather().iter().filter(|e| **e == WeatherEvent::LocationFailed).count(),
            usize::from(MAX_RETRIES)
        );
    }

    #[test]
    fn below_ceiling_retries_after_short_delay() {
        let (mut svc, _) = service(false, false);
        let mut ev = Events::default();
        let sp = Spawner::default();
        svc.init(0, &mut ev);
        svc.set_enabled(true, 0);
        let t = connect(&mut svc, 400_000, &sp, &mut ev);
        svc.update(t + 10, true, &sp, &mut ev);
        assert_eq!(svc.state(), WeatherState::Idle);
        // retry delay is 30 s but spacing keeps it at 300 s
        assert_eq!(svc.seconds_until_update(t), RETRY_DELAY_SECS);
        svc.update(t + 30_000, true, &sp, &mut ev);
        assert_eq!(svc.seconds_until_update(t + 30_000), MIN_ATTEMPT_SPACING_SECS - 30);
    }

    #[test]
    fn weather_only_refresh_when_location_fresh() {
        let (mut svc, mut store) = service(true, true);
        let loc = Location { latitude: 1.0, longitude: 2.0, valid: true, fetched_at: 100, ..Default::default() };
        cache::save_location(&mut store, &loc).unwrap();
        let mut fc = crate::weather::forecast::parse_forecast(&five_days()).unwrap();
        fc.fetched_at = 100;
        cache::save_forecast(&mut store, &fc).unwrap();
        cache::save_enabled(&mut store, true).unwrap();

        let mut ev = Events::default();
        let sp = Spawner::default();
        let five_hours_later = (100 + 5 * 3600) * 1000;
        svc.init(five_hours_later, &mut ev);
        assert_eq!(svc.state(), WeatherState::Cached);
        assert!(svc.is_location_cache_valid(five_hours_later));
        assert!(!svc.is_weather_cache_valid(five_hours_later));

        let t = connect(&mut svc, five_hours_later + 5_000, &sp, &mut ev);
        svc.update(t + 10, true, &sp, &mut ev);
        let calls = svc.http.calls.lock().unwrap().clone();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].starts_with(forecast::API_URL));
        assert_eq!(ev.weather().last(), Some(&WeatherEvent::WeatherUpdated));
    }

    #[test]
    fn forecast_failure_keeps_fresh_location() {
        let (mut svc, store) = service(true, false);
        let mut ev = Events::default();
        let sp = Spawner::default();
        svc.init(0, &mut ev);
        svc.set_enabled(true, 0);
        let t = connect(&mut svc, 10_000, &sp, &mut ev);
        svc.update(t + 10, true, &sp, &mut ev);
        assert_eq!(svc.state(), WeatherState::Stale);
        assert!(svc.location().valid);
        assert!(store.exists(cache::NAMESPACE, cache::KEY_LAT));
        assert_eq!(ev.weather(), vec![WeatherEvent::LocationUpdated, WeatherEvent::WeatherFailed]);
    }

    #[test]
    fn attempt_at_boot_still_counts_for_spacing() {
        let (mut svc, _) = service(false, true);
        let mut ev = Events::default();
        let sp = Spawner::default();
        svc.init(0, &mut ev);
        svc.set_enabled(true, 0);
        svc.update(0, true, &sp, &mut ev);
        assert!(svc.force_update(0, true, &sp, &mut ev));
        let first = svc.http.calls.lock().unwrap().len();
        assert!(first > 0);

        for t in (1_000..u64::from(MIN_ATTEMPT_SPACING_SECS) * 1_000).step_by(1_000) {
            svc.update(t, true, &sp, &mut ev);
        }
        assert_eq!(svc.retry_count(), 1);
        assert_eq!(svc.http.calls.lock().unwrap().len(), first);

        svc.update(u64::from(MIN_ATTEMPT_SPACING_SECS) * 1_000, true, &sp, &mut ev);
        assert!(svc.http.calls.lock().unwrap().len() > first);
    }

    #[test]
    fn force_update_needs_wifi() {
        let (mut svc, _) = service(true, true);
        let mut ev = Events::default();
        let sp = Spawner::default();
        svc.init(0, &mut ev);
        assert!(!svc.force_update(1000, false, &sp, &mut ev));
        assert_eq!(svc.last_error(), Some(FetchError::WifiDisconnected));
        assert!(svc.force_update(1000, true, &sp, &mut ev));
    }

    #[test]
    fn clear_cache_keeps_user_choices() {
        let (mut svc, store) = service(true, true);
        let mut ev = Events::default();
        let sp = Spawner::default();
        svc.init(0, &mut ev);
        svc.set_enabled(true, 0);
        svc.set_update_interval(60);
        assert_eq!(svc.update_interval(), MIN_INTERVAL_SECS);
        svc.force_update(1000, true, &sp, &mut ev);
        svc.update(1010, true, &sp, &mut ev);
        assert!(svc.has_valid_data());

        assert!(svc.clear_cache(&mut ev));
        assert!(!svc.has_valid_data());
        assert_eq!(svc.state(), WeatherState::Idle);
        assert!(!store.exists(cache::NAMESPACE, cache::KEY_LAT));
        assert_eq!(cache::load_settings(&store), (Some(true), Some(MIN_INTERVAL_SECS)));
    }

    #[test]
    fn state_changes_are_reported() {
        let (mut svc, _) = service(true, true);
        let mut ev = Events::default();
        let sp = Spawner { park: true, ..Default::default() };
        svc.init(0, &mut ev);
        svc.force_update(1000, true, &sp, &mut ev);
        let job = sp.parked.borrow_mut().pop().unwrap();
        job();
        svc.update(1010, true, &sp, &mut ev);
        let changes: std::vec::Vec<_> = ev
            .0
            .iter()
            .filter_map(|e| match e {
                AppEvent::WeatherStateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(changes, vec![WeatherState::FetchingLocation, WeatherState::Cached]);
    }

    mod proptests {
        use super::super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn ttl_bounds(fetched in 1u32..1_000_000, age in 0u32..2_000_000) {
                let now = fetched.wrapping_add(age);
                prop_assert_eq!(
                    cache_fresh(true, fetched, now, WEATHER_TTL_SECS),
                    age < WEATHER_TTL_SECS
                );
                prop_assert!(!cache_fresh(false, fetched, now, WEATHER_TTL_SECS));
                prop_assert!(!cache_fresh(true, 0, now, WEATHER_TTL_SECS));
            }
        }
    }
}
