//! Mock ports for the integration tests.
//!
//! Input levels are set directly by the test between ticks; HTTP and the
//! task spawner record what the service asked for so tests can assert on
//! the full request history.

use std::cell::RefCell;
use std::sync::{Arc, Mutex};

use coompel::adapters::http::CannedHttp;
use coompel::adapters::nvs::NvsAdapter;
use coompel::adapters::oled::Framebuffer;
use coompel::adapters::wifi::{SimWifiDriver, WIFI_NAMESPACE, WifiManager};
use coompel::adapters::{device_id, portal};
use coompel::app::events::AppEvent;
use coompel::app::ports::{
    Acceleration, Climate, ClockPort, EventSink, HttpError, HttpPort, HttpResponse, InputPort, Job,
    RawInputs, SensorPort, SpawnError, StoragePort, TaskSpawner, WallTime,
};
use coompel::app::service::AppService;
use coompel::weather::forecast;
use coompel::weather::service::WeatherService;

pub const TICK_MS: u64 = 10;

// ── Inputs and sensors ────────────────────────────────────────

/// Raw pin levels held until the test changes them.
#[derive(Debug, Default)]
pub struct ScriptedInputs {
    pub raw: RawInputs,
}

impl InputPort for ScriptedInputs {
    fn sample(&mut self) -> RawInputs {
        self.raw
    }
}

/// Board with no optional sensors fitted.
#[derive(Debug, Default)]
pub struct NoSensors;

impl SensorPort for NoSensors {
    fn read_acceleration(&mut self) -> Option<Acceleration> {
        None
    }
    fn read_climate(&mut self) -> Option<Climate> {
        None
    }
    fn read_sound(&mut self) -> Option<u16> {
        None
    }
}

/// SNTP never synchronises.
pub struct NoClock;

impl ClockPort for NoClock {
    fn wall_time(&self) -> Option<WallTime> {
        None
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Task spawner ──────────────────────────────────────────────

/// Runs jobs on the calling thread, or holds them until [`run_parked`]
/// so a test can observe the service while a fetch is in flight.
///
/// [`run_parked`]: InlineSpawner::run_parked
#[derive(Default)]
pub struct InlineSpawner {
    park: bool,
    parked: RefCell<Vec<Job>>,
    spawned: RefCell<u32>,
}

#[allow(dead_code)]
impl InlineSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parking() -> Self {
        Self {
            park: true,
            ..Self::default()
        }
    }

    pub fn spawned(&self) -> u32 {
        *self.spawned.borrow()
    }

    pub fn parked(&self) -> usize {
        self.parked.borrow().len()
    }

    pub fn run_parked(&self) {
        let jobs: Vec<Job> = self.parked.borrow_mut().drain(..).collect();
        for job in jobs {
            job();
        }
    }
}

impl TaskSpawner for InlineSpawner {
    fn spawn(&self, _name: &'static str, job: Job) -> Result<(), SpawnError> {
        *self.spawned.borrow_mut() += 1;
        if self.park {
            self.parked.borrow_mut().push(job);
        } else {
            job();
        }
        Ok(())
    }
}

// ── HTTP ──────────────────────────────────────────────────────

pub const GEO_REPLY: &str =
    r#"{"success":true,"city":"Oslo","country_code":"NO","latitude":59.91,"longitude":10.75}"#;

/// A four-day compact forecast, two samples per day.
pub fn forecast_reply() -> String {
    let mut entries = Vec::new();
    for day in 10..14 {
        for (hour, temp) in [(6, 8.5), (15, 17.0)] {
            entries.push(format!(
                r#"{{"time":"2024-06-{day}T{hour:02}:00:00Z","data":{{"instant":{{"details":{{"air_temperature":{temp},"relative_humidity":60.0}}}},"next_1_hours":{{"summary":{{"symbol_code":"cloudy"}}}}}}}}"#
            ));
        }
    }
    format!(
        r#"{{"type":"Feature","properties":{{"meta":{{}},"timeseries":[{}]}}}}"#,
        entries.join(",")
    )
}

/// Canned answers plus a log of every requested URL.
pub struct RecordingHttp {
    inner: CannedHttp,
    pub requests: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl RecordingHttp {
    /// Both the geolocation providers and the forecast API answer.
    pub fn healthy() -> Self {
        Self::wrap(
            CannedHttp::new()
                .route("https://ipwho.is/", 200, GEO_REPLY)
                .route(forecast::API_URL, 200, &forecast_reply()),
        )
    }

    /// Every request times out.
    pub fn unreachable() -> Self {
        Self::wrap(CannedHttp::new().fail("https://", HttpError::Timeout))
    }

    fn wrap(inner: CannedHttp) -> Self {
        Self {
            inner,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn forecast_requests(&self) -> usize {
        self.urls().iter().filter(|u| u.starts_with(forecast::API_URL)).count()
    }

    pub fn location_requests(&self) -> usize {
        self.urls().iter().filter(|u| !u.starts_with(forecast::API_URL)).count()
    }
}

impl HttpPort for RecordingHttp {
    fn get(&self, url: &str, headers: &[(&str, &str)], timeout_ms: u32) -> Result<HttpResponse, HttpError> {
        self.requests.lock().unwrap().push(url.to_string());
        self.inner.get(url, headers, timeout_ms)
    }
}

// ── Flash contents ────────────────────────────────────────────

/// Store WiFi credentials the way the manager does after a portal submit.
pub fn provision(nvs: &mut NvsAdapter, ssid: &str, password: &str) {
    nvs.write(WIFI_NAMESPACE, "ssid", ssid.as_bytes()).unwrap();
    nvs.write(WIFI_NAMESPACE, "password", password.as_bytes()).unwrap();
    nvs.write(WIFI_NAMESPACE, "configured", &[1]).unwrap();
}

// ── Assembled device ──────────────────────────────────────────

pub type Wifi = WifiManager<SimWifiDriver, NvsAdapter>;
pub type App = AppService<RecordingHttp, NvsAdapter>;

/// Everything `main` wires together, on simulated hardware.
pub struct Rig {
    pub app: App,
    pub http: Arc<RecordingHttp>,
    pub nvs: NvsAdapter,
    pub radio: SimWifiDriver,
    pub wifi: Wifi,
    pub display: Framebuffer,
    pub inputs: ScriptedInputs,
    pub sensors: NoSensors,
    pub sink: RecordingSink,
    pub now: u64,
}

#[allow(dead_code)]
impl Rig {
    /// Boot with an empty flash and a reachable network.
    pub fn boot() -> Self {
        Self::boot_with(NvsAdapter::new().unwrap(), RecordingHttp::healthy(), 0)
    }

    /// Boot with a home network already stored.
    pub fn boot_provisioned() -> Self {
        let mut nvs = NvsAdapter::new().unwrap();
        provision(&mut nvs, "HomeNet", "secret123");
        Self::boot_with(nvs, RecordingHttp::healthy(), 0)
    }

    /// Boot against existing flash contents with the uptime clock at
    /// `start_ms`.
    pub fn boot_with(nvs: NvsAdapter, http: RecordingHttp, start_ms: u64) -> Self {
        let http = Arc::new(http);
        let radio = SimWifiDriver::new();
        let link = portal::new_link();
        let ap_name = device_id::ap_name(&device_id::read_mac());
        let mut wifi = WifiManager::new(radio.clone(), nvs.clone(), link, ap_name);
        wifi.init(start_ms as u32);

        let weather = WeatherService::new(Arc::clone(&http), nvs.clone());
        let mut app = AppService::new(
            Box::new(nvs.clone()),
            weather,
            Box::new(NoClock),
            Box::new(InlineSpawner::new()),
            App::default_rng(1),
            coompel::adapters::oled::HEIGHT,
        );
        let mut display = Framebuffer::new();
        let mut inputs = ScriptedInputs::default();
        let mut sink = RecordingSink::new();
        app.start(start_ms, &mut inputs, &mut display, &mut sink);

        Self {
            app,
            http,
            nvs,
            radio,
            wifi,
            display,
            inputs,
            sensors: NoSensors,
            sink,
            now: start_ms,
        }
    }

    pub fn tick(&mut self) {
        self.now += TICK_MS;
        self.app.tick(
            self.now,
            &mut self.inputs,
            &mut self.sensors,
            &mut self.display,
            &mut self.wifi,
            &mut self.sink,
        );
    }

    /// Tick until `ms` milliseconds have passed.
    pub fn run_for(&mut self, ms: u64) {
        let until = self.now + ms;
        while self.now < until {
            self.tick();
        }
    }

    /// Press the encoder button for `ms`, then release and let it settle.
    pub fn hold_button(&mut self, ms: u64) {
        self.inputs.raw.button_pressed = true;
        self.run_for(ms);
        self.inputs.raw.button_pressed = false;
        self.run_for(100);
    }

    pub fn screen_shows(&self, text: &str) -> bool {
        self.display.text_log().iter().any(|t| t.contains(text))
    }
}
