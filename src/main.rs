//! Coompel firmware: main entry point.
//!
//! Wires the adapters to the application core and runs the cooperative
//! 10 ms main loop. The weather worker is the only other task.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  Sh1106 (Display)   BoardInputs (Input)   BoardSensors (Sensor)│
//! │  NvsAdapter (Settings+Storage)   WifiManager (Connectivity)    │
//! │  EspHttp (Http)   SystemClock (Clock)   LogEventSink (Events)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │                AppService (pure logic)                 │    │
//! │  │  ModeDispatcher · ApplicationContext · WeatherService  │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  weather worker thread (core 0) ◀── TaskSpawner                │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use core::cell::RefCell;
use std::sync::Arc;

use anyhow::{Context, Result};
use embedded_hal_bus::i2c::RefCellDevice;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::delay::FreeRtos;
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::prelude::*;
use log::{error, info, warn};

use coompel::adapters::device_id;
use coompel::adapters::entropy::EspEntropy;
use coompel::adapters::hardware::{BoardInputs, BoardSensors, Mpu6050};
use coompel::adapters::http::EspHttp;
use coompel::adapters::log_sink::LogEventSink;
use coompel::adapters::nvs::NvsAdapter;
use coompel::adapters::oled::Sh1106;
use coompel::adapters::portal;
use coompel::adapters::time::{self, SystemClock};
use coompel::adapters::wifi::{EspWifiDriver, WifiManager};
use coompel::app::ports::DisplayPort;
use coompel::app::service::AppService;
use coompel::drivers::hw_init;
use coompel::drivers::task_pin::ThreadSpawner;
use coompel::drivers::watchdog::Watchdog;
use coompel::error::Error;
use coompel::pins;
use coompel::weather::service::WeatherService;

/// Main loop period.
const LOOP_PERIOD_MS: u32 = 10;
/// POSIX TZ string for the clock view.
const TIMEZONE: &str = "UTC0";

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Coompel v{}                         ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let watchdog = Watchdog::new();
    let clock = SystemClock::new();

    // ── 2. GPIO / ADC ─────────────────────────────────────────
    let inputs_ok = match hw_init::init_peripherals() {
        Ok(()) => true,
        Err(e) => {
            warn!("HAL: input init failed: {} (touch and sound disabled)", e);
            false
        }
    };

    // ── 3. I2C bus: OLED + MPU6050 ────────────────────────────
    let i2c = I2cDriver::new(
        peripherals.i2c0,
        peripherals.pins.gpio6,
        peripherals.pins.gpio7,
        &I2cConfig::new().baudrate(pins::I2C_FREQ_HZ.Hz()),
    )?;
    // Both devices live for the whole program.
    let bus: &'static RefCell<I2cDriver<'static>> = Box::leak(Box::new(RefCell::new(i2c)));

    let mut oled = Sh1106::new(RefCellDevice::new(bus), pins::OLED_I2C_ADDR);
    if let Err(e) = oled.init() {
        halt_without_display(Error::Display(e));
    }

    let mut imu = Mpu6050::new(RefCellDevice::new(bus), pins::MPU6050_I2C_ADDR);
    let imu = match imu.init().and_then(|()| imu.calibrate()) {
        Ok(_) => Some(imu),
        Err(e) => {
            warn!("IMU: {:?}, shake detection disabled", e);
            None
        }
    };

    let mut inputs = BoardInputs::new(inputs_ok);
    let mut sensors = BoardSensors::new(imu, true, inputs_ok);

    // ── 4. Storage ────────────────────────────────────────────
    let nvs = NvsAdapter::new()
        .map_err(Error::Storage)
        .context("NVS init")?;

    // ── 5. WiFi + captive portal ──────────────────────────────
    let link = portal::new_link();
    let radio = EspWifiDriver::new(peripherals.modem, sysloop.clone(), link.clone())?;
    let ap_name = device_id::ap_name(&device_id::read_mac());
    let mut wifi = WifiManager::new(radio, nvs.clone(), link, ap_name);
    wifi.init(clock.uptime_ms() as u32);

    let _sntp = match time::start_sntp(TIMEZONE) {
        Ok(sntp) => Some(sntp),
        Err(e) => {
            warn!("CLOCK: SNTP unavailable: {:?}", e);
            None
        }
    };

    // ── 6. Application core ───────────────────────────────────
    let weather = WeatherService::new(Arc::new(EspHttp::new()), nvs.clone());
    let mut app = AppService::new(
        Box::new(nvs),
        weather,
        Box::new(SystemClock::new()),
        Box::new(ThreadSpawner::weather_worker()),
        Box::new(EspEntropy::new()),
        oled.height(),
    );
    app.set_sensor_presence(inputs_ok, true, inputs_ok);

    let mut sink = LogEventSink::new();
    app.start(clock.uptime_ms(), &mut inputs, &mut oled, &mut sink);
    info!("APP: main loop running ({} ms period)", LOOP_PERIOD_MS);

    // ── 7. Main loop ──────────────────────────────────────────
    loop {
        watchdog.feed();
        app.tick(
            clock.uptime_ms(),
            &mut inputs,
            &mut sensors,
            &mut oled,
            &mut wifi,
            &mut sink,
        );
        FreeRtos::delay_ms(LOOP_PERIOD_MS);
    }
}

/// Without a panel there is nothing useful to do. Keep reporting on the
/// console and stop feeding the watchdog so the board resets.
fn halt_without_display(e: Error) -> ! {
    loop {
        error!("BOOT: {}; halted, waiting for watchdog reset", e);
        FreeRtos::delay_ms(1_000);
    }
}
