//! ESP32 time adapter.
//!
//! Monotonic uptime for the main loop plus the SNTP-backed wall clock
//! behind [`ClockPort`].
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` for uptime and
//!   `gettimeofday` + `localtime_r` for wall time, which stays `None`
//!   until SNTP has set the clock.
//! - **`not(target_os = "espidf")`**: `std::time::Instant`, with a wall
//!   time that tests set explicitly.

use crate::app::ports::{ClockPort, WallTime};

/// Anything before 2020-01-01 means the clock was never set.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const EPOCH_2020: i64 = 1_577_836_800;

pub struct SystemClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
    #[cfg(not(target_os = "espidf"))]
    wall: Option<WallTime>,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
            #[cfg(not(target_os = "espidf"))]
            wall: None,
        }
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(target_os = "espidf")]
    pub fn uptime_ms(&self) -> u64 {
        // SAFETY: esp_timer is started by the bootloader.
        (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1_000
    }

    /// Milliseconds since boot (monotonic).
    #[cfg(not(target_os = "espidf"))]
    pub fn uptime_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// Pretend SNTP has synchronised.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_wall_time(&mut self, wall: Option<WallTime>) {
        self.wall = wall;
    }
}

impl ClockPort for SystemClock {
    #[cfg(target_os = "espidf")]
    fn wall_time(&self) -> Option<WallTime> {
        use esp_idf_svc::sys;

        let mut tv = sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        // SAFETY: out-pointers to locals.
        if unsafe { sys::gettimeofday(&mut tv, core::ptr::null_mut()) } != 0 {
            return None;
        }
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as sys::time_t;
        let mut tm: sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        Some(WallTime {
            hour: tm.tm_hour.clamp(0, 23) as u8,
            minute: tm.tm_min.clamp(0, 59) as u8,
            second: tm.tm_sec.clamp(0, 59) as u8,
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn wall_time(&self) -> Option<WallTime> {
        self.wall
    }
}

/// Start background SNTP. The returned handle must stay alive for the
/// clock to keep syncing; the first sync lands some seconds after WiFi
/// comes up and [`ClockPort::wall_time`] turns `Some` by itself.
#[cfg(target_os = "espidf")]
pub fn start_sntp(tz: &str) -> anyhow::Result<esp_idf_svc::sntp::EspSntp<'static>> {
    use esp_idf_svc::sntp::{EspSntp, OperatingMode, SntpConf, SyncMode};

    // SAFETY: called from the main task before any other thread reads TZ.
    unsafe {
        std::env::set_var("TZ", tz);
    }
    let conf = SntpConf {
        servers: ["pool.ntp.org", "time.nist.gov"],
        sync_mode: SyncMode::Immediate,
        operating_mode: OperatingMode::Poll,
    };
    let sntp = EspSntp::new_with_callback(&conf, |_| log::info!("CLOCK: SNTP synchronised"))?;
    log::info!("CLOCK: SNTP started (TZ={})", tz);
    Ok(sntp)
}
