//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService / WeatherService (domain)
//! ```
//!
//! Driven adapters (OLED, NVS, HTTP, WiFi, GPIO/I2C sensors) implement these
//! traits. The domain consumes them via generics, so the mode dispatcher,
//! menu, animation engine and weather pipeline never touch hardware directly
//! and run unchanged against the mocks in `tests/integration/mock_hw.rs`.

use crate::config::DeviceSettings;

// ───────────────────────────────────────────────────────────────
// Display port (domain → OLED)
// ───────────────────────────────────────────────────────────────

/// Glyph size for [`DisplayPort::draw_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextSize {
    /// 6×10 px cells (21 columns on a 128 px panel).
    Small,
    /// 10×20 px cells for headlines and the clock face.
    Large,
}

impl TextSize {
    pub const fn char_width(self) -> i32 {
        match self {
            Self::Small => 6,
            Self::Large => 10,
        }
    }

    pub const fn line_height(self) -> i32 {
        match self {
            Self::Small => 10,
            Self::Large => 20,
        }
    }
}

/// Horizontal anchoring of `x` in [`DisplayPort::draw_text`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// The single monochrome panel. Only the active mode draws to it.
///
/// Coordinates are pixels from the top-left corner; `y` of text is the
/// top of the glyph cell. Drawing marks the frame dirty; [`flush`]
/// pushes the frame buffer to the panel and clears the dirty flag.
///
/// [`flush`]: DisplayPort::flush
pub trait DisplayPort {
    fn width(&self) -> i32;
    fn height(&self) -> i32;

    fn clear(&mut self);
    fn draw_text(&mut self, text: &str, x: i32, y: i32, size: TextSize, align: TextAlign);
    fn draw_line(&mut self, x0: i32, y0: i32, x1: i32, y1: i32);
    fn draw_rect(&mut self, x: i32, y: i32, w: u32, h: u32, filled: bool);
    fn draw_circle(&mut self, cx: i32, cy: i32, radius: u32, filled: bool);
    /// Row-major, MSB-first, rows padded to whole bytes.
    fn draw_bitmap(&mut self, x: i32, y: i32, w: u32, h: u32, data: &[u8]);
    /// Outlined bar filled to `progress` (clamped to 0.0–1.0).
    fn draw_progress_bar(&mut self, x: i32, y: i32, w: u32, h: u32, progress: f32);

    /// Push the frame buffer to the panel.
    fn flush(&mut self) -> Result<(), DisplayError>;
    fn set_brightness(&mut self, level: u8);
    fn set_power(&mut self, on: bool);

    fn is_dirty(&self) -> bool;
    fn mark_dirty(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Input + sensor ports (hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Raw digital levels sampled once per tick, already normalised so that
/// `true` means "active" (switch closed, pad touched).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawInputs {
    pub encoder_clk: bool,
    pub encoder_dt: bool,
    pub button_pressed: bool,
    pub touch_active: bool,
}

/// Read-side port for the user input pins.
pub trait InputPort {
    fn sample(&mut self) -> RawInputs;
}

/// Accelerometer reading in m/s² with offsets already removed.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Acceleration {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// DHT11 reading.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Climate {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Read-side port for the optional sensors. `None` means the sensor is
/// absent or the read failed this time; callers keep their last value.
pub trait SensorPort {
    fn read_acceleration(&mut self) -> Option<Acceleration>;
    fn read_climate(&mut self) -> Option<Climate>;
    /// Raw 12-bit sound level.
    fn read_sound(&mut self) -> Option<u16>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Settings port (domain ↔ persistent user settings)
// ───────────────────────────────────────────────────────────────

/// Loads and persists [`DeviceSettings`].
///
/// Implementations MUST validate before persisting and reject invalid
/// values with [`ConfigError::ValidationFailed`].
pub trait SettingsPort {
    /// Returns [`DeviceSettings::default()`] if nothing is stored.
    fn load(&self) -> Result<DeviceSettings, ConfigError>;

    fn save(&self, settings: &DeviceSettings) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Namespaced key-value storage.
///
/// Keys are fixed strings (≤ 15 bytes, the NVS limit); nothing in the
/// firmware builds keys at runtime. Writes are atomic per key, there are
/// no multi-key transactions.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;

    /// Remove every key in `namespace`.
    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// HTTP port (weather worker → network)
// ───────────────────────────────────────────────────────────────

/// A completed HTTP exchange. Non-2xx statuses are *not* errors at this
/// level; the caller classifies them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

/// Blocking HTTPS GET. Only ever called from the weather worker thread.
pub trait HttpPort: Send + Sync {
    fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        timeout_ms: u32,
    ) -> Result<HttpResponse, HttpError>;
}

// ───────────────────────────────────────────────────────────────
// Connectivity port (WiFi manager → domain)
// ───────────────────────────────────────────────────────────────

/// Connection states reported by the WiFi manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Idle,
    ApMode,
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

impl WifiState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::ApMode => "Setup AP",
            Self::Connecting => "Connecting",
            Self::Connected => "Connected",
            Self::Disconnected => "Disconnected",
            Self::Failed => "Failed",
        }
    }
}

/// Notifications from the WiFi manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiEvent {
    ApStarted,
    ClientConnected,
    CredentialsSaved,
    Connected,
    Disconnected,
    Failed,
}

/// What the modes and the weather service need to know about WiFi.
pub trait ConnectivityPort {
    fn is_connected(&self) -> bool;
    fn state(&self) -> WifiState;
    /// Captive-portal SSID (`coompel-XXYY`).
    fn ap_name(&self) -> &str;
    /// Configured station SSID, empty when unprovisioned.
    fn ssid(&self) -> &str;
    /// Station IP when connected, AP IP while the portal runs.
    fn ip_address(&self) -> Option<&str>;
    /// Bring up the captive portal on request from the menu.
    fn start_portal(&mut self);
    /// Advance the connection state machine. Called every tick.
    fn update(&mut self, now_ms: u32);
    /// Next queued notification, oldest first.
    fn pop_event(&mut self) -> Option<WifiEvent> {
        None
    }
}

// ───────────────────────────────────────────────────────────────
// Clock + entropy + task ports
// ───────────────────────────────────────────────────────────────

/// Local wall-clock time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallTime {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Wall clock. `None` until SNTP has synchronised.
pub trait ClockPort {
    fn wall_time(&self) -> Option<WallTime>;
}

/// Uniform random numbers for the idle behaviours.
pub trait EntropyPort {
    /// Uniform in `[low, high)`; returns `low` when the range is empty.
    fn random_range(&mut self, low: u32, high: u32) -> u32;
}

/// A unit of background work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs background jobs off the UI loop.
pub trait TaskSpawner {
    /// Hand `job` to a worker. An error means the job was dropped unrun.
    fn spawn(&self, name: &'static str, job: Job) -> Result<(), SpawnError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`SettingsPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored settings failed deserialization.
    Corrupted,
    /// A field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`DisplayPort::flush`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayError {
    /// The panel did not acknowledge on the bus.
    BusError,
    /// Panel init sequence was rejected.
    InitFailed,
}

/// The worker thread could not be created (out of memory, bad core id).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpawnError;

/// Transport-level failures from [`HttpPort::get`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    Timeout,
    ConnectionFailed,
    /// Body exceeded the adapter's buffer limit.
    TooLarge,
    Other,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "settings corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for DisplayError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::BusError => write!(f, "I2C bus error"),
            Self::InitFailed => write!(f, "panel init failed"),
        }
    }
}

impl core::fmt::Display for SpawnError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "task spawn failed")
    }
}

impl core::fmt::Display for HttpError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::ConnectionFailed => write!(f, "connection failed"),
            Self::TooLarge => write!(f, "response too large"),
            Self::Other => write!(f, "transport error"),
        }
    }
}
