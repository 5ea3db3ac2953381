//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements          | Connects to                    |
//! |-------------|---------------------|--------------------------------|
//! | `oled`      | DisplayPort         | SH1106 over I2C / framebuffer  |
//! | `hardware`  | InputPort           | encoder, button, touch GPIO    |
//! |             | SensorPort          | MPU6050, DHT11, sound ADC      |
//! | `nvs`       | SettingsPort        | NVS / in-memory store          |
//! |             | StoragePort         |                                |
//! | `wifi`      | ConnectivityPort    | ESP-IDF WiFi STA + AP          |
//! | `portal`    | (HTTP + DNS)        | captive provisioning page      |
//! | `http`      | HttpPort            | HTTPS client / canned replies  |
//! | `time`      | ClockPort           | esp_timer + SNTP               |
//! | `entropy`   | EntropyPort         | hardware RNG / xorshift        |
//! | `log_sink`  | EventSink           | Serial log output              |
//! | `device_id` |                     | eFuse MAC → portal SSID        |

pub mod device_id;
pub mod entropy;
pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod oled;
pub mod portal;
pub mod time;
pub mod wifi;
