//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements both [`SettingsPort`] and [`StoragePort`].
//!
//! - Settings are one postcard blob under `coompel`/`settings`, range-checked
//!   with [`validate_settings`] before every write.
//! - Weather cache and WiFi credentials use their own namespaces with fixed
//!   keys; see `weather::cache` and `adapters::wifi`.
//! - ESP-IDF NVS commits are atomic per key. There are no multi-key
//!   transactions.
//!
//! The adapter is `Clone + Send`: the weather worker thread holds its own
//! handle. On the device every call opens and closes the namespace, so
//! clones share nothing but the flash. The simulation backend shares one
//! map behind a mutex.

use log::{info, warn};

use crate::app::ports::{ConfigError, SettingsPort, StorageError, StoragePort};
use crate::config::{DeviceSettings, validate_settings};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;
#[cfg(not(target_os = "espidf"))]
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

pub const SETTINGS_NAMESPACE: &str = "coompel";
pub const SETTINGS_KEY: &str = "settings";

/// Largest blob the adapter will read back.
#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 512;

#[derive(Clone)]
pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl NvsAdapter {
    /// Initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the partition is erased
    /// and re-initialised. Returns `Err(StorageError::IoError)` only if
    /// that fails too.
    pub fn new() -> Result<Self, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: called once from the main task before any other NVS
            // access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK
                {
                    return Err(StorageError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(StorageError::IoError);
            }
            info!("NVS: flash initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NVS: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    #[cfg(not(target_os = "espidf"))]
    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// NUL-terminated copy of a namespace or key, truncated to the 15-byte
    /// NVS limit.
    #[cfg(target_os = "espidf")]
    fn c_name(name: &str) -> [u8; 16] {
        let mut buf = [0u8; 16];
        let len = name.len().min(15);
        buf[..len].copy_from_slice(&name.as_bytes()[..len]);
        buf
    }

    /// Open a namespace, run `f` with the handle, then close it.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = Self::c_name(namespace);
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };
        let mut handle: nvs_handle_t = 0;
        let ret = unsafe { nvs_open(ns.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }
        let result = f(handle);
        unsafe { nvs_close(handle) };
        result
    }

    #[cfg(target_os = "espidf")]
    fn commit(handle: nvs_handle_t, ret: i32) -> Result<(), i32> {
        if ret != ESP_OK {
            return Err(ret);
        }
        match unsafe { nvs_commit(handle) } {
            ESP_OK => Ok(()),
            e => Err(e),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// SettingsPort
// ───────────────────────────────────────────────────────────────

impl SettingsPort for NvsAdapter {
    fn load(&self) -> Result<DeviceSettings, ConfigError> {
        let mut buf = [0u8; MAX_BLOB_SIZE];
        match self.read(SETTINGS_NAMESPACE, SETTINGS_KEY, &mut buf) {
            Ok(len) => {
                let settings: DeviceSettings =
                    postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
                validate_settings(&settings).map_err(|_| ConfigError::Corrupted)?;
                info!("NVS: loaded settings ({} bytes)", len);
                Ok(settings)
            }
            Err(StorageError::NotFound) => {
                info!("NVS: no stored settings, using defaults");
                Ok(DeviceSettings::default())
            }
            Err(e) => {
                warn!("NVS: settings read error ({}), using defaults", e);
                Ok(DeviceSettings::default())
            }
        }
    }

    fn save(&self, settings: &DeviceSettings) -> Result<(), ConfigError> {
        validate_settings(settings)?;
        let bytes = postcard::to_allocvec(settings).map_err(|_| ConfigError::IoError)?;
        // The port takes `&self`; writes go through a clone of the handle.
        let mut writer = self.clone();
        writer
            .write(SETTINGS_NAMESPACE, SETTINGS_KEY, &bytes)
            .map_err(|e| {
                warn!("NVS: settings write error ({})", e);
                ConfigError::IoError
            })?;
        info!("NVS: settings saved ({} bytes)", bytes.len());
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// StoragePort
// ───────────────────────────────────────────────────────────────

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let map = self.map();
            let data = map
                .get(&Self::composite_key(namespace, key))
                .ok_or(StorageError::NotFound)?;
            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);
            Ok(len)
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            let result = Self::with_nvs_handle(namespace, false, |handle| {
                let mut size = buf.len();
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(size)
            });
            match result {
                Ok(size) => Ok(size),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Err(StorageError::NotFound),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.map()
                .insert(Self::composite_key(namespace, key), data.to_vec());
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            Self::with_nvs_handle(namespace, true, |handle| {
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key.as_ptr() as *const _,
                        data.as_ptr() as *const _,
                        data.len(),
                    )
                };
                Self::commit(handle, ret)
            })
            .map_err(|e| {
                if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE {
                    StorageError::Full
                } else {
                    StorageError::IoError
                }
            })
        }
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            self.map().remove(&Self::composite_key(namespace, key));
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            Self::with_nvs_handle(namespace, true, |handle| {
                let ret = unsafe { nvs_erase_key(handle, key.as_ptr() as *const _) };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Ok(());
                }
                Self::commit(handle, ret)
            })
            .or_else(|e| {
                // A namespace that was never written cannot be opened.
                if e == ESP_ERR_NVS_NOT_FOUND {
                    Ok(())
                } else {
                    Err(StorageError::IoError)
                }
            })
        }
    }

    fn exists(&self, namespace: &str, key: &str) -> bool {
        #[cfg(not(target_os = "espidf"))]
        {
            self.map().contains_key(&Self::composite_key(namespace, key))
        }

        #[cfg(target_os = "espidf")]
        {
            let key = Self::c_name(key);
            Self::with_nvs_handle(namespace, false, |handle| {
                let ret = unsafe {
                    nvs_find_key(handle, key.as_ptr() as *const _, core::ptr::null_mut())
                };
                Ok(ret == ESP_OK)
            })
            .unwrap_or(false)
        }
    }

    fn erase_namespace(&mut self, namespace: &str) -> Result<(), StorageError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let prefix = format!("{}::", namespace);
            self.map().retain(|k, _| !k.starts_with(&prefix));
            info!("NVS: erased namespace '{}'", namespace);
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(namespace, true, |handle| {
                let ret = unsafe { nvs_erase_all(handle) };
                Self::commit(handle, ret)
            });
            match result {
                Ok(()) => {
                    info!("NVS: erased namespace '{}'", namespace);
                    Ok(())
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => Ok(()),
                Err(_) => Err(StorageError::IoError),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_default_when_empty() {
        let nvs = NvsAdapter::new().unwrap();
        assert_eq!(nvs.load().unwrap(), DeviceSettings::default());
    }

    #[test]
    fn settings_round_trip_through_postcard() {
        let nvs = NvsAdapter::new().unwrap();
        let s = DeviceSettings {
            brightness: 90,
            sound_enabled: false,
            motion_sensitivity: 9,
            display_sleep_minutes: 30,
        };
        nvs.save(&s).unwrap();
        assert_eq!(nvs.load().unwrap(), s);
        assert!(nvs.exists(SETTINGS_NAMESPACE, SETTINGS_KEY));
    }

    #[test]
    fn invalid_settings_are_rejected_not_stored() {
        let nvs = NvsAdapter::new().unwrap();
        let s = DeviceSettings {
            motion_sensitivity: 0,
            ..Default::default()
        };
        assert!(matches!(nvs.save(&s), Err(ConfigError::ValidationFailed(_))));
        assert!(!nvs.exists(SETTINGS_NAMESPACE, SETTINGS_KEY));
    }

    #[test]
    fn corrupted_blob_is_reported() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write(SETTINGS_NAMESPACE, SETTINGS_KEY, &[0xff; 3]).unwrap();
        assert_eq!(nvs.load(), Err(ConfigError::Corrupted));
    }

    #[test]
    fn clones_share_the_store() {
        let mut a = NvsAdapter::new().unwrap();
        let b = a.clone();
        a.write("weather", "lat", &1.5f32.to_le_bytes()).unwrap();
        let mut buf = [0u8; 4];
        assert_eq!(b.read("weather", "lat", &mut buf), Ok(4));
    }

    #[test]
    fn namespaces_are_isolated_and_erasable() {
        let mut nvs = NvsAdapter::new().unwrap();
        nvs.write("wifi", "ssid", b"home").unwrap();
        nvs.write("weather", "city", b"Oslo").unwrap();
        nvs.erase_namespace("weather").unwrap();
        assert!(!nvs.exists("weather", "city"));
        assert!(nvs.exists("wifi", "ssid"));
        nvs.delete("wifi", "ssid").unwrap();
        nvs.delete("wifi", "ssid").unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(nvs.read("wifi", "ssid", &mut buf), Err(StorageError::NotFound));
    }
}
