//! Persisted weather cache.
//!
//! Every field has its own fixed NVS key. Nothing here builds a key at
//! runtime, so a write interrupted halfway leaves a predictable set of
//! keys behind. Location and forecast are saved independently, each with
//! a commit key (`loc_time`, `fc_count`) that is erased before the record
//! is rewritten and written back last. A record without its commit key
//! loads as invalid and gets refetched.
//!
//! Values are stored little-endian (`f32`, `u32`), as a single byte
//! (`bool`, `u8`) or as raw UTF-8.

use heapless::String;
use log::{info, warn};

use super::{DayForecast, Forecast, Location, MAX_FORECAST_DAYS, SYMBOL_CAPACITY, bounded};
use crate::app::ports::{StorageError, StoragePort};

pub const NAMESPACE: &str = "weather";

pub const KEY_ENABLED: &str = "enabled";
pub const KEY_INTERVAL: &str = "interval";
pub const KEY_LAT: &str = "lat";
pub const KEY_LON: &str = "lon";
pub const KEY_CITY: &str = "city";
pub const KEY_COUNTRY: &str = "country";
pub const KEY_LOC_TIME: &str = "loc_time";
pub const KEY_FC_COUNT: &str = "fc_count";
pub const KEY_FC_TIME: &str = "fc_time";

/// Keys of one forecast day.
#[derive(Debug, Clone, Copy)]
pub struct DayKeys {
    pub date: &'static str,
    pub temp_min: &'static str,
    pub temp_max: &'static str,
    pub humidity: &'static str,
    pub symbol: &'static str,
}

pub const DAY_KEYS: [DayKeys; MAX_FORECAST_DAYS] = [
    DayKeys {
        date: "fc0_date",
        temp_min: "fc0_tmin",
        temp_max: "fc0_tmax",
        humidity: "fc0_hum",
        symbol: "fc0_sym",
    },
    DayKeys {
        date: "fc1_date",
        temp_min: "fc1_tmin",
        temp_max: "fc1_tmax",
        humidity: "fc1_hum",
        symbol: "fc1_sym",
    },
    DayKeys {
        date: "fc2_date",
        temp_min: "fc2_tmin",
        temp_max: "fc2_tmax",
        humidity: "fc2_hum",
        symbol: "fc2_sym",
    },
    DayKeys {
        date: "fc3_date",
        temp_min: "fc3_tmin",
        temp_max: "fc3_tmax",
        humidity: "fc3_hum",
        symbol: "fc3_sym",
    },
];

// ── Scalar codecs ─────────────────────────────────────────────

fn read_u32<S: StoragePort + ?Sized>(s: &S, key: &str) -> Option<u32> {
    let mut buf = [0u8; 4];
    match s.read(NAMESPACE, key, &mut buf) {
        Ok(4) => Some(u32::from_le_bytes(buf)),
        _ => None,
    }
}

fn read_f32<S: StoragePort + ?Sized>(s: &S, key: &str) -> Option<f32> {
    read_u32(s, key).map(f32::from_bits)
}

fn read_u8<S: StoragePort + ?Sized>(s: &S, key: &str) -> Option<u8> {
    let mut buf = [0u8; 1];
    match s.read(NAMESPACE, key, &mut buf) {
        Ok(1) => Some(buf[0]),
        _ => None,
    }
}

fn read_str<S: StoragePort + ?Sized, const N: usize>(s: &S, key: &str) -> Option<String<N>> {
    let mut buf = [0u8; SYMBOL_CAPACITY];
    let len = s.read(NAMESPACE, key, &mut buf).ok()?;
    let text = core::str::from_utf8(&buf[..len]).ok()?;
    Some(bounded(text, N))
}

fn write_u32<S: StoragePort + ?Sized>(s: &mut S, key: &str, v: u32) -> Result<(), StorageError> {
    s.write(NAMESPACE, key, &v.to_le_bytes())
}

fn write_f32<S: StoragePort + ?Sized>(s: &mut S, key: &str, v: f32) -> Result<(), StorageError> {
    write_u32(s, key, v.to_bits())
}

// ── Settings ──────────────────────────────────────────────────

/// Persisted `(enabled, interval_secs)`, each `None` when never written.
pub fn load_settings<S: StoragePort + ?Sized>(s: &S) -> (Option<bool>, Option<u32>) {
    (read_u8(s, KEY_ENABLED).map(|b| b != 0), read_u32(s, KEY_INTERVAL))
}

pub fn save_enabled<S: StoragePort + ?Sized>(s: &mut S, enabled: bool) -> Result<(), StorageError> {
    s.write(NAMESPACE, KEY_ENABLED, &[u8::from(enabled)])
}

pub fn save_interval<S: StoragePort + ?Sized>(s: &mut S, secs: u32) -> Result<(), StorageError> {
    write_u32(s, KEY_INTERVAL, secs)
}

// ── Location ──────────────────────────────────────────────────

/// Load the stored location. Invalid (default) unless the commit key and
/// both coordinates are present.
pub fn load_location<S: StoragePort + ?Sized>(s: &S) -> Location {
    let Some(fetched_at) = read_u32(s, KEY_LOC_TIME) else {
        return Location::default();
    };
    let (Some(latitude), Some(longitude)) = (read_f32(s, KEY_LAT), read_f32(s, KEY_LON)) else {
        warn!("WEATHER: cached location incomplete");
        return Location::default();
    };
    Location {
        latitude,
        longitude,
        city: read_str(s, KEY_CITY).unwrap_or_default(),
        country: read_str(s, KEY_COUNTRY).unwrap_or_default(),
        valid: true,
        fetched_at,
    }
}

/// Save a location. `loc_time` is the commit key: it goes first and comes
/// back last, so an interrupted save leaves no valid location behind.
pub fn save_location<S: StoragePort + ?Sized>(s: &mut S, loc: &Location) -> Result<(), StorageError> {
    s.delete(NAMESPACE, KEY_LOC_TIME)?;
    write_f32(s, KEY_LAT, loc.latitude)?;
    write_f32(s, KEY_LON, loc.longitude)?;
    s.write(NAMESPACE, KEY_CITY, loc.city.as_bytes())?;
    s.write(NAMESPACE, KEY_COUNTRY, loc.country.as_bytes())?;
    write_u32(s, KEY_LOC_TIME, loc.fetched_at)?;
    info!("WEATHER: location saved ({})", loc.city);
    Ok(())
}

// ── Forecast ──────────────────────────────────────────────────

fn load_day<S: StoragePort + ?Sized>(s: &S, keys: &DayKeys) -> Option<DayForecast> {
    Some(DayForecast {
        date: read_str(s, keys.date)?,
        temp_min: read_f32(s, keys.temp_min)?,
        temp_max: read_f32(s, keys.temp_max)?,
        humidity: read_f32(s, keys.humidity)?,
        symbol: read_str(s, keys.symbol)?,
    })
}

/// Load the stored forecast. A count outside 1–4, a missing timestamp or
/// any missing day key yields an invalid (default) forecast.
pub fn load_forecast<S: StoragePort + ?Sized>(s: &S) -> Forecast {
    let count = usize::from(read_u8(s, KEY_FC_COUNT).unwrap_or(0));
    if count == 0 || count > MAX_FORECAST_DAYS {
        return Forecast::default();
    }
    let Some(fetched_at) = read_u32(s, KEY_FC_TIME) else {
        warn!("WEATHER: cached forecast has no timestamp");
        return Forecast::default();
    };
    let mut forecast = Forecast {
        fetched_at,
        ..Forecast::default()
    };
    for keys in &DAY_KEYS[..count] {
        let Some(day) = load_day(s, keys) else {
            warn!("WEATHER: cached forecast day '{}' incomplete", keys.date);
            return Forecast::default();
        };
        // Capacity equals DAY_KEYS.len(), so this never overflows.
        let _ = forecast.days.push(day);
    }
    forecast.valid = true;
    forecast
}

/// Save a forecast. `fc_count` is the commit key: it is erased before the
/// day records are rewritten and written after the timestamp, so old and
/// new days never load together.
pub fn save_forecast<S: StoragePort + ?Sized>(s: &mut S, fc: &Forecast) -> Result<(), StorageError> {
    s.delete(NAMESPACE, KEY_FC_COUNT)?;
    for (day, keys) in fc.days.iter().zip(DAY_KEYS.iter()) {
        s.write(NAMESPACE, keys.date, day.date.as_bytes())?;
        write_f32(s, keys.temp_min, day.temp_min)?;
        write_f32(s, keys.temp_max, day.temp_max)?;
        write_f32(s, keys.humidity, day.humidity)?;
        s.write(NAMESPACE, keys.symbol, day.symbol.as_bytes())?;
    }
    write_u32(s, KEY_FC_TIME, fc.fetched_at)?;
    s.write(NAMESPACE, KEY_FC_COUNT, &[fc.days.len() as u8])?;
    info!("WEATHER: forecast saved ({} days)", fc.days.len());
    Ok(())
}

/// Erase every cached record. The enabled flag and interval are written
/// back so a cache clear does not also reset the user's choices.
pub fn clear<S: StoragePort + ?Sized>(
    s: &mut S,
    enabled: bool,
    interval_secs: u32,
) -> Result<(), StorageError> {
    s.erase_namespace(NAMESPACE)?;
    save_enabled(s, enabled)?;
    save_interval(s, interval_secs)
}
