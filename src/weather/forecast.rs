//! MET Norway `locationforecast/2.0/compact` client.
//!
//! The reply is an hourly (later six-hourly) time series. It is folded
//! into at most [`MAX_FORECAST_DAYS`] daily summaries keyed by the date
//! part of each timestamp, in the order the dates first appear.

use log::{debug, info, warn};
use serde::Deserialize;

use super::{DayForecast, FetchError, Forecast, Location, MAX_FORECAST_DAYS, SYMBOL_CAPACITY, bounded};
use crate::app::ports::HttpPort;

pub const API_URL: &str = "https://api.met.no/weatherapi/locationforecast/2.0/compact";
/// MET Norway rejects requests without an identifying agent.
pub const USER_AGENT: &str = concat!("coompel/", env!("CARGO_PKG_VERSION"));
pub const TIMEOUT_MS: u32 = 15_000;

#[derive(Debug, Deserialize)]
struct Reply {
    properties: Properties,
}

#[derive(Debug, Deserialize)]
struct Properties {
    timeseries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    time: String,
    data: EntryData,
}

#[derive(Debug, Deserialize)]
struct EntryData {
    instant: Option<Instant>,
    next_1_hours: Option<Period>,
    next_6_hours: Option<Period>,
}

#[derive(Debug, Deserialize)]
struct Instant {
    details: Option<Details>,
}

#[derive(Debug, Deserialize)]
struct Details {
    air_temperature: Option<f32>,
    relative_humidity: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct Period {
    summary: Option<Summary>,
}

#[derive(Debug, Deserialize)]
struct Summary {
    symbol_code: Option<String>,
}

impl EntryData {
    fn symbol(&self) -> Option<&str> {
        [&self.next_1_hours, &self.next_6_hours]
            .into_iter()
            .flatten()
            .find_map(|p| p.summary.as_ref()?.symbol_code.as_deref())
    }
}

/// Running totals for one calendar day.
struct DayAccumulator<'a> {
    date: &'a str,
    temp_min: f32,
    temp_max: f32,
    humidity_sum: f32,
    humidity_samples: u32,
    samples: u32,
    symbols: Vec<(&'a str, u32)>,
}

impl<'a> DayAccumulator<'a> {
    fn new(date: &'a str) -> Self {
        Self {
            date,
            temp_min: f32::MAX,
            temp_max: f32::MIN,
            humidity_sum: 0.0,
            humidity_samples: 0,
            samples: 0,
            symbols: Vec::new(),
        }
    }

    fn add(&mut self, data: &'a EntryData) {
        if let Some(details) = data.instant.as_ref().and_then(|i| i.details.as_ref()) {
            if let Some(t) = details.air_temperature {
                self.temp_min = self.temp_min.min(t);
                self.temp_max = self.temp_max.max(t);
                self.samples += 1;
            }
            if let Some(h) = details.relative_humidity {
                self.humidity_sum += h;
                self.humidity_samples += 1;
            }
        }
        if let Some(sym) = data.symbol() {
            match self.symbols.iter_mut().find(|(s, _)| *s == sym) {
                Some((_, n)) => *n += 1,
                None => self.symbols.push((sym, 1)),
            }
        }
    }

    /// Most frequent symbol; ties go to the alphabetically first code.
    fn dominant_symbol(&self) -> &'a str {
        self.symbols
            .iter()
            .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
            .map_or("", |(s, _)| s)
    }

    fn finish(&self) -> Option<DayForecast> {
        if self.samples == 0 {
            return None;
        }
        let humidity = if self.humidity_samples == 0 {
            0.0
        } else {
            self.humidity_sum / self.humidity_samples as f32
        };
        Some(DayForecast {
            date: bounded(self.date, 10),
            temp_min: self.temp_min,
            temp_max: self.temp_max,
            humidity,
            symbol: bounded(self.dominant_symbol(), SYMBOL_CAPACITY),
        })
    }
}

/// Fold a compact-format reply into daily summaries.
pub fn parse_forecast(body: &str) -> Result<Forecast, FetchError> {
    let reply: Reply = serde_json::from_str(body).map_err(|e| {
        warn!("FORECAST: JSON rejected: {}", e);
        FetchError::ParseFailed
    })?;
    let series = &reply.properties.timeseries;
    debug!("FORECAST: {} timeseries entries", series.len());

    let mut days: Vec<DayAccumulator<'_>> = Vec::with_capacity(MAX_FORECAST_DAYS);
    for entry in series {
        let Some(date) = entry.time.get(..10) else {
            continue;
        };
        let idx = match days.iter().position(|d| d.date == date) {
            Some(i) => i,
            None if days.len() < MAX_FORECAST_DAYS => {
                days.push(DayAccumulator::new(date));
                days.len() - 1
            }
            None => break,
        };
        days[idx].add(&entry.data);
    }

    let mut forecast = Forecast::default();
    for day in days.iter().filter_map(DayAccumulator::finish) {
        // At most MAX_FORECAST_DAYS accumulators exist.
        let _ = forecast.days.push(day);
    }
    if forecast.days.is_empty() {
        return Err(FetchError::InvalidResponse);
    }
    forecast.valid = true;
    Ok(forecast)
}

/// Request URL for a location, coordinates to four decimals.
pub fn forecast_url(loc: &Location) -> String {
    format!("{}?lat={:.4}&lon={:.4}", API_URL, loc.latitude, loc.longitude)
}

pub fn fetch_forecast<H: HttpPort + ?Sized>(
    http: &H,
    loc: &Location,
    now_secs: u32,
) -> Result<Forecast, FetchError> {
    let url = forecast_url(loc);
    info!("FORECAST: GET {}", url);
    let resp = http
        .get(&url, &[("User-Agent", USER_AGENT), ("Accept", "application/json")], TIMEOUT_MS)
        .map_err(FetchError::from)?;
    if let Some(e) = FetchError::from_status(resp.status) {
        warn!("FORECAST: HTTP {}", resp.status);
        return Err(e);
    }
    let mut forecast = parse_forecast(&resp.body)?;
    forecast.fetched_at = now_secs;
    for d in &forecast.days {
        info!(
            "FORECAST: {} {:.1}..{:.1}C {:.0}% {}",
            d.date, d.temp_min, d.temp_max, d.humidity, d.symbol
        );
    }
    Ok(forecast)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn entry(time: &str, t: f32, h: f32, sym1: Option<&str>, sym6: Option<&str>) -> String {
        let period = |s: Option<&str>| {
            s.map_or(String::new(), |s| format!(r#"{{"summary":{{"symbol_code":"{s}"}}}}"#))
        };
        let mut data = format!(
            r#""instant":{{"details":{{"air_temperature":{t},"relative_humidity":{h}}}}}"#
        );
        if sym1.is_some() {
            data.push_str(&format!(r#","next_1_hours":{}"#, period(sym1)));
        }
        if sym6.is_some() {
            data.push_str(&format!(r#","next_6_hours":{}"#, period(sym6)));
        }
        format!(r#"{{"time":"{time}","data":{{{data}}}}}"#)
    }

    pub(crate) fn body(entries: &[String]) -> String {
        format!(
            r#"{{"type":"Feature","properties":{{"meta":{{}},"timeseries":[{}]}}}}"#,
            entries.join(",")
        )
    }

    /// Five days of six-hourly data.
    pub(crate) fn five_days() -> String {
        let mut e = Vec::new();
        for day in 10..15 {
            for hour in [0, 6, 12, 18] {
                e.push(entry(
                    &format!("2024-06-{day}T{hour:02}:00:00Z"),
                    f32::from(hour as u8) + f32::from(day as u8),
                    50.0 + f32::from(hour as u8),
                    Some(if hour < 12 { "rain" } else { "cloudy" }),
                    None,
                ));
            }
        }
        body(&e)
    }

    #[test]
    fn groups_into_four_days() {
        let fc = parse_forecast(&five_days()).unwrap();
        assert!(fc.valid);
        assert_eq!(fc.days.len(), 4);
        assert_eq!(fc.days[0].date.as_str(), "2024-06-10");
        assert_eq!(fc.days[3].date.as_str(), "2024-06-13");
        assert!((fc.days[0].temp_min - 10.0).abs() < 1e-3);
        assert!((fc.days[0].temp_max - 28.0).abs() < 1e-3);
        assert!((fc.days[0].humidity - 59.0).abs() < 1e-3);
    }

    #[test]
    fn symbol_ties_break_alphabetically() {
        let fc = parse_forecast(&five_days()).unwrap();
        // two "rain", two "cloudy"
        assert_eq!(fc.days[0].symbol.as_str(), "cloudy");
    }

    #[test]
    fn most_frequent_symbol_wins_and_six_hour_fallback() {
        let b = body(&[
            entry("2024-01-01T00:00:00Z", 1.0, 80.0, Some("snow"), None),
            entry("2024-01-01T01:00:00Z", 2.0, 80.0, None, Some("lightsnow")),
            entry("2024-01-01T02:00:00Z", 3.0, 80.0, None, Some("lightsnow")),
        ]);
        let fc = parse_forecast(&b).unwrap();
        assert_eq!(fc.days[0].symbol.as_str(), "lightsnow");
    }

    #[test]
    fn empty_series_is_invalid() {
        assert_eq!(parse_forecast(&body(&[])), Err(FetchError::InvalidResponse));
        assert_eq!(parse_forecast(r#"{"type":"Feature"}"#), Err(FetchError::ParseFailed));
    }

    #[test]
    fn url_uses_four_decimals() {
        let loc = Location {
            latitude: 59.913_868,
            longitude: 10.752_245,
            ..Default::default()
        };
        assert!(forecast_url(&loc).ends_with("?lat=59.9139&lon=10.7522"));
    }
}
