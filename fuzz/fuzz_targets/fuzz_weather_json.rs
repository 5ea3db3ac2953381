//! Fuzz target: geolocation and forecast reply parsing.
//!
//! cargo fuzz run fuzz_weather_json

#![no_main]

use coompel::weather::forecast::parse_forecast;
use coompel::weather::geo::parse_location;
use coompel::weather::MAX_FORECAST_DAYS;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = core::str::from_utf8(data) else {
        return;
    };

    if let Ok(loc) = parse_location(body) {
        assert!(loc.valid);
        assert!((-90.0..=90.0).contains(&loc.latitude));
        assert!((-180.0..=180.0).contains(&loc.longitude));
    }

    if let Ok(fc) = parse_forecast(body) {
        assert!(fc.valid);
        assert!(!fc.days.is_empty() && fc.days.len() <= MAX_FORECAST_DAYS);
        for day in &fc.days {
            assert!(day.temp_min <= day.temp_max);
        }
    }
});
