//! 8×8 condition icons keyed by MET Norway symbol codes.

use crate::app::ports::DisplayPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeatherIcon {
    ClearDay,
    ClearNight,
    FairDay,
    FairNight,
    PartlyCloudyDay,
    PartlyCloudyNight,
    Cloudy,
    Fog,
    LightRain,
    Rain,
    HeavyRain,
    LightSnow,
    Snow,
    HeavySnow,
    Sleet,
    Thunder,
    Unknown,
}

fn is_night(code: &str) -> bool {
    code.contains("night") || code.contains("polartwilight")
}

impl WeatherIcon {
    /// Classify a symbol code such as `lightrainshowers_day`. Order
    /// matters: the more specific substrings are checked first.
    pub fn classify(code: &str) -> Self {
        let night = is_night(code);
        if code.is_empty() {
            Self::Unknown
        } else if code.contains("thunder") {
            Self::Thunder
        } else if code.contains("fog") {
            Self::Fog
        } else if code.contains("heavyrain") {
            Self::HeavyRain
        } else if code.contains("lightrain") {
            Self::LightRain
        } else if code.contains("rain") {
            Self::Rain
        } else if code.contains("heavysnow") {
            Self::HeavySnow
        } else if code.contains("lightsnow") {
            Self::LightSnow
        } else if code.contains("snow") {
            Self::Snow
        } else if code.contains("sleet") {
            Self::Sleet
        } else if code.contains("clearsky") {
            if night { Self::ClearNight } else { Self::ClearDay }
        } else if code.contains("fair") {
            if night { Self::FairNight } else { Self::FairDay }
        } else if code.contains("partlycloudy") {
            if night { Self::PartlyCloudyNight } else { Self::PartlyCloudyDay }
        } else if code.contains("cloudy") {
            Self::Cloudy
        } else {
            Self::Unknown
        }
    }

    /// One byte per row, MSB leftmost.
    pub const fn bitmap(self) -> &'static [u8; 8] {
        match self {
            Self::ClearDay => &[0x24, 0x10, 0xbe, 0x3e, 0xbe, 0x10, 0x24, 0x00],
            Self::ClearNight => &[0x00, 0x30, 0x70, 0xf8, 0xf8, 0x70, 0x30, 0x00],
            Self::FairDay => &[0x20, 0xa0, 0x70, 0x00, 0x0c, 0x1f, 0x1f, 0x00],
            Self::FairNight => &[0x30, 0x70, 0x30, 0x00, 0x0c, 0x1f, 0x1f, 0x00],
            Self::PartlyCloudyDay => &[0x40, 0x80, 0x18, 0x3f, 0x7f, 0x7f, 0x3e, 0x00],
            Self::PartlyCloudyNight => &[0x20, 0x40, 0x18, 0x3f, 0x7f, 0x7f, 0x3e, 0x00],
            Self::Cloudy => &[0x00, 0x18, 0x3c, 0x7e, 0xff, 0xff, 0x7e, 0x00],
            Self::Fog => &[0x00, 0xff, 0x00, 0x7e, 0x00, 0xff, 0x00, 0x7e],
            Self::LightRain => &[0x18, 0x3c, 0xff, 0xff, 0x00, 0x24, 0x00, 0x00],
            Self::Rain => &[0x18, 0x3c, 0xff, 0xff, 0x00, 0x54, 0xa8, 0x00],
            Self::HeavyRain | Self::HeavySnow => &[0x18, 0x3c, 0xff, 0xff, 0xaa, 0x55, 0xaa, 0x00],
            Self::LightSnow => &[0x18, 0x3c, 0xff, 0xff, 0x00, 0x20, 0x04, 0x00],
            Self::Snow => &[0x18, 0x3c, 0xff, 0xff, 0x00, 0x44, 0x10, 0x44],
            Self::Sleet => &[0x18, 0x3c, 0xff, 0xff, 0x00, 0x48, 0x22, 0x00],
            Self::Thunder => &[0x18, 0x3c, 0xff, 0x08, 0x18, 0x10, 0x30, 0x00],
            Self::Unknown => &[0x3c, 0x42, 0x04, 0x08, 0x10, 0x00, 0x10, 0x00],
        }
    }

    pub fn draw<D: DisplayPort + ?Sized>(self, d: &mut D, x: i32, y: i32) {
        d.draw_bitmap(x, y, 8, 8, self.bitmap());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_codes_win() {
        assert_eq!(WeatherIcon::classify("heavyrainandthunder"), WeatherIcon::Thunder);
        assert_eq!(WeatherIcon::classify("lightrainshowers_day"), WeatherIcon::LightRain);
        assert_eq!(WeatherIcon::classify("heavysnow"), WeatherIcon::HeavySnow);
        assert_eq!(WeatherIcon::classify("rainshowers_night"), WeatherIcon::Rain);
        assert_eq!(WeatherIcon::classify("lightsleet"), WeatherIcon::Sleet);
    }

    #[test]
    fn day_night_variants() {
        assert_eq!(WeatherIcon::classify("clearsky_day"), WeatherIcon::ClearDay);
        assert_eq!(WeatherIcon::classify("clearsky_polartwilight"), WeatherIcon::ClearNight);
        assert_eq!(WeatherIcon::classify("fair_night"), WeatherIcon::FairNight);
        assert_eq!(WeatherIcon::classify("partlycloudy_day"), WeatherIcon::PartlyCloudyDay);
        assert_eq!(WeatherIcon::classify("cloudy"), WeatherIcon::Cloudy);
    }

    #[test]
    fn unknown_codes() {
        assert_eq!(WeatherIcon::classify(""), WeatherIcon::Unknown);
        assert_eq!(WeatherIcon::classify("volcanic_ash"), WeatherIcon::Unknown);
    }
}
