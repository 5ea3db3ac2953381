//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing application events to the ESP-IDF
//! logger (UART / USB-CDC in production, stderr on the host).

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged since boot.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            AppEvent::Started(mode) => info!("START | initial_mode={:?}", mode),
            AppEvent::ModeChanged { from, to } => info!("MODE | {:?} -> {:?}", from, to),
            AppEvent::Weather(ev) => info!("WEATHER | {:?}", ev),
            AppEvent::WeatherStateChanged { from, to } => {
                info!("WEATHER | state {:?} -> {:?}", from, to)
            }
            AppEvent::WifiStateChanged { from, to } => {
                info!("WIFI | {} -> {}", from.label(), to.label())
            }
            AppEvent::Wifi(ev) => info!("WIFI | {:?}", ev),
            AppEvent::SettingsSaved => info!("SETTINGS | saved"),
            AppEvent::SettingsSaveFailed => warn!("SETTINGS | save failed, will retry"),
            AppEvent::DisplaySleep => info!("DISPLAY | sleep"),
            AppEvent::DisplayWake => info!("DISPLAY | wake"),
            AppEvent::DisplayFault => warn!("DISPLAY | frame rejected"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::ModeId;

    #[test]
    fn counts_every_event() {
        let mut sink = LogEventSink::new();
        sink.emit(&AppEvent::Started(ModeId::Animations));
        sink.emit(&AppEvent::DisplaySleep);
        assert_eq!(sink.emitted(), 2);
    }
}
