//! Input edge detectors, hardware initialisation and task helpers.

pub mod button;
pub mod encoder;
pub mod hw_init;
pub mod task_pin;
pub mod touch;
pub mod watchdog;
