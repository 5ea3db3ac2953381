//! Application core: pure domain logic, zero I/O.
//!
//! The service ties the mode dispatcher, the input edge detectors, the
//! sensor hub and the weather pipeline together. All interaction with
//! hardware happens through **port traits** defined in [`ports`], keeping
//! this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
