//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a whole flow against
//! the simulated radio, flash and panel. All tests run on the host with
//! no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod app_service_tests;
mod mock_hw;
mod weather_flow_tests;
