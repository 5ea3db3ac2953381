//! Coompel firmware library.
//!
//! Everything except the boot wiring in `main.rs` lives here so that the
//! modes, menu, animation engine and weather pipeline build and test on
//! the host. ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` inside each module, next to a
//! simulation backend.

#![deny(unused_must_use)]

pub mod adapters;
pub mod animation;
pub mod app;
pub mod config;
pub mod drivers;
pub mod error;
pub mod events;
pub mod fsm;
pub mod games;
pub mod menu;
pub mod pins;
pub mod sensors;
pub mod weather;
