//! Games playable from the menu.

pub mod pong;

pub use pong::{Pong, PongState};
