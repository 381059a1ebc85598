//! notchd-core: signal snapshots, mode resolution, cooldowns and widget
//! session lifecycle for the notch overlay.
//!
//! Pure library. No IO, no async: every time-dependent function takes
//! `now` as a parameter so behavior is deterministic under test.

pub mod admission;
pub mod config;
pub mod cooldown;
pub mod error;
pub mod resolver;
pub mod scenario;
pub mod session;
pub mod snapshot;
pub mod types;

pub use config::NotchConfig;
pub use error::NotchError;
