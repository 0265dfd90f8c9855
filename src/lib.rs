//! heatctl firmware library.
//!
//! Cooperative dispatch loop plus closed-loop heater control.  Exposes the
//! pure-logic modules for integration testing and the simulator. All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod safety;
pub mod scheduler;
pub mod sensors;
pub mod tick;

pub mod pins;

// The hardware modules compile on the host too; the register-level code
// inside is guarded by cfg attributes.
pub mod adapters;
pub mod drivers;

pub use error::{Error, Result};
