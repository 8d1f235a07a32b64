//! Irrigation node firmware library.
//!
//! Exposes the pure-logic modules for integration testing and host
//! simulation. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod pins;
pub mod pump;
pub mod sensors;
pub mod snapshot;
pub mod sync;
pub mod tasks;

// Hardware-facing modules; the real implementations are cfg-gated inside
// and fall back to host simulation elsewhere.
pub mod adapters;
pub mod drivers;
