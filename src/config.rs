//! System configuration parameters
//!
//! All tunable parameters for the irrigation node. Defaults match the
//! YF-S201 flow sensor and the relay-driven pump on the reference board.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sensors::flow::FlowStrategy;

/// What an emergency stop (and any supervisory safety trip) leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyStopPolicy {
    /// Latch `Error`; `activate()` fails until `reset()`.
    Latch,
    /// Go straight to `Off` with no latch.
    ReturnToOff,
}

/// Policy used unless the configuration overrides it.
pub const DEFAULT_EMERGENCY_STOP_POLICY: EmergencyStopPolicy = EmergencyStopPolicy::Latch;

/// Core node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    // --- Flow sensor ---
    /// Pulses per second produced by a flow of 1 L/min.
    pub calibration_factor: f64,
    /// Acquisition strategy for the flow input.
    pub flow_strategy: FlowStrategy,
    /// Minimum window before a new flow estimate is computed (ms).
    pub min_sample_interval_ms: u64,
    /// Timeout for one pulse-width half-period measurement (µs).
    pub pulse_timeout_us: u64,

    // --- Pump safety ---
    /// Absolute actuator-on ceiling, applied in every mode (ms).
    pub max_runtime_ms: u64,
    /// Largest accepted volume target (L).
    pub max_volume_liters: f64,
    /// Fixed pump delivery rate used to turn `water_ml` into a duration.
    pub water_rate_ml_per_second: f64,
    /// Emergency stop / safety trip behaviour.
    pub emergency_stop_policy: EmergencyStopPolicy,
    /// Refuse to run the pump while the reservoir float switch reads low.
    pub water_level_interlock: bool,

    // --- Locking ---
    /// Bound on controller lock acquisition for commands (ms).
    pub command_lock_timeout_ms: u64,
    /// Bound on controller lock acquisition when feeding volume (ms).
    pub volume_feed_lock_timeout_ms: u64,
    /// Bound on snapshot lock acquisition for readers (ms).
    pub snapshot_read_timeout_ms: u64,

    // --- Timing ---
    /// Acquisition task cadence (ms).
    pub acquisition_interval_ms: u64,
    /// Supervisory safety check cadence (ms).
    pub supervisor_interval_ms: u64,
    /// Task watchdog timeout for the supervisory task (ms).
    pub watchdog_timeout_ms: u32,
    /// Status display refresh cadence (ms).
    pub display_interval_ms: u64,

    // --- Network ---
    /// Port of the local control HTTP server.
    pub http_port: u16,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            // Flow sensor
            calibration_factor: 7.5,
            flow_strategy: FlowStrategy::EdgeInterrupt,
            min_sample_interval_ms: 1000,
            pulse_timeout_us: 1_000_000,

            // Pump safety
            max_runtime_ms: 300_000, // 5 min
            max_volume_liters: 100.0,
            water_rate_ml_per_second: 30.0,
            emergency_stop_policy: DEFAULT_EMERGENCY_STOP_POLICY,
            water_level_interlock: false,

            // Locking
            command_lock_timeout_ms: 1000,
            volume_feed_lock_timeout_ms: 10,
            snapshot_read_timeout_ms: 10,

            // Timing
            acquisition_interval_ms: 1000, // 1 Hz
            supervisor_interval_ms: 100,   // 10 Hz
            watchdog_timeout_ms: 5000,
            display_interval_ms: 500, // 2 Hz

            http_port: 80,
        }
    }
}

impl NodeConfig {
    /// Reject values the firmware cannot run with.
    pub fn validate(&self) -> Result<()> {
        if !(self.calibration_factor.is_finite() && self.calibration_factor > 0.0) {
            return Err(Error::Config("calibration_factor must be positive"));
        }
        if self.min_sample_interval_ms == 0 {
            return Err(Error::Config("min_sample_interval_ms must be non-zero"));
        }
        if self.acquisition_interval_ms == 0 || self.supervisor_interval_ms == 0 || self.display_interval_ms == 0 {
            return Err(Error::Config("task cadences must be non-zero"));
        }
        if u64::from(self.watchdog_timeout_ms) <= self.supervisor_interval_ms {
            return Err(Error::Config("watchdog_timeout_ms must exceed the supervisor interval"));
        }
        if self.max_runtime_ms == 0 {
            return Err(Error::Config("max_runtime_ms must be non-zero"));
        }
        if !(self.max_volume_liters.is_finite() && self.max_volume_liters > 0.0) {
            return Err(Error::Config("max_volume_liters must be positive"));
        }
        if !(self.water_rate_ml_per_second.is_finite() && self.water_rate_ml_per_second > 0.0) {
            return Err(Error::Config("water_rate_ml_per_second must be positive"));
        }
        Ok(())
    }
}
