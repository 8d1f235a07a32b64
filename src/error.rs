//! Unified error types for the irrigation node firmware.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! command path and the periodic tasks uniform in how they report failure.
//! All variants are `Copy` so they pass through the pump controller and the
//! control surface without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Error {
    /// A request parameter was rejected before any state change.
    Validation(ValidationError),
    /// The controller lock could not be taken within its bound. Retry.
    Busy,
    /// The pump is latched in `Error` and needs an explicit reset.
    Latched,
    /// A safety interlock refused the operation.
    Safety(SafetyFault),
    /// The relay output could not be driven.
    Actuator(ActuatorError),
    /// A sensor could not be read.
    Sensor(SensorError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl Error {
    /// Transient errors go away on their own; the caller may retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Busy)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(e) => write!(f, "{e}"),
            Self::Busy => write!(f, "System busy - try again"),
            Self::Latched => write!(f, "Pump in error state - reset required"),
            Self::Safety(e) => write!(f, "Safety conditions not met: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValidationError {
    /// Duration is zero, negative, not finite, or above the runtime ceiling.
    InvalidDuration,
    /// Volume is zero, negative, not finite, or above the volume ceiling.
    InvalidVolume,
    /// `water_ml` is zero, negative, or not finite.
    InvalidWaterAmount,
    /// The request body is not a JSON object of the expected shape.
    MalformedBody,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDuration => write!(f, "Invalid duration specified"),
            Self::InvalidVolume => write!(f, "Invalid volume specified"),
            Self::InvalidWaterAmount => write!(f, "Invalid water_ml specified"),
            Self::MalformedBody => write!(f, "Malformed request body"),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Reasons the pump may not run, or was forced to stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyFault {
    /// The operator disabled the pump.
    PumpDisabled,
    /// The network link is down; the pump cannot be monitored remotely.
    LinkDown,
    /// Supply water level below minimum.
    WaterLevelLow,
    /// Absolute runtime ceiling reached.
    RuntimeCeiling,
    /// Explicit emergency stop.
    EmergencyStop,
    /// The relay could not be switched off.
    RelayStuck,
    /// A board-specific interlock, named by its implementation.
    Interlock(&'static str),
}

impl fmt::Display for SafetyFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PumpDisabled => write!(f, "pump disabled"),
            Self::LinkDown => write!(f, "network link down"),
            Self::WaterLevelLow => write!(f, "water level low"),
            Self::RuntimeCeiling => write!(f, "maximum runtime exceeded"),
            Self::EmergencyStop => write!(f, "emergency stop"),
            Self::RelayStuck => write!(f, "relay failed to switch off"),
            Self::Interlock(name) => write!(f, "interlock '{name}' open"),
        }
    }
}

impl From<SafetyFault> for Error {
    fn from(e: SafetyFault) -> Self {
        Self::Safety(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed.
    GpioWriteFailed,
    /// Relay feedback disagrees with the commanded level.
    NotConfirmed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::NotConfirmed => write!(f, "relay did not confirm state"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// ADC read returned an error or timed out.
    AdcReadFailed,
    /// Digital sensor did not answer.
    NotResponding,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AdcReadFailed => write!(f, "ADC read failed"),
            Self::NotResponding => write!(f, "sensor not responding"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
