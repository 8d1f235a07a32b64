//! Pump state types.
//!
//! The run mode is a tagged variant carrying only its own parameter, and
//! the phase carries the run state only while the pump is on, so a
//! duration run with a volume target (or an `Off` pump with a start time)
//! cannot be expressed.

use core::fmt;

use crate::app::ports::Timestamp;
use crate::error::{SafetyFault, ValidationError};

/// Validated run mode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PumpMode {
    /// Runs until deactivated or tripped.
    Manual,
    /// Runs for a fixed time.
    Duration { duration_ms: u64 },
    /// Runs until the fed volume reaches the target.
    Volume { target_liters: f64 },
}

impl PumpMode {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Duration { .. } => "duration",
            Self::Volume { .. } => "volume",
        }
    }
}

/// Upper bounds an activation request is checked against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Limits {
    pub max_runtime_ms: u64,
    pub max_volume_liters: f64,
}

/// Unvalidated activation request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Activation {
    Manual,
    DurationMs(u64),
    VolumeLiters(f64),
}

impl Activation {
    /// Check the parameter against `limits` and produce the run mode.
    pub fn validate(self, limits: &Limits) -> Result<PumpMode, ValidationError> {
        match self {
            Self::Manual => Ok(PumpMode::Manual),
            Self::DurationMs(ms) => {
                if ms == 0 || ms > limits.max_runtime_ms {
                    return Err(ValidationError::InvalidDuration);
                }
                Ok(PumpMode::Duration { duration_ms: ms })
            }
            Self::VolumeLiters(liters) => {
                if !(liters.is_finite() && liters > 0.0 && liters <= limits.max_volume_liters) {
                    return Err(ValidationError::InvalidVolume);
                }
                Ok(PumpMode::Volume { target_liters: liters })
            }
        }
    }
}

/// State of an active run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunState {
    pub mode: PumpMode,
    pub started_at: Timestamp,
    /// Volume dispensed since activation (L).  Only advanced in volume mode.
    pub current_volume: f64,
}

impl RunState {
    pub fn runtime_ms(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.started_at)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PumpPhase {
    Off,
    On(RunState),
    /// Latched until `reset()`.
    Error(SafetyFault),
}

/// The single pump record guarded by the controller lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PumpState {
    pub phase: PumpPhase,
    pub enabled: bool,
}

impl Default for PumpState {
    fn default() -> Self {
        Self {
            phase: PumpPhase::Off,
            enabled: true,
        }
    }
}

/// Coarse status as reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PumpStatus {
    Off,
    On,
    Error,
}

impl PumpStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
            Self::Error => "error",
        }
    }
}

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Deactivated,
    DurationElapsed,
    TargetVolumeReached,
    Disabled,
    EmergencyStop,
    /// Interlock failure or runtime ceiling.
    Safety(SafetyFault),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deactivated => write!(f, "deactivated"),
            Self::DurationElapsed => write!(f, "duration elapsed"),
            Self::TargetVolumeReached => write!(f, "target volume reached"),
            Self::Disabled => write!(f, "pump disabled"),
            Self::EmergencyStop => write!(f, "emergency stop"),
            Self::Safety(fault) => write!(f, "safety: {fault}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Status report
// ---------------------------------------------------------------------------

/// Details of a run in progress.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub mode: PumpMode,
    pub runtime_ms: u64,
    pub current_volume: f64,
}

impl RunReport {
    /// Time left in duration mode, saturating at zero.
    pub fn remaining_ms(&self) -> Option<u64> {
        match self.mode {
            PumpMode::Duration { duration_ms } => Some(duration_ms.saturating_sub(self.runtime_ms)),
            _ => None,
        }
    }
}

/// Copied-out view of the pump, taken under the controller lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatusReport {
    pub status: PumpStatus,
    pub enabled: bool,
    /// Present iff `status == On`.
    pub run: Option<RunReport>,
    /// Present iff `status == Error`.
    pub fault: Option<SafetyFault>,
}

impl StatusReport {
    pub fn capture(state: &PumpState, now: Timestamp) -> Self {
        let (status, run, fault) = match state.phase {
            PumpPhase::Off => (PumpStatus::Off, None, None),
            PumpPhase::On(run) => (
                PumpStatus::On,
                Some(RunReport {
                    mode: run.mode,
                    runtime_ms: run.runtime_ms(now),
                    current_volume: run.current_volume,
                }),
                None,
            ),
            PumpPhase::Error(fault) => (PumpStatus::Error, None, Some(fault)),
        };
        Self {
            status,
            enabled: state.enabled,
            run,
            fault,
        }
    }

    /// Mode label; a pump that is not running reports `manual`.
    pub fn mode_label(&self) -> &'static str {
        self.run.map_or(PumpMode::Manual.label(), |r| r.mode.label())
    }

    pub fn details(&self) -> StatusDetails {
        match self.status {
            PumpStatus::Off => StatusDetails::Ready,
            PumpStatus::Error => StatusDetails::ResetRequired,
            PumpStatus::On => StatusDetails::Runtime {
                secs: self.run.map_or(0, |run| run.runtime_ms / 1000),
            },
        }
    }
}

/// Second display line under the one-line status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDetails {
    Ready,
    ResetRequired,
    Runtime { secs: u64 },
}

impl fmt::Display for StatusDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::ResetRequired => write!(f, "Reset Required"),
            Self::Runtime { secs } => write!(f, "Runtime: {secs}s"),
        }
    }
}

/// One-line display text.
impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.run) {
            (PumpStatus::On, Some(run)) => match run.mode {
                PumpMode::Manual => write!(f, "PUMP: ON (Manual)"),
                PumpMode::Duration { .. } => {
                    write!(f, "PUMP: ON ({}s)", run.remaining_ms().unwrap_or(0) / 1000)
                }
                PumpMode::Volume { target_liters } => {
                    write!(f, "PUMP: ON ({:.1}/{:.1}L)", run.current_volume, target_liters)
                }
            },
            (PumpStatus::Error, _) => write!(f, "PUMP: ERROR"),
            _ => write!(f, "PUMP: OFF"),
        }
    }
}
