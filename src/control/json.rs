//! JSON bodies of the control API.

use serde::{Deserialize, Serialize};

use super::Command;
use crate::error::ValidationError;
use crate::pump::state::{Activation, PumpMode, StatusReport};
use crate::sensors::flow::FlowStrategy;

/// `POST /pump/activate` body.  All fields optional; an empty object (or
/// an empty body) means manual mode.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ActivateBody {
    /// Seconds.
    pub duration: Option<f64>,
    /// Liters.
    pub volume: Option<f64>,
    /// Milliliters, converted to a duration at the fixed pump rate.
    pub water_ml: Option<f64>,
}

impl ActivateBody {
    pub fn parse(body: &[u8]) -> Result<Self, ValidationError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        serde_json::from_slice(body).map_err(|_| ValidationError::MalformedBody)
    }

    /// Pick the request variant.  `duration` wins over `volume`, which wins
    /// over `water_ml`.
    pub fn into_activation(self, water_rate_ml_per_second: f64) -> Result<Activation, ValidationError> {
        if let Some(secs) = self.duration {
            return Ok(Activation::DurationMs(seconds_to_ms(secs).ok_or(ValidationError::InvalidDuration)?));
        }
        if let Some(liters) = self.volume {
            return Ok(Activation::VolumeLiters(liters));
        }
        if let Some(ml) = self.water_ml {
            return Ok(Activation::DurationMs(
                water_ml_to_ms(ml, water_rate_ml_per_second).ok_or(ValidationError::InvalidWaterAmount)?,
            ));
        }
        Ok(Activation::Manual)
    }
}

/// Whole milliseconds, `None` for non-positive or non-finite input.
/// Values past `u64::MAX` saturate and are rejected later by the ceiling.
fn seconds_to_ms(secs: f64) -> Option<u64> {
    (secs.is_finite() && secs > 0.0).then(|| (secs * 1000.0).round() as u64)
}

/// Run time needed to deliver `ml` at `rate_ml_per_second`.
pub fn water_ml_to_ms(ml: f64, rate_ml_per_second: f64) -> Option<u64> {
    if !(ml.is_finite() && ml > 0.0 && rate_ml_per_second > 0.0) {
        return None;
    }
    seconds_to_ms(ml / rate_ml_per_second)
}

/// Pump status as served by every successful pump endpoint.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
    pub enabled: bool,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runtime_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_volume: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<String>,
    pub water_rate_ml_per_second: f64,
}

impl StatusBody {
    pub fn new(report: &StatusReport, water_rate_ml_per_second: f64) -> Self {
        let mut body = Self {
            status: report.status.label(),
            enabled: report.enabled,
            mode: report.mode_label(),
            runtime_seconds: None,
            remaining_seconds: None,
            duration_seconds: None,
            current_volume: None,
            target_volume: None,
            fault: report.fault.map(|f| f.to_string()),
            water_rate_ml_per_second,
        };
        if let Some(run) = report.run {
            body.runtime_seconds = Some(run.runtime_ms / 1000);
            match run.mode {
                PumpMode::Duration { duration_ms } => {
                    body.remaining_seconds = run.remaining_ms().map(|ms| ms / 1000);
                    body.duration_seconds = Some(duration_ms / 1000);
                }
                PumpMode::Volume { target_liters } => {
                    body.current_volume = Some(run.current_volume);
                    body.target_volume = Some(target_liters);
                }
                PumpMode::Manual => {}
            }
        }
        body
    }
}

/// `POST /flow/mode` body: `{"mode": "edge-interrupt" | "pulse-width"}`.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowModeBody {
    pub mode: FlowStrategy,
}

impl FlowModeBody {
    pub fn parse(body: &[u8]) -> Result<Self, ValidationError> {
        serde_json::from_slice(body).map_err(|_| ValidationError::MalformedBody)
    }
}

/// Answer to a queued flow command.
#[derive(Debug, Serialize)]
pub struct FlowAckBody {
    pub status: &'static str,
    pub action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<FlowStrategy>,
}

impl FlowAckBody {
    pub fn new(command: &Command) -> Self {
        let (action, mode) = match command {
            Command::SetFlowMode(strategy) => ("set-mode", Some(*strategy)),
            _ => ("reset-total", None),
        };
        Self {
            status: "accepted",
            action,
            mode,
        }
    }
}

/// `{error, status: "error"}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub error: &'a str,
    pub status: &'static str,
}

impl<'a> ErrorBody<'a> {
    pub fn new(error: &'a str) -> Self {
        Self { error, status: "error" }
    }
}
