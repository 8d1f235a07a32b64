//! Pump safety controller.
//!
//! Owns the single [`PumpState`] record, the relay and the interlocks, all
//! behind one [`TimedMutex`].  Every transition drives the relay before the
//! lock is released, so no observer can see `On` with a low relay or the
//! reverse.
//!
//! ## Lock bounds
//!
//! | Caller                  | Bound                            | On timeout        |
//! |-------------------------|----------------------------------|-------------------|
//! | commands, status        | `command_lock_timeout_ms` (1 s)  | `Error::Busy`     |
//! | supervisory check       | `command_lock_timeout_ms`        | `Error::Busy`     |
//! | volume feed             | `volume_feed_lock_timeout_ms`    | `Error::Busy`     |
//!
//! ## Stop policy
//!
//! An emergency stop, a failed interlock and the runtime ceiling all end in
//! the configured [`EmergencyStopPolicy`]: `Latch` leaves the pump in
//! `Error` until `reset()`, `ReturnToOff` goes straight to `Off`.

use std::time::Duration;

use log::{debug, error, info, warn};

use super::interlock::InterlockSet;
use super::relay::RelayPort;
use super::state::{
    Activation, Limits, PumpMode, PumpPhase, PumpState, RunReport, RunState, StatusReport,
    StopReason,
};
use crate::app::ports::{Clock, Timestamp};
use crate::config::{EmergencyStopPolicy, NodeConfig};
use crate::error::{Error, Result, SafetyFault};
use crate::sync::TimedMutex;

/// Result of one supervisory pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Supervision {
    /// Pump was not on; nothing evaluated.
    Idle,
    /// Pump is on and may keep running.
    Running(RunReport),
    /// The run ended normally.  `last` is the status just before the stop.
    Completed { reason: StopReason, last: StatusReport },
    /// A safety condition forced the stop.
    Tripped { fault: SafetyFault, last: StatusReport },
}

struct Inner<R> {
    state: PumpState,
    relay: R,
    interlocks: InterlockSet,
    /// Cumulative volume at the previous feed, for delta accounting.
    last_fed_liters: f64,
}

pub struct PumpController<R: RelayPort, C: Clock> {
    inner: TimedMutex<Inner<R>>,
    clock: C,
    limits: Limits,
    policy: EmergencyStopPolicy,
    command_timeout: Duration,
    feed_timeout: Duration,
}

impl<R: RelayPort, C: Clock> PumpController<R, C> {
    /// Create the controller in `Off`, enabled.  The relay is driven low.
    pub fn new(mut relay: R, interlocks: InterlockSet, clock: C, config: &NodeConfig) -> Result<Self> {
        relay.drive(false)?;
        info!(
            "PUMP | controller ready (max runtime {} ms, max volume {:.1} L, policy {:?}, {} interlocks)",
            config.max_runtime_ms,
            config.max_volume_liters,
            config.emergency_stop_policy,
            interlocks.len()
        );
        Ok(Self {
            inner: TimedMutex::new(Inner {
                state: PumpState::default(),
                relay,
                interlocks,
                last_fed_liters: 0.0,
            }),
            clock,
            limits: Limits {
                max_runtime_ms: config.max_runtime_ms,
                max_volume_liters: config.max_volume_liters,
            },
            policy: config.emergency_stop_policy,
            command_timeout: Duration::from_millis(config.command_lock_timeout_ms),
            feed_timeout: Duration::from_millis(config.volume_feed_lock_timeout_ms),
        })
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    pub fn policy(&self) -> EmergencyStopPolicy {
        self.policy
    }

    fn lock_for(&self, timeout: Duration, op: &str) -> Result<std::sync::MutexGuard<'_, Inner<R>>> {
        self.inner.lock_within(timeout).ok_or_else(|| {
            warn!("PUMP | {} rejected: controller busy", op);
            Error::Busy
        })
    }

    // ── Commands ──────────────────────────────────────────────

    /// Start the pump.  Parameters are validated before the lock is taken;
    /// a rejected request changes nothing.  Activating a running pump is a
    /// successful no-op and keeps the original start time.
    pub fn activate(&self, request: Activation) -> Result<StatusReport> {
        let mode = request.validate(&self.limits)?;
        let mut inner = self.lock_for(self.command_timeout, "activate")?;
        let now = self.clock.now_ms();

        match inner.state.phase {
            PumpPhase::Error(fault) => {
                warn!("PUMP | activate refused, latched error ({})", fault);
                return Err(Error::Latched);
            }
            PumpPhase::On(_) => {
                debug!("PUMP | activate ignored, already running");
                return Ok(StatusReport::capture(&inner.state, now));
            }
            PumpPhase::Off => {}
        }

        if !inner.state.enabled {
            warn!("SAFETY: activate refused, pump disabled");
            return Err(SafetyFault::PumpDisabled.into());
        }
        inner.interlocks.check_all()?;

        if let Err(e) = inner.relay.drive(true) {
            error!("PUMP | relay failed on activate: {}", e);
            // Best effort back to a known-low output; state stays Off.
            let _ = inner.relay.drive(false);
            return Err(e.into());
        }

        inner.state.phase = PumpPhase::On(RunState {
            mode,
            started_at: now,
            current_volume: 0.0,
        });
        match mode {
            PumpMode::Manual => info!("PUMP | ON (manual)"),
            PumpMode::Duration { duration_ms } => info!("PUMP | ON for {} ms", duration_ms),
            PumpMode::Volume { target_liters } => info!("PUMP | ON until {:.2} L", target_liters),
        }
        Ok(StatusReport::capture(&inner.state, now))
    }

    /// Stop a running pump.  No-op when not running.
    pub fn deactivate(&self) -> Result<StatusReport> {
        let mut inner = self.lock_for(self.command_timeout, "deactivate")?;
        let now = self.clock.now_ms();
        if matches!(inner.state.phase, PumpPhase::On(_)) {
            Self::stop(&mut inner, StopReason::Deactivated)?;
        }
        Ok(StatusReport::capture(&inner.state, now))
    }

    /// Drive the relay low unconditionally and apply the stop policy.
    ///
    /// Under `Latch` this latches `Error` even if the pump was already off.
    pub fn emergency_stop(&self) -> Result<StatusReport> {
        let mut inner = self.lock_for(self.command_timeout, "emergency stop")?;
        let now = self.clock.now_ms();
        Self::stop(&mut inner, StopReason::EmergencyStop)?;
        inner.state.phase = match self.policy {
            EmergencyStopPolicy::Latch => PumpPhase::Error(SafetyFault::EmergencyStop),
            EmergencyStopPolicy::ReturnToOff => PumpPhase::Off,
        };
        warn!("SAFETY: emergency stop ({:?})", self.policy);
        Ok(StatusReport::capture(&inner.state, now))
    }

    /// Clear a latched error.  No-op in any other state.
    pub fn reset(&self) -> Result<StatusReport> {
        let mut inner = self.lock_for(self.command_timeout, "reset")?;
        let now = self.clock.now_ms();
        if let PumpPhase::Error(fault) = inner.state.phase {
            // The relay is already low on every path into Error except a
            // stuck relay; try again before clearing.
            inner.relay.drive(false)?;
            inner.state.phase = PumpPhase::Off;
            info!("PUMP | error ({}) cleared by reset", fault);
        }
        Ok(StatusReport::capture(&inner.state, now))
    }

    pub fn status(&self) -> Result<StatusReport> {
        let inner = self.lock_for(self.command_timeout, "status")?;
        Ok(StatusReport::capture(&inner.state, self.clock.now_ms()))
    }

    pub fn enable(&self) -> Result<StatusReport> {
        let mut inner = self.lock_for(self.command_timeout, "enable")?;
        inner.state.enabled = true;
        info!("PUMP | enabled");
        Ok(StatusReport::capture(&inner.state, self.clock.now_ms()))
    }

    /// Disable the pump, stopping it if it is running.  A latched error
    /// stays latched.
    pub fn disable(&self) -> Result<StatusReport> {
        let mut inner = self.lock_for(self.command_timeout, "disable")?;
        inner.state.enabled = false;
        if matches!(inner.state.phase, PumpPhase::On(_)) {
            Self::stop(&mut inner, StopReason::Disabled)?;
        }
        info!("PUMP | disabled");
        Ok(StatusReport::capture(&inner.state, self.clock.now_ms()))
    }

    // ── Acquisition path ──────────────────────────────────────

    /// Feed the flow meter's cumulative volume.
    ///
    /// Only the increase since the previous feed counts toward a volume
    /// run, so a feed lost to a busy lock is made up by the next one.  A
    /// total lower than the last feed means the meter was reset.
    pub fn update_volume(&self, cumulative_liters: f64) -> Result<()> {
        let mut inner = self.inner.lock_within(self.feed_timeout).ok_or(Error::Busy)?;
        let delta = if cumulative_liters >= inner.last_fed_liters {
            cumulative_liters - inner.last_fed_liters
        } else {
            cumulative_liters
        };
        inner.last_fed_liters = cumulative_liters;
        if let PumpPhase::On(run) = &mut inner.state.phase {
            if let PumpMode::Volume { .. } = run.mode {
                run.current_volume += delta;
            }
        }
        Ok(())
    }

    // ── Supervision ───────────────────────────────────────────

    /// One supervisory pass: interlocks, mode termination, runtime ceiling,
    /// in that order.  Does nothing unless the pump is on.
    pub fn supervise(&self) -> Result<Supervision> {
        let mut inner = self.lock_for(self.command_timeout, "supervise")?;
        let now = self.clock.now_ms();
        let PumpPhase::On(run) = inner.state.phase else {
            return Ok(Supervision::Idle);
        };
        let last = StatusReport::capture(&inner.state, now);

        let safety = if inner.state.enabled {
            inner.interlocks.check_all()
        } else {
            Err(SafetyFault::PumpDisabled)
        };
        if let Err(fault) = safety {
            self.trip(&mut inner, fault)?;
            return Ok(Supervision::Tripped { fault, last });
        }

        let runtime = run.runtime_ms(now);
        let finished = match run.mode {
            PumpMode::Duration { duration_ms } => {
                (runtime >= duration_ms).then_some(StopReason::DurationElapsed)
            }
            PumpMode::Volume { target_liters } => {
                (run.current_volume >= target_liters).then_some(StopReason::TargetVolumeReached)
            }
            PumpMode::Manual => None,
        };
        if let Some(reason) = finished {
            Self::stop(&mut inner, reason)?;
            return Ok(Supervision::Completed { reason, last });
        }

        if runtime >= self.limits.max_runtime_ms {
            error!("SAFETY: runtime ceiling reached after {} ms", runtime);
            self.trip(&mut inner, SafetyFault::RuntimeCeiling)?;
            return Ok(Supervision::Tripped {
                fault: SafetyFault::RuntimeCeiling,
                last,
            });
        }

        Ok(Supervision::Running(RunReport {
            mode: run.mode,
            runtime_ms: runtime,
            current_volume: run.current_volume,
        }))
    }

    // ── Internal ──────────────────────────────────────────────

    /// Relay low, then `Off`.  A relay that refuses to go low latches
    /// `Error` regardless of policy.
    fn stop(inner: &mut Inner<R>, reason: StopReason) -> Result<()> {
        if let Err(e) = inner.relay.drive(false) {
            error!("SAFETY: relay stuck on stop ({}): {}", reason, e);
            inner.state.phase = PumpPhase::Error(SafetyFault::RelayStuck);
            return Err(e.into());
        }
        inner.state.phase = PumpPhase::Off;
        info!("PUMP | OFF ({})", reason);
        Ok(())
    }

    /// Forced stop under the configured policy.
    fn trip(&self, inner: &mut Inner<R>, fault: SafetyFault) -> Result<()> {
        Self::stop(inner, StopReason::Safety(fault))?;
        if self.policy == EmergencyStopPolicy::Latch {
            inner.state.phase = PumpPhase::Error(fault);
            warn!("SAFETY: latched error ({}), reset required", fault);
        }
        Ok(())
    }

    /// Relay level as last driven.  Diagnostic only.
    pub fn relay_is_on(&self) -> Result<bool> {
        let inner = self.lock_for(self.command_timeout, "relay query")?;
        Ok(inner.relay.is_on())
    }

    /// Timestamp from the controller's clock.
    pub fn now_ms(&self) -> Timestamp {
        self.clock.now_ms()
    }
}
