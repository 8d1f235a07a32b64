//! Supervisor task: the pump's periodic safety check.
//!
//! Turns each [`Supervision`] outcome into node events and feeds the task
//! watchdog on every pass, whatever the outcome.

use std::sync::Arc;

use log::{debug, error, info};

use super::cadence::Cadence;
use crate::app::events::NodeEvent;
use crate::app::ports::{Clock, EventSink};
use crate::drivers::watchdog::Watchdog;
use crate::error::Error;
use crate::pump::controller::Supervision;
use crate::pump::relay::RelayPort;
use crate::pump::state::{StatusReport, StopReason};
use crate::pump::PumpController;

pub struct SupervisorTask<R: RelayPort, C: Clock, S: EventSink> {
    pump: Arc<PumpController<R, C>>,
    sink: S,
    watchdog: Option<Watchdog>,
    period_ms: u64,
    was_running: bool,
    busy_passes: u32,
}

impl<R: RelayPort, C: Clock, S: EventSink> SupervisorTask<R, C, S> {
    pub fn new(pump: Arc<PumpController<R, C>>, sink: S, period_ms: u64) -> Self {
        Self {
            pump,
            sink,
            watchdog: None,
            period_ms,
            was_running: false,
            busy_passes: 0,
        }
    }

    /// Feed `watchdog` on every pass.  Subscribe it from the task's own
    /// thread: the TWDT tracks the calling task.
    pub fn with_watchdog(mut self, watchdog: Watchdog) -> Self {
        self.watchdog = Some(watchdog);
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Passes skipped because the controller lock was held too long.
    pub fn busy_passes(&self) -> u32 {
        self.busy_passes
    }

    /// One supervisory pass.  `None` when the check could not run.
    pub fn run_once(&mut self) -> Option<Supervision> {
        let outcome = match self.pump.supervise() {
            Ok(outcome) => Some(outcome),
            Err(Error::Busy) => {
                self.busy_passes = self.busy_passes.wrapping_add(1);
                debug!("SAFETY: supervisory pass skipped, controller busy");
                None
            }
            Err(e) => {
                error!("SAFETY: supervisory pass failed: {}", e);
                self.was_running = false;
                None
            }
        };

        match outcome {
            Some(Supervision::Idle) => self.was_running = false,
            Some(Supervision::Running(run)) => {
                if !self.was_running {
                    self.sink.emit(&NodeEvent::PumpStarted(run.mode));
                }
                self.was_running = true;
            }
            Some(Supervision::Completed { reason, last }) => {
                self.emit_stopped(reason, &last);
            }
            Some(Supervision::Tripped { fault, last }) => {
                self.sink.emit(&NodeEvent::SafetyTrip(fault));
                self.emit_stopped(StopReason::Safety(fault), &last);
            }
            None => {}
        }

        if let Some(wd) = self.watchdog.as_mut() {
            wd.feed();
        }
        outcome
    }

    fn emit_stopped(&mut self, reason: StopReason, last: &StatusReport) {
        let runtime_ms = last.run.map_or(0, |run| run.runtime_ms);
        self.sink.emit(&NodeEvent::PumpStopped { reason, runtime_ms });
        self.was_running = false;
    }

    /// Run forever at the configured cadence.
    pub fn run(mut self) -> ! {
        let mut cadence = Cadence::new("supervise", self.period_ms, self.pump.now_ms());
        info!("TASK | supervision running every {} ms", cadence.period_ms());
        loop {
            self.run_once();
            let wait = cadence.next_wait(self.pump.now_ms());
            std::thread::sleep(wait);
        }
    }
}
