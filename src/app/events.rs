//! Outbound node events.
//!
//! The periodic tasks emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other side
//! decide what to do with them: log to serial, feed the telemetry
//! aggregator, refresh the display.

use crate::error::SafetyFault;
use crate::pump::state::{PumpMode, StatusReport, StopReason};
use crate::snapshot::SensorSnapshot;

/// Structured events emitted by the node core.
#[derive(Debug, Clone, Copy)]
pub enum NodeEvent {
    /// One acquisition cycle's snapshot.
    Reading(SensorSnapshot),

    /// The pump was switched on.
    PumpStarted(PumpMode),

    /// The pump stopped on its own (deadline, target volume, ceiling).
    PumpStopped { reason: StopReason, runtime_ms: u64 },

    /// A safety interlock forced the pump off.
    SafetyTrip(SafetyFault),

    /// Tasks are up.
    Started,
}

/// One refresh of the status display: a copied-out snapshot and pump status.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayFrame {
    pub snapshot: SensorSnapshot,
    pub pump: StatusReport,
}
