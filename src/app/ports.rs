//! Port traits: the boundary between the node's core and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ PumpController / tasks (core)
//! ```
//!
//! Driven adapters (clock, event sinks, status display) implement these traits; the core
//! consumes them via generics so it never touches hardware directly.  The
//! hardware-facing ports live next to their consumers:
//! [`FlowInput`](crate::sensors::flow::FlowInput),
//! [`EnvironmentPort`](crate::sensors::environment::EnvironmentPort),
//! [`RelayPort`](crate::pump::relay::RelayPort) and
//! [`LinkProbe`](crate::pump::interlock::LinkProbe).

use super::events::{DisplayFrame, NodeEvent};

/// Milliseconds on the node's monotonic clock.
pub type Timestamp = u64;

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond clock shared by the tasks and the controller.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> Timestamp;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> Timestamp {
        (**self).now_ms()
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now_ms(&self) -> Timestamp {
        (**self).now_ms()
    }
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: core → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The core emits structured [`NodeEvent`]s through this port.  Adapters
/// decide where they go (serial log, telemetry aggregator, ...).
pub trait EventSink {
    fn emit(&mut self, event: &NodeEvent);
}

// ───────────────────────────────────────────────────────────────
// Status display port (driven adapter: core → screen / console)
// ───────────────────────────────────────────────────────────────

/// Renders [`DisplayFrame`]s.  Called from the display task only.
pub trait StatusDisplay {
    fn show(&mut self, frame: &DisplayFrame);
}
