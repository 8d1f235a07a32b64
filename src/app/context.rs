//! Node context: everything the periodic tasks share, created once in
//! `main` and alive for the whole run.
//!
//! ```text
//!            ┌──────────────── NodeContext ────────────────┐
//!            │ pump (Arc)   pulse counter                  │
//!            │ snapshot writer (taken once) / reader       │
//!            │ flow requests (Arc)                         │
//!            └─────────────────────────────────────────────┘
//!               │                   │                 │
//!      acquisition task     supervisor task     control surface
//!                                               display task
//! ```
//!
//! The snapshot writer can be taken exactly once; readers are handed out
//! as clones.

use std::sync::Arc;
use std::time::Duration;

use log::info;

use crate::app::ports::Clock;
use crate::config::NodeConfig;
use crate::error::{Error, Result};
use crate::pump::interlock::InterlockSet;
use crate::pump::relay::RelayPort;
use crate::pump::PumpController;
use crate::sensors::flow::{FlowRequests, PulseCounter};
use crate::snapshot::{shared_snapshot, SnapshotReader, SnapshotWriter};

pub struct NodeContext<R: RelayPort, C: Clock> {
    pump: Arc<PumpController<R, C>>,
    counter: &'static PulseCounter,
    flow_requests: Arc<FlowRequests>,
    writer: Option<SnapshotWriter>,
    reader: SnapshotReader,
}

impl<R: RelayPort, C: Clock> NodeContext<R, C> {
    /// Validate `config`, build the controller (relay driven low) and the
    /// shared snapshot.
    pub fn new(
        config: &NodeConfig,
        relay: R,
        interlocks: InterlockSet,
        clock: C,
        counter: &'static PulseCounter,
    ) -> Result<Self> {
        config.validate()?;
        let pump = Arc::new(PumpController::new(relay, interlocks, clock, config)?);
        let (writer, reader) = shared_snapshot(Duration::from_millis(config.snapshot_read_timeout_ms));
        info!(
            "CTX | node context ready (acquire every {} ms, supervise every {} ms)",
            config.acquisition_interval_ms, config.supervisor_interval_ms
        );
        Ok(Self {
            pump,
            counter,
            flow_requests: Arc::new(FlowRequests::new()),
            writer: Some(writer),
            reader,
        })
    }

    pub fn pump(&self) -> Arc<PumpController<R, C>> {
        Arc::clone(&self.pump)
    }

    pub fn counter(&self) -> &'static PulseCounter {
        self.counter
    }

    /// Shared with the acquisition task, which applies the requests.
    pub fn flow_requests(&self) -> Arc<FlowRequests> {
        Arc::clone(&self.flow_requests)
    }

    /// A new reader on the shared snapshot.
    pub fn reader(&self) -> SnapshotReader {
        self.reader.clone()
    }

    /// The single snapshot writer.  A second call fails.
    pub fn take_writer(&mut self) -> Result<SnapshotWriter> {
        self.writer.take().ok_or(Error::Init("snapshot writer already taken"))
    }
}
