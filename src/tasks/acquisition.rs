//! Acquisition task: one pass per cadence tick.
//!
//! ```text
//!   link probe ─▶ flow requests ─▶ sensors ─▶ snapshot publish
//!              ─▶ pump volume feed ─▶ telemetry
//! ```

use std::sync::Arc;

use log::{debug, info, warn};

use super::cadence::Cadence;
use crate::adapters::wifi::LinkMonitor;
use crate::app::events::NodeEvent;
use crate::app::ports::{Clock, EventSink};
use crate::error::{Error, Result};
use crate::pump::relay::RelayPort;
use crate::pump::PumpController;
use crate::sensors::environment::EnvironmentPort;
use crate::sensors::flow::{FlowInput, FlowRequests};
use crate::sensors::AcquisitionHub;
use crate::snapshot::{SensorSnapshot, SnapshotWriter};

pub struct AcquisitionTask<E, I, R, C, S>
where
    E: EnvironmentPort,
    I: FlowInput,
    R: RelayPort,
    C: Clock,
    S: EventSink,
{
    hub: AcquisitionHub<E, I>,
    writer: SnapshotWriter,
    pump: Arc<PumpController<R, C>>,
    link: Option<LinkMonitor>,
    flow_requests: Option<Arc<FlowRequests>>,
    sink: S,
    period_ms: u64,
    cycles: u64,
}

impl<E, I, R, C, S> AcquisitionTask<E, I, R, C, S>
where
    E: EnvironmentPort,
    I: FlowInput,
    R: RelayPort,
    C: Clock,
    S: EventSink,
{
    pub fn new(
        hub: AcquisitionHub<E, I>,
        writer: SnapshotWriter,
        pump: Arc<PumpController<R, C>>,
        sink: S,
        period_ms: u64,
    ) -> Self {
        Self {
            hub,
            writer,
            pump,
            link: None,
            flow_requests: None,
            sink,
            period_ms,
            cycles: 0,
        }
    }

    /// Also poll the WiFi link on every pass.
    pub fn with_link_monitor(mut self, monitor: LinkMonitor) -> Self {
        self.link = Some(monitor);
        self
    }

    /// Apply flow meter requests posted by other tasks on every pass.
    pub fn with_flow_requests(mut self, requests: Arc<FlowRequests>) -> Self {
        self.flow_requests = Some(requests);
        self
    }

    /// Bind the flow input.
    pub fn start(&mut self) -> Result<()> {
        self.hub.start(self.pump.now_ms())
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn link_monitor_mut(&mut self) -> Option<&mut LinkMonitor> {
        self.link.as_mut()
    }

    /// One acquisition pass.  Failures are logged; the pass always
    /// completes and returns the snapshot it produced.
    pub fn run_once(&mut self) -> SensorSnapshot {
        let now = self.pump.now_ms();
        if let Some(link) = self.link.as_mut() {
            link.poll(now);
        }

        if let Some(requests) = self.flow_requests.as_deref() {
            if let Err(e) = self.hub.apply_flow_requests(requests, now) {
                warn!("FLOW | request failed: {}", e);
            }
        }

        let snapshot = self.hub.read_all(now);

        if let Err(e) = self.writer.publish(snapshot) {
            warn!("SNAPSHOT | publish skipped: {}", e);
        }

        match self.pump.update_volume(snapshot.cumulative_volume_liters) {
            Ok(()) => {}
            Err(Error::Busy) => debug!("PUMP | volume feed skipped, controller busy"),
            Err(e) => warn!("PUMP | volume feed failed: {}", e),
        }

        self.sink.emit(&NodeEvent::Reading(snapshot));
        self.cycles += 1;
        snapshot
    }

    /// Run forever at the configured cadence.
    pub fn run(mut self) -> ! {
        let mut cadence = Cadence::new("acquire", self.period_ms, self.pump.now_ms());
        info!("TASK | acquisition running every {} ms", cadence.period_ms());
        loop {
            self.run_once();
            let wait = cadence.next_wait(self.pump.now_ms());
            std::thread::sleep(wait);
        }
    }
}
