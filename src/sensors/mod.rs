//! Sensor subsystem: individual drivers and the aggregating [`AcquisitionHub`].
//!
//! The hub owns the environmental sensors and the flow meter and produces
//! one [`SensorSnapshot`] per acquisition cycle.

pub mod environment;
pub mod flow;
pub mod pulse;

use log::debug;

use crate::app::ports::Timestamp;
use crate::error::Result;
use crate::snapshot::SensorSnapshot;
use environment::{EnvironmentPort, SoilMoisture};
use flow::{FlowInput, FlowMeter, FlowRequests};

/// Aggregates all sensor drivers and produces a unified snapshot.
pub struct AcquisitionHub<E: EnvironmentPort, I: FlowInput> {
    environment: E,
    flow: FlowMeter<I>,
    last: SensorSnapshot,
}

impl<E: EnvironmentPort, I: FlowInput> AcquisitionHub<E, I> {
    pub fn new(environment: E, flow: FlowMeter<I>) -> Self {
        Self {
            environment,
            flow,
            last: SensorSnapshot::default(),
        }
    }

    /// Bind the flow input.  Call once before the first [`read_all`](Self::read_all).
    pub fn start(&mut self, now: Timestamp) -> Result<()> {
        self.flow.start(now)
    }

    /// Read every sensor and return a unified snapshot.
    ///
    /// Individual read failures are logged and the previous good value is
    /// retained; a single flaky sensor must not stall acquisition.
    pub fn read_all(&mut self, now: Timestamp) -> SensorSnapshot {
        let env = self.environment.read();
        let flow = self.flow.poll(now);

        let mut snap = self.last;
        keep_or_replace(&mut snap.air_temperature_c, env.air_temperature_c, "air temperature");
        keep_or_replace(&mut snap.air_humidity_pct, env.air_humidity_pct, "air humidity");
        keep_or_replace(&mut snap.soil_temperature_c, env.soil_temperature_c, "soil temperature");
        keep_or_replace(&mut snap.soil_moisture_raw, env.soil_moisture_raw, "soil moisture");
        if let Some(raw) = snap.soil_moisture_raw {
            snap.soil_moisture = SoilMoisture::classify(raw);
        }
        snap.flow_rate_lpm = flow.rate_liters_per_minute;
        snap.cumulative_volume_liters = self.flow.total_liters();
        snap.captured_at = now;

        self.last = snap;
        snap
    }

    /// Apply pending strategy switch and volume reset requests.
    pub fn apply_flow_requests(&mut self, requests: &FlowRequests, now: Timestamp) -> Result<()> {
        self.flow.apply(requests, now)
    }
}

fn keep_or_replace<T>(slot: &mut Option<T>, fresh: Option<T>, what: &str) {
    match fresh {
        Some(v) => *slot = Some(v),
        None => debug!("SENSOR | {} read failed, keeping previous value", what),
    }
}
