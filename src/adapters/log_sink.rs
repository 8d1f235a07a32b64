//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing node events to the ESP-IDF logger
//! (UART / USB-CDC in production).  The telemetry uploader would implement
//! the same trait.

use log::{info, warn};

use crate::app::events::NodeEvent;
use crate::app::ports::EventSink;

fn opt(v: Option<f32>) -> f32 {
    v.unwrap_or(f32::NAN)
}

/// Adapter that logs every [`NodeEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink {
    emitted: u32,
}

impl LogEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events logged so far.
    pub fn emitted(&self) -> u32 {
        self.emitted
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &NodeEvent) {
        self.emitted = self.emitted.wrapping_add(1);
        match event {
            NodeEvent::Reading(s) => {
                info!(
                    "TELEM | air={:.1}\u{00b0}C/{:.0}% | soil={:.1}\u{00b0}C {} ({}) | \
                     flow={:.2}L/min total={:.3}L | t={}ms",
                    opt(s.air_temperature_c),
                    opt(s.air_humidity_pct),
                    opt(s.soil_temperature_c),
                    s.soil_moisture,
                    s.soil_moisture_raw.map_or(-1, i32::from),
                    s.flow_rate_lpm,
                    s.cumulative_volume_liters,
                    s.captured_at,
                );
            }
            NodeEvent::PumpStarted(mode) => {
                info!("PUMP | started ({})", mode.label());
            }
            NodeEvent::PumpStopped { reason, runtime_ms } => {
                info!("PUMP | stopped: {} after {} ms", reason, runtime_ms);
            }
            NodeEvent::SafetyTrip(fault) => {
                warn!("SAFETY: trip: {}", fault);
            }
            NodeEvent::Started => {
                info!("START | periodic tasks running");
            }
        }
    }
}
