//! Console status display.
//!
//! Implements [`StatusDisplay`] by rendering each frame as one log line.
//! A frame whose text matches the previous one is not logged again, so a
//! fast display cadence does not flood the console.  A panel driver would
//! implement the same trait.

use core::fmt::{self, Write};

use log::{debug, info};

use crate::app::events::DisplayFrame;
use crate::app::ports::StatusDisplay;

type Text = heapless::String<192>;

/// Adapter that logs display frames to the serial console.
#[derive(Default)]
pub struct LogDisplay {
    last: Text,
    shown: u32,
}

impl LogDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames actually written out.
    pub fn shown(&self) -> u32 {
        self.shown
    }

    /// Text of the last frame written out.
    pub fn last_text(&self) -> &str {
        &self.last
    }
}

/// `PUMP: ON (12s) | Runtime: 8s | air 24.0C 70% | soil wet 19.5C | flow 1.20 L/min 3.40 L`
pub fn render(frame: &DisplayFrame, out: &mut impl Write) -> fmt::Result {
    let s = &frame.snapshot;
    write!(out, "{} | {} | air ", frame.pump, frame.pump.details())?;
    match (s.air_temperature_c, s.air_humidity_pct) {
        (Some(t), Some(h)) => write!(out, "{t:.1}C {h:.0}%")?,
        _ => out.write_str("--")?,
    }
    write!(out, " | soil {}", s.soil_moisture)?;
    if let Some(t) = s.soil_temperature_c {
        write!(out, " {t:.1}C")?;
    }
    write!(out, " | flow {:.2} L/min {:.2} L", s.flow_rate_lpm, s.cumulative_volume_liters)
}

impl StatusDisplay for LogDisplay {
    fn show(&mut self, frame: &DisplayFrame) {
        let mut text = Text::new();
        if render(frame, &mut text).is_err() {
            debug!("DISPLAY | line truncated");
        }
        if text == self.last {
            return;
        }
        info!("DISPLAY | {}", text);
        self.last = text;
        self.shown = self.shown.wrapping_add(1);
    }
}
