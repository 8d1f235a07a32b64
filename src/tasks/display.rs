//! Display task: the read-only consumer of the shared snapshot.
//!
//! Each pass copies the snapshot out with the reader's bounded wait, takes
//! the pump status and hands both to the [`StatusDisplay`].  When the
//! controller is busy the previous status is shown again.

use std::sync::Arc;

use log::{debug, info, warn};

use super::cadence::Cadence;
use crate::app::events::DisplayFrame;
use crate::app::ports::{Clock, StatusDisplay};
use crate::error::Error;
use crate::pump::relay::RelayPort;
use crate::pump::state::StatusReport;
use crate::pump::PumpController;
use crate::snapshot::SnapshotReader;

pub struct DisplayTask<R: RelayPort, C: Clock, D: StatusDisplay> {
    pump: Arc<PumpController<R, C>>,
    reader: SnapshotReader,
    display: D,
    period_ms: u64,
    last_status: Option<StatusReport>,
    frames: u64,
}

impl<R: RelayPort, C: Clock, D: StatusDisplay> DisplayTask<R, C, D> {
    pub fn new(pump: Arc<PumpController<R, C>>, reader: SnapshotReader, display: D, period_ms: u64) -> Self {
        Self {
            pump,
            reader,
            display,
            period_ms,
            last_status: None,
            frames: 0,
        }
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// One refresh.  `None` when there is no pump status to show yet.
    pub fn run_once(&mut self) -> Option<DisplayFrame> {
        let snapshot = self.reader.read_copy();
        let pump = match self.pump.status() {
            Ok(report) => report,
            Err(Error::Busy) => {
                debug!("DISPLAY | controller busy, showing previous status");
                self.last_status?
            }
            Err(e) => {
                warn!("DISPLAY | status failed: {}", e);
                return None;
            }
        };
        self.last_status = Some(pump);

        let frame = DisplayFrame { snapshot, pump };
        self.display.show(&frame);
        self.frames += 1;
        Some(frame)
    }

    /// Run forever at the configured cadence.
    pub fn run(mut self) -> ! {
        let mut cadence = Cadence::new("display", self.period_ms, self.pump.now_ms());
        info!("TASK | display running every {} ms", cadence.period_ms());
        loop {
            self.run_once();
            let wait = cadence.next_wait(self.pump.now_ms());
            std::thread::sleep(wait);
        }
    }
}
