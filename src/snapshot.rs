//! The shared sensor snapshot.
//!
//! One [`SensorSnapshot`] record sits behind a [`TimedMutex`].  The
//! acquisition task holds the only [`SnapshotWriter`]; every other consumer
//! gets a [`SnapshotReader`] and only ever sees copied-out values.  Readers
//! wait a bounded time for the lock and fall back to their last good copy,
//! so a slow writer can never stall the display or control path.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use crate::app::ports::Timestamp;
use crate::error::{Error, Result};
use crate::sensors::environment::SoilMoisture;
use crate::sync::TimedMutex;

/// One consistent set of sensor values.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SensorSnapshot {
    pub air_temperature_c: Option<f32>,
    pub air_humidity_pct: Option<f32>,
    pub soil_temperature_c: Option<f32>,
    pub soil_moisture_raw: Option<u16>,
    pub soil_moisture: SoilMoisture,
    pub flow_rate_lpm: f64,
    pub cumulative_volume_liters: f64,
    pub captured_at: Timestamp,
}

/// The lock-protected record both ends point at.
pub type SharedSnapshot = Arc<TimedMutex<SensorSnapshot>>;

/// Create the shared record and its two ends.
///
/// `timeout` bounds every lock acquisition on either side.
pub fn shared_snapshot(timeout: Duration) -> (SnapshotWriter, SnapshotReader) {
    let cell: SharedSnapshot = Arc::new(TimedMutex::new(SensorSnapshot::default()));
    let writer = SnapshotWriter {
        cell: Arc::clone(&cell),
        timeout,
    };
    let reader = SnapshotReader {
        cell,
        timeout,
        last: SensorSnapshot::default(),
        stale_reads: 0,
    };
    (writer, reader)
}

/// Write end.  Deliberately not `Clone`: there is exactly one writer.
pub struct SnapshotWriter {
    cell: SharedSnapshot,
    timeout: Duration,
}

impl SnapshotWriter {
    /// Replace every field in one critical section.
    pub fn publish(&mut self, snapshot: SensorSnapshot) -> Result<()> {
        let Some(mut guard) = self.cell.lock_within(self.timeout) else {
            warn!("SNAPSHOT | publish skipped, lock busy");
            return Err(Error::Busy);
        };
        *guard = snapshot;
        Ok(())
    }
}

/// Read end.  Each clone keeps its own fallback copy.
#[derive(Clone)]
pub struct SnapshotReader {
    cell: SharedSnapshot,
    timeout: Duration,
    last: SensorSnapshot,
    stale_reads: u32,
}

impl SnapshotReader {
    /// Copy out the current snapshot, or the last good copy if the lock is
    /// not available within the bound.
    pub fn read_copy(&mut self) -> SensorSnapshot {
        match self.cell.lock_within(self.timeout) {
            Some(guard) => {
                self.last = *guard;
            }
            None => {
                self.stale_reads = self.stale_reads.wrapping_add(1);
                debug!("SNAPSHOT | lock busy, serving stale copy");
            }
        }
        self.last
    }

    /// Number of reads that fell back to the previous copy.
    pub fn stale_reads(&self) -> u32 {
        self.stale_reads
    }
}
