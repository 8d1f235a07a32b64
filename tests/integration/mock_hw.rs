//! Mock hardware adapters for integration tests.
//!
//! The relay records every drive so tests can assert on the full output
//! history after the relay has been moved into the controller.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use std::sync::{Arc, Mutex};

use irrigation_node::adapters::time::ManualClock;
use irrigation_node::app::events::{DisplayFrame, NodeEvent};
use irrigation_node::app::ports::{EventSink, StatusDisplay};
use irrigation_node::config::NodeConfig;
use irrigation_node::error::{ActuatorError, Result};
use irrigation_node::pump::interlock::{ConnectivityInterlock, InterlockSet, LinkStatus};
use irrigation_node::pump::relay::RelayPort;
use irrigation_node::pump::PumpController;
use irrigation_node::sensors::environment::{EnvironmentPort, EnvironmentReading};
use irrigation_node::sensors::flow::{FlowInput, PulseCounter};
use irrigation_node::sensors::pulse::PulsePeriod;

// ── Relay ─────────────────────────────────────────────────────

/// Shared view of a [`RecordingRelay`]'s history and failure switches.
#[derive(Clone, Default)]
pub struct RelayLog {
    drives: Arc<Mutex<Vec<bool>>>,
    fail_on: Arc<AtomicBool>,
    fail_off: Arc<AtomicBool>,
    delay_ms: Arc<AtomicU64>,
}

impl RelayLog {
    pub fn drives(&self) -> Vec<bool> {
        self.drives.lock().unwrap().clone()
    }

    /// Output level after the last successful drive.
    pub fn level(&self) -> bool {
        self.drives.lock().unwrap().last().copied().unwrap_or(false)
    }

    /// Low→high transitions since construction.
    pub fn rising_edges(&self) -> usize {
        let drives = self.drives.lock().unwrap();
        let mut prev = false;
        let mut edges = 0;
        for &d in drives.iter() {
            if d && !prev {
                edges += 1;
            }
            prev = d;
        }
        edges
    }

    pub fn fail_on(&self, fail: bool) {
        self.fail_on.store(fail, Ordering::SeqCst);
    }

    pub fn fail_off(&self, fail: bool) {
        self.fail_off.store(fail, Ordering::SeqCst);
    }

    /// Make every drive take `ms`, holding the controller lock meanwhile.
    pub fn slow_down(&self, ms: u64) {
        self.delay_ms.store(ms, Ordering::SeqCst);
    }
}

pub struct RecordingRelay {
    log: RelayLog,
    on: bool,
}

impl RecordingRelay {
    pub fn new() -> (Self, RelayLog) {
        let log = RelayLog::default();
        (Self { log: log.clone(), on: false }, log)
    }
}

impl RelayPort for RecordingRelay {
    fn drive(&mut self, on: bool) -> core::result::Result<(), ActuatorError> {
        let delay = self.log.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        let failing = if on { &self.log.fail_on } else { &self.log.fail_off };
        if failing.load(Ordering::SeqCst) {
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.log.drives.lock().unwrap().push(on);
        self.on = on;
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct CollectingSink {
    pub events: Vec<NodeEvent>,
}

impl EventSink for CollectingSink {
    fn emit(&mut self, event: &NodeEvent) {
        self.events.push(*event);
    }
}

// ── Display ───────────────────────────────────────────────────

#[derive(Default)]
pub struct CollectingDisplay {
    pub frames: Vec<DisplayFrame>,
}

impl StatusDisplay for CollectingDisplay {
    fn show(&mut self, frame: &DisplayFrame) {
        self.frames.push(*frame);
    }
}

// ── Sensors ───────────────────────────────────────────────────

/// Returns the same reading every time.
pub struct FixedEnvironment(pub EnvironmentReading);

impl EnvironmentPort for FixedEnvironment {
    fn read(&mut self) -> EnvironmentReading {
        self.0
    }
}

/// Edge-interrupt input whose pulses the test injects on the counter.
#[derive(Default)]
pub struct InjectedFlow {
    pub attached: bool,
    pub period: Option<PulsePeriod>,
}

impl FlowInput for InjectedFlow {
    fn attach_edge_interrupt(&mut self, _counter: &'static PulseCounter) -> Result<()> {
        self.attached = true;
        Ok(())
    }

    fn detach_edge_interrupt(&mut self) {
        self.attached = false;
    }

    fn measure_pulse_width(&mut self, _timeout_us: u64) -> Option<PulsePeriod> {
        self.period
    }
}

pub fn leak_counter() -> &'static PulseCounter {
    Box::leak(Box::new(PulseCounter::new()))
}

// ── Controller rig ────────────────────────────────────────────

pub type TestPump = PumpController<RecordingRelay, ManualClock>;

pub struct Rig {
    pub pump: Arc<TestPump>,
    pub relay: RelayLog,
    pub clock: ManualClock,
    pub link: LinkStatus,
}

/// Controller with a connectivity interlock (link up) and a manual clock
/// at zero.
pub fn rig(config: &NodeConfig) -> Rig {
    let (relay, log) = RecordingRelay::new();
    let clock = ManualClock::new(0);
    let link = LinkStatus::new(true);
    let interlocks = InterlockSet::new()
        .with(ConnectivityInterlock::new(link.clone()))
        .unwrap();
    let pump = PumpController::new(relay, interlocks, clock.clone(), config).unwrap();
    Rig {
        pump: Arc::new(pump),
        relay: log,
        clock,
        link,
    }
}
