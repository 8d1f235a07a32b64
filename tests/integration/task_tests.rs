//! Acquisition and supervisor tasks driven one pass at a time.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use irrigation_node::adapters::wifi::LinkMonitor;
use irrigation_node::app::events::NodeEvent;
use irrigation_node::config::NodeConfig;
use irrigation_node::error::{Error, SafetyFault};
use irrigation_node::pump::interlock::LinkProbe;
use irrigation_node::pump::{Activation, PumpStatus, StopReason, Supervision};
use irrigation_node::sensors::environment::{EnvironmentReading, SoilMoisture};
use irrigation_node::sensors::flow::{FlowMeter, FlowRequests, PulseCounter};
use irrigation_node::sensors::AcquisitionHub;
use irrigation_node::snapshot::{shared_snapshot, SnapshotReader};
use irrigation_node::tasks::{AcquisitionTask, DisplayTask, SupervisorTask};

use crate::mock_hw::{
    leak_counter, rig, CollectingDisplay, CollectingSink, FixedEnvironment, InjectedFlow, RecordingRelay, Rig,
};

type Acq = AcquisitionTask<
    FixedEnvironment,
    InjectedFlow,
    RecordingRelay,
    irrigation_node::adapters::time::ManualClock,
    CollectingSink,
>;

const GREENHOUSE: EnvironmentReading = EnvironmentReading {
    air_temperature_c: Some(24.0),
    air_humidity_pct: Some(70.0),
    soil_temperature_c: Some(19.5),
    soil_moisture_raw: Some(1800),
};

fn acquisition(r: &Rig) -> (Acq, SnapshotReader, &'static PulseCounter) {
    let config = NodeConfig::default();
    let counter = leak_counter();
    let hub = AcquisitionHub::new(
        FixedEnvironment(GREENHOUSE),
        FlowMeter::new(InjectedFlow::default(), counter, &config),
    );
    let (writer, reader) = shared_snapshot(Duration::from_millis(10));
    let mut task = AcquisitionTask::new(
        hub,
        writer,
        Arc::clone(&r.pump),
        CollectingSink::default(),
        config.acquisition_interval_ms,
    );
    task.start().unwrap();
    (task, reader, counter)
}

fn pulses(counter: &PulseCounter, n: u32) {
    for _ in 0..n {
        counter.on_pulse();
    }
}

#[test]
fn pass_publishes_snapshot_and_emits_reading() {
    let r = rig(&NodeConfig::default());
    let (mut task, mut reader, counter) = acquisition(&r);

    r.clock.advance(1_000);
    pulses(counter, 75); // (75 / 7.5) * (60 / 1 s) = 600 L/min
    let snap = task.run_once();

    assert!((snap.flow_rate_lpm - 600.0).abs() < 1e-9);
    assert_eq!(snap.soil_moisture, SoilMoisture::Wet);
    assert_eq!(snap.captured_at, 1_000);
    assert_eq!(reader.read_copy(), snap);
    assert_eq!(task.cycles(), 1);
    assert!(matches!(task.sink().events.as_slice(), [NodeEvent::Reading(_)]));
}

#[test]
fn flow_drives_volume_run_to_completion() {
    let r = rig(&NodeConfig::default());
    let (mut task, _reader, counter) = acquisition(&r);
    let mut supervisor = SupervisorTask::new(Arc::clone(&r.pump), CollectingSink::default(), 100);

    r.pump.activate(Activation::VolumeLiters(1.5)).unwrap();

    // 450 pulses in one second at 7.5 pulses per L/min is one liter.
    r.clock.advance(1_000);
    pulses(counter, 450);
    let snap = task.run_once();
    assert!((snap.cumulative_volume_liters - 1.0).abs() < 1e-9);
    assert!(matches!(supervisor.run_once(), Some(Supervision::Running(_))));

    r.clock.advance(1_000);
    pulses(counter, 450);
    task.run_once();
    match supervisor.run_once() {
        Some(Supervision::Completed { reason, last }) => {
            assert_eq!(reason, StopReason::TargetVolumeReached);
            assert!(last.run.unwrap().current_volume >= 1.5);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!r.relay.level());

    let events = &supervisor.sink().events;
    assert!(matches!(events[0], NodeEvent::PumpStarted(_)));
    assert!(matches!(
        events[1],
        NodeEvent::PumpStopped { reason: StopReason::TargetVolumeReached, runtime_ms: 2_000 }
    ));
}

#[test]
fn link_monitor_feeds_connectivity_interlock() {
    let r = rig(&NodeConfig::default());
    r.link.set_connected(false);
    let (task, _reader, _counter) = acquisition(&r);
    let mut task = task.with_link_monitor(LinkMonitor::new(r.link.clone()));

    task.run_once();
    assert!(r.link.is_connected());
    r.pump.activate(Activation::Manual).unwrap();

    task.link_monitor_mut().unwrap().set_sim_station_up(false);
    r.clock.advance(1_000);
    task.run_once();

    let mut supervisor = SupervisorTask::new(Arc::clone(&r.pump), CollectingSink::default(), 100);
    assert!(matches!(
        supervisor.run_once(),
        Some(Supervision::Tripped { fault: SafetyFault::LinkDown, .. })
    ));
    assert!(matches!(supervisor.sink().events[0], NodeEvent::SafetyTrip(SafetyFault::LinkDown)));
    assert_eq!(r.pump.reset().map(|_| ()), Ok(()));
    assert_eq!(
        r.pump.activate(Activation::Manual).map(|_| ()),
        Err(Error::Safety(SafetyFault::LinkDown))
    );
}

#[test]
fn queued_flow_reset_clears_the_total() {
    let r = rig(&NodeConfig::default());
    let (task, _reader, counter) = acquisition(&r);
    let requests = Arc::new(FlowRequests::new());
    let mut task = task.with_flow_requests(Arc::clone(&requests));

    r.clock.advance(1_000);
    pulses(counter, 450);
    assert!((task.run_once().cumulative_volume_liters - 1.0).abs() < 1e-9);

    requests.request_reset();
    r.clock.advance(1_000);
    let snap = task.run_once();
    assert_eq!(snap.cumulative_volume_liters, 0.0);
    assert!(!requests.take_reset());
}

#[test]
fn display_shows_published_snapshot_with_pump_status() {
    let r = rig(&NodeConfig::default());
    let (mut task, reader, counter) = acquisition(&r);
    let mut display = DisplayTask::new(Arc::clone(&r.pump), reader, CollectingDisplay::default(), 500);

    r.clock.advance(1_000);
    pulses(counter, 75);
    let snap = task.run_once();
    let frame = display.run_once().expect("status available");
    assert_eq!(frame.snapshot, snap);
    assert_eq!(frame.pump.status, PumpStatus::Off);

    r.pump.activate(Activation::Manual).unwrap();
    let frame = display.run_once().expect("status available");
    assert_eq!(frame.pump.status, PumpStatus::On);
    assert_eq!(display.frames(), 2);
    assert_eq!(display.display().frames.len(), 2);
}

#[test]
fn display_repeats_last_status_while_controller_is_busy() {
    let config = NodeConfig {
        command_lock_timeout_ms: 20,
        ..NodeConfig::default()
    };
    let r = rig(&config);
    let (_writer, reader) = shared_snapshot(Duration::from_millis(10));
    let mut display = DisplayTask::new(Arc::clone(&r.pump), reader, CollectingDisplay::default(), 500);
    assert!(display.run_once().is_some());

    r.relay.slow_down(500);
    let pump = Arc::clone(&r.pump);
    let slow = thread::spawn(move || pump.activate(Activation::Manual));
    thread::sleep(Duration::from_millis(100));

    let frame = display.run_once().expect("previous status reused");
    assert_eq!(frame.pump.status, PumpStatus::Off);

    slow.join().unwrap().unwrap();
    r.relay.slow_down(0);
    assert_eq!(display.run_once().unwrap().pump.status, PumpStatus::On);
}

#[test]
fn display_without_any_status_shows_nothing_while_busy() {
    let config = NodeConfig {
        command_lock_timeout_ms: 20,
        ..NodeConfig::default()
    };
    let r = rig(&config);
    let (_writer, reader) = shared_snapshot(Duration::from_millis(10));
    let mut display = DisplayTask::new(Arc::clone(&r.pump), reader, CollectingDisplay::default(), 500);

    r.relay.slow_down(500);
    let pump = Arc::clone(&r.pump);
    let slow = thread::spawn(move || pump.activate(Activation::Manual));
    thread::sleep(Duration::from_millis(100));

    assert!(display.run_once().is_none());
    assert_eq!(display.frames(), 0);
    slow.join().unwrap().unwrap();
}
