//! End-to-end pump controller scenarios through the public API.

use irrigation_node::app::ports::Clock;
use irrigation_node::config::{EmergencyStopPolicy, NodeConfig};
use irrigation_node::error::{Error, SafetyFault, ValidationError};
use irrigation_node::pump::{Activation, PumpMode, PumpStatus, StopReason, Supervision};

use crate::mock_hw::{rig, Rig};

/// Run the supervisory check every `step` ms until it stops the pump or
/// `limit` ms pass.  Returns the outcome and the time it happened.
fn supervise_until_stop(r: &Rig, step: u64, limit: u64) -> Option<(Supervision, u64)> {
    let start = r.clock.now_ms();
    while r.clock.now_ms() - start <= limit {
        match r.pump.supervise().unwrap() {
            s @ (Supervision::Completed { .. } | Supervision::Tripped { .. }) => {
                return Some((s, r.clock.now_ms()));
            }
            _ => r.clock.advance(step),
        }
    }
    None
}

// ── Duration mode ─────────────────────────────────────────────

#[test]
fn duration_run_stops_within_one_cycle_of_deadline() {
    let r = rig(&NodeConfig::default());
    r.pump.activate(Activation::DurationMs(5_000)).unwrap();
    assert!(r.relay.level());

    let (outcome, at) = supervise_until_stop(&r, 100, 10_000).expect("run must end");
    assert!(at <= 5_100, "stopped at {at} ms");
    match outcome {
        Supervision::Completed { reason, last } => {
            assert_eq!(reason, StopReason::DurationElapsed);
            assert_eq!(last.status, PumpStatus::On);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!r.relay.level());
    assert_eq!(r.pump.status().unwrap().status, PumpStatus::Off);
}

// ── Volume mode ───────────────────────────────────────────────

#[test]
fn volume_run_stops_after_target_is_fed() {
    let r = rig(&NodeConfig::default());
    r.pump.activate(Activation::VolumeLiters(2.0)).unwrap();

    r.pump.update_volume(0.5).unwrap();
    assert!(matches!(r.pump.supervise().unwrap(), Supervision::Running(_)));
    r.pump.update_volume(1.1).unwrap();
    assert!(matches!(r.pump.supervise().unwrap(), Supervision::Running(_)));
    r.pump.update_volume(2.3).unwrap();

    match r.pump.supervise().unwrap() {
        Supervision::Completed { reason, last } => {
            assert_eq!(reason, StopReason::TargetVolumeReached);
            let run = last.run.expect("run report before stop");
            assert!(run.current_volume >= 2.0);
            assert_eq!(run.mode, PumpMode::Volume { target_liters: 2.0 });
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!r.relay.level());
}

#[test]
fn volume_counts_only_flow_during_the_run() {
    let r = rig(&NodeConfig::default());
    r.pump.update_volume(40.0).unwrap();
    r.pump.activate(Activation::VolumeLiters(1.0)).unwrap();
    r.pump.update_volume(40.4).unwrap();
    let run = r.pump.status().unwrap().run.unwrap();
    assert!((run.current_volume - 0.4).abs() < 1e-9);
}

// ── Ceiling, latch and reset ──────────────────────────────────

#[test]
fn manual_run_hits_ceiling_and_latches() {
    let config = NodeConfig { max_runtime_ms: 2_000, ..NodeConfig::default() };
    let r = rig(&config);
    r.pump.activate(Activation::Manual).unwrap();

    let (outcome, at) = supervise_until_stop(&r, 100, 5_000).expect("ceiling must trip");
    assert!(at <= 2_100);
    assert!(matches!(
        outcome,
        Supervision::Tripped { fault: SafetyFault::RuntimeCeiling, .. }
    ));
    assert_eq!(r.pump.status().unwrap().status, PumpStatus::Error);
    assert_eq!(r.pump.activate(Activation::Manual), Err(Error::Latched));

    let after = r.pump.reset().unwrap();
    assert_eq!(after.status, PumpStatus::Off);
    r.pump.activate(Activation::Manual).unwrap();
    assert_eq!(r.relay.rising_edges(), 2);
}

#[test]
fn return_to_off_policy_never_latches() {
    let config = NodeConfig {
        emergency_stop_policy: EmergencyStopPolicy::ReturnToOff,
        ..NodeConfig::default()
    };
    let r = rig(&config);
    r.pump.activate(Activation::Manual).unwrap();
    let s = r.pump.emergency_stop().unwrap();
    assert_eq!(s.status, PumpStatus::Off);
    assert!(!r.relay.level());
    r.pump.activate(Activation::DurationMs(1_000)).unwrap();
    assert!(r.relay.level());
}

#[test]
fn emergency_stop_from_off_latches_under_latch_policy() {
    let r = rig(&NodeConfig::default());
    let s = r.pump.emergency_stop().unwrap();
    assert_eq!(s.status, PumpStatus::Error);
    assert_eq!(s.fault, Some(SafetyFault::EmergencyStop));
    assert_eq!(r.pump.activate(Activation::Manual), Err(Error::Latched));
}

// ── Interlocks ────────────────────────────────────────────────

#[test]
fn link_loss_mid_run_trips_pump() {
    let r = rig(&NodeConfig::default());
    r.pump.activate(Activation::DurationMs(60_000)).unwrap();
    r.clock.advance(1_000);
    r.link.set_connected(false);

    match r.pump.supervise().unwrap() {
        Supervision::Tripped { fault, last } => {
            assert_eq!(fault, SafetyFault::LinkDown);
            assert_eq!(last.run.unwrap().runtime_ms, 1_000);
        }
        other => panic!("unexpected outcome {other:?}"),
    }
    assert!(!r.relay.level());
}

#[test]
fn activate_with_link_down_never_touches_relay() {
    let r = rig(&NodeConfig::default());
    r.link.set_connected(false);
    assert_eq!(
        r.pump.activate(Activation::Manual),
        Err(Error::Safety(SafetyFault::LinkDown))
    );
    assert_eq!(r.relay.rising_edges(), 0);
}

#[test]
fn disabled_pump_refuses_activation_until_enabled() {
    let r = rig(&NodeConfig::default());
    r.pump.disable().unwrap();
    assert_eq!(
        r.pump.activate(Activation::Manual),
        Err(Error::Safety(SafetyFault::PumpDisabled))
    );
    r.pump.enable().unwrap();
    r.pump.activate(Activation::Manual).unwrap();
}

// ── Validation and actuator failures ──────────────────────────

#[test]
fn out_of_range_requests_change_nothing() {
    let r = rig(&NodeConfig::default());
    assert_eq!(
        r.pump.activate(Activation::DurationMs(300_001)),
        Err(Error::Validation(ValidationError::InvalidDuration))
    );
    assert_eq!(
        r.pump.activate(Activation::VolumeLiters(f64::NAN)),
        Err(Error::Validation(ValidationError::InvalidVolume))
    );
    assert_eq!(
        r.pump.activate(Activation::VolumeLiters(-1.0)),
        Err(Error::Validation(ValidationError::InvalidVolume))
    );
    assert_eq!(r.pump.status().unwrap().status, PumpStatus::Off);
    assert_eq!(r.relay.rising_edges(), 0);
}

#[test]
fn relay_failure_on_activate_leaves_pump_off() {
    let r = rig(&NodeConfig::default());
    r.relay.fail_on(true);
    assert!(matches!(r.pump.activate(Activation::Manual), Err(Error::Actuator(_))));
    assert_eq!(r.pump.status().unwrap().status, PumpStatus::Off);
    assert!(!r.relay.level());
}

#[test]
fn stuck_relay_latches_even_under_return_to_off() {
    let config = NodeConfig {
        emergency_stop_policy: EmergencyStopPolicy::ReturnToOff,
        ..NodeConfig::default()
    };
    let r = rig(&config);
    r.pump.activate(Activation::Manual).unwrap();
    r.relay.fail_off(true);
    assert!(matches!(r.pump.deactivate(), Err(Error::Actuator(_))));
    let s = r.pump.status().unwrap();
    assert_eq!(s.status, PumpStatus::Error);
    assert_eq!(s.fault, Some(SafetyFault::RelayStuck));

    // Reset retries the relay and only clears once it goes low.
    assert!(r.pump.reset().is_err());
    r.relay.fail_off(false);
    assert_eq!(r.pump.reset().unwrap().status, PumpStatus::Off);
    assert!(!r.relay.level());
}
