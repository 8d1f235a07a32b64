//! HTTP control surface: routing, bodies, status codes and JSON shape.

use std::sync::Arc;

use serde_json::Value;

use irrigation_node::adapters::time::ManualClock;
use irrigation_node::config::NodeConfig;
use irrigation_node::control::{ControlSurface, Method, MAX_BODY_BYTES};
use irrigation_node::sensors::flow::{FlowRequests, FlowStrategy};

use crate::mock_hw::{rig, RecordingRelay, Rig};

fn surface(r: &Rig) -> ControlSurface<RecordingRelay, ManualClock> {
    ControlSurface::new(Arc::clone(&r.pump), 30.0)
}

fn json(body: &str) -> Value {
    serde_json::from_str(body).expect("response is JSON")
}

#[test]
fn status_when_off() {
    let r = rig(&NodeConfig::default());
    let resp = surface(&r).handle(Method::Get, "/pump/status", b"");
    assert_eq!(resp.status, 200);
    let v = json(&resp.body);
    assert_eq!(v["status"], "off");
    assert_eq!(v["enabled"], true);
    assert_eq!(v["mode"], "manual");
    assert_eq!(v["water_rate_ml_per_second"], 30.0);
    assert!(v.get("runtime_seconds").is_none());
    assert!(v.get("fault").is_none());
}

#[test]
fn water_ml_becomes_a_duration_run() {
    let r = rig(&NodeConfig::default());
    let s = surface(&r);
    let resp = s.handle(Method::Post, "/pump/activate", br#"{"water_ml": 150}"#);
    assert_eq!(resp.status, 200);
    let v = json(&resp.body);
    assert_eq!(v["status"], "on");
    assert_eq!(v["mode"], "duration");
    assert_eq!(v["duration_seconds"], 5);
    assert_eq!(v["remaining_seconds"], 5);
    assert_eq!(v["runtime_seconds"], 0);

    r.clock.advance(2_400);
    let v = json(&s.handle(Method::Get, "/pump/status", b"").body);
    assert_eq!(v["runtime_seconds"], 2);
    assert_eq!(v["remaining_seconds"], 2);
}

#[test]
fn volume_run_reports_progress() {
    let r = rig(&NodeConfig::default());
    let s = surface(&r);
    assert_eq!(s.handle(Method::Post, "/pump/activate", br#"{"volume": 2.0}"#).status, 200);
    r.pump.update_volume(0.75).unwrap();
    let v = json(&s.handle(Method::Get, "/pump/status", b"").body);
    assert_eq!(v["mode"], "volume");
    assert_eq!(v["current_volume"], 0.75);
    assert_eq!(v["target_volume"], 2.0);
    assert!(v.get("duration_seconds").is_none());
}

#[test]
fn empty_body_starts_manual_run() {
    let r = rig(&NodeConfig::default());
    let resp = surface(&r).handle(Method::Post, "/pump/activate", b"");
    assert_eq!(resp.status, 200);
    assert_eq!(json(&resp.body)["mode"], "manual");
    assert!(r.relay.level());
}

#[test]
fn unknown_path_and_wrong_method() {
    let r = rig(&NodeConfig::default());
    let s = surface(&r);

    let resp = s.handle(Method::Get, "/pump/water", b"");
    assert_eq!(resp.status, 404);
    let v = json(&resp.body);
    assert_eq!(v["error"], "Endpoint not found");
    assert_eq!(v["status"], "error");

    let resp = s.handle(Method::Get, "/pump/activate", b"");
    assert_eq!(resp.status, 405);
    assert_eq!(s.handle(Method::Other, "/pump/status", b"").status, 405);
    assert!(!r.relay.level());
}

#[test]
fn invalid_bodies_are_400_and_change_nothing() {
    let r = rig(&NodeConfig::default());
    let s = surface(&r);
    for body in [
        &br#"{"duration": 0}"#[..],
        br#"{"duration": 301}"#,
        br#"{"volume": -2}"#,
        br#"{"water_ml": "lots"}"#,
        br#"{"durration": 5}"#,
        b"not json",
    ] {
        let resp = s.handle(Method::Post, "/pump/activate", body);
        assert_eq!(resp.status, 400, "{}", String::from_utf8_lossy(body));
        assert_eq!(json(&resp.body)["status"], "error");
    }
    assert_eq!(r.relay.rising_edges(), 0);
}

#[test]
fn disabled_pump_message() {
    let r = rig(&NodeConfig::default());
    let s = surface(&r);
    let resp = s.handle(Method::Post, "/pump/disable", b"");
    assert_eq!(resp.status, 200);
    assert_eq!(json(&resp.body)["enabled"], false);

    let resp = s.handle(Method::Post, "/pump/activate", b"{}");
    assert_eq!(resp.status, 400);
    assert_eq!(json(&resp.body)["error"], "Pump is disabled");

    assert_eq!(s.handle(Method::Post, "/pump/enable", b"").status, 200);
    assert_eq!(s.handle(Method::Post, "/pump/activate", b"{}").status, 200);
}

#[test]
fn emergency_stop_then_reset() {
    let r = rig(&NodeConfig::default());
    let s = surface(&r);
    s.handle(Method::Post, "/pump/activate", br#"{"duration": 30}"#);

    let v = json(&s.handle(Method::Post, "/pump/emergency-stop", b"").body);
    assert_eq!(v["status"], "error");
    assert_eq!(v["fault"], "emergency stop");
    assert!(!r.relay.level());

    let resp = s.handle(Method::Post, "/pump/activate", b"");
    assert_eq!(resp.status, 400);
    assert_eq!(json(&resp.body)["error"], "Pump in error state - reset required");

    let v = json(&s.handle(Method::Post, "/pump/reset", b"").body);
    assert_eq!(v["status"], "off");
}

#[test]
fn relay_failure_is_500() {
    let r = rig(&NodeConfig::default());
    r.relay.fail_on(true);
    let resp = surface(&r).handle(Method::Post, "/pump/activate", b"");
    assert_eq!(resp.status, 500);
}

#[test]
fn deactivate_when_off_is_ok() {
    let r = rig(&NodeConfig::default());
    let resp = surface(&r).handle(Method::Post, "/pump/deactivate", b"");
    assert_eq!(resp.status, 200);
    assert_eq!(json(&resp.body)["status"], "off");
}

#[test]
fn five_second_run_is_off_after_five_point_one_seconds() {
    let r = rig(&NodeConfig::default());
    let s = surface(&r);
    let v = json(&s.handle(Method::Post, "/pump/activate", br#"{"duration": 5}"#).body);
    assert_eq!(v["mode"], "duration");
    assert_eq!(v["duration_seconds"], 5);

    for _ in 0..51 {
        r.clock.advance(100);
        r.pump.supervise().unwrap();
    }
    let v = json(&s.handle(Method::Get, "/pump/status", b"").body);
    assert_eq!(v["status"], "off");
    assert!(v.get("runtime_seconds").is_none());
    assert!(!r.relay.level());
}

#[test]
fn flow_routes_queue_requests() {
    let r = rig(&NodeConfig::default());
    let requests = Arc::new(FlowRequests::new());
    let s = surface(&r).with_flow_requests(Arc::clone(&requests));

    let resp = s.handle(Method::Post, "/flow/mode", br#"{"mode": "pulse-width"}"#);
    assert_eq!(resp.status, 202);
    let v = json(&resp.body);
    assert_eq!(v["status"], "accepted");
    assert_eq!(v["mode"], "pulse-width");
    assert_eq!(requests.take_strategy(), Some(FlowStrategy::PulseWidth));

    assert_eq!(s.handle(Method::Post, "/flow/reset", b"").status, 202);
    assert!(requests.take_reset());

    assert_eq!(s.handle(Method::Post, "/flow/mode", br#"{"mode": "fast"}"#).status, 400);
    assert_eq!(requests.take_strategy(), None);
}

#[test]
fn flow_routes_without_flow_control_are_503() {
    let r = rig(&NodeConfig::default());
    let resp = surface(&r).handle(Method::Post, "/flow/reset", b"");
    assert_eq!(resp.status, 503);
    assert_eq!(json(&resp.body)["status"], "error");
}

#[test]
fn body_at_the_limit_is_served_and_larger_is_413() {
    let r = rig(&NodeConfig::default());
    let s = surface(&r);

    let mut body = br#"{"duration": 5}"#.to_vec();
    body.resize(MAX_BODY_BYTES, b' ');
    assert_eq!(s.handle(Method::Post, "/pump/activate", &body).status, 200);
    s.handle(Method::Post, "/pump/deactivate", b"");

    body.push(b' ');
    let resp = s.handle(Method::Post, "/pump/activate", &body);
    assert_eq!(resp.status, 413);
    assert_eq!(json(&resp.body)["error"], "Request body too large");
    assert_eq!(r.relay.rising_edges(), 1);
}
