//! Controller and snapshot behaviour under real threads.

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use irrigation_node::config::NodeConfig;
use irrigation_node::control::{ControlSurface, Method};
use irrigation_node::error::Error;
use irrigation_node::pump::{Activation, PumpStatus};
use irrigation_node::snapshot::{shared_snapshot, SensorSnapshot};

use crate::mock_hw::rig;

#[test]
fn concurrent_activations_switch_the_relay_once() {
    let r = rig(&NodeConfig::default());
    r.clock.set(1_000);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = [Activation::DurationMs(10_000), Activation::Manual]
        .into_iter()
        .map(|request| {
            let pump = Arc::clone(&r.pump);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                pump.activate(request)
            })
        })
        .collect();

    let reports: Vec<_> = handles.into_iter().map(|h| h.join().unwrap().unwrap()).collect();
    assert_eq!(r.relay.rising_edges(), 1);
    let modes: Vec<_> = reports.iter().map(|s| s.run.unwrap().mode).collect();
    assert_eq!(modes[0], modes[1], "loser must see the winner's run");
    assert_eq!(r.pump.status().unwrap().run.unwrap().mode, modes[0]);
}

#[test]
fn commands_give_up_when_lock_is_held() {
    let config = NodeConfig {
        command_lock_timeout_ms: 20,
        volume_feed_lock_timeout_ms: 5,
        ..NodeConfig::default()
    };
    let r = rig(&config);
    r.relay.slow_down(500);

    let pump = Arc::clone(&r.pump);
    let slow = thread::spawn(move || pump.activate(Activation::Manual));
    thread::sleep(Duration::from_millis(100));

    assert_eq!(r.pump.status(), Err(Error::Busy));
    assert_eq!(r.pump.update_volume(1.0), Err(Error::Busy));
    let surface = ControlSurface::new(Arc::clone(&r.pump), 30.0);
    assert_eq!(surface.handle(Method::Get, "/pump/status", b"").status, 503);

    slow.join().unwrap().unwrap();
    r.relay.slow_down(0);
    assert_eq!(r.pump.status().unwrap().status, PumpStatus::On);
}

#[test]
fn relay_level_matches_state_after_mixed_traffic() {
    let r = rig(&NodeConfig::default());
    let mut workers = Vec::new();

    for i in 0..4u64 {
        let pump = Arc::clone(&r.pump);
        workers.push(thread::spawn(move || {
            for n in 0..200u64 {
                let _ = match (i + n) % 4 {
                    0 => pump.activate(Activation::DurationMs(50)).map(|_| ()),
                    1 => pump.deactivate().map(|_| ()),
                    2 => pump.supervise().map(|_| ()),
                    _ => pump.update_volume(n as f64 * 0.01),
                };
            }
        }));
    }
    let clock = r.clock.clone();
    workers.push(thread::spawn(move || {
        for _ in 0..200 {
            clock.advance(5);
            thread::yield_now();
        }
    }));
    for w in workers {
        w.join().unwrap();
    }

    let on = r.pump.status().unwrap().status == PumpStatus::On;
    assert_eq!(r.relay.level(), on);
    assert_eq!(r.pump.relay_is_on().unwrap(), on);
}

#[test]
fn snapshot_readers_never_see_torn_records() {
    let (mut writer, reader) = shared_snapshot(Duration::from_millis(10));
    let writer_thread = thread::spawn(move || {
        for i in 1..=500u64 {
            let v = i as f64;
            let snap = SensorSnapshot {
                flow_rate_lpm: v,
                cumulative_volume_liters: v,
                captured_at: i,
                ..SensorSnapshot::default()
            };
            let _ = writer.publish(snap);
        }
    });

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let mut reader = reader.clone();
            thread::spawn(move || {
                let mut last = 0;
                for _ in 0..500 {
                    let s = reader.read_copy();
                    assert_eq!(s.flow_rate_lpm, s.cumulative_volume_liters);
                    assert_eq!(s.captured_at as f64, s.flow_rate_lpm);
                    assert!(s.captured_at >= last, "snapshots only move forward");
                    last = s.captured_at;
                }
            })
        })
        .collect();

    writer_thread.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
}
