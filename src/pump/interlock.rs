//! Safety interlocks.
//!
//! Each interlock is one predicate that must hold for the pump to run.
//! The controller ANDs every entry of its [`InterlockSet`]; adding a
//! physical interlock (water level, pressure) means pushing another
//! entry, never editing the state machine.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use log::warn;

use crate::error::{Error, Result, SafetyFault};

/// Upper bound on registered interlocks.
pub const MAX_INTERLOCKS: usize = 4;

/// One AND-condition of the pump's safety check.
pub trait Interlock: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// `Err(fault)` when the pump must not run.
    fn check(&self) -> core::result::Result<(), SafetyFault>;
}

/// Fixed-capacity list of interlocks, evaluated in registration order.
#[derive(Default)]
pub struct InterlockSet {
    items: heapless::Vec<Box<dyn Interlock>, MAX_INTERLOCKS>,
}

impl InterlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, interlock: impl Interlock + 'static) -> Result<()> {
        self.items
            .push(Box::new(interlock))
            .map_err(|_| Error::Config("interlock table full"))
    }

    /// Builder form of [`push`](Self::push).
    pub fn with(mut self, interlock: impl Interlock + 'static) -> Result<Self> {
        self.push(interlock)?;
        Ok(self)
    }

    /// First failing interlock, if any.
    pub fn check_all(&self) -> core::result::Result<(), SafetyFault> {
        for item in &self.items {
            if let Err(fault) = item.check() {
                warn!("SAFETY: interlock '{}' open: {}", item.name(), fault);
                return Err(fault);
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

// ── Connectivity ──────────────────────────────────────────────

/// Liveness signal from the network collaborator.
pub trait LinkProbe: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Shared flag the network side sets and the interlock reads.
#[derive(Debug, Clone, Default)]
pub struct LinkStatus(Arc<AtomicBool>);

impl LinkStatus {
    pub fn new(connected: bool) -> Self {
        Self(Arc::new(AtomicBool::new(connected)))
    }

    pub fn set_connected(&self, connected: bool) {
        self.0.store(connected, Ordering::Release);
    }
}

impl LinkProbe for LinkStatus {
    fn is_connected(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Refuses to run the pump while it cannot be monitored remotely.
pub struct ConnectivityInterlock<P: LinkProbe> {
    probe: P,
}

impl<P: LinkProbe> ConnectivityInterlock<P> {
    pub fn new(probe: P) -> Self {
        Self { probe }
    }
}

impl<P: LinkProbe> Interlock for ConnectivityInterlock<P> {
    fn name(&self) -> &'static str {
        "connectivity"
    }

    fn check(&self) -> core::result::Result<(), SafetyFault> {
        if self.probe.is_connected() {
            Ok(())
        } else {
            Err(SafetyFault::LinkDown)
        }
    }
}

// ── Water level ───────────────────────────────────────────────

/// Supply-tank float switch.  `level_ok` returns `true` while the tank
/// holds enough water.
pub struct WaterLevelInterlock<F: Fn() -> bool + Send> {
    level_ok: F,
}

impl<F: Fn() -> bool + Send> WaterLevelInterlock<F> {
    pub fn new(level_ok: F) -> Self {
        Self { level_ok }
    }
}

impl<F: Fn() -> bool + Send> Interlock for WaterLevelInterlock<F> {
    fn name(&self) -> &'static str {
        "water-level"
    }

    fn check(&self) -> core::result::Result<(), SafetyFault> {
        if (self.level_ok)() {
            Ok(())
        } else {
            Err(SafetyFault::WaterLevelLow)
        }
    }
}
