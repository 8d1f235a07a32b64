//! YF-S201 hall-effect water flow sensor.
//!
//! The sensor emits ~7.5 pulses per second for every L/min of flow.  Two
//! mutually exclusive acquisition strategies are supported:
//!
//! - **Edge interrupt**: a GPIO ISR calls [`PulseCounter::on_pulse`] on
//!   each falling edge; [`FlowMeter::poll`] swaps the count to zero once per
//!   window and converts the tally into a rate.
//! - **Pulse width**: the ISR is detached and one high/low period is timed
//!   directly; no pulse within the timeout means "no flow", not an error.
//!
//! The counter is an `AtomicU32` so the ISR never takes a lock.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::Timestamp;
use crate::error::Result;
use crate::sensors::pulse::PulsePeriod;

// ---------------------------------------------------------------------------
// Pulse counter (interrupt side)
// ---------------------------------------------------------------------------

/// Interrupt-context pulse tally.
///
/// Lives in a `static` (or is leaked) so its address can be handed to the
/// GPIO ISR as the handler argument.  Only one counter is bound to the flow
/// pin at a time; binding happens through [`FlowInput::attach_edge_interrupt`].
pub struct PulseCounter {
    count: AtomicU32,
}

impl PulseCounter {
    pub const fn new() -> Self {
        Self { count: AtomicU32::new(0) }
    }

    /// Count one pulse.  ISR-safe: one atomic add, wraps on overflow.
    #[inline]
    pub fn on_pulse(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the tally and zero it in one atomic step.  Task context only.
    pub fn take_and_reset(&self) -> u32 {
        self.count.swap(0, Ordering::AcqRel)
    }

    /// Current tally without resetting it.
    pub fn peek(&self) -> u32 {
        self.count.load(Ordering::Acquire)
    }
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Hardware boundary
// ---------------------------------------------------------------------------

/// How pulses are turned into a flow estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FlowStrategy {
    EdgeInterrupt,
    PulseWidth,
}

impl FlowStrategy {
    fn code(self) -> u8 {
        match self {
            Self::EdgeInterrupt => 1,
            Self::PulseWidth => 2,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::EdgeInterrupt),
            2 => Some(Self::PulseWidth),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Requests from other tasks
// ---------------------------------------------------------------------------

/// Flow meter changes requested from outside the acquisition task.
///
/// The meter is owned by the acquisition task, so other tasks post here
/// and the task applies pending requests at the start of its next pass.
/// A newer strategy request replaces an older one that was not applied yet.
#[derive(Debug, Default)]
pub struct FlowRequests {
    strategy: AtomicU8,
    reset_total: AtomicBool,
}

impl FlowRequests {
    pub const fn new() -> Self {
        Self {
            strategy: AtomicU8::new(0),
            reset_total: AtomicBool::new(false),
        }
    }

    pub fn request_strategy(&self, strategy: FlowStrategy) {
        self.strategy.store(strategy.code(), Ordering::Release);
    }

    pub fn request_reset(&self) {
        self.reset_total.store(true, Ordering::Release);
    }

    pub fn take_strategy(&self) -> Option<FlowStrategy> {
        FlowStrategy::from_code(self.strategy.swap(0, Ordering::AcqRel))
    }

    pub fn take_reset(&self) -> bool {
        self.reset_total.swap(false, Ordering::AcqRel)
    }
}

/// Capability port for the flow sensor's digital input.
pub trait FlowInput {
    /// Route falling-edge interrupts on the flow pin to `counter`.
    fn attach_edge_interrupt(&mut self, counter: &'static PulseCounter) -> Result<()>;

    /// Stop delivering interrupts.  No handler may fire after this returns.
    fn detach_edge_interrupt(&mut self);

    /// Time one high and one low half-period.  `None` when no pulse arrives
    /// within `timeout_us`.
    fn measure_pulse_width(&mut self, timeout_us: u64) -> Option<PulsePeriod>;
}

// ---------------------------------------------------------------------------
// Samples and readings
// ---------------------------------------------------------------------------

/// Pulses counted over one measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSample {
    pulse_count: u32,
    window_start: Timestamp,
    window_end: Timestamp,
}

impl FlowSample {
    /// `None` unless `window_end > window_start`.
    pub fn new(pulse_count: u32, window_start: Timestamp, window_end: Timestamp) -> Option<Self> {
        (window_end > window_start).then_some(Self {
            pulse_count,
            window_start,
            window_end,
        })
    }

    pub fn pulse_count(&self) -> u32 {
        self.pulse_count
    }

    pub fn elapsed_secs(&self) -> f64 {
        (self.window_end - self.window_start) as f64 / 1000.0
    }
}

/// Flow derived from one window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FlowReading {
    pub rate_liters_per_minute: f64,
    pub liters_per_second: f64,
    pub incremental_volume_liters: f64,
}

/// Edge-interrupt estimate: tally per window.
pub fn estimate(sample: &FlowSample, calibration_factor: f64) -> FlowReading {
    let pulses = sample.pulse_count as f64;
    let rate = (pulses / calibration_factor) * (60.0 / sample.elapsed_secs());
    FlowReading {
        rate_liters_per_minute: rate,
        liters_per_second: rate / 60.0,
        // pulses / (pulses per L/min * 60) = litres
        incremental_volume_liters: pulses / (calibration_factor * 60.0),
    }
}

/// Pulse-width estimate: instantaneous frequency of one period.
pub fn estimate_pulse_width(
    period: Option<PulsePeriod>,
    elapsed_secs: f64,
    calibration_factor: f64,
) -> FlowReading {
    let Some(period) = period else {
        return FlowReading::default();
    };
    let rate = period.frequency_hz() / calibration_factor;
    let liters_per_second = rate / 60.0;
    FlowReading {
        rate_liters_per_minute: rate,
        liters_per_second,
        incremental_volume_liters: liters_per_second * elapsed_secs,
    }
}

// ---------------------------------------------------------------------------
// Flow meter
// ---------------------------------------------------------------------------

/// Owns the flow input and turns it into readings plus a cumulative volume.
pub struct FlowMeter<I: FlowInput> {
    input: I,
    counter: &'static PulseCounter,
    strategy: FlowStrategy,
    calibration_factor: f64,
    min_interval_ms: u64,
    pulse_timeout_us: u64,
    window_start: Timestamp,
    last: FlowReading,
    total_liters: f64,
    started: bool,
}

impl<I: FlowInput> FlowMeter<I> {
    pub fn new(
        input: I,
        counter: &'static PulseCounter,
        config: &crate::config::NodeConfig,
    ) -> Self {
        Self {
            input,
            counter,
            strategy: config.flow_strategy,
            calibration_factor: config.calibration_factor,
            min_interval_ms: config.min_sample_interval_ms,
            pulse_timeout_us: config.pulse_timeout_us,
            window_start: 0,
            last: FlowReading::default(),
            total_liters: 0.0,
            started: false,
        }
    }

    /// Bind the configured strategy and open the first window at `now`.
    pub fn start(&mut self, now: Timestamp) -> Result<()> {
        if self.strategy == FlowStrategy::EdgeInterrupt {
            self.counter.take_and_reset();
            self.input.attach_edge_interrupt(self.counter)?;
        }
        self.window_start = now;
        self.started = true;
        info!("FLOW | started in {:?} mode", self.strategy);
        Ok(())
    }

    /// Switch acquisition strategy.  The interrupt is detached before pulse
    /// timing begins and re-attached (with a fresh tally) when switching back.
    pub fn set_strategy(&mut self, strategy: FlowStrategy, now: Timestamp) -> Result<()> {
        if strategy == self.strategy {
            return Ok(());
        }
        match strategy {
            FlowStrategy::PulseWidth => {
                self.input.detach_edge_interrupt();
                self.counter.take_and_reset();
            }
            FlowStrategy::EdgeInterrupt => {
                self.counter.take_and_reset();
                self.input.attach_edge_interrupt(self.counter)?;
            }
        }
        self.strategy = strategy;
        self.window_start = now;
        info!("FLOW | read mode changed to {:?}", strategy);
        Ok(())
    }

    /// Produce the reading for the window ending at `now`.
    ///
    /// Before the minimum interval has elapsed this returns the previous
    /// reading unchanged and touches nothing.
    pub fn poll(&mut self, now: Timestamp) -> FlowReading {
        if !self.started {
            warn!("FLOW | poll before start");
            return self.last;
        }
        let elapsed_ms = now.saturating_sub(self.window_start);
        if elapsed_ms < self.min_interval_ms {
            return self.last;
        }

        let reading = match self.strategy {
            FlowStrategy::EdgeInterrupt => {
                let pulses = self.counter.take_and_reset();
                match FlowSample::new(pulses, self.window_start, now) {
                    Some(sample) => {
                        debug!("FLOW | pulses={} window={}ms", pulses, elapsed_ms);
                        estimate(&sample, self.calibration_factor)
                    }
                    None => return self.last,
                }
            }
            FlowStrategy::PulseWidth => {
                let period = self.input.measure_pulse_width(self.pulse_timeout_us);
                if period.is_none() {
                    debug!("FLOW | pulse-width: no flow detected");
                }
                estimate_pulse_width(period, elapsed_ms as f64 / 1000.0, self.calibration_factor)
            }
        };

        self.total_liters += reading.incremental_volume_liters;
        self.last = reading;
        self.window_start = now;
        debug!(
            "FLOW | {:.2} L/min, total {:.3} L",
            reading.rate_liters_per_minute, self.total_liters
        );
        reading
    }

    /// Cumulative volume since start or the last reset (L).
    pub fn total_liters(&self) -> f64 {
        self.total_liters
    }

    /// Zero the cumulative volume.
    pub fn reset_total(&mut self) {
        self.total_liters = 0.0;
        info!("FLOW | total volume reset");
    }

    /// Apply whatever is pending in `requests`.  The reset is applied
    /// before a strategy switch, so a failed switch does not lose it.
    pub fn apply(&mut self, requests: &FlowRequests, now: Timestamp) -> Result<()> {
        if requests.take_reset() {
            self.reset_total();
        }
        if let Some(strategy) = requests.take_strategy() {
            self.set_strategy(strategy, now)?;
        }
        Ok(())
    }

    pub fn strategy(&self) -> FlowStrategy {
        self.strategy
    }

    pub fn last_reading(&self) -> FlowReading {
        self.last
    }
}
