//! Blocking pulse-width measurement over an `embedded-hal` input pin.
//!
//! Equivalent of the Arduino `pulseIn`: wait for any pulse already in
//! progress to finish, wait for the next one to start, then time it.  The
//! whole measurement is bounded by `timeout_us`.

use embedded_hal::digital::InputPin;

/// Monotonic microsecond source used while busy-waiting on a pin.
pub trait MicrosClock {
    fn now_us(&self) -> u64;
}

/// One full period of the flow signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulsePeriod {
    pub high_us: u64,
    pub low_us: u64,
}

impl PulsePeriod {
    pub fn frequency_hz(&self) -> f64 {
        1_000_000.0 / (self.high_us + self.low_us) as f64
    }
}

/// Duration in µs of the next pulse at `level_high`, or `None` on timeout
/// or pin error.
pub fn pulse_in<P: InputPin, T: MicrosClock>(
    pin: &mut P,
    level_high: bool,
    timeout_us: u64,
    clock: &T,
) -> Option<u64> {
    let start = clock.now_us();
    let expired = || clock.now_us().saturating_sub(start) >= timeout_us;
    let at_level = |pin: &mut P| pin.is_high().ok().map(|high| high == level_high);

    while at_level(pin)? {
        if expired() {
            return None;
        }
    }
    while !at_level(pin)? {
        if expired() {
            return None;
        }
    }
    let pulse_start = clock.now_us();
    while at_level(pin)? {
        if expired() {
            return None;
        }
    }
    Some(clock.now_us().saturating_sub(pulse_start))
}

/// Measure one high then one low half-period.  A zero or timed-out half
/// means no flow.
pub fn measure_period<P: InputPin, T: MicrosClock>(
    pin: &mut P,
    timeout_us: u64,
    clock: &T,
) -> Option<PulsePeriod> {
    let high_us = pulse_in(pin, true, timeout_us, clock).filter(|&us| us > 0)?;
    let low_us = pulse_in(pin, false, timeout_us, clock).filter(|&us| us > 0)?;
    Some(PulsePeriod { high_us, low_us })
}
