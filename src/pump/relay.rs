//! Pump relay output.
//!
//! The relay is a single active-high digital output.  Only the
//! [`PumpController`](super::controller::PumpController) drives it, always
//! while holding its lock.

use embedded_hal::digital::OutputPin;
use log::error;

use crate::error::ActuatorError;

/// Write-side port for the pump relay.
pub trait RelayPort {
    /// Drive the relay on (`true`) or off.  Must return only once the
    /// output has been set, or fail.
    fn drive(&mut self, on: bool) -> Result<(), ActuatorError>;

    /// Last level successfully driven.
    fn is_on(&self) -> bool;
}

/// Relay on any `embedded-hal` output pin.
pub struct GpioRelay<P: OutputPin> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> GpioRelay<P> {
    /// Take the pin and force it low.
    pub fn new(mut pin: P) -> Result<Self, ActuatorError> {
        pin.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        Ok(Self { pin, on: false })
    }
}

impl<P: OutputPin> RelayPort for GpioRelay<P> {
    fn drive(&mut self, on: bool) -> Result<(), ActuatorError> {
        let res = if on { self.pin.set_high() } else { self.pin.set_low() };
        if res.is_err() {
            error!("PUMP | relay write failed (want {})", if on { "HIGH" } else { "LOW" });
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.on = on;
        Ok(())
    }

    fn is_on(&self) -> bool {
        self.on
    }
}
