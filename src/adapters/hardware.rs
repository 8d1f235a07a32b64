//! Hardware adapter: bridges the board's peripherals to the core's ports.
//!
//! | Type               | Implements        | Peripheral                    |
//! |--------------------|-------------------|-------------------------------|
//! | `BoardRelay`       | `RelayPort`       | relay GPIO                    |
//! | `BoardFlowInput`   | `FlowInput`       | flow GPIO + ISR, pulse timing |
//! | `BoardEnvironment` | `EnvironmentPort` | soil ADC                      |
//!
//! All raw access goes through [`hw_init`]; on non-espidf targets those
//! calls are simulation stubs.

use embedded_hal::digital::{ErrorKind, ErrorType, InputPin, OutputPin};
use log::{debug, error};

use crate::adapters::time::Esp32TimeAdapter;
use crate::drivers::hw_init;
use crate::error::{ActuatorError, Result, SensorError};
use crate::pins;
use crate::pump::relay::GpioRelay;
use crate::sensors::environment::{EnvironmentPort, EnvironmentReading};
use crate::sensors::flow::{FlowInput, PulseCounter};
use crate::sensors::pulse::{self, PulsePeriod};

// ── Relay ─────────────────────────────────────────────────────

/// Driver return code from a failed `gpio_set_level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpioFault(pub i32);

impl embedded_hal::digital::Error for GpioFault {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

/// `embedded-hal` view of `PUMP_RELAY_GPIO`.
pub struct RelayPin;

impl ErrorType for RelayPin {
    type Error = GpioFault;
}

impl OutputPin for RelayPin {
    fn set_low(&mut self) -> core::result::Result<(), GpioFault> {
        write_relay(false)
    }

    fn set_high(&mut self) -> core::result::Result<(), GpioFault> {
        write_relay(true)
    }
}

fn write_relay(high: bool) -> core::result::Result<(), GpioFault> {
    hw_init::gpio_write(pins::PUMP_RELAY_GPIO, high).map_err(|rc| {
        error!("PUMP | gpio_set_level({}) failed rc={}", high, rc);
        GpioFault(rc)
    })
}

/// Pump relay on `PUMP_RELAY_GPIO`.
pub type BoardRelay = GpioRelay<RelayPin>;

/// Take the relay pin, driven low.
pub fn board_relay() -> core::result::Result<BoardRelay, ActuatorError> {
    GpioRelay::new(RelayPin)
}

// ── Flow input ────────────────────────────────────────────────

/// `embedded-hal` view of the flow pin for pulse timing.
struct FlowPin;

impl ErrorType for FlowPin {
    type Error = core::convert::Infallible;
}

impl InputPin for FlowPin {
    fn is_high(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(hw_init::gpio_read(pins::FLOW_SENSOR_GPIO))
    }

    fn is_low(&mut self) -> core::result::Result<bool, Self::Error> {
        Ok(!hw_init::gpio_read(pins::FLOW_SENSOR_GPIO))
    }
}

/// Flow sensor on `FLOW_SENSOR_GPIO`.
pub struct BoardFlowInput {
    clock: Esp32TimeAdapter,
    attached: bool,
}

impl BoardFlowInput {
    pub fn new() -> Self {
        Self {
            clock: Esp32TimeAdapter::new(),
            attached: false,
        }
    }
}

impl Default for BoardFlowInput {
    fn default() -> Self {
        Self::new()
    }
}

impl FlowInput for BoardFlowInput {
    fn attach_edge_interrupt(&mut self, counter: &'static PulseCounter) -> Result<()> {
        if self.attached {
            hw_init::detach_flow_isr();
        }
        hw_init::attach_flow_isr(counter)?;
        self.attached = true;
        Ok(())
    }

    fn detach_edge_interrupt(&mut self) {
        if self.attached {
            hw_init::detach_flow_isr();
            self.attached = false;
        }
    }

    fn measure_pulse_width(&mut self, timeout_us: u64) -> Option<PulsePeriod> {
        pulse::measure_period(&mut FlowPin, timeout_us, &self.clock)
    }
}

// ── Environment ───────────────────────────────────────────────

/// Soil moisture probe on ADC1.  The DHT22 and DS18B20 drivers are not
/// part of this crate; their fields stay `None` unless a reader is
/// supplied.
pub struct BoardEnvironment {
    air: Option<Box<dyn FnMut() -> Option<(f32, f32)> + Send>>,
    soil_temperature: Option<Box<dyn FnMut() -> Option<f32> + Send>>,
}

impl BoardEnvironment {
    pub fn new() -> Self {
        Self {
            air: None,
            soil_temperature: None,
        }
    }

    /// Attach an air sensor returning `(temperature °C, humidity %)`.
    pub fn with_air_sensor(mut self, read: impl FnMut() -> Option<(f32, f32)> + Send + 'static) -> Self {
        self.air = Some(Box::new(read));
        self
    }

    /// Attach a soil temperature probe (°C).
    pub fn with_soil_temperature(mut self, read: impl FnMut() -> Option<f32> + Send + 'static) -> Self {
        self.soil_temperature = Some(Box::new(read));
        self
    }
}

impl Default for BoardEnvironment {
    fn default() -> Self {
        Self::new()
    }
}

impl BoardEnvironment {
    /// Raw soil moisture from ADC1.
    pub fn read_soil_moisture(&mut self) -> Result<u16> {
        Ok(hw_init::adc1_read(pins::SOIL_MOISTURE_ADC1_CHANNEL)?)
    }

    /// `(temperature °C, humidity %)` from the air sensor.
    pub fn read_air(&mut self) -> Result<(f32, f32)> {
        let read = self.air.as_mut().ok_or(SensorError::NotResponding)?;
        Ok(read().ok_or(SensorError::NotResponding)?)
    }

    pub fn read_soil_temperature(&mut self) -> Result<f32> {
        let read = self.soil_temperature.as_mut().ok_or(SensorError::NotResponding)?;
        Ok(read().ok_or(SensorError::NotResponding)?)
    }
}

fn logged<T>(what: &str, reading: Result<T>) -> Option<T> {
    reading.map_err(|e| debug!("SENSOR | {}: {}", what, e)).ok()
}

impl EnvironmentPort for BoardEnvironment {
    fn read(&mut self) -> EnvironmentReading {
        let air = logged("air", self.read_air());
        EnvironmentReading {
            air_temperature_c: air.map(|(t, _)| t),
            air_humidity_pct: air.map(|(_, h)| h),
            soil_temperature_c: logged("soil temperature", self.read_soil_temperature()),
            soil_moisture_raw: logged("soil moisture", self.read_soil_moisture()),
        }
    }
}

/// Supply-tank float switch level.  HIGH = water present.
pub fn water_level_ok() -> bool {
    hw_init::gpio_read(pins::WATER_LEVEL_GPIO)
}
