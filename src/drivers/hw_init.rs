//! One-shot hardware peripheral initialization.
//!
//! Configures the soil ADC channel, the relay output, the flow and float
//! switch inputs and the GPIO ISR service using raw ESP-IDF sys calls.
//! Called once from `main()` before the tasks start.  Host builds get
//! no-op stubs.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
use crate::pins;
use crate::error::SensorError;
use crate::sensors::flow::PulseCounter;

// ── Error type ────────────────────────────────────────────────

/// Errors during peripheral initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
    IsrAttachFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
            Self::IsrAttachFailed(rc) => write!(f, "flow ISR attach failed (rc={})", rc),
        }
    }
}

impl From<HwInitError> for crate::error::Error {
    fn from(e: HwInitError) -> Self {
        let what = match e {
            HwInitError::AdcInitFailed(_) => "ADC init failed",
            HwInitError::GpioConfigFailed(_) => "GPIO config failed",
            HwInitError::IsrInstallFailed(_) => "ISR service install failed",
            HwInitError::IsrAttachFailed(_) => "flow ISR attach failed",
        };
        Self::Init(what)
    }
}

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: Called once from main() before any task is spawned.
    unsafe {
        init_adc()?;
        init_gpio_inputs()?;
        init_gpio_outputs()?;
        init_isr_service()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), HwInitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

#[cfg(target_os = "espidf")]
static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: `ADC1_HANDLE` is written once in `init_adc()` before the
/// acquisition task (its only reader) is spawned.
#[cfg(target_os = "espidf")]
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

#[cfg(target_os = "espidf")]
unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe {
        adc_oneshot_config_channel(adc1_handle(), pins::SOIL_MOISTURE_ADC1_CHANNEL, &chan_cfg)
    };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 configured (CH{}=soil)", pins::SOIL_MOISTURE_ADC1_CHANNEL);
    Ok(())
}

/// 12-bit raw reading.
#[cfg(target_os = "espidf")]
pub fn adc1_read(channel: u32) -> Result<u16, SensorError> {
    let mut raw: i32 = 0;
    // SAFETY: see adc1_handle(); acquisition task only.
    let ret = unsafe { adc_oneshot_read(adc1_handle(), channel, &mut raw) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::AdcReadFailed);
    }
    Ok(raw.max(0) as u16)
}

/// No ADC in simulation.
#[cfg(not(target_os = "espidf"))]
pub fn adc1_read(_channel: u32) -> Result<u16, SensorError> {
    Err(SensorError::AdcReadFailed)
}

// ── GPIO Inputs ───────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_inputs() -> Result<(), HwInitError> {
    for &pin in &[pins::FLOW_SENSOR_GPIO, pins::WATER_LEVEL_GPIO] {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << pin,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(HwInitError::GpioConfigFailed(ret));
        }
    }

    info!("hw_init: GPIO inputs configured");
    Ok(())
}

#[cfg(target_os = "espidf")]
pub fn gpio_read(pin: i32) -> bool {
    // SAFETY: read-only register access on an already-configured input.
    (unsafe { gpio_get_level(pin) }) != 0
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_read(_pin: i32) -> bool {
    true
}

// ── GPIO Outputs ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::PUMP_RELAY_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_ENABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    // Relay off before anything else can touch it.
    unsafe { gpio_set_level(pins::PUMP_RELAY_GPIO, 0) };

    info!("hw_init: relay output configured (GPIO{})", pins::PUMP_RELAY_GPIO);
    Ok(())
}

/// Set an output level.  `Err(rc)` on a driver error.
#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) -> Result<(), i32> {
    // SAFETY: the pin was configured in init_gpio_outputs(); the relay is
    // only written under the pump controller lock.
    let ret = unsafe { gpio_set_level(pin, u32::from(high)) };
    if ret == ESP_OK as i32 { Ok(()) } else { Err(ret) }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) -> Result<(), i32> {
    Ok(())
}

// ── GPIO ISR Service ──────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_isr_service() -> Result<(), HwInitError> {
    // SAFETY: ESP_ERR_INVALID_STATE means the service is already installed.
    let ret = unsafe { gpio_install_isr_service(0) };
    if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
        return Err(HwInitError::IsrInstallFailed(ret));
    }
    info!("hw_init: ISR service installed");
    Ok(())
}

/// Flow pin handler.  `arg` is the `&'static PulseCounter` registered in
/// [`attach_flow_isr`].
#[cfg(target_os = "espidf")]
unsafe extern "C" fn flow_gpio_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: arg was created from a &'static PulseCounter and is never
    // freed; on_pulse is a single atomic add.
    let counter = unsafe { &*(arg as *const PulseCounter) };
    counter.on_pulse();
}

/// Route falling edges on the flow pin to `counter`.
#[cfg(target_os = "espidf")]
pub fn attach_flow_isr(counter: &'static PulseCounter) -> Result<(), HwInitError> {
    let arg = counter as *const PulseCounter as *mut core::ffi::c_void;
    // SAFETY: the handler only dereferences `arg`, which outlives it.
    unsafe {
        gpio_set_intr_type(pins::FLOW_SENSOR_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE);
        let ret = gpio_isr_handler_add(pins::FLOW_SENSOR_GPIO, Some(flow_gpio_isr), arg);
        if ret != ESP_OK {
            return Err(HwInitError::IsrAttachFailed(ret));
        }
        gpio_intr_enable(pins::FLOW_SENSOR_GPIO);
    }
    info!("hw_init: flow ISR attached (GPIO{})", pins::FLOW_SENSOR_GPIO);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn attach_flow_isr(_counter: &'static PulseCounter) -> Result<(), HwInitError> {
    log::info!("hw_init(sim): flow ISR attach skipped");
    Ok(())
}

/// Disable and remove the flow handler.  After this returns no handler
/// invocation is pending.
#[cfg(target_os = "espidf")]
pub fn detach_flow_isr() {
    // SAFETY: removing a handler that may not exist is harmless.
    unsafe {
        gpio_intr_disable(pins::FLOW_SENSOR_GPIO);
        gpio_isr_handler_remove(pins::FLOW_SENSOR_GPIO);
        gpio_set_intr_type(pins::FLOW_SENSOR_GPIO, gpio_int_type_t_GPIO_INTR_DISABLE);
    }
    info!("hw_init: flow ISR detached");
}

#[cfg(not(target_os = "espidf"))]
pub fn detach_flow_isr() {}
