//! GPIO / peripheral pin assignments for the irrigation node board.
//!
//! Single source of truth: every driver references this module rather than
//! hard-coding pin numbers.

// ---------------------------------------------------------------------------
// Pump
// ---------------------------------------------------------------------------

/// Digital output: pump relay coil driver.  HIGH = pump on.
pub const PUMP_RELAY_GPIO: i32 = 23;

// ---------------------------------------------------------------------------
// Flow sensor
// ---------------------------------------------------------------------------

/// YF-S201 hall-effect flow sensor, open-collector pulse output.
/// Falling-edge interrupt or pulse-width timing.
pub const FLOW_SENSOR_GPIO: i32 = 27;

// ---------------------------------------------------------------------------
// Environmental sensors
// ---------------------------------------------------------------------------

/// Capacitive soil moisture probe, analog out.
/// ADC1 channel 6 (GPIO 34 on ESP32).
pub const SOIL_MOISTURE_GPIO: i32 = 34;
pub const SOIL_MOISTURE_ADC1_CHANNEL: u32 = 6;

/// DHT22 air temperature / humidity (single-wire).
pub const DHT22_GPIO: i32 = 4;

/// DS18B20 soil temperature probe (one-wire).
pub const DS18B20_GPIO: i32 = 5;

/// Supply tank float switch.  HIGH = water present.
pub const WATER_LEVEL_GPIO: i32 = 26;

// ---------------------------------------------------------------------------
// Display (SSD1306 over I2C)
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 21;
pub const I2C_SCL_GPIO: i32 = 22;
