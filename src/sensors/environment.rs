//! Air and soil sensors (DHT22, capacitive soil probe, DS18B20).
//!
//! The drivers themselves live outside the core; this module fixes the
//! boundary they report through and classifies raw soil moisture.

use core::fmt;

use serde::Serialize;

/// One pass over the environmental sensors.  `None` marks a failed read.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EnvironmentReading {
    pub air_temperature_c: Option<f32>,
    pub air_humidity_pct: Option<f32>,
    pub soil_temperature_c: Option<f32>,
    pub soil_moisture_raw: Option<u16>,
}

/// Read-side port for the environmental sensor drivers.
pub trait EnvironmentPort {
    fn read(&mut self) -> EnvironmentReading;
}

/// Soil moisture band derived from the 12-bit probe value.
/// Higher raw values mean drier soil.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoilMoisture {
    /// No reading yet.
    #[default]
    Unknown,
    SoakedExtreme,
    Soaked,
    VeryWet,
    Wet,
    Moist,
    Dry,
    DryExtreme,
    /// Raw value outside the ADC range.
    Invalid,
}

impl SoilMoisture {
    pub fn classify(raw: u16) -> Self {
        match raw {
            0..=750 => Self::SoakedExtreme,
            751..=1000 => Self::Soaked,
            1001..=1500 => Self::VeryWet,
            1501..=2000 => Self::Wet,
            2001..=3000 => Self::Moist,
            3001..=3500 => Self::Dry,
            3501..=4095 => Self::DryExtreme,
            _ => Self::Invalid,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::SoakedExtreme => "soaked-extreme",
            Self::Soaked => "soaked",
            Self::VeryWet => "very-wet",
            Self::Wet => "wet",
            Self::Moist => "moist",
            Self::Dry => "dry",
            Self::DryExtreme => "dry-extreme",
            Self::Invalid => "invalid",
        }
    }
}

impl fmt::Display for SoilMoisture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
