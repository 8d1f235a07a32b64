//! Pump subsystem: state types, interlocks, the relay port and the
//! safety controller that ties them together.

pub mod controller;
pub mod interlock;
pub mod relay;
pub mod state;

pub use controller::{PumpController, Supervision};
pub use state::{Activation, PumpMode, PumpStatus, StatusDetails, StatusReport, StopReason};
