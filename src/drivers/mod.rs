//! Hardware initialisation, watchdog and task placement.

pub mod hw_init;
pub mod task_pin;
pub mod watchdog;
