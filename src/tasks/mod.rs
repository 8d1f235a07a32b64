//! The periodic tasks and their pacing.
//!
//! | Task        | Core | Cadence  | Work                                          |
//! |-------------|------|----------|-----------------------------------------------|
//! | acquisition | PRO  | 1000 ms  | sensors → snapshot → volume feed → telemetry  |
//! | supervisor  | APP  | 100 ms   | pump safety check, watchdog feed              |
//! | display     | PRO  | 500 ms   | snapshot copy + pump status → display         |
//!
//! Every loop runs forever and never propagates errors: a failed iteration
//! is logged and the next one runs on schedule.

pub mod acquisition;
pub mod cadence;
pub mod display;
pub mod supervisor;

pub use acquisition::AcquisitionTask;
pub use cadence::Cadence;
pub use display::DisplayTask;
pub use supervisor::SupervisorTask;
