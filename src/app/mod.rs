//! Application core wiring: ports, events and the startup context.
//!
//! The domain logic itself lives in [`crate::pump`], [`crate::sensors`] and
//! [`crate::tasks`]; this module holds the boundary traits those consume
//! and the owned context object handed to each task at startup.

pub mod context;
pub mod events;
pub mod ports;
