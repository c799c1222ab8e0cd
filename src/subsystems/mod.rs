//! Long-running subsystems of the assistant.

pub mod comms;
pub mod runtime;
