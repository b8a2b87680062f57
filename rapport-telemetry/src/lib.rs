//! # rapport-telemetry
//!
//! `tracing` integration for the reporting core: subscriber setup for the
//! core's own diagnostics, and a trace sink that forwards trace-channel lines
//! as `tracing` events.

pub mod logging;
pub mod trace;

pub use logging::EventLogger;
pub use trace::TracingTraceSink;
