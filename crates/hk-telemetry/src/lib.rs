//! Telemetry bootstrap for hawker services.
//!
//! Structured logging via the `tracing` ecosystem: human-readable output for
//! interactive use, JSON output for log shippers. Every other crate emits
//! `tracing` events; this crate only installs the subscriber.

pub mod logging;

pub use logging::{init_logging, init_logging_json};
