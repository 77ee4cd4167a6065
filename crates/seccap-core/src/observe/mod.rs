//! # Observability
//!
//! Structured logging via `tracing`. The optimizer itself only emits events;
//! binaries decide where they go by calling [`init_logging`] once at startup.
//! Per-iteration progress reaches `tracing` through
//! [`TracingSink`](crate::diagnostics::TracingSink).

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat, LogLevel};
