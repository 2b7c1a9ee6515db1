//! Telemetry
//!
//! Structured logging setup for the service binary.

pub mod logging;

pub use logging::{LogFormat, LogLevel, LoggingConfig};
