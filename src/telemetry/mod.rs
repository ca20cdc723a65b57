//! Telemetry for the actuator itself.
//!
//! Installs the tracing subscriber that feeds the in-memory logfile and
//! enforces runtime logger levels, and provides span helpers for the
//! registration heartbeat.

mod logging;
mod spans;

pub use logging::{build_subscriber, init_logging, LogConfig, LogError, LogFormat};
pub use spans::{HeartbeatSpan, SpanExt};
