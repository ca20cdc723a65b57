//! Span helpers for actuator background work.

use tracing::{info_span, Span};

/// Extension trait for recording outcomes on a span.
pub trait SpanExt {
    /// Record the result of an operation into the span.
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display;
}

impl SpanExt for Span {
    fn record_result<T, E>(&self, result: &Result<T, E>)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => {
                self.record("status", "ok");
            }
            Err(e) => {
                self.record("status", "error");
                self.record("error.message", e.to_string().as_str());
            }
        }
    }
}

/// Factory for registration heartbeat spans.
pub struct HeartbeatSpan;

impl HeartbeatSpan {
    /// Create a span for one heartbeat attempt.
    ///
    /// Fields included:
    /// - `registration_url`: Console endpoint being called
    /// - `status`: To be filled in by `SpanExt::record_result`
    /// - `error.message`: To be filled in on error
    /// - `instance_id`: To be filled in on success
    pub fn new(registration_url: &str) -> Span {
        info_span!(
            "registration_heartbeat",
            registration_url = %registration_url,
            status = tracing::field::Empty,
            error.message = tracing::field::Empty,
            instance_id = tracing::field::Empty,
        )
    }
}
