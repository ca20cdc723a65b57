//! Health aggregation for GG-ACTUATOR.
//!
//! Providers are registered explicitly and queried on demand. The aggregate
//! follows a fixed precedence: any DOWN makes the summary DOWN, otherwise any
//! UP makes it UP, otherwise it is UNKNOWN. Unsupported providers are left
//! out of the summary entirely, so a registry with nothing to check is UP.

mod composite;
mod disk_space;

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub use composite::CompositeHealthProvider;
pub use disk_space::{DiskSpaceHealthProvider, DEFAULT_FREE_BYTES_THRESHOLD};

/// Health of a single component or of the whole service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Up,
    Down,
    Unknown,
}

/// Status of one provider with free-form details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: Status,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl HealthStatus {
    pub fn new(status: Status) -> Self {
        Self {
            status,
            details: Map::new(),
        }
    }

    pub fn up() -> Self {
        Self::new(Status::Up)
    }

    pub fn down() -> Self {
        Self::new(Status::Down)
    }

    pub fn unknown() -> Self {
        Self::new(Status::Unknown)
    }

    /// Add a detail entry.
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// DOWN status carrying the failure message.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::down().with_detail("error", message.into())
    }
}

/// Aggregate status plus the status of every supported provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub status: Status,
    pub details: BTreeMap<String, HealthStatus>,
}

impl HealthSummary {
    /// HTTP status for the health endpoint: 503 when DOWN, 200 otherwise.
    pub fn http_status(&self) -> u16 {
        match self.status {
            Status::Down => 503,
            Status::Up | Status::Unknown => 200,
        }
    }
}

/// Error raised by a provider while probing its backend.
#[derive(Debug, Error)]
pub enum HealthCheckError {
    #[error("Health probe failed: {0}")]
    Probe(String),

    #[error("Backend unreachable: {0}")]
    Unreachable(String),
}

/// A pluggable health check.
pub trait HealthProvider: Send + Sync {
    /// Whether this provider can run in the current process.
    fn is_supported(&self) -> bool {
        true
    }

    fn name(&self) -> &str;

    fn health(&self) -> Result<HealthStatus, HealthCheckError>;
}

/// Combine statuses with DOWN > UP > UNKNOWN precedence.
///
/// An empty input is UP.
pub fn combine<'a, I>(statuses: I) -> Status
where
    I: IntoIterator<Item = &'a Status>,
{
    let mut seen_any = false;
    let mut seen_up = false;
    for status in statuses {
        seen_any = true;
        match status {
            Status::Down => return Status::Down,
            Status::Up => seen_up = true,
            Status::Unknown => {}
        }
    }
    if !seen_any || seen_up {
        Status::Up
    } else {
        Status::Unknown
    }
}

/// Run one provider, turning errors and panics into DOWN.
pub fn check(provider: &dyn HealthProvider) -> HealthStatus {
    match catch_unwind(AssertUnwindSafe(|| provider.health())) {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => {
            tracing::warn!(provider = provider.name(), error = %e, "health check failed");
            HealthStatus::failed(e.to_string())
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::warn!(provider = provider.name(), error = %message, "health check panicked");
            HealthStatus::failed(message)
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "health check panicked".to_string()
    }
}

/// Aggregate a set of providers into a summary.
pub fn aggregate(providers: &[Arc<dyn HealthProvider>]) -> HealthSummary {
    let details: BTreeMap<String, HealthStatus> = providers
        .iter()
        .filter(|p| p.is_supported())
        .map(|p| (p.name().to_string(), check(p.as_ref())))
        .collect();

    HealthSummary {
        status: combine(details.values().map(|s| &s.status)),
        details,
    }
}

/// Registered health providers, in registration order.
#[derive(Default)]
pub struct HealthRegistry {
    providers: RwLock<Vec<Arc<dyn HealthProvider>>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, provider: Arc<dyn HealthProvider>) {
        self.providers.write().push(provider);
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Compute the current health summary.
    pub fn aggregate(&self) -> HealthSummary {
        let providers = self.providers.read().clone();
        aggregate(&providers)
    }
}

/// Health provider backed by a closure.
pub struct FnHealthProvider<F> {
    name: String,
    check: F,
}

impl<F> FnHealthProvider<F>
where
    F: Fn() -> Result<HealthStatus, HealthCheckError> + Send + Sync,
{
    pub fn new(name: impl Into<String>, check: F) -> Self {
        Self {
            name: name.into(),
            check,
        }
    }
}

impl<F> HealthProvider for FnHealthProvider<F>
where
    F: Fn() -> Result<HealthStatus, HealthCheckError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn health(&self) -> Result<HealthStatus, HealthCheckError> {
        (self.check)()
    }
}
