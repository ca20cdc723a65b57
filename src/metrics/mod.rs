//! Metric providers and name resolution.
//!
//! Each provider owns a name prefix (`memory.`, `thread.`, ...). A metric name
//! resolves to the first registered provider whose prefix starts the name,
//! so when two prefixes overlap the provider registered earlier always wins.

mod memory;
mod store;
mod thread;

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::ActuatorError;

pub use memory::MemoryMetricsProvider;
pub use store::{HistogramSummary, MetricsSnapshot, MetricsStore};
pub use thread::ThreadMetricsProvider;

/// Kind of a single measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Statistic {
    Total,
    TotalTime,
    Count,
    Max,
    Value,
    Unknown,
    ActiveTasks,
    Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub statistic: Statistic,
    pub value: f64,
}

impl Measurement {
    pub fn new(statistic: Statistic, value: f64) -> Self {
        Self { statistic, value }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTag {
    pub tag: String,
    pub values: Vec<String>,
}

/// A named metric with its current measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub name: String,
    pub description: Option<String>,
    pub base_unit: String,
    pub measurements: Vec<Measurement>,
    pub available_tags: Vec<MetricTag>,
}

impl Metric {
    pub fn new(name: impl Into<String>, base_unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            base_unit: base_unit.into(),
            measurements: Vec::new(),
            available_tags: Vec::new(),
        }
    }

    pub fn with_measurement(mut self, statistic: Statistic, value: f64) -> Self {
        self.measurements.push(Measurement::new(statistic, value));
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Payload of the metrics listing endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricNames {
    pub names: Vec<String>,
}

/// A pluggable source of metrics under one name prefix.
pub trait MetricsProvider: Send + Sync {
    fn prefix(&self) -> &str;

    /// Whether this provider can report anything in the current process.
    fn is_supported(&self) -> bool {
        true
    }

    /// Full names (prefix included) this provider can measure.
    fn supported_names(&self) -> Vec<String>;

    /// Measure one metric. `None` if the name is not one of ours.
    fn metric(&self, name: &str) -> Option<Metric>;
}

/// Registered metric providers, in registration order.
#[derive(Default)]
pub struct MetricsRegistry {
    providers: RwLock<Vec<Arc<dyn MetricsProvider>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, provider: Arc<dyn MetricsProvider>) {
        self.providers.write().push(provider);
    }

    /// All metric names, grouped by provider in registration order.
    pub fn names(&self) -> MetricNames {
        let providers = self.providers.read();
        let names = providers
            .iter()
            .filter(|p| p.is_supported())
            .flat_map(|p| p.supported_names())
            .collect();
        MetricNames { names }
    }

    /// Measure a metric through the first provider owning its prefix.
    pub fn measure(&self, name: &str) -> Result<Metric, ActuatorError> {
        let provider = {
            let providers = self.providers.read();
            providers
                .iter()
                .find(|p| p.is_supported() && name.starts_with(p.prefix()))
                .cloned()
        };

        provider
            .and_then(|p| p.metric(name))
            .ok_or_else(|| ActuatorError::MetricNotFound(name.to_string()))
    }
}
