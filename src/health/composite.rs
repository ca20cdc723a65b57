//! Grouping of several providers under one name.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::{aggregate, HealthCheckError, HealthProvider, HealthStatus};

/// A provider whose status is the aggregate of its children.
///
/// Children that are unsupported are skipped, exactly as in the top-level
/// summary, so composites nest to any depth.
pub struct CompositeHealthProvider {
    name: String,
    providers: Vec<Arc<dyn HealthProvider>>,
}

impl CompositeHealthProvider {
    pub fn new(name: impl Into<String>, providers: Vec<Arc<dyn HealthProvider>>) -> Self {
        Self {
            name: name.into(),
            providers,
        }
    }
}

impl HealthProvider for CompositeHealthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn health(&self) -> Result<HealthStatus, HealthCheckError> {
        let summary = aggregate(&self.providers);
        let details: Map<String, Value> = summary
            .details
            .into_iter()
            .map(|(name, status)| {
                serde_json::to_value(status)
                    .map(|value| (name, value))
                    .map_err(|e| HealthCheckError::Probe(e.to_string()))
            })
            .collect::<Result<_, _>>()?;

        Ok(HealthStatus {
            status: summary.status,
            details,
        })
    }
}
