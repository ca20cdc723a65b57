//! Thread count metric.

use super::{Metric, MetricsProvider, Statistic};
use crate::threads::ThreadSnapshotProvider;

const PREFIX: &str = "thread.";
const THREAD_COUNT: &str = "thread.count";

/// Number of live threads in the process.
#[derive(Debug, Default, Clone)]
pub struct ThreadMetricsProvider {
    threads: ThreadSnapshotProvider,
}

impl ThreadMetricsProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetricsProvider for ThreadMetricsProvider {
    fn prefix(&self) -> &str {
        PREFIX
    }

    fn supported_names(&self) -> Vec<String> {
        vec![THREAD_COUNT.to_string()]
    }

    fn metric(&self, name: &str) -> Option<Metric> {
        if name != THREAD_COUNT {
            return None;
        }
        let count = self.threads.thread_count();
        Some(Metric::new(name, "Integer").with_measurement(Statistic::Count, count as f64))
    }
}
