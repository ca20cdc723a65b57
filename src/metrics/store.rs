//! Application-recorded metrics exposed as a provider.
//!
//! The host application records counters, gauges and histograms under a
//! prefix of its choosing; the console reads them like any other metric.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{Metric, MetricsProvider, Statistic};

/// Snapshot of all recorded values at a point in time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub counters: BTreeMap<String, u64>,
    pub gauges: BTreeMap<String, f64>,
    pub histograms: BTreeMap<String, HistogramSummary>,
}

/// Summary statistics for a histogram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramSummary {
    pub count: u64,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
}

/// Histogram with f64 bits packed into atomics.
struct HistogramData {
    count: AtomicU64,
    sum: AtomicU64,
    min: AtomicU64,
    max: AtomicU64,
}

impl HistogramData {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            sum: AtomicU64::new(f64::to_bits(0.0)),
            min: AtomicU64::new(f64::to_bits(f64::MAX)),
            max: AtomicU64::new(f64::to_bits(f64::MIN)),
        }
    }

    fn record(&self, value: f64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        update_f64(&self.sum, |current| Some(current + value));
        update_f64(&self.min, |current| (value < current).then_some(value));
        update_f64(&self.max, |current| (value > current).then_some(value));
    }

    fn summary(&self) -> HistogramSummary {
        let count = self.count.load(Ordering::Relaxed);
        let load = |a: &AtomicU64| f64::from_bits(a.load(Ordering::Relaxed));
        HistogramSummary {
            count,
            sum: load(&self.sum),
            min: if count == 0 { 0.0 } else { load(&self.min) },
            max: if count == 0 { 0.0 } else { load(&self.max) },
        }
    }
}

/// CAS loop over an f64 stored as bits. `next` returns `None` to keep the
/// current value.
fn update_f64(atomic: &AtomicU64, next: impl Fn(f64) -> Option<f64>) {
    let _ = atomic.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |bits| {
        next(f64::from_bits(bits)).map(f64::to_bits)
    });
}

/// Thread-safe store of application metrics under one prefix.
pub struct MetricsStore {
    prefix: String,
    counters: RwLock<BTreeMap<String, AtomicU64>>,
    gauges: RwLock<BTreeMap<String, AtomicU64>>,
    histograms: RwLock<BTreeMap<String, HistogramData>>,
}

impl MetricsStore {
    /// Create an empty store. Recorded names are exposed as `prefix + name`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counters: RwLock::new(BTreeMap::new()),
            gauges: RwLock::new(BTreeMap::new()),
            histograms: RwLock::new(BTreeMap::new()),
        }
    }

    /// Increment a counter by the given value.
    pub fn increment_counter(&self, name: &str, value: u64) {
        if let Some(counter) = self.counters.read().get(name) {
            counter.fetch_add(value, Ordering::Relaxed);
            return;
        }
        self.counters
            .write()
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(value, Ordering::Relaxed);
    }

    /// Set a gauge to the given value.
    pub fn set_gauge(&self, name: &str, value: f64) {
        if let Some(gauge) = self.gauges.read().get(name) {
            gauge.store(f64::to_bits(value), Ordering::Relaxed);
            return;
        }
        self.gauges
            .write()
            .entry(name.to_string())
            .or_insert_with(|| AtomicU64::new(0))
            .store(f64::to_bits(value), Ordering::Relaxed);
    }

    /// Record a histogram observation.
    pub fn record_histogram(&self, name: &str, value: f64) {
        if let Some(histogram) = self.histograms.read().get(name) {
            histogram.record(value);
            return;
        }
        self.histograms
            .write()
            .entry(name.to_string())
            .or_insert_with(HistogramData::new)
            .record(value);
    }

    /// Take a snapshot of all recorded values.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.load(Ordering::Relaxed)))
                .collect(),
            gauges: self
                .gauges
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), f64::from_bits(v.load(Ordering::Relaxed))))
                .collect(),
            histograms: self
                .histograms
                .read()
                .iter()
                .map(|(k, v)| (k.clone(), v.summary()))
                .collect(),
        }
    }
}

impl MetricsProvider for MetricsStore {
    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn supported_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        names.extend(self.counters.read().keys().cloned());
        names.extend(self.gauges.read().keys().cloned());
        names.extend(self.histograms.read().keys().cloned());
        names.sort();
        names.dedup();
        names
            .into_iter()
            .map(|n| format!("{}{}", self.prefix, n))
            .collect()
    }

    fn metric(&self, name: &str) -> Option<Metric> {
        let leaf = name.strip_prefix(self.prefix.as_str())?;

        if let Some(counter) = self.counters.read().get(leaf) {
            return Some(
                Metric::new(name, "Integer")
                    .with_measurement(Statistic::Count, counter.load(Ordering::Relaxed) as f64),
            );
        }
        if let Some(gauge) = self.gauges.read().get(leaf) {
            return Some(
                Metric::new(name, "Float")
                    .with_measurement(Statistic::Value, f64::from_bits(gauge.load(Ordering::Relaxed))),
            );
        }
        let histograms = self.histograms.read();
        let summary = histograms.get(leaf)?.summary();
        Some(
            Metric::new(name, "Float")
                .with_measurement(Statistic::Count, summary.count as f64)
                .with_measurement(Statistic::Total, summary.sum)
                .with_measurement(Statistic::Max, summary.max),
        )
    }
}
