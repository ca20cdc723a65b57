//! GG Actuator
//!
//! An in-process operability core. The host application embeds an
//! [`Actuator`] to expose its own runtime state to a monitoring console:
//! health, metrics, recent logs, logger levels, HTTP request history, thread
//! stacks, environment and build info. A separate [`RegistrationHeartbeat`]
//! keeps the console informed that this instance is alive.
//!
//! # Boundaries
//!
//! - No HTTP server: the host's web layer calls the facade methods and
//!   serializes their results.
//! - Logs live only in a fixed in-memory window.
//! - Registration is a unicast heartbeat to one configured endpoint.

pub mod config;
pub mod environment;
pub mod error;
pub mod health;
pub mod httptrace;
pub mod info;
pub mod logfile;
pub mod loggers;
pub mod metrics;
pub mod registration;
pub mod scrubber;
pub mod telemetry;
pub mod threads;

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use config::ActuatorConfig;
pub use error::ActuatorError;
pub use registration::{RegistrationError, RegistrationHeartbeat};

use environment::{EnvironmentData, EnvironmentProvider, OsEnvironmentProvider};
use health::{DiskSpaceHealthProvider, HealthProvider, HealthRegistry, HealthSummary};
use httptrace::{HttpTracer, TraceRecord, Traces};
use info::{AppInfo, BuildInfo, GitInfo};
use logfile::{LogRingBuffer, LogfileResponse};
use loggers::{ConsoleLevel, LoggerLevelBridge, LoggerLevels, LoggersData};
use metrics::{MemoryMetricsProvider, Metric, MetricNames, MetricsProvider, MetricsRegistry, ThreadMetricsProvider};
use scrubber::SecretScrubber;
use threads::{ThreadDump, ThreadSnapshotProvider};

/// Endpoint names published under the management URL.
pub const ENDPOINTS: [&str; 9] = [
    "env",
    "info",
    "health",
    "metrics",
    "loggers",
    "dump",
    "threaddump",
    "logfile",
    "httptrace",
];

/// Canonical endpoint for a requested name, resolving the `dump` and
/// `trace` aliases.
pub fn canonical_endpoint(name: &str) -> Option<&'static str> {
    match name {
        "dump" => Some("threaddump"),
        "trace" => Some("httptrace"),
        other => ENDPOINTS.iter().copied().find(|e| *e == other),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub templated: bool,
}

/// Discovery document listing every endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointLinks {
    #[serde(rename = "_links")]
    pub links: BTreeMap<String, Link>,
}

/// The actuator instance: every store and provider registry in one place.
pub struct Actuator {
    config: ActuatorConfig,
    log_buffer: Arc<LogRingBuffer>,
    loggers: Arc<LoggerLevelBridge>,
    tracer: HttpTracer,
    health: HealthRegistry,
    metrics: MetricsRegistry,
    threads: ThreadSnapshotProvider,
    scrubber: SecretScrubber,
    environment: RwLock<Vec<Arc<dyn EnvironmentProvider>>>,
    app_info: RwLock<AppInfo>,
    additional_info: RwLock<Map<String, Value>>,
}

impl Actuator {
    /// Create an actuator with empty provider registries.
    pub fn new(config: ActuatorConfig) -> Self {
        let app_info = AppInfo::new(config.app_name.clone(), config.app_description.clone());
        Self {
            log_buffer: Arc::new(LogRingBuffer::new(config.logfile_max_size)),
            loggers: Arc::new(LoggerLevelBridge::new(ConsoleLevel::Info)),
            tracer: HttpTracer::new(),
            health: HealthRegistry::new(),
            metrics: MetricsRegistry::new(),
            threads: ThreadSnapshotProvider::new(),
            scrubber: SecretScrubber::new(),
            environment: RwLock::new(Vec::new()),
            app_info: RwLock::new(app_info),
            additional_info: RwLock::new(Map::new()),
            config,
        }
    }

    /// Create an actuator with the built-in providers registered: disk
    /// space health, memory and thread metrics, process environment.
    pub fn with_builtin_providers(config: ActuatorConfig) -> Self {
        let actuator = Self::new(config);

        match DiskSpaceHealthProvider::for_current_dir(actuator.config.free_disk_threshold) {
            Some(disk) => actuator.register_health_provider(Arc::new(disk)),
            None => tracing::debug!("no disk found for working directory, skipping diskSpace"),
        }
        match MemoryMetricsProvider::new() {
            Some(memory) => actuator.register_metrics_provider(Arc::new(memory)),
            None => tracing::debug!("process memory not inspectable, skipping memory metrics"),
        }
        actuator.register_metrics_provider(Arc::new(ThreadMetricsProvider::new()));
        actuator.register_environment_provider(Arc::new(OsEnvironmentProvider::new()));

        actuator
    }

    pub fn config(&self) -> &ActuatorConfig {
        &self.config
    }

    pub fn log_buffer(&self) -> Arc<LogRingBuffer> {
        Arc::clone(&self.log_buffer)
    }

    pub fn logger_bridge(&self) -> Arc<LoggerLevelBridge> {
        Arc::clone(&self.loggers)
    }

    pub fn register_health_provider(&self, provider: Arc<dyn HealthProvider>) {
        self.health.register(provider);
    }

    pub fn register_metrics_provider(&self, provider: Arc<dyn MetricsProvider>) {
        self.metrics.register(provider);
    }

    pub fn register_environment_provider(&self, provider: Arc<dyn EnvironmentProvider>) {
        self.environment.write().push(provider);
    }

    pub fn set_build_info(&self, build: BuildInfo) {
        self.app_info.write().build = Some(build);
    }

    pub fn set_git_info(&self, git: GitInfo) {
        self.app_info.write().git = Some(git);
    }

    /// Extra top-level entries for the info document.
    pub fn set_additional_info(&self, additional: Map<String, Value>) {
        *self.additional_info.write() = additional;
    }

    /// Feed one exchange observed by the HTTP layer.
    pub fn record_trace(&self, record: TraceRecord) {
        self.tracer.record(record);
    }

    /// Append a line to the logfile directly, bypassing tracing.
    pub fn append_log(&self, line: &str) {
        self.log_buffer.append(line);
    }

    // =========================================================================
    // Endpoints
    // =========================================================================

    pub fn endpoint_links(&self) -> EndpointLinks {
        let base = &self.config.endpoint_url;
        let mut links = BTreeMap::new();
        links.insert(
            "self".to_string(),
            Link {
                href: base.clone(),
                templated: false,
            },
        );
        for name in ENDPOINTS {
            links.insert(
                name.to_string(),
                Link {
                    href: format!("{}/{}", base, name),
                    templated: false,
                },
            );
        }
        EndpointLinks { links }
    }

    pub fn health(&self) -> HealthSummary {
        self.health.aggregate()
    }

    pub fn metric_names(&self) -> MetricNames {
        self.metrics.names()
    }

    pub fn metric(&self, name: &str) -> Result<Metric, ActuatorError> {
        self.metrics.measure(name)
    }

    pub fn loggers(&self) -> LoggersData {
        self.loggers.list()
    }

    pub fn logger(&self, name: &str) -> Result<LoggerLevels, ActuatorError> {
        self.loggers.logger(name)
    }

    /// `None` switches the logger off.
    pub fn set_logger_level(&self, name: &str, level: Option<&str>) -> Result<(), ActuatorError> {
        self.loggers.set_level_str(name, level)
    }

    pub fn thread_dump(&self) -> ThreadDump {
        self.threads.snapshot()
    }

    /// Whole logfile window, or the part named by a `Range` header.
    pub fn logfile(&self, range: Option<&str>) -> Result<LogfileResponse, ActuatorError> {
        match range {
            Some(header) => Ok(LogfileResponse {
                slice: self.log_buffer.range_request(header)?,
                partial: true,
            }),
            None => Ok(LogfileResponse {
                slice: self.log_buffer.slice(None, None),
                partial: false,
            }),
        }
    }

    pub fn http_trace(&self) -> Traces {
        self.tracer.traces()
    }

    pub fn environment(&self) -> EnvironmentData {
        let property_sources = self
            .environment
            .read()
            .iter()
            .map(|provider| provider.properties_source(&self.scrubber))
            .collect();
        EnvironmentData {
            active_profiles: Vec::new(),
            property_sources,
        }
    }

    pub fn info(&self) -> Value {
        self.app_info.read().document(&self.additional_info.read())
    }

    /// Heartbeat for the configured console, if registration is enabled.
    /// The caller starts it.
    pub fn registration_heartbeat(&self) -> Option<Result<RegistrationHeartbeat, RegistrationError>> {
        self.config
            .registration_config()
            .map(RegistrationHeartbeat::new)
    }
}

impl Default for Actuator {
    fn default() -> Self {
        Self::new(ActuatorConfig::default())
    }
}
