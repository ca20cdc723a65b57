//! Periodic self-registration with the monitoring console.
//!
//! One Tokio task per running heartbeat. Each tick POSTs the registration
//! payload; failures are logged and the schedule carries on at the fixed
//! interval. `stop()` cancels future ticks only: an attempt already in flight
//! runs to completion (bounded by the client timeout).

mod auth;

pub use auth::BasicAuth;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::telemetry::{HeartbeatSpan, SpanExt};

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("Registration request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registration rejected with status {0}")]
    Status(u16),

    #[error("Invalid registration response: {0}")]
    InvalidResponse(String),

    #[error("Unsupported registration URL: {0}")]
    UnsupportedScheme(String),

    #[error("No Tokio runtime available for the heartbeat")]
    NoRuntime,
}

/// Everything the heartbeat needs to announce this instance.
#[derive(Debug, Clone)]
pub struct RegistrationConfig {
    pub registration_url: String,
    pub app_name: String,
    /// Management base URL; the health URL is derived from it.
    pub management_url: String,
    pub service_url: String,
    pub interval: Duration,
    pub initial_delay: Duration,
    pub timeout: Duration,
    pub auth: Option<BasicAuth>,
    /// Skip TLS certificate verification for console calls.
    pub accept_invalid_certs: bool,
    /// Extra entries merged into the payload's `metadata`.
    pub metadata: Map<String, Value>,
}

impl RegistrationConfig {
    pub fn new(
        registration_url: impl Into<String>,
        app_name: impl Into<String>,
        management_url: impl Into<String>,
        service_url: impl Into<String>,
    ) -> Self {
        Self {
            registration_url: registration_url.into(),
            app_name: app_name.into(),
            management_url: management_url.into(),
            service_url: service_url.into(),
            interval: Duration::from_secs(10),
            initial_delay: Duration::from_secs(10),
            timeout: Duration::from_secs(5),
            auth: None,
            accept_invalid_certs: false,
            metadata: Map::new(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_auth(mut self, auth: BasicAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Outbound registration body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationPayload {
    pub name: String,
    pub management_url: String,
    pub health_url: String,
    pub service_url: String,
    pub metadata: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RegistrationResponse {
    id: String,
}

struct HeartbeatState {
    config: RegistrationConfig,
    client: reqwest::Client,
    startup: DateTime<Utc>,
    running: AtomicBool,
    instance_id: Mutex<Option<String>>,
}

/// Background client that keeps the console informed of this instance.
pub struct RegistrationHeartbeat {
    state: Arc<HeartbeatState>,
    cancel: Mutex<Option<CancellationToken>>,
}

impl RegistrationHeartbeat {
    pub fn new(config: RegistrationConfig) -> Result<Self, RegistrationError> {
        let url = reqwest::Url::parse(&config.registration_url)
            .map_err(|_| RegistrationError::UnsupportedScheme(config.registration_url.clone()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RegistrationError::UnsupportedScheme(url.scheme().to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()?;

        Ok(Self {
            state: Arc::new(HeartbeatState {
                config,
                client,
                startup: Utc::now(),
                running: AtomicBool::new(false),
                instance_id: Mutex::new(None),
            }),
            cancel: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &RegistrationConfig {
        &self.state.config
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Id issued by the console on the last successful registration.
    pub fn instance_id(&self) -> Option<String> {
        self.state.instance_id.lock().clone()
    }

    /// The body the next attempt will send.
    pub fn payload(&self) -> RegistrationPayload {
        self.state.payload()
    }

    /// Begin ticking on the current Tokio runtime. A second call while
    /// running is a no-op.
    pub fn start(&self) -> Result<(), RegistrationError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| RegistrationError::NoRuntime)?;

        let mut cancel = self.cancel.lock();
        if self.state.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let token = CancellationToken::new();
        *cancel = Some(token.clone());

        let state = Arc::clone(&self.state);
        handle.spawn(async move {
            let mut delay = state.config.initial_delay;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
                if !state.running.load(Ordering::SeqCst) {
                    break;
                }
                state.attempt().await;
                delay = state.config.interval;
            }
            tracing::debug!(registration_url = %state.config.registration_url, "heartbeat stopped");
        });

        tracing::info!(
            registration_url = %self.state.config.registration_url,
            interval_ms = self.state.config.interval.as_millis() as u64,
            "registration heartbeat started"
        );
        Ok(())
    }

    /// Cancel future ticks. Idempotent.
    pub fn stop(&self) {
        self.state.running.store(false, Ordering::SeqCst);
        if let Some(token) = self.cancel.lock().take() {
            token.cancel();
        }
    }

    /// One registration attempt, outside the schedule.
    pub async fn register_once(&self) -> Result<String, RegistrationError> {
        self.state.register().await
    }

    /// Best-effort removal from the console. Without a prior successful
    /// registration this does nothing; failures are logged, never returned.
    pub async fn deregister(&self) {
        let Some(id) = self.instance_id() else {
            tracing::debug!("no instance id, skipping deregistration");
            return;
        };

        let url = format!(
            "{}/{}",
            self.state.config.registration_url.trim_end_matches('/'),
            id
        );
        let mut request = self.state.client.delete(&url);
        if let Some(auth) = &self.state.config.auth {
            request = request.header(reqwest::header::AUTHORIZATION, auth.header_value());
        }

        match request.send().await {
            Ok(response) if response.status().is_success() => {
                self.state.instance_id.lock().take();
                tracing::info!(instance_id = %id, "deregistered from console");
            }
            Ok(response) => {
                tracing::warn!(
                    registration_url = %url,
                    status = response.status().as_u16(),
                    "deregistration rejected"
                );
            }
            Err(e) => {
                tracing::warn!(registration_url = %url, error = %e, "deregistration failed");
            }
        }
    }
}

impl Drop for RegistrationHeartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

impl HeartbeatState {
    fn payload(&self) -> RegistrationPayload {
        let mut metadata = Map::new();
        metadata.insert(
            "startup".to_string(),
            Value::String(self.startup.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        for (key, value) in &self.config.metadata {
            metadata.insert(key.clone(), value.clone());
        }

        let management_url = self.config.management_url.trim_end_matches('/').to_string();
        let mut service_url = self.config.service_url.clone();
        if !service_url.ends_with('/') {
            service_url.push('/');
        }

        RegistrationPayload {
            name: self.config.app_name.clone(),
            health_url: format!("{}/health", management_url),
            management_url,
            service_url,
            metadata,
        }
    }

    async fn register(&self) -> Result<String, RegistrationError> {
        let mut request = self
            .client
            .post(&self.config.registration_url)
            .json(&self.payload());
        if let Some(auth) = &self.config.auth {
            request = request.header(reqwest::header::AUTHORIZATION, auth.header_value());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(RegistrationError::Status(status.as_u16()));
        }

        let body: RegistrationResponse = response
            .json()
            .await
            .map_err(|e| RegistrationError::InvalidResponse(e.to_string()))?;
        *self.instance_id.lock() = Some(body.id.clone());
        Ok(body.id)
    }

    async fn attempt(&self) {
        let span = HeartbeatSpan::new(&self.config.registration_url);
        let result = self.register().await;
        span.record_result(&result);

        match result {
            Ok(id) => {
                span.record("instance_id", id.as_str());
                tracing::debug!(parent: &span, instance_id = %id, "registered with console");
            }
            Err(e) => {
                tracing::warn!(
                    parent: &span,
                    registration_url = %self.config.registration_url,
                    error = %e,
                    "registration attempt failed"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RegistrationConfig {
        RegistrationConfig::new(
            "http://console.local/instances",
            "orders",
            "http://orders.local/actuator/",
            "http://orders.local",
        )
    }

    #[test]
    fn test_payload_shape() {
        let heartbeat =
            RegistrationHeartbeat::new(config().with_metadata("zone", Value::from("eu-1"))).unwrap();
        let payload = heartbeat.payload();

        assert_eq!(payload.name, "orders");
        assert_eq!(payload.management_url, "http://orders.local/actuator");
        assert_eq!(payload.health_url, "http://orders.local/actuator/health");
        assert_eq!(payload.service_url, "http://orders.local/");
        assert!(payload.metadata["startup"].as_str().unwrap().ends_with('Z'));
        assert_eq!(payload.metadata["zone"], "eu-1");

        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("managementUrl").is_some());
        assert!(json.get("healthUrl").is_some());
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let mut cfg = config();
        cfg.registration_url = "ftp://console.local/instances".to_string();
        assert!(matches!(
            RegistrationHeartbeat::new(cfg),
            Err(RegistrationError::UnsupportedScheme(_))
        ));
    }

    #[test]
    fn test_start_without_runtime_fails() {
        let heartbeat = RegistrationHeartbeat::new(config()).unwrap();
        assert!(matches!(heartbeat.start(), Err(RegistrationError::NoRuntime)));
        assert!(!heartbeat.is_running());
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let heartbeat = RegistrationHeartbeat::new(config()).unwrap();
        heartbeat.start().unwrap();
        assert!(heartbeat.is_running());
        heartbeat.stop();
        heartbeat.stop();
        assert!(!heartbeat.is_running());
    }
}
