//! Actuator configuration loading from environment variables.
//!
//! All configuration values are loaded from `GG_ACTUATOR_*` environment
//! variables with sensible defaults. Invalid values fall back to defaults
//! without crashing.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |---|---|---|
//! | `GG_ACTUATOR_APP_NAME` | gg-app | Application name |
//! | `GG_ACTUATOR_APP_DESCRIPTION` | unset | Application description |
//! | `GG_ACTUATOR_ENDPOINT_URL` | http://localhost:8000/actuator | Management base URL |
//! | `GG_ACTUATOR_APP_URL` | http://localhost:8000 | Service URL |
//! | `GG_ACTUATOR_LOGFILE_MAX_SIZE` | 10485760 | Log ring capacity (bytes) |
//! | `GG_ACTUATOR_REGISTRATION_URL` | unset | Console endpoint; unset disables the heartbeat |
//! | `GG_ACTUATOR_REGISTRATION_INTERVAL` | 10 | Heartbeat interval (secs) |
//! | `GG_ACTUATOR_REGISTRATION_INITIAL_DELAY` | interval | First heartbeat delay (secs) |
//! | `GG_ACTUATOR_REGISTRATION_TIMEOUT` | 5 | Heartbeat HTTP timeout (secs) |
//! | `GG_ACTUATOR_REGISTRATION_USER` | unset | Basic-auth user |
//! | `GG_ACTUATOR_REGISTRATION_PASSWORD` | unset | Basic-auth password |
//! | `GG_ACTUATOR_REGISTRATION_NO_CERT` | unset | Any value disables TLS verification |
//! | `GG_ACTUATOR_FREE_DISK_THRESHOLD` | 1048576 | Disk-space DOWN threshold (bytes) |

use std::time::Duration;

use crate::health::DEFAULT_FREE_BYTES_THRESHOLD;
use crate::logfile::DEFAULT_LOGFILE_MAX_SIZE;
use crate::registration::{BasicAuth, RegistrationConfig};

const MIN_LOGFILE_SIZE: usize = 1024;

/// Heartbeat settings loaded from env.
#[derive(Debug, Clone)]
pub struct RegistrationEnvConfig {
    pub url: String,
    pub interval: Duration,
    pub initial_delay: Duration,
    pub timeout: Duration,
    pub user: Option<String>,
    pub password: Option<String>,
    pub no_cert: bool,
}

/// All actuator configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ActuatorConfig {
    pub app_name: String,
    pub app_description: Option<String>,
    /// No trailing slash.
    pub endpoint_url: String,
    /// Always ends with a slash.
    pub app_url: String,
    pub logfile_max_size: usize,
    pub free_disk_threshold: u64,
    pub registration: Option<RegistrationEnvConfig>,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            app_name: "gg-app".to_string(),
            app_description: None,
            endpoint_url: "http://localhost:8000/actuator".to_string(),
            app_url: "http://localhost:8000/".to_string(),
            logfile_max_size: DEFAULT_LOGFILE_MAX_SIZE,
            free_disk_threshold: DEFAULT_FREE_BYTES_THRESHOLD,
            registration: None,
        }
    }
}

impl ActuatorConfig {
    /// Heartbeat configuration, if a registration URL is set.
    pub fn registration_config(&self) -> Option<RegistrationConfig> {
        let reg = self.registration.as_ref()?;
        let mut config = RegistrationConfig::new(
            reg.url.clone(),
            self.app_name.clone(),
            self.endpoint_url.clone(),
            self.app_url.clone(),
        )
        .with_interval(reg.interval)
        .with_initial_delay(reg.initial_delay)
        .with_timeout(reg.timeout);
        if let Some(user) = &reg.user {
            config = config.with_auth(BasicAuth::new(user.clone(), reg.password.as_deref()));
        }
        config.accept_invalid_certs = reg.no_cert;
        Some(config)
    }
}

/// Parse a `usize` env var, returning `default` on missing or invalid.
fn parse_usize(key: &str, default: usize) -> usize {
    match std::env::var(key) {
        Ok(val) => val.parse::<usize>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Parse a `u64` env var, returning `default` on missing or invalid.
fn parse_u64(key: &str, default: u64) -> u64 {
    match std::env::var(key) {
        Ok(val) => val.parse::<u64>().unwrap_or(default),
        Err(_) => default,
    }
}

/// Non-empty string env var.
fn parse_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Load heartbeat configuration from environment.
fn load_registration_config() -> Option<RegistrationEnvConfig> {
    let url = parse_string("GG_ACTUATOR_REGISTRATION_URL")?;
    let interval = parse_u64("GG_ACTUATOR_REGISTRATION_INTERVAL", 10).max(1);
    let initial_delay = parse_u64("GG_ACTUATOR_REGISTRATION_INITIAL_DELAY", interval);
    let timeout = parse_u64("GG_ACTUATOR_REGISTRATION_TIMEOUT", 5).max(1);

    Some(RegistrationEnvConfig {
        url,
        interval: Duration::from_secs(interval),
        initial_delay: Duration::from_secs(initial_delay),
        timeout: Duration::from_secs(timeout),
        user: parse_string("GG_ACTUATOR_REGISTRATION_USER"),
        password: std::env::var("GG_ACTUATOR_REGISTRATION_PASSWORD").ok(),
        no_cert: std::env::var_os("GG_ACTUATOR_REGISTRATION_NO_CERT").is_some(),
    })
}

/// Load all configuration from environment variables.
///
/// Missing or invalid values fall back to safe defaults without panicking.
pub fn load() -> ActuatorConfig {
    let defaults = ActuatorConfig::default();

    let endpoint_url = parse_string("GG_ACTUATOR_ENDPOINT_URL")
        .unwrap_or(defaults.endpoint_url)
        .trim_end_matches('/')
        .to_string();
    let mut app_url = parse_string("GG_ACTUATOR_APP_URL").unwrap_or(defaults.app_url);
    if !app_url.ends_with('/') {
        app_url.push('/');
    }
    let logfile_max_size =
        parse_usize("GG_ACTUATOR_LOGFILE_MAX_SIZE", DEFAULT_LOGFILE_MAX_SIZE).max(MIN_LOGFILE_SIZE);

    ActuatorConfig {
        app_name: parse_string("GG_ACTUATOR_APP_NAME").unwrap_or(defaults.app_name),
        app_description: parse_string("GG_ACTUATOR_APP_DESCRIPTION"),
        endpoint_url,
        app_url,
        logfile_max_size,
        free_disk_threshold: parse_u64("GG_ACTUATOR_FREE_DISK_THRESHOLD", DEFAULT_FREE_BYTES_THRESHOLD),
        registration: load_registration_config(),
    }
}
