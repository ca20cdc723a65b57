//! Runtime logger levels for GG-ACTUATOR.
//!
//! The host logging system is `tracing`: every target that registers a
//! callsite becomes a logger, along with its `::`-separated ancestors. Levels
//! live on a numeric severity scale (TRACE 5, DEBUG 10, INFO 20, WARN 30,
//! ERROR 40). Each console level owns the half-open range
//! `(exclusive_lower, inclusive_upper]` of that scale, and threshold `0`
//! means the logger is off.
//!
//! Setting a logger to `OFF` silences that logger only. Silencing the whole
//! process is a separate, explicit operation: [`LoggerLevelBridge::set_global_kill_switch`].

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::subscriber::Interest;
use tracing::{Level, Metadata, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::error::ActuatorError;

/// Name under which the default threshold is listed and configured.
pub const ROOT_LOGGER: &str = "ROOT";

/// Threshold value meaning "logger is off".
pub const OFF_THRESHOLD: u8 = 0;

pub const TRACE_SEVERITY: u8 = 5;
pub const DEBUG_SEVERITY: u8 = 10;
pub const INFO_SEVERITY: u8 = 20;
pub const WARN_SEVERITY: u8 = 30;
pub const ERROR_SEVERITY: u8 = 40;

/// Level vocabulary of the monitoring console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsoleLevel {
    Debug,
    Info,
    Warn,
    Error,
    Off,
}

impl ConsoleLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
            Self::Off => "OFF",
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConsoleLevel {
    type Err = ActuatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DEBUG" => Ok(Self::Debug),
            "INFO" => Ok(Self::Info),
            "WARN" => Ok(Self::Warn),
            "ERROR" => Ok(Self::Error),
            "OFF" => Ok(Self::Off),
            _ => Err(ActuatorError::UnknownLevel(s.to_string())),
        }
    }
}

struct LevelMapping {
    console: ConsoleLevel,
    host: u8,
    exclusive_lower: i16,
}

/// Console/host mapping, scanned in this order.
const LEVEL_MAPPING: [LevelMapping; 5] = [
    LevelMapping { console: ConsoleLevel::Debug, host: DEBUG_SEVERITY, exclusive_lower: 0 },
    LevelMapping { console: ConsoleLevel::Info, host: INFO_SEVERITY, exclusive_lower: DEBUG_SEVERITY as i16 },
    LevelMapping { console: ConsoleLevel::Warn, host: WARN_SEVERITY, exclusive_lower: INFO_SEVERITY as i16 },
    LevelMapping { console: ConsoleLevel::Error, host: ERROR_SEVERITY, exclusive_lower: WARN_SEVERITY as i16 },
    LevelMapping { console: ConsoleLevel::Off, host: OFF_THRESHOLD, exclusive_lower: -1 },
];

/// Console name for a host threshold, or the raw number if no range holds it.
pub fn level_for(host: u8) -> String {
    LEVEL_MAPPING
        .iter()
        .find(|m| m.exclusive_lower < i16::from(host) && host <= m.host)
        .map(|m| m.console.as_str().to_string())
        .unwrap_or_else(|| host.to_string())
}

/// Host threshold for a console level.
pub fn host_level_for(level: ConsoleLevel) -> u8 {
    LEVEL_MAPPING
        .iter()
        .find(|m| m.console == level)
        .map(|m| m.host)
        .unwrap_or(OFF_THRESHOLD)
}

/// Severity of a tracing level on the host scale.
pub fn severity(level: &Level) -> u8 {
    match *level {
        Level::TRACE => TRACE_SEVERITY,
        Level::DEBUG => DEBUG_SEVERITY,
        Level::INFO => INFO_SEVERITY,
        Level::WARN => WARN_SEVERITY,
        Level::ERROR => ERROR_SEVERITY,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggerLevels {
    /// `None` when the logger inherits from an ancestor.
    pub configured_level: Option<String>,
    pub effective_level: String,
}

/// Payload of the `loggers` endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggersData {
    pub levels: Vec<String>,
    pub loggers: BTreeMap<String, LoggerLevels>,
    pub groups: BTreeMap<String, LoggerLevels>,
}

/// Live logger registry and level controls.
pub struct LoggerLevelBridge {
    /// Logger name to explicitly configured threshold.
    loggers: DashMap<String, Option<u8>>,
    root: AtomicU8,
    killed: AtomicBool,
}

impl LoggerLevelBridge {
    /// Create a bridge whose unconfigured loggers use `default`.
    pub fn new(default: ConsoleLevel) -> Self {
        Self {
            loggers: DashMap::new(),
            root: AtomicU8::new(host_level_for(default)),
            killed: AtomicBool::new(false),
        }
    }

    /// Make a logger and its ancestors known without configuring them.
    pub fn register(&self, name: &str) {
        if name.is_empty() || self.loggers.contains_key(name) {
            return;
        }
        for prefix in ancestors(name) {
            self.loggers.entry(prefix.to_string()).or_insert(None);
        }
    }

    pub fn is_known(&self, name: &str) -> bool {
        name == ROOT_LOGGER || self.loggers.contains_key(name)
    }

    /// Set a logger's level. `None` is treated as `OFF`.
    pub fn set_level(&self, name: &str, level: Option<ConsoleLevel>) {
        let level = level.unwrap_or(ConsoleLevel::Off);
        self.set_host_level(name, host_level_for(level));
        tracing::debug!(logger = name, level = %level, "logger level changed");
    }

    /// Parse and apply a console level string.
    pub fn set_level_str(&self, name: &str, level: Option<&str>) -> Result<(), ActuatorError> {
        let level = level.map(str::parse::<ConsoleLevel>).transpose()?;
        self.set_level(name, level);
        Ok(())
    }

    /// Set a raw host threshold, bypassing the console vocabulary.
    pub fn set_host_level(&self, name: &str, host: u8) {
        if name == ROOT_LOGGER {
            self.root.store(host, Ordering::SeqCst);
            return;
        }
        self.register(name);
        self.loggers.insert(name.to_string(), Some(host));
    }

    /// Drop a logger's explicit level so it inherits again.
    pub fn clear_level(&self, name: &str) {
        if let Some(mut entry) = self.loggers.get_mut(name) {
            *entry = None;
        }
    }

    /// Process-wide suppression of every record, regardless of logger.
    pub fn set_global_kill_switch(&self, enabled: bool) {
        if !enabled {
            self.killed.store(false, Ordering::SeqCst);
            tracing::warn!("global log kill switch released");
            return;
        }
        tracing::warn!("global log kill switch engaged");
        self.killed.store(true, Ordering::SeqCst);
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::SeqCst)
    }

    fn configured(&self, name: &str) -> Option<u8> {
        if name == ROOT_LOGGER {
            return Some(self.root.load(Ordering::SeqCst));
        }
        self.loggers.get(name).and_then(|entry| *entry)
    }

    /// Threshold in force for `name`: its own, the nearest configured
    /// ancestor's, or the root default.
    pub fn effective_threshold(&self, name: &str) -> u8 {
        if name == ROOT_LOGGER {
            return self.root.load(Ordering::SeqCst);
        }
        ancestors(name)
            .into_iter()
            .rev()
            .find_map(|prefix| self.configured(prefix))
            .unwrap_or_else(|| self.root.load(Ordering::SeqCst))
    }

    /// Whether a record of `level` from `target` passes.
    pub fn is_enabled(&self, target: &str, level: &Level) -> bool {
        if self.is_killed() {
            return false;
        }
        let threshold = self.effective_threshold(target);
        threshold != OFF_THRESHOLD && severity(level) >= threshold
    }

    fn levels_of(&self, name: &str) -> LoggerLevels {
        LoggerLevels {
            configured_level: self.configured(name).map(level_for),
            effective_level: level_for(self.effective_threshold(name)),
        }
    }

    /// Levels of one known logger.
    pub fn logger(&self, name: &str) -> Result<LoggerLevels, ActuatorError> {
        if !self.is_known(name) {
            return Err(ActuatorError::LoggerNotFound(name.to_string()));
        }
        Ok(self.levels_of(name))
    }

    /// Every known logger with its levels.
    pub fn list(&self) -> LoggersData {
        let names: Vec<String> = self.loggers.iter().map(|e| e.key().clone()).collect();
        let mut loggers: BTreeMap<String, LoggerLevels> = names
            .into_iter()
            .map(|name| {
                let levels = self.levels_of(&name);
                (name, levels)
            })
            .collect();
        loggers.insert(ROOT_LOGGER.to_string(), self.levels_of(ROOT_LOGGER));

        LoggersData {
            levels: LEVEL_MAPPING
                .iter()
                .filter(|m| m.console != ConsoleLevel::Off)
                .map(|m| m.console.as_str().to_string())
                .collect(),
            loggers,
            groups: BTreeMap::new(),
        }
    }
}

impl Default for LoggerLevelBridge {
    fn default() -> Self {
        Self::new(ConsoleLevel::Info)
    }
}

/// `a`, `a::b`, `a::b::c` for `a::b::c`, shortest first.
fn ancestors(name: &str) -> Vec<&str> {
    name.match_indices("::")
        .map(|(idx, _)| &name[..idx])
        .chain(std::iter::once(name))
        .collect()
}

/// Tracing layer that discovers loggers and enforces their thresholds.
#[derive(Clone)]
pub struct LoggerLevelLayer {
    bridge: Arc<LoggerLevelBridge>,
}

impl LoggerLevelLayer {
    pub fn new(bridge: Arc<LoggerLevelBridge>) -> Self {
        Self { bridge }
    }
}

impl<S: Subscriber> Layer<S> for LoggerLevelLayer {
    fn register_callsite(&self, metadata: &'static Metadata<'static>) -> Interest {
        self.bridge.register(metadata.target());
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.bridge.is_enabled(metadata.target(), metadata.level())
    }
}
