//! Structured logging.
//!
//! Everything in the crate logs through `tracing` macros with structured
//! fields. Hosts (the bridge, the simulation binary) call `init_tracing`
//! once; later calls are no-ops, so it is safe from FFI entry points.
//! `RUST_LOG` overrides the configured filter.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub const ALL: [LogLevel; 5] = [
        LogLevel::Trace,
        LogLevel::Debug,
        LogLevel::Info,
        LogLevel::Warn,
        LogLevel::Error,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LogLevel::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::InvalidConfig(format!("unknown log level '{s}'")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TracingConfig {
    pub default_level: LogLevel,
    /// `(module path, level)` pairs layered over the default
    pub module_filters: Vec<(String, LogLevel)>,
    pub show_thread_ids: bool,
    pub show_targets: bool,
    pub show_file_line: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            module_filters: vec![
                ("combat_core::bridge".to_string(), LogLevel::Warn),
                ("combat_core::creature".to_string(), LogLevel::Info),
                ("combat_core::balance".to_string(), LogLevel::Info),
            ],
            show_thread_ids: false,
            show_targets: true,
            show_file_line: false,
        }
    }
}

impl TracingConfig {
    /// Same config at a different default level
    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.default_level = level;
        self
    }

    pub fn to_env_filter_string(&self) -> String {
        std::iter::once(self.default_level.as_str().to_string())
            .chain(
                self.module_filters
                    .iter()
                    .map(|(module, level)| format!("{module}={}", level.as_str())),
            )
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn from_json(json: &str) -> Option<Self> {
        serde_json::from_str(json).ok()
    }
}

static TRACING_INIT: Once = Once::new();

pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Install the global subscriber. First call wins.
pub fn init_tracing(config: &TracingConfig) {
    let config = config.clone();
    TRACING_INIT.call_once(move || {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.to_env_filter_string()));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(config.show_targets)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file_line)
            .with_line_number(config.show_file_line)
            .with_writer(std::io::stderr)
            .compact();

        // host may already own the global subscriber
        let _ = subscriber.try_init();
    });
}

/// Span guard around a named operation; closing the span records its timing
pub struct TimingSpan {
    _span: tracing::span::EnteredSpan,
}

impl TimingSpan {
    pub fn new(name: &str) -> Self {
        let span = tracing::info_span!("operation", name = name);
        Self {
            _span: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_parse() {
        assert_eq!("TRACE".parse::<LogLevel>().unwrap(), LogLevel::Trace);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_env_filter_string() {
        let filter = TracingConfig::default().to_env_filter_string();
        assert!(filter.starts_with("info,"));
        assert!(filter.contains("combat_core::bridge=warn"));

        let quiet = TracingConfig {
            module_filters: vec![],
            ..TracingConfig::default()
        }
        .with_level(LogLevel::Error);
        assert_eq!(quiet.to_env_filter_string(), "error");
    }

    #[test]
    fn test_config_json_roundtrip() {
        let config = TracingConfig::default().with_level(LogLevel::Debug);
        let restored = TracingConfig::from_json(&config.to_json()).unwrap();
        assert_eq!(restored, config);
        assert!(TracingConfig::from_json("{not json").is_none());
        // missing fields fall back to defaults
        let partial = TracingConfig::from_json(r#"{"default_level":"trace"}"#).unwrap();
        assert_eq!(partial.default_level, LogLevel::Trace);
        assert!(partial.show_targets);
    }

    #[test]
    fn test_init_is_idempotent() {
        init_tracing_default();
        init_tracing(&TracingConfig::default().with_level(LogLevel::Trace));
        let _span = TimingSpan::new("test_operation");
        tracing::debug!(value = 3, "inside span");
    }
}
