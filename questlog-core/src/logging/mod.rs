//! Structured Logging & Tracing
//!
//! Level-based filtering through `tracing-subscriber`'s `EnvFilter`, with
//! per-module overrides. Initialization is idempotent: the first call wins
//! and later calls (from tests or a second binary entry point) are no-ops.
//! `RUST_LOG`, when set, replaces the configured filter entirely.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Once;
use tracing_subscriber::EnvFilter;

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
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level: {other}")),
        }
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TracingConfig {
    pub default_level: LogLevel,
    pub module_filters: Vec<(String, LogLevel)>,
    pub show_targets: bool,
    pub show_thread_ids: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: LogLevel::Info,
            module_filters: vec![
                ("questlog_server::storage".to_string(), LogLevel::Info),
                ("questlog_server::ai".to_string(), LogLevel::Info),
                ("tower_http".to_string(), LogLevel::Info),
                ("sqlx".to_string(), LogLevel::Warn),
            ],
            show_targets: true,
            show_thread_ids: false,
        }
    }
}

impl TracingConfig {
    pub fn with_level(level: LogLevel) -> Self {
        Self {
            default_level: level,
            ..Self::default()
        }
    }

    pub fn to_env_filter_string(&self) -> String {
        let mut parts = vec![self.default_level.as_str().to_string()];
        for (module, level) in &self.module_filters {
            parts.push(format!("{}={}", module, level.as_str()));
        }
        parts.join(",")
    }
}

static TRACING_INIT: Once = Once::new();

/// Initialize tracing with default settings (idempotent)
pub fn init_tracing_default() {
    init_tracing(&TracingConfig::default());
}

/// Initialize tracing with a custom config (idempotent, first call wins)
pub fn init_tracing(config: &TracingConfig) {
    let filter_str = config.to_env_filter_string();
    let show_targets = config.show_targets;
    let show_thread_ids = config.show_thread_ids;
    TRACING_INIT.call_once(move || {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(show_targets)
            .with_thread_ids(show_thread_ids)
            .compact();

        // A test harness may already have installed a global subscriber
        let _ = subscriber.try_init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_parse() {
        assert_eq!("DEBUG".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert_eq!("warning".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_env_filter_string() {
        let filter = TracingConfig::default().to_env_filter_string();
        assert!(filter.starts_with("info"));
        assert!(filter.contains("sqlx=warn"));
        assert!(filter.contains("questlog_server::storage=info"));
    }

    #[test]
    fn test_with_level_keeps_module_filters() {
        let config = TracingConfig::with_level(LogLevel::Debug);
        assert!(config.to_env_filter_string().starts_with("debug,"));
        assert_eq!(config.module_filters.len(), TracingConfig::default().module_filters.len());
    }

    #[test]
    fn test_init_tracing_idempotent() {
        init_tracing_default();
        init_tracing_default();
        init_tracing(&TracingConfig::with_level(LogLevel::Trace));
    }
}
