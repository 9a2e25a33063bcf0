//! Centralized logging configuration for all Tgcast binaries
//!
//! Logs go to stderr so that progress lines and summaries on stdout stay
//! readable. Supports text, JSON and pretty output, and honours `RUST_LOG`
//! when set.
//!
//! # Examples
//!
//! ```no_run
//! use libtgcast::logging::{LoggingConfig, LogFormat};
//!
//! let config = LoggingConfig::new(LogFormat::Json, "info".to_string(), false);
//! config.init();
//! ```

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable text output (no colors, for piping)
    Text,
    /// Machine-parseable JSON (one JSON object per line)
    Json,
    /// Pretty-printed with colors (for development)
    Pretty,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            _ => Err(format!(
                "Invalid log format: '{}'. Valid options: text, json, pretty",
                s
            )),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Text => write!(f, "text"),
            LogFormat::Json => write!(f, "json"),
            LogFormat::Pretty => write!(f, "pretty"),
        }
    }
}

/// Configuration for logging initialization
pub struct LoggingConfig {
    pub format: LogFormat,
    pub level: String,
    pub verbose: bool,
}

impl LoggingConfig {
    /// Create a new logging configuration
    ///
    /// `verbose` forces the debug level regardless of `level`.
    pub fn new(format: LogFormat, level: String, verbose: bool) -> Self {
        Self {
            format,
            level,
            verbose,
        }
    }

    /// Build from `TGCAST_LOG_FORMAT` and `TGCAST_LOG_LEVEL`, falling back to
    /// text output at `default_level`
    pub fn from_env(default_level: &str, verbose: bool) -> Self {
        let format = std::env::var("TGCAST_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(LogFormat::Text);

        let level =
            std::env::var("TGCAST_LOG_LEVEL").unwrap_or_else(|_| default_level.to_string());

        Self::new(format, level, verbose)
    }

    /// Effective filter directive before `RUST_LOG` is consulted
    pub fn directive(&self) -> &str {
        if self.verbose {
            "debug"
        } else {
            &self.level
        }
    }

    /// Install the global subscriber
    ///
    /// Uses `try_init`: unit tests and binaries that share a process may
    /// reach this more than once, and only the first subscriber is kept.
    pub fn init(&self) {
        use tracing_subscriber::EnvFilter;

        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.directive()));

        let result = match self.format {
            LogFormat::Json => tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .with_span_list(true)
                .flatten_event(true)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_line_number(true)
                .with_file(true)
                .try_init(),
            LogFormat::Text => tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_level(true)
                .try_init(),
        };

        if result.is_err() {
            tracing::debug!("Logging already initialized");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("Json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);

        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.contains("'xml'"));
        assert_eq!(LogFormat::Json.to_string(), "json");
    }

    #[test]
    fn test_verbose_overrides_level() {
        let verbose = LoggingConfig::new(LogFormat::Text, "error".to_string(), true);
        assert_eq!(verbose.directive(), "debug");

        let quiet = LoggingConfig::new(LogFormat::Text, "error".to_string(), false);
        assert_eq!(quiet.directive(), "error");
    }

    #[test]
    #[serial]
    fn test_from_env_reads_tgcast_variables() {
        std::env::set_var("TGCAST_LOG_FORMAT", "json");
        std::env::set_var("TGCAST_LOG_LEVEL", "trace");
        let config = LoggingConfig::from_env("warn", false);
        std::env::remove_var("TGCAST_LOG_FORMAT");
        std::env::remove_var("TGCAST_LOG_LEVEL");

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.directive(), "trace");
    }

    #[test]
    #[serial]
    fn test_from_env_falls_back_on_bad_format() {
        std::env::set_var("TGCAST_LOG_FORMAT", "yaml");
        std::env::remove_var("TGCAST_LOG_LEVEL");
        let config = LoggingConfig::from_env("warn", false);
        std::env::remove_var("TGCAST_LOG_FORMAT");

        assert_eq!(config.format, LogFormat::Text);
        assert_eq!(config.directive(), "warn");
    }

    #[test]
    fn test_second_init_is_ignored() {
        let config = LoggingConfig::new(LogFormat::Text, "info".to_string(), false);
        config.init();
        config.init();
    }
}
