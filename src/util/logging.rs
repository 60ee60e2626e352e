//! Structured logging setup
//!
//! `tracing` macros are used throughout the crate; this module installs the
//! subscriber once per process. `RUST_LOG` takes precedence over the
//! configured level, and the HTTP stack is capped at `warn` unless `RUST_LOG`
//! says otherwise.
//!
//! ```no_run
//! use uragent::util::logging::{self, LoggingConfig};
//! use tracing::Level;
//!
//! logging::init_logging(LoggingConfig::with_level(Level::DEBUG));
//! tracing::info!(bucket = "ur-docs", "Listing objects");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const QUIET_CRATES: &[&str] = &["h2", "hyper", "hyper_util", "reqwest", "rustls"];

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    pub level: Level,
    /// One JSON object per line instead of human-readable output
    pub use_json: bool,
    pub include_target: bool,
    /// File and line of each event
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
            include_target: true,
            include_location: false,
        }
    }
}

impl LoggingConfig {
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    /// Reads `UR_AGENT_LOG_LEVEL` and `UR_AGENT_LOG_JSON`
    pub fn from_env() -> Self {
        let level = env::var("UR_AGENT_LOG_LEVEL")
            .ok()
            .and_then(|l| parse_level(&l))
            .unwrap_or(Level::INFO);
        let use_json = env::var("UR_AGENT_LOG_JSON")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            level,
            use_json,
            include_location: use_json,
            ..Default::default()
        }
    }
}

/// Case-insensitive level name, `None` when unrecognised
pub fn parse_level(level: &str) -> Option<Level> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn directive(spec: &str) -> Option<Directive> {
    spec.parse().ok()
}

/// Filter for `config`, layered on top of whatever `RUST_LOG` holds
pub fn build_filter(config: &LoggingConfig, rust_log_set: bool) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    if let Some(own) = directive(&format!("uragent={}", config.level)) {
        filter = filter.add_directive(own);
    }
    if !rust_log_set {
        for name in QUIET_CRATES {
            if let Some(quiet) = directive(&format!("{}=warn", name)) {
                filter = filter.add_directive(quiet);
            }
        }
    }
    filter
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = build_filter(&config, env::var("RUST_LOG").is_ok());
        let layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.include_target)
            .with_file(config.include_location)
            .with_line_number(config.include_location);

        let registry = tracing_subscriber::registry().with(filter);
        let result = if config.use_json {
            registry.with(layer.json()).try_init()
        } else {
            registry.with(layer).try_init()
        };
        if let Err(e) = result {
            eprintln!("Logging was already initialised: {}", e);
        }
    });
}

pub fn init_from_env() {
    init_logging(LoggingConfig::from_env());
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use yare::parameterized;

    #[parameterized(
        trace = { "trace", Some(Level::TRACE) },
        upper = { "DEBUG", Some(Level::DEBUG) },
        padded = { " info ", Some(Level::INFO) },
        warning = { "warning", Some(Level::WARN) },
        error = { "Error", Some(Level::ERROR) },
        invalid = { "verbose", None },
        empty = { "", None },
    )]
    fn test_parse_level(input: &str, expected: Option<Level>) {
        assert_eq!(parse_level(input), expected);
    }

    #[test]
    fn test_default_config() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
        assert!(config.include_target);
    }

    #[test]
    #[serial]
    fn test_from_env() {
        env::set_var("UR_AGENT_LOG_LEVEL", "debug");
        env::set_var("UR_AGENT_LOG_JSON", "true");
        let config = LoggingConfig::from_env();
        env::remove_var("UR_AGENT_LOG_LEVEL");
        env::remove_var("UR_AGENT_LOG_JSON");

        assert_eq!(config.level, Level::DEBUG);
        assert!(config.use_json);
        assert!(config.include_location);
    }

    #[test]
    #[serial]
    fn test_from_env_ignores_garbage() {
        env::set_var("UR_AGENT_LOG_LEVEL", "loud");
        let config = LoggingConfig::from_env();
        env::remove_var("UR_AGENT_LOG_LEVEL");

        assert_eq!(config.level, Level::INFO);
        assert!(!config.use_json);
    }

    #[test]
    fn test_build_filter_caps_http_crates() {
        let filter = build_filter(&LoggingConfig::with_level(Level::DEBUG), false)
            .to_string()
            .to_lowercase();
        assert!(filter.contains("uragent=debug"));
        assert!(filter.contains("hyper=warn"));

        let filter = build_filter(&LoggingConfig::default(), true)
            .to_string()
            .to_lowercase();
        assert!(!filter.contains("hyper=warn"));
    }
}
