//! Logging utilities
//!
//! Provides logging configuration and helpers.

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Log level configuration
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn to_tracing_level(self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    /// Pick the level from the `--verbose` flag and an optional override
    pub fn resolve(verbose: bool, requested: Option<&str>) -> Self {
        match requested.and_then(LogLevel::from_str) {
            Some(level) => level,
            None if verbose => LogLevel::Debug,
            None => LogLevel::Info,
        }
    }
}

/// Filter directive for our own crate at `level`. kube's internals stay at warn.
fn filter_directive(level: LogLevel) -> String {
    format!("netpol_e2e={},kube=warn", level.to_tracing_level())
}

/// Initialize the logger with specified level
pub fn init_logger(level: LogLevel) {
    let filter = EnvFilter::new(filter_directive(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("info"), Some(LogLevel::Info));
        assert_eq!(LogLevel::from_str("DEBUG"), Some(LogLevel::Debug));
        assert_eq!(LogLevel::from_str("warning"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::from_str("unknown"), None);
    }

    #[test]
    fn test_resolve_prefers_explicit_level() {
        assert_eq!(LogLevel::resolve(true, Some("error")), LogLevel::Error);
        assert_eq!(LogLevel::resolve(true, None), LogLevel::Debug);
        assert_eq!(LogLevel::resolve(false, Some("bogus")), LogLevel::Info);
    }

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive(LogLevel::Debug), "netpol_e2e=DEBUG,kube=warn");
    }
}
