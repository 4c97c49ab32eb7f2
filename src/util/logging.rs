//! Structured logging setup for migration-scout
//!
//! Logging is built on the `tracing` ecosystem and always writes to stderr,
//! so `analyze` output on stdout stays machine-readable. When `RUST_LOG` is
//! set it wins outright; otherwise this crate logs at the configured level
//! and the HTTP stack is kept quiet.
//!
//! # Example
//!
//! ```no_run
//! use migration_scout::util::logging::{init_logging, LoggingConfig};
//!
//! init_logging(LoggingConfig::from_env());
//!
//! tracing::info!(report_id = "abc", "Report accepted");
//! ```

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_LEVEL_VAR: &str = "SCOUT_LOG_LEVEL";
pub const LOG_JSON_VAR: &str = "SCOUT_LOG_JSON";

/// Targets that stay at a fixed level unless `RUST_LOG` says otherwise
const QUIET_TARGETS: &[&str] = &["h2=warn", "hyper=warn", "tower_http=info"];

static INIT: Once = Once::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum level for `migration_scout` events
    pub level: Level,

    /// One JSON object per event instead of human-readable lines
    pub use_json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
        }
    }
}

impl LoggingConfig {
    /// Reads `SCOUT_LOG_LEVEL` and `SCOUT_LOG_JSON`
    pub fn from_env() -> Self {
        let level = env::var(LOG_LEVEL_VAR)
            .map(|v| parse_level(&v))
            .unwrap_or(Level::INFO);
        let use_json = env::var(LOG_JSON_VAR)
            .ok()
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(false);
        Self { level, use_json }
    }

    /// Replaces the level when a command-line override is present
    pub fn with_level_override(mut self, level: Option<Level>) -> Self {
        if let Some(level) = level {
            self.level = level;
        }
        self
    }

    fn is_verbose(&self) -> bool {
        self.level == Level::DEBUG || self.level == Level::TRACE
    }

    fn filter(&self) -> EnvFilter {
        if env::var("RUST_LOG").is_ok() {
            return EnvFilter::from_default_env();
        }
        let crate_directive = format!("migration_scout={}", self.level);
        std::iter::once(crate_directive.as_str())
            .chain(QUIET_TARGETS.iter().copied())
            .filter_map(directive)
            .fold(EnvFilter::default(), EnvFilter::add_directive)
    }
}

/// Parses a log level from a string, falling back to `INFO`
///
/// ```
/// use migration_scout::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("bogus"), Level::INFO);
/// ```
pub fn parse_level(level_str: &str) -> Level {
    match level_str.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!(
                "Invalid log level '{}', defaulting to INFO. Valid levels: trace, debug, info, warn, error",
                level_str
            );
            Level::INFO
        }
    }
}

fn directive(text: &str) -> Option<Directive> {
    text.parse().ok()
}

/// Installs the global subscriber. Only the first call has any effect.
///
/// Debug and trace levels also record source file and line.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let verbose = config.is_verbose();
        let registry = tracing_subscriber::registry().with(config.filter());

        if config.use_json {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_file(verbose)
                        .with_line_number(verbose)
                        .with_writer(std::io::stderr),
                )
                .init();
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_file(verbose)
                        .with_line_number(verbose)
                        .with_writer(std::io::stderr),
                )
                .init();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: &'static str,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: Option<&str>) -> Self {
            let old_value = env::var(key).ok();
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
            Self { key, old_value }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(self.key, v),
                None => env::remove_var(self.key),
            }
        }
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("WARN"), Level::WARN);
        assert_eq!(parse_level(" error "), Level::ERROR);
        assert_eq!(parse_level("loud"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        let _level = EnvGuard::set(LOG_LEVEL_VAR, None);
        let _json = EnvGuard::set(LOG_JSON_VAR, None);

        assert_eq!(LoggingConfig::from_env(), LoggingConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_reads_level_and_json() {
        let _level = EnvGuard::set(LOG_LEVEL_VAR, Some("debug"));
        let _json = EnvGuard::set(LOG_JSON_VAR, Some("true"));

        let config = LoggingConfig::from_env();
        assert_eq!(config.level, Level::DEBUG);
        assert!(config.use_json);
        assert!(config.is_verbose());
    }

    #[test]
    #[serial]
    fn test_unparseable_json_flag_means_text() {
        let _level = EnvGuard::set(LOG_LEVEL_VAR, None);
        let _json = EnvGuard::set(LOG_JSON_VAR, Some("yes please"));

        assert!(!LoggingConfig::from_env().use_json);
    }

    #[test]
    fn test_level_override() {
        let config = LoggingConfig::default().with_level_override(Some(Level::ERROR));
        assert_eq!(config.level, Level::ERROR);
        assert!(!config.is_verbose());

        let config = LoggingConfig::default().with_level_override(None);
        assert_eq!(config.level, Level::INFO);
    }

    #[test]
    fn test_quiet_targets_parse() {
        for target in QUIET_TARGETS {
            assert!(directive(target).is_some(), "{}", target);
        }
        assert!(directive("migration_scout=trace").is_some());
    }
}
