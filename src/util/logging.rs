//! Structured logging setup for foodsync
//!
//! Logs always go to stderr: stdout carries the run report, which callers
//! may pipe into another tool as JSON or YAML. `RUST_LOG` directives are
//! honoured on top of the configured level.
//!
//! # Example
//!
//! ```no_run
//! use foodsync::util::logging;
//! use tracing::{info, warn};
//!
//! logging::init_from_env();
//!
//! info!(stage = "nutrition", "Starting stage");
//! warn!(artifact = "recipes", "Presence check failed, treating artifact as absent");
//! ```

use std::env;
use std::io;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

const LEVEL_VAR: &str = "FOODSYNC_LOG_LEVEL";
const JSON_VAR: &str = "FOODSYNC_LOG_JSON";

/// Drivers whose own logging is noisy at debug level.
const QUIET_DEPENDENCIES: [&str; 3] = ["tokio_postgres=warn", "mongodb=warn", "hickory_proto=warn"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Minimum level for foodsync's own events.
    pub level: Level,

    /// One JSON object per event instead of console lines.
    pub use_json: bool,

    /// Adds file and line to every event.
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            use_json: false,
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

    /// JSON with source locations, for scheduled runs whose logs are shipped
    /// elsewhere.
    pub fn production() -> Self {
        Self {
            level: Level::INFO,
            use_json: true,
            include_location: true,
        }
    }

    /// Reads `FOODSYNC_LOG_LEVEL` and `FOODSYNC_LOG_JSON`. Unset or unparseable
    /// values keep their defaults.
    pub fn from_env() -> Self {
        let level = env::var(LEVEL_VAR)
            .map(|raw| parse_level(&raw))
            .unwrap_or(Level::INFO);
        let use_json = env::var(JSON_VAR)
            .ok()
            .and_then(|raw| raw.trim().parse::<bool>().ok())
            .unwrap_or(false);

        Self {
            level,
            use_json,
            include_location: false,
        }
    }
}

/// Parses a level name case-insensitively, falling back to `INFO`.
///
/// ```
/// use foodsync::util::logging::parse_level;
/// use tracing::Level;
///
/// assert_eq!(parse_level("debug"), Level::DEBUG);
/// assert_eq!(parse_level("WARN"), Level::WARN);
/// assert_eq!(parse_level("loud"), Level::INFO);
/// ```
pub fn parse_level(raw: &str) -> Level {
    raw.trim().parse::<Level>().unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level '{}', defaulting to info",
            raw
        );
        Level::INFO
    })
}

fn build_filter(level: Level) -> EnvFilter {
    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = format!("foodsync={}", level).parse() {
        filter = filter.add_directive(directive);
    }

    // An explicit RUST_LOG decides for the drivers too.
    if env::var("RUST_LOG").is_err() {
        for quiet in QUIET_DEPENDENCIES {
            if let Ok(directive) = quiet.parse() {
                filter = filter.add_directive(directive);
            }
        }
    }
    filter
}

/// Installs the global subscriber. Only the first call has any effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let registry = tracing_subscriber::registry().with(build_filter(config.level));
        let layer = fmt::layer()
            .with_writer(io::stderr)
            .with_file(config.include_location)
            .with_line_number(config.include_location);

        if config.use_json {
            registry.with(layer.json().with_current_span(false)).init();
        } else {
            registry.with(layer).init();
        }
    });
}

pub fn init_default() {
    init_logging(LoggingConfig::default());
}

pub fn init_from_env() {
    init_logging(LoggingConfig::from_env());
}
