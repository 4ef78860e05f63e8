//! `tracing` subscriber setup for the CLI.
//!
//! The library only emits events; installing a subscriber is left to the
//! binary. `RUST_LOG` takes precedence over the configured level, which
//! comes from `CLJ_UBERJAR_LOG_LEVEL` when set.

use std::env;
use std::sync::Once;
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static INIT: Once = Once::new();

pub const LEVEL_ENV: &str = "CLJ_UBERJAR_LOG_LEVEL";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset.
    pub level: Level,
    /// One JSON object per event instead of human-readable lines.
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
    pub fn with_level(level: Level) -> Self {
        Self {
            level,
            ..Default::default()
        }
    }

    pub fn json(mut self, use_json: bool) -> Self {
        self.use_json = use_json;
        self
    }

    /// Level from `CLJ_UBERJAR_LOG_LEVEL`, falling back to info.
    pub fn from_env() -> Self {
        match env::var(LEVEL_ENV) {
            Ok(raw) => Self::from_level_name(&raw),
            Err(_) => Self::default(),
        }
    }

    fn from_level_name(raw: &str) -> Self {
        match parse_level(raw) {
            Some(level) => Self::with_level(level),
            None => {
                eprintln!(
                    "invalid {LEVEL_ENV} '{raw}', defaulting to info (trace, debug, info, warn, error)"
                );
                Self::default()
            }
        }
    }
}

/// Parse a level name, case-insensitively. Unknown names give `None`.
pub fn parse_level(raw: &str) -> Option<Level> {
    match raw.to_ascii_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Install the global subscriber. Later calls are no-ops.
///
/// Events go to stderr so stdout stays free for command output.
pub fn init(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.level.as_str().to_ascii_lowercase()));

        let registry = tracing_subscriber::registry().with(filter);
        if config.use_json {
            registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(false),
                )
                .init();
        } else {
            registry
                .with(
                    fmt::layer()
                        .with_writer(std::io::stderr)
                        .with_target(false),
                )
                .init();
        }
    });
}
