//! Structured logging setup.
//!
//! Installs a `tracing` subscriber with an `EnvFilter` and JSON or pretty
//! output. Stage threads log from the hot path, so by default lines go
//! through a bounded non-blocking writer and a full buffer drops lines
//! instead of stalling a stage.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `SMACK_LOG_LEVEL` | `info` (overridden by `RUST_LOG`) |
//! | `SMACK_LOG_FORMAT` | `json` |
//! | `SMACK_LOG_ASYNC` | `true` |
//! | `SMACK_LOG_BUFFER_SIZE` | `8192` lines |
//! | `SMACK_LOG_TARGET_FILTER` | unset |
//! | `SMACK_LOG_INCLUDE_LOCATION` | `false` |

use anyhow::{Context, Result};
use std::env;
use std::str::FromStr;
use tracing::Level;
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_BUFFERED_LINES: usize = 8192;

/// Encoding of emitted lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Multi-line, human readable
    Pretty,
}

impl LogFormat {
    /// `pretty` in any case selects [`LogFormat::Pretty`]; anything else is JSON.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("pretty") {
            LogFormat::Pretty
        } else {
            LogFormat::Json
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Base level when `RUST_LOG` is unset
    pub log_level: String,
    pub format: LogFormat,
    /// Write from a background thread
    pub async_logging: bool,
    /// Lines the background writer holds before dropping new ones
    pub buffer_size: usize,
    /// Extra directives, comma-separated (`smack::ring=trace,smack::router=warn`)
    pub target_filter: Option<String>,
    /// Emit file and line of each event
    pub include_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::default_prod()
    }
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|val| val.trim().parse().ok())
        .unwrap_or(default)
}

impl LogConfig {
    /// Read `SMACK_LOG_*`, falling back to [`LogConfig::default_prod`] per
    /// variable when unset or unparseable.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default_prod();
        Self {
            log_level: env::var("SMACK_LOG_LEVEL").unwrap_or(defaults.log_level),
            format: env::var("SMACK_LOG_FORMAT").map_or(defaults.format, |val| LogFormat::parse(&val)),
            async_logging: env_or("SMACK_LOG_ASYNC", defaults.async_logging),
            buffer_size: env_or("SMACK_LOG_BUFFER_SIZE", defaults.buffer_size),
            target_filter: env::var("SMACK_LOG_TARGET_FILTER")
                .ok()
                .filter(|val| !val.trim().is_empty()),
            include_location: env_or("SMACK_LOG_INCLUDE_LOCATION", defaults.include_location),
        }
    }

    /// Pretty, synchronous, debug level with locations.
    #[must_use]
    pub fn default_dev() -> Self {
        Self {
            log_level: "debug".to_string(),
            format: LogFormat::Pretty,
            async_logging: false,
            buffer_size: 1024,
            include_location: true,
            ..Self::default_prod()
        }
    }

    /// JSON through the non-blocking writer at info level.
    #[must_use]
    pub fn default_prod() -> Self {
        Self {
            log_level: "info".to_string(),
            format: LogFormat::Json,
            async_logging: true,
            buffer_size: DEFAULT_BUFFERED_LINES,
            target_filter: None,
            include_location: false,
        }
    }

    fn level(&self) -> Level {
        Level::from_str(self.log_level.trim()).unwrap_or(Level::INFO)
    }

    fn env_filter(&self) -> EnvFilter {
        let base = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level().as_str()));

        let extra = self.target_filter.as_deref().unwrap_or_default();
        extra
            .split(',')
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .fold(base, |filter, raw| match raw.parse::<Directive>() {
                Ok(directive) => filter.add_directive(directive),
                Err(err) => {
                    // No subscriber yet, so stderr is the only place to say so
                    eprintln!("Ignoring log filter directive '{raw}': {err}");
                    filter
                }
            })
    }
}

/// Install the global subscriber.
///
/// With `async_logging` the returned guard owns the background writer; hold
/// it until exit or buffered lines are lost.
///
/// # Errors
///
/// Fails if a global subscriber is already installed.
///
/// # Example
///
/// ```no_run
/// use smack::logging::{init_logging, LogConfig};
///
/// let _guard = init_logging(&LogConfig::from_env())?;
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn init_logging(config: &LogConfig) -> Result<Option<WorkerGuard>> {
    let (writer, guard) = if config.async_logging {
        let (non_blocking, guard) = NonBlockingBuilder::default()
            .buffered_lines_limit(config.buffer_size)
            .lossy(true)
            .thread_name("smack-log-writer")
            .finish(std::io::stdout());
        (BoxMakeWriter::new(non_blocking), Some(guard))
    } else {
        (BoxMakeWriter::new(std::io::stdout), None)
    };

    let layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_names(true)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer);
    let layer = match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(config.env_filter())
        .with(layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;
    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles() {
        let prod = LogConfig::default();
        assert_eq!(prod, LogConfig::default_prod());
        assert_eq!(prod.format, LogFormat::Json);
        assert!(prod.async_logging);
        assert_eq!(prod.buffer_size, DEFAULT_BUFFERED_LINES);

        let dev = LogConfig::default_dev();
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(!dev.async_logging);
        assert!(dev.include_location);
        assert_eq!(dev.target_filter, None);
    }

    #[test]
    fn test_format_parse_is_lenient() {
        assert_eq!(LogFormat::parse(" Pretty "), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Json);
    }

    #[test]
    fn test_level_falls_back_to_info() {
        let mut config = LogConfig::default_prod();
        config.log_level = "WARN".to_string();
        assert_eq!(config.level(), Level::WARN);
        config.log_level = "chatty".to_string();
        assert_eq!(config.level(), Level::INFO);
    }
}
