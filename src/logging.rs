//! Tracing setup for the rig.
//!
//! Every acquisition loop runs on its own named thread (`cam1-capture`,
//! `cam2-writer`, `serial-reader`), so thread names are part of every line.
//! `RUST_LOG` takes precedence over the configured level.
//!
//! # Example
//! ```no_run
//! use rig_daq::{config::Settings, logging};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = Settings::load()?;
//! logging::init_from_settings(&settings)?;
//! tracing::info!(camera = 1, "Recording started");
//! # Ok(())
//! # }
//! ```

use crate::config::Settings;
use crate::error::{AppResult, DaqError};
use std::str::FromStr;
use tracing::{Level, Subscriber};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Line format of the log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line, coloured; for an operator watching the terminal
    #[default]
    Pretty,
    /// One line per event, no colour; for redirected output
    Compact,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = DaqError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(DaqError::Configuration(format!(
                "Invalid log format '{}'. Must be one of: pretty, compact, json",
                other
            ))),
        }
    }
}

/// Subscriber options.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level used when `RUST_LOG` is not set
    pub level: Level,
    /// Output format
    pub format: LogFormat,
    /// Print source file and line of each event
    pub with_source_location: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            with_source_location: false,
        }
    }
}

impl LogConfig {
    /// Options taken from the `[application]` section.
    pub fn from_settings(settings: &Settings) -> AppResult<Self> {
        let level = Level::from_str(&settings.application.log_level).map_err(|_| {
            DaqError::Configuration(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                settings.application.log_level
            ))
        })?;
        Ok(Self {
            level,
            format: settings.application.log_format.parse()?,
            ..Self::default()
        })
    }

    /// Filter honouring `RUST_LOG`, falling back to the configured level.
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.level.as_str().to_lowercase()))
    }
}

/// Install the global subscriber described by `settings`.
pub fn init_from_settings(settings: &Settings) -> AppResult<()> {
    init(&LogConfig::from_settings(settings)?)
}

/// Build the subscriber described by `config` without installing it.
pub fn subscriber(config: &LogConfig) -> impl Subscriber + Send + Sync + 'static {
    let source = config.with_source_location;
    let layer = match config.format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_thread_names(true)
            .with_file(source)
            .with_line_number(source)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_ansi(false)
            .with_thread_names(true)
            .with_file(source)
            .with_line_number(source)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_thread_names(true)
            .with_file(source)
            .with_line_number(source)
            .boxed(),
    };
    tracing_subscriber::registry().with(layer.with_filter(config.filter()))
}

/// Install the global subscriber.
///
/// A second call, or a call after a test harness installed its own
/// subscriber, leaves the existing one in place and returns `Ok(())`.
pub fn init(config: &LogConfig) -> AppResult<()> {
    if subscriber(config).try_init().is_err() {
        tracing::debug!("Global subscriber already installed");
    }
    Ok(())
}
