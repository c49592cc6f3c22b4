//! Tracing subscriber setup for the binary.
//!
//! Logs always go to stderr so stdout stays clean for results.

use anyhow::Result;
use tracing_subscriber::fmt::time::SystemTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter when `RUST_LOG` is not set.
pub const DEFAULT_FILTER: &str = "listharvest=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Raise the crate's level to debug.
    pub verbose: bool,
    /// Only warnings and errors.
    pub quiet: bool,
}

impl LogConfig {
    /// The filter to install: `RUST_LOG` when present, otherwise derived from
    /// the flags.
    pub fn filter(&self) -> EnvFilter {
        let fallback = if self.verbose {
            "listharvest=debug"
        } else if self.quiet {
            "listharvest=warn"
        } else {
            DEFAULT_FILTER
        };
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(config: &LogConfig) -> Result<()> {
    let env_filter = config.filter();
    match config.format {
        LogFormat::Pretty => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .with_ansi(true),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogFormat::Json => {
            let subscriber = tracing_subscriber::registry().with(env_filter).with(
                fmt::layer()
                    .json()
                    .with_timer(SystemTime)
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_list(false)
                    .flatten_event(true),
            );
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}
