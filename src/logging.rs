// src/logging.rs

//! Logging setup for `packflow` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the filter:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `PACKFLOW_LOG` environment variable, any `EnvFilter` directive
//!    (`debug`, `packflow::command=trace,info`, ...)
//! 3. default to `info`
//!
//! Logs go to STDERR; STDOUT is reserved for `--dry-run` output. Output of
//! supervised commands is logged under the `packflow::command` target, so it
//! can be raised or silenced on its own.

use anyhow::{Context, Result};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "PACKFLOW_LOG";

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let directive = filter_directive(cli_level, std::env::var(LOG_ENV).ok());
    let filter = EnvFilter::try_new(&directive)
        .with_context(|| format!("invalid log filter '{directive}' (from {LOG_ENV})"))?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn filter_directive(cli_level: Option<LogLevel>, env: Option<String>) -> String {
    match (cli_level, env) {
        (Some(level), _) => level_name(level).to_string(),
        (None, Some(env)) if !env.trim().is_empty() => env.trim().to_string(),
        _ => "info".to_string(),
    }
}

fn level_name(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_flag_beats_environment() {
        assert_eq!(
            filter_directive(Some(LogLevel::Debug), Some("warn".into())),
            "debug"
        );
        assert_eq!(
            filter_directive(None, Some(" packflow::command=trace,info ".into())),
            "packflow::command=trace,info"
        );
        assert_eq!(filter_directive(None, Some("  ".into())), "info");
        assert_eq!(filter_directive(None, None), "info");
    }
}
