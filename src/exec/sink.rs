// src/exec/sink.rs

//! Where command output lines go.

use std::fmt::Debug;

use tracing::{Level, debug, error, info, trace, warn};

/// Receives `(severity, line)` pairs from supervised commands.
pub trait LogSink: Send + Sync + Debug {
    fn log(&self, level: Level, line: &str);
}

/// Default sink: forwards every line to `tracing` under the
/// `packflow::command` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, level: Level, line: &str) {
        match level {
            Level::ERROR => error!(target: "packflow::command", "{line}"),
            Level::WARN => warn!(target: "packflow::command", "{line}"),
            Level::INFO => info!(target: "packflow::command", "{line}"),
            Level::DEBUG => debug!(target: "packflow::command", "{line}"),
            _ => trace!(target: "packflow::command", "{line}"),
        }
    }
}
