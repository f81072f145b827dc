//! Logger Fan-out
//!
//! Workers receive a single [`Logger`] handle at initialization. The host
//! composes an [`AggregateLogger`] from the sinks the configuration enables;
//! the default sink forwards to `tracing` so worker output lands in the same
//! place as the host's own logs.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;

/// Logging interface handed to every worker
///
/// Sink failures are the sink's problem; none of these calls can fail.
pub trait Logger: Send + Sync {
    fn info(&self, message: &str);

    fn warning(&self, message: &str);

    fn error(&self, message: &str, cause: Option<&(dyn std::error::Error + 'static)>);
}

// ─────────────────────────────────────────────────────────────────────────────
// Trace sink
// ─────────────────────────────────────────────────────────────────────────────

/// Logger sink backed by `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TraceLogger;

impl Logger for TraceLogger {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str, cause: Option<&(dyn std::error::Error + 'static)>) {
        match cause {
            Some(cause) => tracing::error!(error = %cause, "{}", message),
            None => tracing::error!("{}", message),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate sink
// ─────────────────────────────────────────────────────────────────────────────

/// Fans every log call out to all registered sinks
#[derive(Default)]
pub struct AggregateLogger {
    sinks: Vec<Arc<dyn Logger>>,
}

impl AggregateLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a sink to the fan-out
    pub fn add(&mut self, sink: Arc<dyn Logger>) {
        self.sinks.push(sink);
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl Logger for AggregateLogger {
    fn info(&self, message: &str) {
        for sink in &self.sinks {
            sink.info(message);
        }
    }

    fn warning(&self, message: &str) {
        for sink in &self.sinks {
            sink.warning(message);
        }
    }

    fn error(&self, message: &str, cause: Option<&(dyn std::error::Error + 'static)>) {
        for sink in &self.sinks {
            sink.error(message, cause);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// File sink
// ─────────────────────────────────────────────────────────────────────────────

/// Appends timestamped JSON lines to a log file
///
/// Enabled by the host when the `LogFile` global parameter names a path.
/// Write errors are swallowed; a log sink must never take the host down.
pub struct FileLogger {
    file: Mutex<File>,
}

impl FileLogger {
    /// Open (or create) the log file in append mode
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }

    fn write_line(&self, level: &str, message: &str, cause: Option<String>) {
        let line = serde_json::json!({
            "ts": chrono::Utc::now().to_rfc3339(),
            "level": level,
            "message": message,
            "cause": cause,
        });

        let mut file = self.file.lock();
        let _ = writeln!(file, "{}", line);
    }
}

impl Logger for FileLogger {
    fn info(&self, message: &str) {
        self.write_line("info", message, None);
    }

    fn warning(&self, message: &str) {
        self.write_line("warning", message, None);
    }

    fn error(&self, message: &str, cause: Option<&(dyn std::error::Error + 'static)>) {
        self.write_line("error", message, cause.map(|c| c.to_string()));
    }
}
