// ABOUTME: append-only, line-oriented audit trail of every mediated operation.
// ABOUTME: logging never fails back to the caller; a bad sink degrades to stderr.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::{SecondsFormat, Utc};
use tracing::warn;

/// Immutable record of one mediated operation's outcome.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub timestamp: String,
    pub session_id: String,
    pub command: String,
    pub argument: String,
    pub success: bool,
    pub error_message: String,
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | session:{} | {} | {} | {} | {}",
            self.timestamp,
            self.session_id,
            self.command,
            self.argument,
            if self.success { "success" } else { "failed" },
            self.error_message
        )
    }
}

/// Shared audit sink. The writer is mutex-guarded so concurrent entries never
/// interleave partial lines; every write is a single flushed line.
pub struct AuditLogger {
    sink: Mutex<Box<dyn Write + Send>>,
}

impl AuditLogger {
    /// Opens `path` for appending. If the file cannot be opened the logger
    /// falls back to stderr; the decision is made here, at construction time.
    pub fn to_file(path: &Path) -> Self {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Self {
                sink: Mutex::new(Box::new(file)),
            },
            Err(e) => {
                warn!(path = %path.display(), error = %e, "audit sink unavailable, using stderr");
                Self::stderr()
            }
        }
    }

    pub fn stderr() -> Self {
        Self {
            sink: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Records one mediated operation. Fire-and-forget: sink errors are
    /// swallowed so auditing can never crash or block the caller.
    pub fn log(
        &self,
        session_id: &str,
        command: &str,
        argument: &str,
        success: bool,
        error_message: &str,
    ) {
        self.append(&AuditEntry {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            session_id: session_id.to_string(),
            command: command.to_string(),
            argument: argument.to_string(),
            success,
            error_message: error_message.to_string(),
        });
    }

    pub fn append(&self, entry: &AuditEntry) {
        let Ok(mut sink) = self.sink.lock() else {
            return;
        };
        let _ = writeln!(sink, "{entry}");
        let _ = sink.flush();
    }
}
