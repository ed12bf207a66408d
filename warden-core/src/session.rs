// ABOUTME: per-run context binding an id, start time, success counter, and the
// ABOUTME: audit trail; created once per invocation and never persisted.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;
use warden_common::Config;

use crate::audit::AuditLogger;

/// Run-scoped mediation state. Safe to share across concurrent executions;
/// the command counter is the only mutable field and it is atomic.
pub struct Session {
    id: String,
    start_time: DateTime<Utc>,
    commands_run: AtomicU64,
    config: Arc<Config>,
    audit: Option<Arc<AuditLogger>>,
}

impl Session {
    pub fn new(config: Arc<Config>, audit: Option<Arc<AuditLogger>>) -> Self {
        Self {
            id: format!("sess-{}", Uuid::new_v4().simple()),
            start_time: Utc::now(),
            commands_run: AtomicU64::new(0),
            config,
            audit,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Opaque id, stable for the session's lifetime and unique across sessions.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Counts one successfully executed command; returns the new total.
    pub fn increment_commands_run(&self) -> u64 {
        self.commands_run.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn commands_run(&self) -> u64 {
        self.commands_run.load(Ordering::Relaxed)
    }

    /// Fire-and-forget audit hook; a missing logger is a silent no-op.
    pub fn log_audit(&self, command: &str, argument: &str, success: bool, error_message: &str) {
        if let Some(audit) = &self.audit {
            audit.log(&self.id, command, argument, success, error_message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(Arc::new(Config::with_root("/repo")), None)
    }

    #[test]
    fn ids_are_unique_and_stable() {
        let a = session();
        let b = session();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.id(), a.id());
        assert!(a.start_time() <= Utc::now());
        assert_eq!(a.config().repository_root, std::path::PathBuf::from("/repo"));
    }

    #[test]
    fn concurrent_increments_lose_no_updates() {
        let session = Arc::new(session());
        let mut handles = Vec::new();
        for _ in 0..10 {
            let session = Arc::clone(&session);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    session.increment_commands_run();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(session.commands_run(), 1000);
    }

    #[test]
    fn log_audit_without_logger_is_a_no_op() {
        session().log_audit("open", "a.txt", true, "");
    }
}
