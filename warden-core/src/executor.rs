// ABOUTME: façade dispatching open/write/exec/search requests through ordered
// ABOUTME: validation, capability handlers, timing, and the audit trail.

use std::sync::Arc;
use std::time::Instant;

use warden_common::{Command, CommandKind, Config, ExecutionResult, MediationError, WriteAction};

use crate::audit::AuditLogger;
use crate::extension;
use crate::files::{FileCapability, FileHandler};
use crate::path;
use crate::sandbox::{ExecCapability, ExecSandbox};
use crate::search::{self, SearchProvider, WalkdirSearch};
use crate::session::Session;

/// Mediation entry point. Every request runs its validation to completion
/// before its handler is invoked; every return path carries a fully populated
/// result envelope, an audit entry, and elapsed time.
pub struct Executor {
    config: Arc<Config>,
    session: Arc<Session>,
    files: Arc<dyn FileCapability>,
    exec: Arc<dyn ExecCapability>,
    search: Arc<dyn SearchProvider>,
}

impl Executor {
    /// Production wiring: real file handler, docker sandbox, walkdir search.
    pub fn new(config: Arc<Config>, audit: Option<Arc<AuditLogger>>) -> Self {
        let session = Arc::new(Session::new(Arc::clone(&config), audit));
        let exec = Arc::new(ExecSandbox::docker(
            config.exec.clone(),
            config.repository_root.clone(),
        ));
        let search = Arc::new(WalkdirSearch::new(
            config.repository_root.clone(),
            config.excluded_paths.clone(),
        ));
        Self::with_handlers(config, session, Arc::new(FileHandler::new()), exec, search)
    }

    /// Explicit wiring; the executor depends only on the capability traits.
    pub fn with_handlers(
        config: Arc<Config>,
        session: Arc<Session>,
        files: Arc<dyn FileCapability>,
        exec: Arc<dyn ExecCapability>,
        search: Arc<dyn SearchProvider>,
    ) -> Self {
        Self {
            config,
            session,
            files,
            exec,
            search,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub async fn execute(&self, command: &Command) -> ExecutionResult {
        match command.kind {
            CommandKind::Open => self.execute_open(command).await,
            CommandKind::Write => self.execute_write(command).await,
            CommandKind::Exec => self.execute_exec(command).await,
            CommandKind::Search => self.execute_search(command).await,
        }
    }

    pub async fn execute_open(&self, command: &Command) -> ExecutionResult {
        let started = Instant::now();
        let resolved = match path::validate_path(
            &command.argument,
            &self.config.repository_root,
            &self.config.excluded_paths,
        )
        .await
        {
            Ok(resolved) => resolved,
            Err(e) => return self.finish_err(command, e, started),
        };

        match self.files.open(&resolved, self.config.max_file_size).await {
            Ok(content) => self.finish_ok(command, content, started),
            Err(e) => self.finish_err(command, e, started),
        }
    }

    pub async fn execute_write(&self, command: &Command) -> ExecutionResult {
        let started = Instant::now();
        let resolved = match path::validate_path(
            &command.argument,
            &self.config.repository_root,
            &self.config.excluded_paths,
        )
        .await
        {
            Ok(resolved) => resolved,
            Err(e) => return self.finish_err(command, e, started),
        };
        if let Err(e) = extension::validate_write_extension(
            &command.argument,
            &self.config.normalized_extensions(),
        ) {
            return self.finish_err(command, e, started);
        }

        let content = command.content.as_deref().unwrap_or("");
        match self
            .files
            .write(
                &resolved,
                content,
                self.config.max_write_size,
                self.config.backup_before_write,
            )
            .await
        {
            Ok(outcome) => {
                let verb = match outcome.action {
                    WriteAction::Created => "created",
                    WriteAction::Updated => "updated",
                };
                let summary = format!(
                    "{verb} {} ({} bytes)",
                    command.argument, outcome.bytes_written
                );
                self.finish_ok(command, summary, started).with_write(outcome)
            }
            Err(e) => self.finish_err(command, e, started),
        }
    }

    pub async fn execute_exec(&self, command: &Command) -> ExecutionResult {
        let started = Instant::now();
        let verdict = self.exec.execute(&command.argument).await;

        let mut result = match verdict.error {
            None => {
                let stdout = verdict
                    .outcome
                    .as_ref()
                    .map(|o| o.stdout.clone())
                    .unwrap_or_default();
                self.finish_ok(command, stdout, started)
            }
            Some(e) => self.finish_err(command, e, started),
        };
        // Exit code and captured output travel with the envelope even when
        // the run itself failed.
        if let Some(outcome) = verdict.outcome {
            result = result.with_exec(outcome);
        }
        result
    }

    pub async fn execute_search(&self, command: &Command) -> ExecutionResult {
        let started = Instant::now();
        if !self.config.search.enabled {
            return self.finish_err(
                command,
                MediationError::search_disabled("search is disabled"),
                started,
            );
        }

        match self
            .search
            .search(&command.argument, self.config.search.max_results)
            .await
        {
            Ok(hits) => {
                let report = search::format_report(&command.argument, &hits);
                self.finish_ok(command, report, started)
            }
            Err(e) => self.finish_err(command, e, started),
        }
    }

    fn finish_ok(&self, command: &Command, result: String, started: Instant) -> ExecutionResult {
        self.session.increment_commands_run();
        self.session
            .log_audit(command.kind.as_str(), &command.argument, true, "");
        ExecutionResult::ok(command.clone(), result, started.elapsed())
    }

    fn finish_err(
        &self,
        command: &Command,
        error: MediationError,
        started: Instant,
    ) -> ExecutionResult {
        self.session
            .log_audit(command.kind.as_str(), &command.argument, false, &error.to_string());
        ExecutionResult::err(command.clone(), error, started.elapsed())
    }
}
