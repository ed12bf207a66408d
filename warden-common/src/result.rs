use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::command::Command;
use crate::error::MediationError;

/// Whether a write created the target or replaced existing content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteAction {
    Created,
    Updated,
}

/// Outcome detail for a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    pub action: WriteAction,
    pub bytes_written: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_file: Option<String>,
}

/// Outcome detail for a sandboxed command run.
///
/// Populated even when the run itself failed (non-zero exit, timeout), so
/// callers can distinguish "ran and failed" from "could not run at all".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub stdout_truncated: bool,
    pub stderr_truncated: bool,
}

/// One ranked hit from the search collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: String,
    pub score: f64,
    pub line_count: usize,
    pub size: u64,
    pub preview: String,
    pub modified_unix: u64,
}

/// Uniform envelope returned for every mediated command.
///
/// Invariant: exactly one of `success == true, error == None` or
/// `success == false, error == Some(_)` holds; the constructors enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub command: Command,
    pub success: bool,
    pub result: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<MediationError>,
    pub execution_time: Duration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write: Option<WriteOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exec: Option<ExecOutcome>,
}

impl ExecutionResult {
    pub fn ok(command: Command, result: impl Into<String>, execution_time: Duration) -> Self {
        Self {
            command,
            success: true,
            result: result.into(),
            error: None,
            execution_time,
            write: None,
            exec: None,
        }
    }

    pub fn err(command: Command, error: MediationError, execution_time: Duration) -> Self {
        Self {
            command,
            success: false,
            result: String::new(),
            error: Some(error),
            execution_time,
            write: None,
            exec: None,
        }
    }

    pub fn with_write(mut self, write: WriteOutcome) -> Self {
        self.write = Some(write);
        self
    }

    pub fn with_exec(mut self, exec: ExecOutcome) -> Self {
        self.exec = Some(exec);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_and_err_hold_the_envelope_invariant() {
        let ok = ExecutionResult::ok(Command::open("a.txt"), "data", Duration::from_millis(3));
        assert!(ok.success && ok.error.is_none());

        let err = ExecutionResult::err(
            Command::open("b.txt"),
            MediationError::file_not_found("no such file"),
            Duration::from_millis(1),
        );
        assert!(!err.success && err.error.is_some());
        assert!(err.result.is_empty());
    }

    #[test]
    fn exec_detail_survives_serialization() {
        let res = ExecutionResult::ok(Command::exec("go test"), "ok", Duration::from_secs(1))
            .with_exec(ExecOutcome {
                exit_code: 0,
                stdout: "ok".into(),
                stderr: String::new(),
                stdout_truncated: false,
                stderr_truncated: false,
            });
        let back: ExecutionResult =
            serde_json::from_str(&serde_json::to_string(&res).unwrap()).unwrap();
        assert_eq!(back.exec.unwrap().exit_code, 0);
    }
}
