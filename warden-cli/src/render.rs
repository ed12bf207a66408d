// ABOUTME: renders result envelopes as deterministic, human-readable transcript
// ABOUTME: blocks for the cli.

use warden_common::{ExecutionResult, WriteAction};

pub fn render(result: &ExecutionResult) -> String {
    let status = if result.success { "ok" } else { "failed" };
    let mut out = format!(
        "── {} {} [{status}, {} ms] ──\n",
        result.command.kind,
        result.command.argument,
        result.execution_time.as_millis()
    );

    if let Some(error) = &result.error {
        out.push_str(&format!("{error}\n"));
    }

    if let Some(write) = &result.write {
        let verb = match write.action {
            WriteAction::Created => "CREATED",
            WriteAction::Updated => "UPDATED",
        };
        out.push_str(&format!("{verb}, {} bytes\n", write.bytes_written));
        if let Some(backup) = &write.backup_file {
            out.push_str(&format!("backup: {backup}\n"));
        }
    }

    if let Some(exec) = &result.exec {
        out.push_str(&format!("exit code: {}\n", exec.exit_code));
        if !result.success && !exec.stderr.is_empty() {
            out.push_str(&format!("stderr:\n{}", exec.stderr));
            if !exec.stderr.ends_with('\n') {
                out.push('\n');
            }
        }
    }

    if !result.result.is_empty() {
        out.push_str(&result.result);
        if !result.result.ends_with('\n') {
            out.push('\n');
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use warden_common::{Command, ExecOutcome, MediationError, WriteOutcome};

    #[test]
    fn success_block_carries_status_and_output() {
        let result =
            ExecutionResult::ok(Command::open("src/main.rs"), "fn main() {}", Duration::from_millis(7));
        let text = render(&result);
        assert!(text.contains("open src/main.rs [ok, 7 ms]"));
        assert!(text.contains("fn main() {}"));
    }

    #[test]
    fn failure_block_shows_the_classified_error() {
        let result = ExecutionResult::err(
            Command::exec("rm -rf /"),
            MediationError::exec_validation("command not whitelisted: rm"),
            Duration::from_millis(1),
        );
        let text = render(&result);
        assert!(text.contains("[failed"));
        assert!(text.contains("EXEC_VALIDATION: command not whitelisted: rm"));
    }

    #[test]
    fn write_block_reports_action_and_backup() {
        let result = ExecutionResult::ok(
            Command::write("a.txt", "x"),
            "updated a.txt (1 bytes)",
            Duration::from_millis(2),
        )
        .with_write(WriteOutcome {
            action: WriteAction::Updated,
            bytes_written: 1,
            backup_file: Some("a.txt.20260830T120000000.bak".to_string()),
        });
        let text = render(&result);
        assert!(text.contains("UPDATED, 1 bytes"));
        assert!(text.contains("backup: a.txt.20260830T120000000.bak"));
    }

    #[test]
    fn failed_exec_shows_exit_code_and_stderr() {
        let result = ExecutionResult::err(
            Command::exec("go vet"),
            MediationError::exec_failed("command exited with status 2"),
            Duration::from_millis(9),
        )
        .with_exec(ExecOutcome {
            exit_code: 2,
            stdout: String::new(),
            stderr: "vet: problem\n".to_string(),
            stdout_truncated: false,
            stderr_truncated: false,
        });
        let text = render(&result);
        assert!(text.contains("exit code: 2"));
        assert!(text.contains("vet: problem"));
    }
}
