// ABOUTME: whitelist-validated, container-isolated command execution with
// ABOUTME: resource limits and a hard deadline; no process outlives the call.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};
use uuid::Uuid;
use warden_common::{ExecConfig, ExecOutcome, MediationError};

/// Conventional timeout exit code, matching coreutils `timeout`.
pub const TIMEOUT_EXIT_CODE: i32 = 124;

/// Fixed in-sandbox mount point for the read-only repository.
pub const REPO_MOUNT: &str = "/workspace";

/// Writable scratch directory inside the sandbox.
pub const SCRATCH_DIR: &str = "/scratch";

const MAX_STDIO_BYTES: usize = 16 * 1024;

/// One isolated run request handed to the container runtime.
#[derive(Debug, Clone)]
pub struct RunSpec {
    pub image: String,
    pub command: String,
    pub repo_root: PathBuf,
    pub memory_limit_mb: u64,
    pub cpu_limit: f64,
    pub network_enabled: bool,
    pub timeout: Duration,
}

/// Raw outcome from the container runtime.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub duration: Duration,
    pub timed_out: bool,
}

/// Abstract container runtime. Swapping implementations must not change the
/// sandbox's validation or error classification.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Whether the runtime is reachable. Safe to call concurrently.
    async fn available(&self) -> bool;

    /// Runs the spec to completion or its deadline; on deadline the spawned
    /// container must be reaped, not abandoned.
    async fn run(&self, spec: &RunSpec) -> Result<RunOutput, MediationError>;
}

/// Production runtime shelling out to the docker CLI.
#[derive(Debug, Default)]
pub struct DockerCli {
    probe: OnceCell<bool>,
}

impl DockerCli {
    pub fn new() -> Self {
        Self {
            probe: OnceCell::new(),
        }
    }
}

fn docker_args(spec: &RunSpec, name: &str) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "--rm".to_string(),
        "--name".to_string(),
        name.to_string(),
        format!("--memory={}m", spec.memory_limit_mb),
        format!("--cpus={}", spec.cpu_limit),
    ];
    if !spec.network_enabled {
        args.push("--network".to_string());
        args.push("none".to_string());
    }
    args.push("-v".to_string());
    args.push(format!("{}:{REPO_MOUNT}:ro", spec.repo_root.display()));
    args.push("--tmpfs".to_string());
    args.push(SCRATCH_DIR.to_string());
    args.push("-w".to_string());
    args.push(REPO_MOUNT.to_string());
    args.push(spec.image.clone());
    args.push("sh".to_string());
    args.push("-c".to_string());
    args.push(spec.command.clone());
    args
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn available(&self) -> bool {
        *self
            .probe
            .get_or_init(|| async {
                tokio::process::Command::new("docker")
                    .args(["version", "--format", "{{.Server.Version}}"])
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await
                    .map(|s| s.success())
                    .unwrap_or(false)
            })
            .await
    }

    async fn run(&self, spec: &RunSpec) -> Result<RunOutput, MediationError> {
        let name = format!("warden-{}", Uuid::new_v4().simple());
        let started = Instant::now();

        let mut cmd = tokio::process::Command::new("docker");
        cmd.args(docker_args(spec, &name))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(spec.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(RunOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: output.stdout,
                stderr: output.stderr,
                duration: started.elapsed(),
                timed_out: false,
            }),
            Ok(Err(e)) => Err(MediationError::docker_unavailable(format!(
                "docker run failed: {e}"
            ))),
            Err(_) => {
                // Deadline elapsed: the client process is killed on drop, and
                // the container itself is reaped by name.
                warn!(container = %name, "exec deadline elapsed, killing container");
                let _ = tokio::process::Command::new("docker")
                    .args(["kill", &name])
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .await;
                Ok(RunOutput {
                    exit_code: TIMEOUT_EXIT_CODE,
                    stdout: Vec::new(),
                    stderr: Vec::new(),
                    duration: started.elapsed(),
                    timed_out: true,
                })
            }
        }
    }
}

/// Outcome of one mediated exec request.
///
/// `outcome` is populated whenever the command actually ran, including
/// non-zero exits and timeouts; `error` is `None` only for a clean exit.
#[derive(Debug, Clone)]
pub struct ExecVerdict {
    pub outcome: Option<ExecOutcome>,
    pub error: Option<MediationError>,
}

impl ExecVerdict {
    fn rejected(error: MediationError) -> Self {
        Self {
            outcome: None,
            error: Some(error),
        }
    }
}

/// Capability seam for sandboxed execution.
#[async_trait]
pub trait ExecCapability: Send + Sync {
    async fn execute(&self, command: &str) -> ExecVerdict;
}

/// Validates commands against the whitelist and runs them through the
/// container runtime. Holds only read-only configuration, so concurrent
/// invocations share nothing mutable.
pub struct ExecSandbox {
    config: ExecConfig,
    repo_root: PathBuf,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ExecSandbox {
    pub fn new(
        config: ExecConfig,
        repo_root: impl Into<PathBuf>,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            config,
            repo_root: repo_root.into(),
            runtime,
        }
    }

    pub fn docker(config: ExecConfig, repo_root: impl Into<PathBuf>) -> Self {
        Self::new(config, repo_root, Arc::new(DockerCli::new()))
    }

    /// Validates the command against the closed whitelist.
    ///
    /// Matching is boundary-aware: an entry admits a command only as its
    /// first whitespace token or as a full-string prefix ending at a token
    /// boundary. `go` never admits `go-evil`.
    pub fn validate(&self, command: &str) -> Result<(), MediationError> {
        if !self.config.enabled {
            return Err(MediationError::exec_validation(
                "command execution is disabled",
            ));
        }
        let command = command.trim();
        let Some(first_token) = command.split_whitespace().next() else {
            return Err(MediationError::exec_validation("empty command"));
        };

        let admitted = self
            .config
            .whitelist
            .iter()
            .map(|e| e.trim())
            .filter(|e| !e.is_empty())
            .any(|entry| whitelist_admits(entry, command, first_token));
        if admitted {
            Ok(())
        } else {
            Err(MediationError::exec_validation(format!(
                "command not whitelisted: {first_token}"
            )))
        }
    }
}

fn whitelist_admits(entry: &str, command: &str, first_token: &str) -> bool {
    entry == first_token
        || command == entry
        || command
            .strip_prefix(entry)
            .is_some_and(|rest| rest.starts_with(char::is_whitespace))
}

#[async_trait]
impl ExecCapability for ExecSandbox {
    async fn execute(&self, command: &str) -> ExecVerdict {
        if let Err(e) = self.validate(command) {
            return ExecVerdict::rejected(e);
        }

        if !self.runtime.available().await {
            return ExecVerdict::rejected(MediationError::docker_unavailable(
                "container runtime is not reachable",
            ));
        }

        let spec = RunSpec {
            image: self.config.container_image.clone(),
            command: command.trim().to_string(),
            repo_root: self.repo_root.clone(),
            memory_limit_mb: self.config.memory_limit_mb,
            cpu_limit: self.config.cpu_limit,
            network_enabled: self.config.network_enabled,
            timeout: Duration::from_secs(self.config.timeout_secs),
        };

        let run = match self.runtime.run(&spec).await {
            Ok(run) => run,
            Err(e) => return ExecVerdict::rejected(e),
        };

        let (stdout, stdout_truncated) = truncate_stdio(&run.stdout);
        let (stderr, stderr_truncated) = truncate_stdio(&run.stderr);
        let outcome = ExecOutcome {
            exit_code: run.exit_code,
            stdout,
            stderr,
            stdout_truncated,
            stderr_truncated,
        };
        debug!(
            command = %command,
            exit_code = run.exit_code,
            duration_ms = run.duration.as_millis() as u64,
            "sandboxed command finished"
        );

        let error = if run.timed_out {
            Some(MediationError::exec_timeout(format!(
                "command timed out after {}s",
                self.config.timeout_secs
            )))
        } else if run.exit_code != 0 {
            Some(MediationError::exec_failed(format!(
                "command exited with status {}",
                run.exit_code
            )))
        } else {
            None
        };

        ExecVerdict {
            outcome: Some(outcome),
            error,
        }
    }
}

fn truncate_stdio(bytes: &[u8]) -> (String, bool) {
    if bytes.len() <= MAX_STDIO_BYTES {
        return (String::from_utf8_lossy(bytes).into_owned(), false);
    }
    let mut out = String::from_utf8_lossy(&bytes[..MAX_STDIO_BYTES]).into_owned();
    out.push_str("\n[truncated]\n");
    (out, true)
}
