// ABOUTME: bounded reads and atomic, optionally-backed-up writes for validated
// ABOUTME: repository paths; never leaves a target partially written.

use std::io::ErrorKind as IoKind;
use std::path::Path;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;
use warden_common::{MediationError, WriteAction, WriteOutcome};

/// Capability seam for file operations; the executor depends on this trait,
/// never on the concrete handler.
#[async_trait]
pub trait FileCapability: Send + Sync {
    /// Reads the full content of a validated path, bounded by `max_size`.
    async fn open(&self, resolved: &Path, max_size: u64) -> Result<String, MediationError>;

    /// Atomically writes `content` to a validated path.
    async fn write(
        &self,
        resolved: &Path,
        content: &str,
        max_size: u64,
        backup: bool,
    ) -> Result<WriteOutcome, MediationError>;
}

/// Production file handler backed by the real filesystem.
#[derive(Debug, Default)]
pub struct FileHandler;

impl FileHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileCapability for FileHandler {
    async fn open(&self, resolved: &Path, max_size: u64) -> Result<String, MediationError> {
        let meta = tokio::fs::metadata(resolved)
            .await
            .map_err(|e| classify_read_error(resolved, e))?;
        if meta.len() > max_size {
            return Err(MediationError::resource_limit(format!(
                "file size {} exceeds limit {max_size}",
                meta.len()
            )));
        }

        let bytes = tokio::fs::read(resolved)
            .await
            .map_err(|e| classify_read_error(resolved, e))?;
        debug!(path = %resolved.display(), bytes = bytes.len(), "opened file");
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn write(
        &self,
        resolved: &Path,
        content: &str,
        max_size: u64,
        backup: bool,
    ) -> Result<WriteOutcome, MediationError> {
        if content.len() as u64 > max_size {
            return Err(MediationError::resource_limit(format!(
                "write size {} exceeds limit {max_size}",
                content.len()
            )));
        }

        let exists = tokio::fs::symlink_metadata(resolved).await.is_ok();
        let action = if exists {
            WriteAction::Updated
        } else {
            WriteAction::Created
        };

        if let Some(parent) = resolved.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                MediationError::internal(format!("create {}: {e}", parent.display()))
            })?;
        }

        // Backup failure aborts before the target is touched.
        let backup_file = if backup && exists {
            Some(snapshot(resolved).await?)
        } else {
            None
        };

        let payload = reformat(resolved, content);

        let file_name = resolved
            .file_name()
            .ok_or_else(|| {
                MediationError::internal(format!("no file name in {}", resolved.display()))
            })?
            .to_string_lossy();
        let tmp = resolved.with_file_name(format!(
            ".{file_name}.tmp-{}",
            Uuid::new_v4().simple()
        ));

        if let Err(e) = tokio::fs::write(&tmp, payload.as_bytes()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(classify_write_error(&tmp, e));
        }
        if let Err(e) = tokio::fs::rename(&tmp, resolved).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(MediationError::internal(format!(
                "rename into {}: {e}",
                resolved.display()
            )));
        }

        debug!(path = %resolved.display(), bytes = payload.len(), ?action, "wrote file");
        Ok(WriteOutcome {
            action,
            bytes_written: payload.len() as u64,
            backup_file,
        })
    }
}

/// Copies the current target content to a timestamped sibling.
async fn snapshot(resolved: &Path) -> Result<String, MediationError> {
    let current = tokio::fs::read(resolved).await.map_err(|e| {
        MediationError::internal(format!("backup read {}: {e}", resolved.display()))
    })?;

    let stamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
    let file_name = resolved
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "backup".to_string());
    let backup_path = resolved.with_file_name(format!("{file_name}.{stamp}.bak"));

    tokio::fs::write(&backup_path, &current).await.map_err(|e| {
        MediationError::internal(format!("backup write {}: {e}", backup_path.display()))
    })?;
    Ok(backup_path.to_string_lossy().into_owned())
}

/// Best-effort pretty-printing for structured targets; on any parse failure
/// the original content is written unmodified.
fn reformat(resolved: &Path, content: &str) -> String {
    let is_json = resolved
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        return content.to_string();
    }
    match serde_json::from_str::<serde_json::Value>(content) {
        Ok(value) => {
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| content.to_string())
        }
        Err(_) => content.to_string(),
    }
}

fn classify_read_error(path: &Path, e: std::io::Error) -> MediationError {
    match e.kind() {
        IoKind::NotFound => {
            MediationError::file_not_found(format!("file not found: {}", path.display()))
        }
        IoKind::PermissionDenied => {
            MediationError::permission_denied(format!("permission denied: {}", path.display()))
        }
        _ => MediationError::internal(format!("read {}: {e}", path.display())),
    }
}

fn classify_write_error(path: &Path, e: std::io::Error) -> MediationError {
    match e.kind() {
        IoKind::PermissionDenied => {
            MediationError::permission_denied(format!("permission denied: {}", path.display()))
        }
        _ => MediationError::internal(format!("write {}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_common::ErrorKind;

    const MAX: u64 = 1024 * 1024;

    #[tokio::test]
    async fn open_missing_file_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileHandler::new()
            .open(&dir.path().join("absent.txt"), MAX)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::FileNotFound);
    }

    #[tokio::test]
    async fn open_reports_both_limit_and_actual_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        tokio::fs::write(&path, vec![b'a'; 100]).await.unwrap();

        let err = FileHandler::new().open(&path, 10).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ResourceLimit);
        assert!(err.message.contains("100"));
        assert!(err.message.contains("10"));
    }

    #[tokio::test]
    async fn write_then_open_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fresh.txt");
        let handler = FileHandler::new();

        let outcome = handler.write(&path, "hello warden\n", MAX, true).await.unwrap();
        assert_eq!(outcome.action, WriteAction::Created);
        assert_eq!(outcome.bytes_written, 13);
        assert!(outcome.backup_file.is_none());

        let content = handler.open(&path, MAX).await.unwrap();
        assert_eq!(content, "hello warden\n");
    }

    #[tokio::test]
    async fn overwrite_with_backup_snapshots_previous_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.txt");
        let handler = FileHandler::new();
        tokio::fs::write(&path, "old").await.unwrap();

        let outcome = handler.write(&path, "new", MAX, true).await.unwrap();
        assert_eq!(outcome.action, WriteAction::Updated);

        let backup = outcome.backup_file.expect("backup taken");
        assert_eq!(tokio::fs::read_to_string(&backup).await.unwrap(), "old");
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "new");
    }

    #[tokio::test]
    async fn overwrite_without_backup_flag_takes_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.txt");
        let handler = FileHandler::new();
        tokio::fs::write(&path, "old").await.unwrap();

        let outcome = handler.write(&path, "new", MAX, false).await.unwrap();
        assert_eq!(outcome.action, WriteAction::Updated);
        assert!(outcome.backup_file.is_none());
    }

    #[tokio::test]
    async fn oversized_write_is_rejected_without_touching_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capped.txt");
        let err = FileHandler::new()
            .write(&path, "0123456789", 5, false)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ResourceLimit);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn write_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a/b/c.txt");
        FileHandler::new().write(&path, "x", MAX, false).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&path).await.unwrap(), "x");
    }

    #[tokio::test]
    async fn json_targets_are_pretty_printed_best_effort() {
        let dir = tempfile::tempdir().unwrap();
        let handler = FileHandler::new();

        let path = dir.path().join("data.json");
        handler.write(&path, r#"{"b":1,"a":2}"#, MAX, false).await.unwrap();
        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.contains('\n'), "expected pretty output: {written}");

        // Invalid JSON falls back to the raw payload instead of failing.
        let bad = dir.path().join("broken.json");
        handler.write(&bad, "{not json", MAX, false).await.unwrap();
        assert_eq!(tokio::fs::read_to_string(&bad).await.unwrap(), "{not json");
    }

    #[tokio::test]
    async fn no_temporary_files_are_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.txt");
        FileHandler::new().write(&path, "x", MAX, false).await.unwrap();

        let mut entries = tokio::fs::read_dir(dir.path()).await.unwrap();
        let mut names = Vec::new();
        while let Some(e) = entries.next_entry().await.unwrap() {
            names.push(e.file_name().to_string_lossy().into_owned());
        }
        assert_eq!(names, vec!["t.txt"]);
    }
}
