// ABOUTME: resolves requested paths against the repository root, rejecting
// ABOUTME: exclusions, lexical traversal, and symlink escapes before any handler runs.

use std::ffi::OsString;
use std::io::ErrorKind as IoKind;
use std::path::{Path, PathBuf};

use glob::Pattern;
use path_clean::PathClean;
use tracing::warn;
use warden_common::MediationError;

/// Resolves `requested` inside `repo_root`, honoring `excluded` entries.
///
/// Exclusion entries are matched before any filesystem access: an entry
/// containing `*`, `?`, or `[` is a glob over the cleaned path (and its
/// repo-relative form); anything else is a literal path component, so `.git`
/// excludes `.git`, `.git/config`, and `a/.git/b`.
///
/// Containment is decided twice: a lexical guard on the cleaned join, and the
/// authoritative check after symlinks resolve. A target that does not exist
/// yet is resolved through its nearest existing ancestor so new write targets
/// can be validated.
pub async fn validate_path(
    requested: &str,
    repo_root: &Path,
    excluded: &[String],
) -> Result<PathBuf, MediationError> {
    if requested.trim().is_empty() {
        return Err(MediationError::path_security("empty path"));
    }

    let cleaned = Path::new(requested).clean();

    if let Some(entry) = matched_exclusion(&cleaned, repo_root, excluded) {
        warn!(path = %requested, entry = %entry, "rejected excluded path");
        return Err(MediationError::path_security(format!(
            "path {requested} matches excluded entry {entry}"
        )));
    }

    let root = tokio::fs::canonicalize(repo_root).await.map_err(|e| {
        MediationError::internal(format!(
            "resolve repository root {}: {e}",
            repo_root.display()
        ))
    })?;

    let joined = if cleaned.is_absolute() {
        cleaned
    } else {
        root.join(&cleaned).clean()
    };

    // Lexical guard: the relative-to-root form must not begin with "..".
    if joined.strip_prefix(&root).is_err() {
        warn!(path = %requested, "rejected lexical traversal outside repository root");
        return Err(MediationError::path_security(format!(
            "path {requested} escapes repository root"
        )));
    }

    let resolved = resolve_symlinks(&joined).await?;

    // Authoritative containment check: defeats symlink-based escapes the
    // lexical guard cannot see.
    if !resolved.starts_with(&root) {
        warn!(
            path = %requested,
            resolved = %resolved.display(),
            "rejected path resolving outside repository root"
        );
        return Err(MediationError::path_security(format!(
            "path {requested} resolves outside repository root"
        )));
    }

    Ok(resolved)
}

fn matched_exclusion<'a>(
    cleaned: &Path,
    repo_root: &Path,
    excluded: &'a [String],
) -> Option<&'a str> {
    let relative = cleaned.strip_prefix(repo_root).ok();
    for entry in excluded {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }
        if entry.contains(|c| matches!(c, '*' | '?' | '[')) {
            let Ok(pattern) = Pattern::new(entry) else {
                continue;
            };
            if pattern.matches(&cleaned.to_string_lossy())
                || relative.is_some_and(|r| pattern.matches(&r.to_string_lossy()))
            {
                return Some(entry);
            }
        } else {
            let target = relative.unwrap_or(cleaned);
            let needle = std::ffi::OsStr::new(entry);
            if target.components().any(|c| c.as_os_str() == needle)
                || target.starts_with(entry)
            {
                return Some(entry);
            }
        }
    }
    None
}

/// Canonicalizes `joined`, falling back to the nearest existing ancestor for
/// targets that do not exist yet and reattaching the missing suffix.
async fn resolve_symlinks(joined: &Path) -> Result<PathBuf, MediationError> {
    match tokio::fs::canonicalize(joined).await {
        Ok(resolved) => Ok(resolved),
        Err(e) if e.kind() == IoKind::NotFound => {
            let mut existing = joined.to_path_buf();
            let mut missing: Vec<OsString> = Vec::new();
            while tokio::fs::symlink_metadata(&existing).await.is_err() {
                match (existing.file_name(), existing.parent()) {
                    (Some(name), Some(parent)) => {
                        missing.push(name.to_os_string());
                        existing = parent.to_path_buf();
                    }
                    _ => {
                        return Err(MediationError::path_security(format!(
                            "cannot resolve {}",
                            joined.display()
                        )))
                    }
                }
            }
            let ancestor = tokio::fs::canonicalize(&existing).await.map_err(|e| {
                classify_resolve_error(&existing, e)
            })?;
            Ok(missing.into_iter().rev().fold(ancestor, |p, c| p.join(c)))
        }
        Err(e) => Err(classify_resolve_error(joined, e)),
    }
}

fn classify_resolve_error(path: &Path, e: std::io::Error) -> MediationError {
    match e.kind() {
        IoKind::PermissionDenied => {
            MediationError::permission_denied(format!("resolve {}: {e}", path.display()))
        }
        IoKind::NotFound => {
            MediationError::path_security(format!("broken link in {}", path.display()))
        }
        _ => MediationError::internal(format!("resolve {}: {e}", path.display())),
    }
}
