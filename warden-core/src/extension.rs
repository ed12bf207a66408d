// ABOUTME: write-target extension allow-list check; pure, no filesystem access.

use std::path::Path;

use warden_common::MediationError;

/// Checks the final dotted suffix of `path` against `allowed`.
///
/// `allowed` is expected in normalized form (lowercase, leading dot, `""` as
/// the explicit no-extension sentinel; see `Config::normalized_extensions`).
/// An empty allow-list means no restriction. Multi-dot names use only the
/// final suffix, so `archive.tar.gz` checks `.gz`.
pub fn validate_write_extension(path: &str, allowed: &[String]) -> Result<(), MediationError> {
    if allowed.is_empty() {
        return Ok(());
    }

    match Path::new(path).extension() {
        Some(ext) => {
            let suffix = format!(".{}", ext.to_string_lossy().to_ascii_lowercase());
            if allowed.iter().any(|a| a == &suffix) {
                Ok(())
            } else {
                Err(MediationError::extension_denied(format!(
                    "extension {suffix} not permitted (allowed: {})",
                    allowed.join(", ")
                )))
            }
        }
        None => {
            if allowed.iter().any(|a| a.is_empty()) {
                Ok(())
            } else {
                Err(MediationError::extension_denied(format!(
                    "path {path} has no extension (allowed: {})",
                    allowed.join(", ")
                )))
            }
        }
    }
}
