use std::fmt;

use serde::{Deserialize, Serialize};

/// Classification for every failure the mediation layer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    PathSecurity,
    ExtensionDenied,
    ResourceLimit,
    FileNotFound,
    PermissionDenied,
    ExecValidation,
    DockerUnavailable,
    ExecTimeout,
    ExecFailed,
    SearchDisabled,
    SearchFailed,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::PathSecurity => "PATH_SECURITY",
            ErrorKind::ExtensionDenied => "EXTENSION_DENIED",
            ErrorKind::ResourceLimit => "RESOURCE_LIMIT",
            ErrorKind::FileNotFound => "FILE_NOT_FOUND",
            ErrorKind::PermissionDenied => "PERMISSION_DENIED",
            ErrorKind::ExecValidation => "EXEC_VALIDATION",
            ErrorKind::DockerUnavailable => "DOCKER_UNAVAILABLE",
            ErrorKind::ExecTimeout => "EXEC_TIMEOUT",
            ErrorKind::ExecFailed => "EXEC_FAILED",
            ErrorKind::SearchDisabled => "SEARCH_DISABLED",
            ErrorKind::SearchFailed => "SEARCH_FAILED",
            ErrorKind::Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured failure returned by every mediated operation.
///
/// Mediation failures are data, not panics: the executor surfaces them inside
/// the result envelope with a kind prefix and a human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct MediationError {
    pub kind: ErrorKind,
    pub message: String,
}

impl MediationError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn path_security(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PathSecurity, message)
    }

    pub fn extension_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExtensionDenied, message)
    }

    pub fn resource_limit(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceLimit, message)
    }

    pub fn file_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::FileNotFound, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermissionDenied, message)
    }

    pub fn exec_validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExecValidation, message)
    }

    pub fn docker_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DockerUnavailable, message)
    }

    pub fn exec_timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExecTimeout, message)
    }

    pub fn exec_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ExecFailed, message)
    }

    pub fn search_disabled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SearchDisabled, message)
    }

    pub fn search_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SearchFailed, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}
