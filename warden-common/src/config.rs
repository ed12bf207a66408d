use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Immutable per-run mediation policy, loaded from a JSON file or built in code.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Repository the mediation layer is confined to.
    pub repository_root: PathBuf,
    /// Largest file an open request may return, in bytes.
    pub max_file_size: u64,
    /// Largest payload a write request may carry, in bytes.
    pub max_write_size: u64,
    /// Glob patterns or literal path components that are never reachable.
    pub excluded_paths: Vec<String>,
    /// Write-target extension allow-list; empty means unrestricted.
    pub allowed_extensions: Vec<String>,
    /// Snapshot existing targets before overwriting them.
    pub backup_before_write: bool,
    pub exec: ExecConfig,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct ExecConfig {
    pub enabled: bool,
    /// Closed allow-list of permitted command prefixes.
    pub whitelist: Vec<String>,
    pub timeout_secs: u64,
    pub memory_limit_mb: u64,
    pub cpu_limit: f64,
    pub container_image: String,
    /// Network access inside the sandbox. Off unless deliberately enabled.
    pub network_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    pub enabled: bool,
    pub max_results: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repository_root: PathBuf::from("."),
            max_file_size: 10 * 1024 * 1024,
            max_write_size: 1024 * 1024,
            excluded_paths: vec![
                ".git".to_string(),
                "node_modules".to_string(),
                "target".to_string(),
            ],
            allowed_extensions: Vec::new(),
            backup_before_write: true,
            exec: ExecConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            whitelist: Vec::new(),
            timeout_secs: 30,
            memory_limit_mb: 512,
            cpu_limit: 1.0,
            container_image: "alpine:3.20".to_string(),
            network_enabled: false,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_results: 10,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

impl Config {
    /// Loads and validates a JSON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Default policy rooted at the given repository.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            repository_root: root.into(),
            ..Self::default()
        }
    }

    /// Enforces the config invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.repository_root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "repository_root must be non-empty".to_string(),
            ));
        }
        if self.exec.enabled && self.exec.whitelist.iter().all(|w| w.trim().is_empty()) {
            return Err(ConfigError::Invalid(
                "exec.whitelist must be non-empty when exec is enabled".to_string(),
            ));
        }
        if self.exec.enabled && self.exec.container_image.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "exec.container_image must be non-empty when exec is enabled".to_string(),
            ));
        }
        if self.exec.cpu_limit <= 0.0 {
            return Err(ConfigError::Invalid(
                "exec.cpu_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Allow-list entries normalized to lowercase with a leading dot.
    ///
    /// The empty string is kept as the explicit no-extension sentinel.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.allowed_extensions
            .iter()
            .map(|e| {
                let e = e.trim().to_ascii_lowercase();
                if e.is_empty() || e.starts_with('.') {
                    e
                } else {
                    format!(".{e}")
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_network_disabled() {
        let config = Config::default();
        config.validate().unwrap();
        assert!(!config.exec.network_enabled);
        assert!(!config.exec.enabled);
    }

    #[test]
    fn exec_enabled_requires_whitelist() {
        let mut config = Config::default();
        config.exec.enabled = true;
        assert!(config.validate().is_err());

        config.exec.whitelist = vec!["go".to_string()];
        config.validate().unwrap();
    }

    #[test]
    fn empty_root_is_rejected() {
        let config = Config::with_root("");
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let parsed: Result<Config, _> =
            serde_json::from_str(r#"{"repository_root":"/repo","hallucinated":true}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn extensions_normalize_to_dotted_lowercase() {
        let mut config = Config::default();
        config.allowed_extensions = vec!["GO".into(), ".Py".into(), "".into()];
        assert_eq!(config.normalized_extensions(), vec![".go", ".py", ""]);
    }
}
