//! Configuration file loading and validation.
//!
//! Two sources, with different failure behavior: an explicit path (from
//! `--config`) is authoritative and must exist, while the default search
//! (cwd dotfile, then the user config dir) quietly falls back to defaults
//! when nothing is found. Either way a file that loads is validated before
//! it reaches the runner.

use std::path::{Path, PathBuf};

use crate::config::RunnerConfig;

/// Loads and validates the runner configuration.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    /// Explicit path overriding the default search, if any.
    explicit: Option<PathBuf>,
}

impl ConfigLoader {
    /// Loader using the default search locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loader pinned to one explicit config file.
    ///
    /// Unlike the searched locations, an explicit path that does not exist
    /// is an error; the caller asked for that file specifically.
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            explicit: Some(path),
        }
    }

    /// Default search locations, in priority order.
    #[must_use]
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".subagent-runner.toml")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("subagent-runner").join("config.toml"));
        }
        paths
    }

    /// Load the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error when an explicit path is missing, when a found file
    /// cannot be read or parsed, or when the loaded values fail validation.
    pub fn load(&self) -> Result<RunnerConfig, ConfigError> {
        if let Some(path) = &self.explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound { path: path.clone() });
            }
            return Self::load_file(path);
        }

        for path in Self::search_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading config file");
                return Self::load_file(&path);
            }
        }

        tracing::debug!("No config file found, using defaults");
        Ok(RunnerConfig::default())
    }

    fn load_file(path: &Path) -> Result<RunnerConfig, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: RunnerConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;

        Self::validate(&config).map_err(|reason| ConfigError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;

        Ok(config)
    }

    /// Reject values the runner cannot operate with.
    fn validate(config: &RunnerConfig) -> Result<(), String> {
        if config.binary.trim().is_empty() {
            return Err("binary must not be empty".to_string());
        }
        if config.max_stdout_bytes == 0 {
            return Err("max_stdout_bytes must be greater than zero".to_string());
        }
        if config.max_stderr_bytes == 0 {
            return Err("max_stderr_bytes must be greater than zero".to_string());
        }
        if config.ai.base_url.trim().is_empty() {
            return Err("ai.base_url must not be empty".to_string());
        }
        if config.ai.model.trim().is_empty() {
            return Err("ai.model must not be empty".to_string());
        }
        if config.ai.max_tokens == 0 {
            return Err("ai.max_tokens must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file {path} does not exist")]
    NotFound { path: PathBuf },

    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid config in {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
