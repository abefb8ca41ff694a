//! Configuration types loaded from TOML.

use serde::{Deserialize, Serialize};

/// Default agent binary name resolved from `PATH`.
pub const DEFAULT_BINARY: &str = "agent";

/// Default cap on accumulated child stdout (4 MiB).
pub const DEFAULT_MAX_STDOUT_BYTES: usize = 4 * 1024 * 1024;

/// Default cap on accumulated child stderr (256 KiB).
pub const DEFAULT_MAX_STDERR_BYTES: usize = 256 * 1024;

/// Runner configuration, typically loaded by [`super::ConfigLoader`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Agent binary to spawn.
    pub binary: String,
    /// Byte threshold for accumulated stdout before termination.
    pub max_stdout_bytes: usize,
    /// Byte threshold for accumulated stderr before termination.
    pub max_stderr_bytes: usize,
    /// Completion-client settings for titles and handoffs.
    pub ai: AiConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            binary: DEFAULT_BINARY.to_string(),
            max_stdout_bytes: DEFAULT_MAX_STDOUT_BYTES,
            max_stderr_bytes: DEFAULT_MAX_STDERR_BYTES,
            ai: AiConfig::default(),
        }
    }
}

/// Settings for the one-off completion client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// API base URL.
    pub base_url: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    /// Model used for title/handoff generation.
    pub model: String,
    /// Response token cap.
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.anthropic.com".to_string(),
            api_key_env: "ANTHROPIC_API_KEY".to_string(),
            model: "claude-3-5-haiku-latest".to_string(),
            max_tokens: 256,
        }
    }
}
