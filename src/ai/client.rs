//! HTTP completion client.
//!
//! Unlike the orchestration path, which folds every failure into a
//! `SpawnResult`, this client returns errors: titles and handoffs are
//! optional features and callers skip them when a request fails outright.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use crate::config::AiConfig;

/// Connection timeout for HTTP requests.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Overall request timeout for HTTP requests.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default()
}

/// Determine if a request should be retried based on status code and attempt count.
fn should_retry(status_code: u16, attempt: u32) -> bool {
    if attempt >= MAX_RETRIES {
        return false;
    }
    // Retry on 5xx server errors
    (500..600).contains(&status_code)
}

/// Exponential backoff: 1s, 2s, 4s.
fn calculate_backoff(attempt: u32) -> Duration {
    Duration::from_secs(1 << attempt)
}

/// Errors from completion requests.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("API key not configured (env: {0})")]
    MissingApiKey(String),
    #[error("API request failed: {0}")]
    RequestFailed(String),
    #[error("Failed to parse response: {0}")]
    ParseError(String),
    #[error("Completion request timed out")]
    Timeout,
}

/// Trait for completion providers.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Generate a single completion.
    async fn generate(&self, system: &str, user: &str) -> Result<String, CompletionError>;
}

/// Anthropic messages-API provider.
#[derive(Debug, Clone)]
pub struct AnthropicProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
}

impl AnthropicProvider {
    /// Create a new provider.
    #[must_use]
    pub fn new(base_url: String, api_key: String, model: String, max_tokens: u32) -> Self {
        Self {
            client: build_http_client(),
            base_url,
            api_key,
            model,
            max_tokens,
        }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicProvider {
    async fn generate(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let url = format!("{}/v1/messages", self.base_url.trim_end_matches('/'));

        let body = serde_json::json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "system": system,
            "messages": [{
                "role": "user",
                "content": user
            }]
        });

        let mut attempt = 0;
        loop {
            let response = self
                .client
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .header("Content-Type", "application/json")
                .json(&body)
                .send()
                .await
                .map_err(|e| {
                    if e.is_timeout() {
                        CompletionError::Timeout
                    } else {
                        CompletionError::RequestFailed(e.to_string())
                    }
                })?;

            let status = response.status();
            if status.is_success() {
                let json: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| CompletionError::ParseError(e.to_string()))?;

                return json["content"][0]["text"]
                    .as_str()
                    .map(String::from)
                    .ok_or_else(|| {
                        CompletionError::ParseError("No text in response".to_string())
                    });
            }

            let status_code = status.as_u16();
            if should_retry(status_code, attempt) {
                let backoff = calculate_backoff(attempt);
                tracing::debug!(status = status_code, ?backoff, "Retrying completion request");
                tokio::time::sleep(backoff).await;
                attempt += 1;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            return Err(CompletionError::RequestFailed(format!(
                "HTTP {status}: {text}"
            )));
        }
    }
}

/// One-off completion client configured from [`AiConfig`].
pub struct CompletionClient {
    provider: Box<dyn CompletionProvider>,
}

impl CompletionClient {
    /// Build a client from configuration, reading the API key from the
    /// configured environment variable.
    ///
    /// # Errors
    ///
    /// Returns `CompletionError::MissingApiKey` if the key is not set.
    pub fn from_config(config: &AiConfig) -> Result<Self, CompletionError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| CompletionError::MissingApiKey(config.api_key_env.clone()))?;

        Ok(Self {
            provider: Box::new(AnthropicProvider::new(
                config.base_url.clone(),
                api_key,
                config.model.clone(),
                config.max_tokens,
            )),
        })
    }

    /// Build a client over an explicit provider (used by tests).
    #[must_use]
    pub fn with_provider(provider: Box<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Generate a short title for a session from its task text.
    ///
    /// # Errors
    ///
    /// Returns the provider error on total response failure; callers skip
    /// the title in that case.
    pub async fn session_title(&self, task: &str) -> Result<String, CompletionError> {
        let title = self
            .provider
            .generate(super::TITLE_SYSTEM_PROMPT, task)
            .await?;
        Ok(title.trim().to_string())
    }

    /// Generate a handoff summary from the session's final text.
    ///
    /// # Errors
    ///
    /// Returns the provider error on total response failure.
    pub async fn handoff_summary(&self, transcript: &str) -> Result<String, CompletionError> {
        let summary = self
            .provider
            .generate(super::HANDOFF_SYSTEM_PROMPT, transcript)
            .await?;
        Ok(summary.trim().to_string())
    }
}
