/*!
 * Ollama engine: translation through a local LLM server.
 *
 * Requests go to `/api/generate` with a system prompt instructing the model
 * to keep delimiter lines intact. Transient failures are retried with
 * exponential backoff; the retry decision belongs to this adapter through
 * its [`RetryClassifier`] implementation.
 */

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::app_config::OllamaConfig;
use crate::errors::ProviderError;
use crate::language_utils;
use crate::providers::{RetryClassifier, TranslationEngine};

/// Error message fragments that indicate a transient failure
const TRANSIENT_MARKERS: &[&str] = &[
    "timed out",
    "timeout",
    "connection reset",
    "connection refused",
    "temporarily unavailable",
    "too many requests",
    "model is loading",
];

/// Generate request for the Ollama API
#[derive(Debug, Serialize)]
struct GenerationRequest {
    model: String,
    prompt: String,
    system: String,
    stream: bool,
    options: GenerationOptions,
}

#[derive(Debug, Serialize)]
struct GenerationOptions {
    temperature: f32,
}

/// Generation response from the Ollama API
#[derive(Debug, Deserialize)]
struct GenerationResponse {
    response: String,
    #[serde(default)]
    done: bool,
}

/// Engine backed by an Ollama server
#[derive(Debug)]
pub struct OllamaEngine {
    /// Base URL of the Ollama API
    base_url: Url,
    /// HTTP client for making requests
    client: Client,
    /// Model name to use for generation
    model: String,
    /// Sampling temperature
    temperature: f32,
    /// Maximum number of retry attempts
    max_retries: u32,
    /// Base backoff time in milliseconds for exponential backoff
    backoff_base_ms: u64,
    /// Languages advertised by `list_languages`
    langs: Vec<String>,
}

impl OllamaEngine {
    /// Create an engine from its configuration section
    pub fn from_config(config: &OllamaConfig, langs: Vec<String>) -> Result<Self> {
        let base_url = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid Ollama endpoint: {}", config.endpoint))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            // Ollama speaks HTTP/1.1
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url,
            client,
            model: config.model.clone(),
            temperature: config.temperature,
            max_retries: config.retry_count,
            backoff_base_ms: config.retry_backoff_ms,
            langs,
        })
    }

    fn system_prompt(source_language: &str, target_language: &str) -> String {
        let source = if source_language == "auto" {
            "the detected source language".to_string()
        } else {
            language_utils::display_name(source_language)
        };
        let target = language_utils::display_name(target_language);

        format!(
            "You translate subtitle text from {} to {}. \
             Translate every line and keep the line structure. \
             Lines that look like ⟦#digits⟧ are markers: copy them exactly, on their own line. \
             Reply with the translation only, no commentary.",
            source, target
        )
    }

    async fn generate_once(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let url = self
            .base_url
            .join("api/generate")
            .map_err(|e| ProviderError::RequestFailed(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    ProviderError::ConnectionError(e.to_string())
                } else {
                    ProviderError::RequestFailed(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            if status.as_u16() == 429 {
                return Err(ProviderError::RateLimitExceeded(message));
            }
            return Err(ProviderError::ApiError {
                status_code: status.as_u16(),
                message,
            });
        }

        let body: GenerationResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        if !body.done {
            warn!("Ollama returned an unfinished generation");
        }

        Ok(body.response)
    }
}

impl RetryClassifier for OllamaEngine {
    fn is_retryable(&self, error: &ProviderError) -> bool {
        match error {
            ProviderError::ConnectionError(_) | ProviderError::RateLimitExceeded(_) => true,
            ProviderError::ApiError { status_code, .. } if *status_code >= 500 => true,
            ProviderError::ApiError { message, .. } | ProviderError::RequestFailed(message) => {
                let lower = message.to_lowercase();
                TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker))
            }
            _ => false,
        }
    }
}

#[async_trait]
impl TranslationEngine for OllamaEngine {
    async fn list_languages(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self.langs.clone())
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let target_language = language_utils::normalize_language_tag(target_language);
        let request = GenerationRequest {
            model: self.model.clone(),
            prompt: text.to_string(),
            system: Self::system_prompt(source_language, &target_language),
            stream: false,
            options: GenerationOptions {
                temperature: self.temperature,
            },
        };

        let mut attempt = 0;
        loop {
            match self.generate_once(&request).await {
                Ok(output) => return Ok(output),
                Err(e) if attempt < self.max_retries && self.is_retryable(&e) => {
                    attempt += 1;
                    let backoff_ms = self.backoff_base_ms * (1u64 << (attempt - 1).min(16));
                    debug!(
                        "Ollama call failed ({}), retry {}/{} in {}ms",
                        e, attempt, self.max_retries, backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
                Err(e) => {
                    error!("Ollama translate failed after {} attempts: {}", attempt + 1, e);
                    return Err(e);
                }
            }
        }
    }
}
