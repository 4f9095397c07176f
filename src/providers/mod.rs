/*!
 * Translation engine implementations.
 *
 * The job pipeline treats every backend as an opaque `translate` function
 * that may fail. This module contains the engines that can be selected by
 * name in the configuration:
 * - `dummy`: Placeholder text, useful for wiring tests and demos
 * - `ollama`: Local LLM server over HTTP
 *
 * `MockEngine` is available for tests and benchmarks.
 */

use std::fmt::Debug;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use crate::app_config::Config;
use crate::errors::ProviderError;

/// Common trait for all translation engines
///
/// Engines are shared between concurrently running jobs, so implementations
/// must be `Send + Sync`. Calls that block the thread (model inference,
/// synchronous I/O) must be offloaded by the engine itself, for instance
/// through `tokio::task::spawn_blocking`.
#[async_trait]
pub trait TranslationEngine: Send + Sync + Debug {
    /// Languages this engine can translate into
    async fn list_languages(&self) -> Result<Vec<String>, ProviderError>;

    /// Translate a block of text
    ///
    /// # Arguments
    /// * `text` - The text to translate, possibly containing delimiter lines
    /// * `source_language` - Source language tag, or "auto"
    /// * `target_language` - Target language tag
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError>;
}

/// Optional capability for engines that retry transient failures themselves
pub trait RetryClassifier {
    /// Whether a failed call is worth retrying
    fn is_retryable(&self, error: &ProviderError) -> bool;
}

/// Engine names accepted by [`build_engine`]
pub const SUPPORTED_ENGINES: &[&str] = &["dummy", "ollama"];

/// Whether an engine name is known to the registry
pub fn is_supported_engine(name: &str) -> bool {
    SUPPORTED_ENGINES.contains(&name.trim().to_lowercase().as_str())
}

/// Build the engine selected by the configuration
pub fn build_engine(config: &Config) -> Result<Arc<dyn TranslationEngine>> {
    let name = config.engine.trim().to_lowercase();

    match name.as_str() {
        "dummy" => Ok(Arc::new(dummy::DummyEngine::new(config.langs.clone()))),
        "ollama" => Ok(Arc::new(ollama::OllamaEngine::from_config(
            &config.ollama,
            config.langs.clone(),
        )?)),
        other => Err(anyhow!(
            "Unknown engine '{}'. Supported engines: {}",
            other,
            SUPPORTED_ENGINES.join(", ")
        )),
    }
}

pub mod dummy;
pub mod mock;
pub mod ollama;
