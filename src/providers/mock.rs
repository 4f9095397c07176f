/*!
 * Mock engine implementations for testing.
 *
 * This module provides a mock engine that simulates different behaviors:
 * - `MockEngine::identity()` - Returns the text unchanged
 * - `MockEngine::uppercase()` - Uppercases the text, markers survive
 * - `MockEngine::strip_punctuation()` - Drops every non-alphanumeric character
 * - `MockEngine::failing()` - Always fails with an error
 * - `MockEngine::failing_for(langs)` - Fails only for the given targets
 */

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::providers::TranslationEngine;

/// Behavior mode for the mock engine
#[derive(Debug, Clone, PartialEq)]
pub enum MockBehavior {
    /// Returns the input text unchanged
    Identity,
    /// Returns the input text uppercased
    Uppercase,
    /// Removes every character that is not alphanumeric
    StripPunctuation,
    /// Always fails with an error
    Failing,
    /// Fails for the listed target languages, identity otherwise
    FailingFor(HashSet<String>),
    /// Identity after a delay (for shutdown and concurrency testing)
    Slow { delay_ms: u64 },
}

/// Mock engine for testing translation behavior
#[derive(Debug)]
pub struct MockEngine {
    /// Behavior mode
    behavior: MockBehavior,
    /// Number of translate calls served
    call_count: Arc<AtomicUsize>,
    /// Languages advertised by `list_languages`
    languages: Option<Vec<String>>,
}

impl MockEngine {
    /// Create a new mock engine with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            call_count: Arc::new(AtomicUsize::new(0)),
            languages: Some(vec!["es".to_string(), "fr".to_string(), "de".to_string()]),
        }
    }

    /// Engine that echoes the input
    pub fn identity() -> Self {
        Self::new(MockBehavior::Identity)
    }

    /// Engine that uppercases the input
    pub fn uppercase() -> Self {
        Self::new(MockBehavior::Uppercase)
    }

    /// Engine that strips punctuation, destroying any delimiter markers
    pub fn strip_punctuation() -> Self {
        Self::new(MockBehavior::StripPunctuation)
    }

    /// Engine that always errors
    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    /// Engine that errors for the given target languages only
    pub fn failing_for(langs: &[&str]) -> Self {
        Self::new(MockBehavior::FailingFor(
            langs.iter().map(|l| l.to_string()).collect(),
        ))
    }

    /// Engine that sleeps before echoing the input
    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Override the advertised languages; `None` makes the listing fail
    pub fn with_languages(mut self, languages: Option<Vec<String>>) -> Self {
        self.languages = languages;
        self
    }

    /// Number of translate calls made so far, shared between clones
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Clone for MockEngine {
    fn clone(&self) -> Self {
        Self {
            behavior: self.behavior.clone(),
            call_count: Arc::clone(&self.call_count),
            languages: self.languages.clone(),
        }
    }
}

#[async_trait]
impl TranslationEngine for MockEngine {
    async fn list_languages(&self) -> Result<Vec<String>, ProviderError> {
        self.languages
            .clone()
            .ok_or_else(|| ProviderError::ConnectionError("mock listing unavailable".to_string()))
    }

    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Identity => Ok(text.to_string()),
            MockBehavior::Uppercase => Ok(text.to_uppercase()),
            MockBehavior::StripPunctuation => {
                Ok(text.chars().filter(|c| c.is_alphanumeric()).collect())
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                status_code: 500,
                message: "Simulated engine failure".to_string(),
            }),
            MockBehavior::FailingFor(langs) => {
                if langs.contains(target_language) {
                    Err(ProviderError::UnsupportedLanguage(target_language.to_string()))
                } else {
                    Ok(text.to_string())
                }
            }
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*delay_ms)).await;
                Ok(text.to_string())
            }
        }
    }
}
