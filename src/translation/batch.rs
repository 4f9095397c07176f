/*!
 * Batched translation of caption lines.
 *
 * All lines of a document are joined with a delimiter marker, cut into
 * chunks that fit the engine's character budget, translated chunk by chunk
 * and split back. The result is either exactly one translation per input
 * line or a [`BatchError`]; a wrong-length list is never returned.
 */

use log::debug;

use crate::errors::BatchError;
use crate::providers::TranslationEngine;

use super::chunking::split_into_chunks;
use super::delimiter::{Delimiter, TolerancePolicy};

/// Batch translator bound to one engine and one character budget
pub struct BatchTranslator<'a> {
    /// The engine to call
    engine: &'a dyn TranslationEngine,

    /// Maximum characters per engine call, 0 for unlimited
    max_chars: usize,

    /// Marker re-parsing rules
    policy: TolerancePolicy,
}

impl<'a> BatchTranslator<'a> {
    /// Create a new batch translator
    pub fn new(engine: &'a dyn TranslationEngine, max_chars: usize) -> Self {
        Self {
            engine,
            max_chars,
            policy: TolerancePolicy::default(),
        }
    }

    /// Use custom marker re-parsing rules
    pub fn with_policy(mut self, policy: TolerancePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Translate `texts`, returning one translation per text in order
    pub async fn translate_texts(
        &self,
        texts: &[String],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<String>, BatchError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let delimiter = Delimiter::generate(texts);
        let joined = delimiter.join(texts);
        let chunks = split_into_chunks(&joined, self.max_chars);

        debug!(
            "Batch translating {} lines in {} chunk(s) to {}",
            texts.len(),
            chunks.len(),
            target_language
        );

        // Sequential on purpose: chunk order is the output order
        let mut translated = String::with_capacity(joined.len());
        for chunk in &chunks {
            let output = self
                .engine
                .translate(chunk, source_language, target_language)
                .await?;
            translated.push_str(&output);
        }

        delimiter.split(&translated, texts.len(), &self.policy)
    }
}

/// Translate `texts` with a fresh [`BatchTranslator`]
pub async fn batch_translate_texts(
    texts: &[String],
    engine: &dyn TranslationEngine,
    source_language: &str,
    target_language: &str,
    max_chars: usize,
) -> Result<Vec<String>, BatchError> {
    BatchTranslator::new(engine, max_chars)
        .translate_texts(texts, source_language, target_language)
        .await
}
