/*!
 * Placeholder engine.
 *
 * Replaces every translatable line with a tagged filler sentence while
 * keeping surrounding whitespace, delimiter lines and numbers untouched.
 * It exercises the whole job pipeline without any external service.
 */

use async_trait::async_trait;

use crate::errors::ProviderError;
use crate::providers::TranslationEngine;
use crate::translation::delimiter;

const FILLER: &str = "Lorem ipsum";

/// Engine producing placeholder translations
#[derive(Debug, Clone)]
pub struct DummyEngine {
    langs: Vec<String>,
}

impl DummyEngine {
    /// Create a dummy engine advertising the given languages
    pub fn new(langs: Vec<String>) -> Self {
        Self { langs }
    }

    fn translate_line(line: &str, target_language: &str) -> String {
        let trimmed = line.trim();
        if trimmed.is_empty()
            || trimmed.chars().all(|c| c.is_ascii_digit())
            || delimiter::looks_like_marker(trimmed)
        {
            return line.to_string();
        }

        let start = line.len() - line.trim_start().len();
        let end = line.trim_end().len();
        format!(
            "{}[{}] {}{}",
            &line[..start],
            target_language,
            FILLER,
            &line[end..]
        )
    }
}

#[async_trait]
impl TranslationEngine for DummyEngine {
    async fn list_languages(&self) -> Result<Vec<String>, ProviderError> {
        if self.langs.is_empty() {
            return Ok(vec!["en".to_string()]);
        }
        Ok(self.langs.clone())
    }

    async fn translate(
        &self,
        text: &str,
        _source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let translated: Vec<String> = text
            .split('\n')
            .map(|line| Self::translate_line(line, target_language))
            .collect();
        Ok(translated.join("\n"))
    }
}
