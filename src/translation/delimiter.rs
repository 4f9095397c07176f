/*!
 * Delimiter markers for batched translation.
 *
 * Many caption lines are joined into one text separated by marker lines such
 * as `⟦#48213907⟧`, translated in one go, then split back on the markers.
 * Generating a marker and recognising a (possibly mangled) marker are kept
 * apart: [`Delimiter`] owns the token, [`TolerancePolicy`] owns the
 * equivalence rules used when re-parsing the engine's output.
 */

use log::debug;
use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use crate::errors::BatchError;

/// Canonical opening bracket of a marker
pub const MARKER_OPEN: &str = "⟦";

/// Canonical closing bracket of a marker
pub const MARKER_CLOSE: &str = "⟧";

/// Canonical token prefix inside a marker
pub const MARKER_HASH: &str = "#";

/// Range of generated tokens (eight digits)
const TOKEN_RANGE: std::ops::Range<u64> = 10_000_000..100_000_000;

/// Maximum attempts to find a token absent from the input texts
const MAX_TOKEN_ATTEMPTS: usize = 64;

/// Any canonical marker line, whatever the token
static CANONICAL_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*⟦\s*#?\s*\d+\s*⟧\s*$").unwrap());

/// Whether a line is a canonical marker line
pub fn looks_like_marker(line: &str) -> bool {
    CANONICAL_MARKER.is_match(line)
}

/// Substitutions a translator is allowed to make to a marker.
///
/// Every entry of a list is treated as equivalent to the canonical character.
/// Extend the lists to accept more variants; the split pattern is derived
/// from them.
#[derive(Debug, Clone)]
pub struct TolerancePolicy {
    /// Accepted spellings of the opening bracket
    pub open: Vec<String>,
    /// Accepted spellings of the closing bracket
    pub close: Vec<String>,
    /// Accepted spellings of the hash prefix
    pub hash: Vec<String>,
    /// Whether the hash prefix may be dropped entirely
    pub hash_optional: bool,
}

impl Default for TolerancePolicy {
    fn default() -> Self {
        let to_vec = |items: &[&str]| items.iter().map(|s| s.to_string()).collect();
        Self {
            open: to_vec(&[MARKER_OPEN, "[[", "[", "【", "〚", "("]),
            close: to_vec(&[MARKER_CLOSE, "]]", "]", "】", "〛", ")"]),
            hash: to_vec(&[MARKER_HASH, "＃"]),
            hash_optional: true,
        }
    }
}

impl TolerancePolicy {
    /// Only accept the exact canonical marker, modulo surrounding whitespace
    pub fn strict() -> Self {
        Self {
            open: vec![MARKER_OPEN.to_string()],
            close: vec![MARKER_CLOSE.to_string()],
            hash: vec![MARKER_HASH.to_string()],
            hash_optional: false,
        }
    }

    /// Accept an extra bracket pair
    pub fn with_brackets(mut self, open: &str, close: &str) -> Self {
        self.open.push(open.to_string());
        self.close.push(close.to_string());
        self
    }

    /// Build the pattern matching a marker for `token`.
    ///
    /// Newlines around the marker are consumed; spaces that belong to the
    /// neighbouring text lines are not.
    pub fn pattern(&self, token: &str) -> Result<Regex, regex::Error> {
        let hash = alternation(&self.hash);
        let hash = if self.hash_optional {
            format!("(?:{})?", hash)
        } else {
            format!("(?:{})", hash)
        };

        let pattern = format!(
            r"\n*[ \t]*(?:{open})[ \t]*{hash}[ \t]*{token}[ \t]*(?:{close})[ \t]*(?:\r?\n)*",
            open = alternation(&self.open),
            close = alternation(&self.close),
            hash = hash,
            token = regex::escape(token),
        );
        Regex::new(&pattern)
    }
}

/// Regex alternation with longest variants first so `[[` wins over `[`
fn alternation(variants: &[String]) -> String {
    let mut sorted: Vec<&String> = variants.iter().collect();
    sorted.sort_by(|a, b| b.chars().count().cmp(&a.chars().count()));
    sorted
        .iter()
        .map(|v| regex::escape(v))
        .collect::<Vec<_>>()
        .join("|")
}

/// A marker token unique with respect to one batch of texts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiter {
    token: String,
}

impl Delimiter {
    /// Generate a random token that does not occur in any of the texts
    pub fn generate(texts: &[String]) -> Self {
        let mut rng = rand::rng();
        let mut token = rng.random_range(TOKEN_RANGE).to_string();

        for _ in 0..MAX_TOKEN_ATTEMPTS {
            if !texts.iter().any(|t| t.contains(&token)) {
                break;
            }
            debug!("Delimiter token {} collides with input, regenerating", token);
            token = rng.random_range(TOKEN_RANGE).to_string();
        }

        // Digit soup everywhere: widen the token until it is unique
        while texts.iter().any(|t| t.contains(&token)) {
            token.push_str(&rng.random_range(0..10u8).to_string());
        }

        Self { token }
    }

    /// Use a fixed token
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The token digits
    pub fn token(&self) -> &str {
        &self.token
    }

    /// The canonical marker, e.g. `⟦#48213907⟧`
    pub fn marker(&self) -> String {
        format!("{}{}{}{}", MARKER_OPEN, MARKER_HASH, self.token, MARKER_CLOSE)
    }

    /// Join texts with the marker on its own line between each of them
    pub fn join(&self, texts: &[String]) -> String {
        texts.join(&format!("\n{}\n", self.marker()))
    }

    /// Split translated text back into exactly `expected` pieces
    pub fn split(
        &self,
        translated: &str,
        expected: usize,
        policy: &TolerancePolicy,
    ) -> Result<Vec<String>, BatchError> {
        let pattern = policy
            .pattern(&self.token)
            .map_err(|_| BatchError::DelimiterMismatch {
                expected,
                actual: 0,
            })?;

        let mut pieces: Vec<String> = pattern
            .split(translated)
            .map(|piece| {
                piece
                    .trim_start_matches(['\r', '\n'])
                    .trim_end_matches('\n')
                    .to_string()
            })
            .collect();

        // A marker at the very start or end leaves one blank artifact
        if pieces.len() > expected && pieces.first().is_some_and(|p| p.trim().is_empty()) {
            pieces.remove(0);
        }
        if pieces.len() > expected && pieces.last().is_some_and(|p| p.trim().is_empty()) {
            pieces.pop();
        }

        if pieces.len() != expected {
            return Err(BatchError::DelimiterMismatch {
                expected,
                actual: pieces.len(),
            });
        }

        Ok(pieces)
    }
}
