/*!
 * Error types for the yttrans service.
 *
 * This module contains custom error types for the different layers of the
 * service, using the thiserror crate for ergonomic error definitions.
 * Storage and pipeline plumbing use `anyhow` with context instead.
 */

use thiserror::Error;

/// Errors that can occur when calling a translation engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// The engine cannot translate into (or from) the requested language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),
}

/// Errors raised while translating a batch of caption lines
#[derive(Error, Debug)]
pub enum BatchError {
    /// The translated text did not split back into one piece per input line
    #[error("delimiter split mismatch after translation: expected {expected} pieces, got {actual}")]
    DelimiterMismatch {
        /// Number of input texts
        expected: usize,
        /// Number of pieces recovered from the translation
        actual: usize,
    },

    /// The engine failed on one of the chunks
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl BatchError {
    /// Whether this failure came from a mutated delimiter rather than the engine
    pub fn is_delimiter_mismatch(&self) -> bool {
        matches!(self, Self::DelimiterMismatch { .. })
    }
}

/// Errors raised while rebuilding a caption document
#[derive(Error, Debug, PartialEq)]
pub enum ExtractError {
    /// Replacement texts do not line up with the translatable line indices
    #[error("translated line count mismatch: expected {expected}, got {actual}")]
    CountMismatch {
        /// Number of translatable line indices
        expected: usize,
        /// Number of replacement texts supplied
        actual: usize,
    },

    /// An index points past the end of the document
    #[error("line index {index} out of range for document with {len} lines")]
    IndexOutOfRange {
        /// Offending index
        index: usize,
        /// Number of lines in the document
        len: usize,
    },
}

/// Errors surfaced to callers of the translator service
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Bad submission or request input
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Unknown job, or a result that expired or was already fetched
    #[error("not found: {0}")]
    NotFound(String),

    /// The job is not in a state that allows the operation
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// Storage or other internal failure
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
