use log::debug;

use crate::errors::ExtractError;

// @module: Caption document line classification and reassembly

// @const: Document type header every WebVTT document starts with
pub const WEBVTT_HEADER: &str = "WEBVTT";

// @const: Token separating cue start and end times
pub const CUE_TIMING_SEPARATOR: &str = "-->";

// @const: Comment block marker
pub const NOTE_MARKER: &str = "NOTE";

/// Returns true when a document line carries free text worth translating.
///
/// Structural lines are left alone: blank lines, cue timings, the document
/// header, comment blocks and purely numeric cue identifiers.
pub fn is_translatable_line(line: &str) -> bool {
    let trimmed = line.trim();

    if trimmed.is_empty()
        || trimmed.contains(CUE_TIMING_SEPARATOR)
        || trimmed == WEBVTT_HEADER
        || trimmed.starts_with(NOTE_MARKER)
    {
        return false;
    }

    // Cue sequence numbers
    !trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Whether a document declares the expected header token
pub fn has_webvtt_header(document: &str) -> bool {
    document.trim().starts_with(WEBVTT_HEADER)
}

/// Split a document into lines the way the caption tooling expects.
///
/// A single trailing newline does not produce an extra empty line; callers
/// track it separately through [`CaptionLines::trailing_newline`].
pub fn split_lines(document: &str) -> Vec<String> {
    if document.is_empty() {
        return Vec::new();
    }

    let body = document.strip_suffix('\n').unwrap_or(document);
    body.split('\n').map(str::to_string).collect()
}

/// Extract the full line list, the translatable line indices and their texts
pub fn extract_translatable_lines(document: &str) -> (Vec<String>, Vec<usize>, Vec<String>) {
    let lines = split_lines(document);
    let mut indices = Vec::new();
    let mut texts = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        if is_translatable_line(line) {
            indices.push(idx);
            texts.push(line.clone());
        }
    }

    debug!(
        "Extracted {} translatable lines out of {}",
        texts.len(),
        lines.len()
    );

    (lines, indices, texts)
}

/// Substitute translated texts back into the original lines.
///
/// The trailing newline of the source document is not restored here.
pub fn inject_translated_lines(
    lines: &[String],
    indices: &[usize],
    translated: &[String],
) -> Result<String, ExtractError> {
    if indices.len() != translated.len() {
        return Err(ExtractError::CountMismatch {
            expected: indices.len(),
            actual: translated.len(),
        });
    }

    let mut out: Vec<String> = lines.to_vec();
    for (&idx, text) in indices.iter().zip(translated) {
        let slot = out.get_mut(idx).ok_or(ExtractError::IndexOutOfRange {
            index: idx,
            len: lines.len(),
        })?;
        *slot = text.clone();
    }

    Ok(out.join("\n"))
}

// @struct: A caption document split for translation
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLines {
    // @field: Every line of the source document
    pub lines: Vec<String>,

    // @field: Positions of translatable lines in `lines`
    pub indices: Vec<usize>,

    // @field: Text of each translatable line, same order as `indices`
    pub texts: Vec<String>,

    // @field: Whether the source ended with a newline
    pub trailing_newline: bool,
}

impl CaptionLines {
    /// Split a caption document into structural and translatable lines
    pub fn extract(document: &str) -> Self {
        let (lines, indices, texts) = extract_translatable_lines(document);
        Self {
            lines,
            indices,
            texts,
            trailing_newline: document.ends_with('\n'),
        }
    }

    /// Rebuild the document with translated texts, restoring the trailing newline
    pub fn rebuild(&self, translated: &[String]) -> Result<String, ExtractError> {
        let mut body = inject_translated_lines(&self.lines, &self.indices, translated)?;
        if self.trailing_newline {
            body.push('\n');
        }
        Ok(body)
    }

    /// Number of translatable lines
    pub fn len(&self) -> usize {
        self.texts.len()
    }

    /// Whether the document has nothing to translate
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty()
    }
}
