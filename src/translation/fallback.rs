/*!
 * Line-by-line translation, used when batching a document fails.
 *
 * One engine call per translatable line: slow, but there is no marker the
 * engine could damage. Engine errors are returned unchanged.
 */

use log::debug;

use crate::errors::ProviderError;
use crate::providers::TranslationEngine;
use crate::subtitle_processor::{is_translatable_line, split_lines};

/// Translate a caption document one translatable line at a time
pub async fn translate_line_by_line(
    document: &str,
    engine: &dyn TranslationEngine,
    source_language: &str,
    target_language: &str,
) -> Result<String, ProviderError> {
    let mut lines = split_lines(document);
    let mut calls = 0usize;

    for line in lines.iter_mut() {
        if !is_translatable_line(line) {
            continue;
        }
        *line = engine
            .translate(line, source_language, target_language)
            .await?;
        calls += 1;
    }

    debug!(
        "Line-by-line translation to {} made {} engine calls",
        target_language, calls
    );

    let mut output = lines.join("\n");
    if document.ends_with('\n') {
        output.push('\n');
    }
    Ok(output)
}
