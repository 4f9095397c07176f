/*!
 * Size-bounded chunk splitting.
 *
 * Engines accept a limited number of characters per request. Long texts are
 * cut at the last sentence end inside the budget, else at the last
 * whitespace, else hard at the budget. Budgets count characters, not bytes.
 */

/// Characters that end a sentence
const SENTENCE_TERMINATORS: &[char] = &['.', '!', '?', '…', '。', '！', '？'];

/// Split `text` into chunks of at most `max_chars` characters.
///
/// Concatenating the chunks gives back `text`. A budget of zero disables
/// splitting.
pub fn split_into_chunks(text: &str, max_chars: usize) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    if max_chars == 0 {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        // Byte offset just past the `max_chars`-th character, if the rest is longer
        let window_end = match rest.char_indices().nth(max_chars) {
            Some((offset, _)) => offset,
            None => {
                chunks.push(rest.to_string());
                break;
            }
        };

        let cut = find_cut(&rest[..window_end]);
        chunks.push(rest[..cut].to_string());
        rest = &rest[cut..];
    }

    chunks
}

/// Byte offset at which to cut a full window
fn find_cut(window: &str) -> usize {
    let sentence_end = window
        .char_indices()
        .filter(|(_, c)| SENTENCE_TERMINATORS.contains(c))
        .map(|(idx, c)| idx + c.len_utf8())
        .last();
    if let Some(cut) = sentence_end {
        return cut;
    }

    // Cutting at position 0 would produce an empty chunk
    let whitespace = window
        .char_indices()
        .filter(|(idx, c)| *idx > 0 && c.is_whitespace())
        .map(|(idx, _)| idx)
        .last();
    if let Some(cut) = whitespace {
        return cut;
    }

    window.len()
}
