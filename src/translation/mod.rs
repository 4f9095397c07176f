/*!
 * Translation of caption documents through an engine.
 *
 * - `delimiter`: Marker generation and tolerant re-splitting
 * - `chunking`: Character-budget chunk splitting
 * - `batch`: Batched translation of many lines with few engine calls
 * - `fallback`: One engine call per line when batching fails
 */

pub use self::batch::{BatchTranslator, batch_translate_texts};
pub use self::delimiter::{Delimiter, TolerancePolicy};
pub use self::fallback::translate_line_by_line;

pub mod batch;
pub mod chunking;
pub mod delimiter;
pub mod fallback;
