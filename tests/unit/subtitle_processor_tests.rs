/*!
 * Tests for caption line extraction and re-injection
 */

use anyhow::Result;
use yttrans::errors::ExtractError;
use yttrans::subtitle_processor::{
    CaptionLines, extract_translatable_lines, has_webvtt_header, inject_translated_lines,
};

const DOCUMENTS: &[&str] = &[
    "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000\nHello\n",
    "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000\nHello",
    "WEBVTT\r\n\r\n1\r\n00:00:00.000 --> 00:00:01.000\r\nHello\r\n",
    "WEBVTT - with title\n\nNOTE comment\n\nintro\n00:00:01.000 --> 00:00:02.000 align:start\n  <i>Indented</i>\n\n",
    "WEBVTT\n",
    "",
    "\n\n\n",
];

/// Extract then inject reproduces every document
#[test]
fn test_roundTrip_forVariousDocuments_shouldReproduceInput() -> Result<()> {
    for doc in DOCUMENTS {
        let caption = CaptionLines::extract(doc);
        assert_eq!(&caption.rebuild(&caption.texts)?, doc, "document {:?}", doc);

        let (lines, indices, texts) = extract_translatable_lines(doc);
        let body = inject_translated_lines(&lines, &indices, &texts)?;
        let expected = doc.strip_suffix('\n').unwrap_or(doc);
        assert_eq!(body, expected);
    }
    Ok(())
}

/// Only free-text lines are extracted
#[test]
fn test_extract_shouldSkipStructuralLines() {
    let doc = "WEBVTT\n\nNOTE hidden\n\n12\n00:00:00.000 --> 00:00:01.000\n- Hi!\n42 apples\n";
    let (_, indices, texts) = extract_translatable_lines(doc);

    assert_eq!(texts, vec!["- Hi!", "42 apples"]);
    assert_eq!(indices, vec![6, 7]);
}

/// Injection refuses a translation list of the wrong size
#[test]
fn test_inject_withWrongCount_shouldFail() {
    let caption = CaptionLines::extract("WEBVTT\n\nA\nB\n");
    let err = caption.rebuild(&["only one".to_string()]).unwrap_err();
    assert!(matches!(err, ExtractError::CountMismatch { expected: 2, actual: 1 }));
}

/// Header detection tolerates leading whitespace
#[test]
fn test_hasWebvttHeader() {
    assert!(has_webvtt_header("WEBVTT\n"));
    assert!(has_webvtt_header("  \nWEBVTT FILE\n"));
    assert!(!has_webvtt_header("1\n00:00:00,000 --> 00:00:01,000\nHi\n"));
    assert!(!has_webvtt_header(""));
}
