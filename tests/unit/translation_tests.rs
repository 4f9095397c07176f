/*!
 * Tests for the delimiter protocol, chunking, batch and fallback translation
 */

use anyhow::Result;
use async_trait::async_trait;
use yttrans::errors::{BatchError, ProviderError};
use yttrans::providers::TranslationEngine;
use yttrans::providers::mock::MockEngine;
use yttrans::translation::chunking::split_into_chunks;
use yttrans::translation::{
    BatchTranslator, Delimiter, TolerancePolicy, batch_translate_texts, translate_line_by_line,
};

fn texts(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Engine that rewrites the canonical marker brackets into ASCII ones
#[derive(Debug)]
struct BracketSwapEngine;

#[async_trait]
impl TranslationEngine for BracketSwapEngine {
    async fn list_languages(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec!["es".to_string()])
    }

    async fn translate(&self, text: &str, _src: &str, _tgt: &str) -> Result<String, ProviderError> {
        Ok(text.replace('⟦', "[[").replace('⟧', " ]]").replace('#', "＃"))
    }
}

/// Every chunk respects the character budget
#[test]
fn test_splitIntoChunks_forManyBudgets_shouldRespectBound() {
    let sample = "First sentence here. Second one! A third? Then a very long run of words without any terminator at all \
                  followed by averyveryverylongwordthatcannotbesplitnicely and more words. 終わり。次の文！";
    for budget in 1..60 {
        let chunks = split_into_chunks(sample, budget);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= budget,
                "chunk of {} chars over budget {}",
                chunk.chars().count(),
                budget
            );
        }
        assert_eq!(chunks.concat(), sample);
    }
}

/// Identity translation returns the input unchanged for any budget
#[tokio::test]
async fn test_batchTranslate_withIdentityEngine_shouldReturnInput() -> Result<()> {
    let engine = MockEngine::identity();
    let input = texts(&["Hello there.", "- Second line", "Third, with commas", "4th line!"]);

    for budget in [20, 40, 80, 4500] {
        let out = batch_translate_texts(&input, &engine, "en", "es", budget).await?;
        assert_eq!(out, input, "budget {}", budget);
    }
    Ok(())
}

/// A count mismatch is always reported, never a wrong-length list
#[tokio::test]
async fn test_batchTranslate_withMarkerStripping_shouldReportMismatch() {
    let engine = MockEngine::strip_punctuation();
    let result = batch_translate_texts(&texts(&["a", "b", "c"]), &engine, "en", "es", 4500).await;

    match result {
        Err(BatchError::DelimiterMismatch { expected, actual }) => {
            assert_eq!(expected, 3);
            assert_ne!(actual, 3);
        }
        other => panic!("expected a delimiter mismatch, got {:?}", other),
    }
}

/// Bracket and hash substitutions are tolerated by default only
#[tokio::test]
async fn test_batchTranslate_withMutatedMarkers_shouldFollowPolicy() -> Result<()> {
    let engine = BracketSwapEngine;
    let input = texts(&["one", "two", "three"]);

    let tolerant = BatchTranslator::new(&engine, 4500);
    assert_eq!(tolerant.translate_texts(&input, "en", "es").await?, input);

    let strict = BatchTranslator::new(&engine, 4500).with_policy(TolerancePolicy::strict());
    let err = strict.translate_texts(&input, "en", "es").await.unwrap_err();
    assert!(err.is_delimiter_mismatch());
    Ok(())
}

/// Engine errors during a batch are passed through
#[tokio::test]
async fn test_batchTranslate_withFailingEngine_shouldReturnProviderError() {
    let engine = MockEngine::failing();
    let err = batch_translate_texts(&texts(&["a"]), &engine, "en", "es", 4500)
        .await
        .unwrap_err();
    assert!(!err.is_delimiter_mismatch());
    assert!(matches!(err, BatchError::Provider(ProviderError::ApiError { .. })));
}

/// No texts means no engine call
#[tokio::test]
async fn test_batchTranslate_withNoTexts_shouldNotCallEngine() -> Result<()> {
    let engine = MockEngine::identity();
    let out = batch_translate_texts(&[], &engine, "en", "es", 10).await?;
    assert!(out.is_empty());
    assert_eq!(engine.call_count(), 0);
    Ok(())
}

/// Small budgets spread one batch over several calls
#[tokio::test]
async fn test_batchTranslate_withSmallBudget_shouldUseSeveralCalls() -> Result<()> {
    let engine = MockEngine::uppercase();
    let input = texts(&["first line of text", "second line of text", "third line of text"]);

    let out = batch_translate_texts(&input, &engine, "en", "es", 30).await?;

    assert_eq!(out, texts(&["FIRST LINE OF TEXT", "SECOND LINE OF TEXT", "THIRD LINE OF TEXT"]));
    assert!(engine.call_count() > 1);
    Ok(())
}

/// The generated token never occurs in the input texts
#[test]
fn test_delimiterGenerate_shouldAvoidTokensInInput() {
    let input = texts(&["12345678 87654321", "0000000011111111"]);
    for _ in 0..50 {
        let delimiter = Delimiter::generate(&input);
        assert!(input.iter().all(|t| !t.contains(delimiter.token())));
        assert!(delimiter.token().len() >= 8);
    }
}

/// Fallback translates text lines and keeps the structure
#[tokio::test]
async fn test_translateLineByLine_shouldKeepStructureAndTrailingNewline() -> Result<()> {
    let engine = MockEngine::uppercase();
    let doc = "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000\nHello\nworld\n";

    let out = translate_line_by_line(doc, &engine, "en", "de").await?;

    assert_eq!(out, "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000\nHELLO\nWORLD\n");
    assert_eq!(engine.call_count(), 2);
    Ok(())
}

/// Fallback stops at the first engine failure
#[tokio::test]
async fn test_translateLineByLine_withFailingEngine_shouldFail() {
    let engine = MockEngine::failing_for(&["xx"]);
    let result = translate_line_by_line("WEBVTT\n\nHi\n", &engine, "en", "xx").await;
    assert_eq!(result, Err(ProviderError::UnsupportedLanguage("xx".to_string())));
}
