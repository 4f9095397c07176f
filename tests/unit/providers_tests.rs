/*!
 * Tests for the engine registry and the built-in engines
 */

use anyhow::Result;
use yttrans::app_config::Config;
use yttrans::providers::dummy::DummyEngine;
use yttrans::providers::{SUPPORTED_ENGINES, TranslationEngine, build_engine, is_supported_engine};
use yttrans::translation::batch_translate_texts;

#[test]
fn test_buildEngine_withKnownNames_shouldSucceed() -> Result<()> {
    for name in SUPPORTED_ENGINES {
        let mut config = Config::default();
        config.engine = name.to_uppercase();
        build_engine(&config)?;
    }
    Ok(())
}

#[test]
fn test_buildEngine_withUnknownName_shouldListSupported() {
    let mut config = Config::default();
    config.engine = "babelfish".to_string();
    let err = build_engine(&config).unwrap_err().to_string();
    assert!(err.contains("babelfish"));
    assert!(err.contains("dummy"));
    assert!(!is_supported_engine("babelfish"));
}

#[tokio::test]
async fn test_dummyEngine_shouldKeepStructureLines() -> Result<()> {
    let engine = DummyEngine::new(vec![]);
    let out = engine.translate("Hello\n⟦#12345678⟧\n42\n\nBye", "en", "es").await?;
    assert_eq!(out, "[es] Lorem ipsum\n⟦#12345678⟧\n42\n\n[es] Lorem ipsum");
    Ok(())
}

#[tokio::test]
async fn test_dummyEngine_shouldSurviveBatchProtocol() -> Result<()> {
    let engine = DummyEngine::new(vec!["es".to_string()]);
    let input = vec!["one".to_string(), "two".to_string()];

    let out = batch_translate_texts(&input, &engine, "auto", "fr", 4500).await?;

    assert_eq!(out, vec!["[fr] Lorem ipsum", "[fr] Lorem ipsum"]);
    assert_eq!(engine.list_languages().await?, vec!["es"]);
    Ok(())
}

#[test]
fn test_dummyEngine_listLanguages_withoutConfig_shouldDefaultToEnglish() {
    let engine = DummyEngine::new(vec![]);
    let langs = tokio_test::block_on(engine.list_languages());
    assert_eq!(langs, Ok(vec!["en".to_string()]));
}
