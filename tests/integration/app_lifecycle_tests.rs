/*!
 * Integration tests for the application controller over caption files
 */

use std::sync::Arc;

use anyhow::Result;
use tempfile::TempDir;
use yttrans::app_controller::{Controller, TranslateOptions};
use yttrans::database::Repository;
use yttrans::providers::mock::MockEngine;

use crate::common::{self, SAMPLE_VTT};

fn controller(engine: MockEngine) -> Result<Controller> {
    Ok(Controller::with_parts(
        common::fast_config(),
        Repository::new_in_memory()?,
        Arc::new(engine),
    ))
}

fn options(targets: &[&str]) -> TranslateOptions {
    TranslateOptions {
        target_langs: targets.iter().map(|t| t.to_string()).collect(),
        ..TranslateOptions::default()
    }
}

/// A single file is translated into `<stem>.<lang>.vtt` next to it
#[tokio::test]
async fn test_run_withSingleFile_shouldWriteOneFilePerLanguage() -> Result<()> {
    let dir = TempDir::new()?;
    let input = common::create_test_file(dir.path(), "talk.vtt", SAMPLE_VTT)?;
    let controller = controller(MockEngine::uppercase())?;

    let summary = controller.run(&input, &options(&["es", "fr"])).await?;

    assert_eq!(summary.processed, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.written.len(), 2);
    let spanish = std::fs::read_to_string(dir.path().join("talk.es.vtt"))?;
    assert!(spanish.contains("\nHELLO\n"));
    assert!(dir.path().join("talk.fr.vtt").exists());
    Ok(())
}

/// Existing outputs are skipped unless forced
#[tokio::test]
async fn test_run_withExistingOutputs_shouldSkipUnlessForced() -> Result<()> {
    let dir = TempDir::new()?;
    let input = common::create_test_file(dir.path(), "talk.vtt", SAMPLE_VTT)?;
    common::create_test_file(dir.path(), "talk.es.vtt", "WEBVTT\n\nold\n")?;
    let controller = controller(MockEngine::uppercase())?;

    let skipped = controller.run(&input, &options(&["es"])).await?;
    assert_eq!(skipped.skipped, 1);
    assert!(skipped.written.is_empty());

    let mut forced = options(&["es"]);
    forced.force_overwrite = true;
    let summary = controller.run(&input, &forced).await?;
    assert_eq!(summary.written.len(), 1);
    let content = std::fs::read_to_string(dir.path().join("talk.es.vtt"))?;
    assert!(content.contains("HELLO"));
    Ok(())
}

/// Directory runs ignore previous outputs and honor the output directory
#[tokio::test]
async fn test_run_withDirectory_shouldTranslateEveryCaptionFile() -> Result<()> {
    let dir = TempDir::new()?;
    let out = TempDir::new()?;
    common::create_test_file(dir.path(), "a.vtt", SAMPLE_VTT)?;
    common::create_test_file(dir.path(), "b.vtt", SAMPLE_VTT)?;
    common::create_test_file(dir.path(), "a.de.vtt", SAMPLE_VTT)?;
    let controller = controller(MockEngine::identity())?;

    let mut opts = options(&["de"]);
    opts.output_dir = Some(out.path().to_path_buf());
    opts.force_overwrite = true;
    let summary = controller.run(dir.path(), &opts).await?;

    assert_eq!(summary.processed, 2);
    assert!(out.path().join("a.de.vtt").exists());
    assert!(out.path().join("b.de.vtt").exists());
    assert!(!out.path().join("a.de.de.vtt").exists());
    Ok(())
}

/// A document without the header is rejected at submission
#[tokio::test]
async fn test_run_withInvalidDocument_shouldCountFailure() -> Result<()> {
    let dir = TempDir::new()?;
    let input = common::create_test_file(dir.path(), "broken.vtt", "1\n00:00:00.000 --> 00:00:01.000\nHi\n")?;
    let controller = controller(MockEngine::identity())?;

    let summary = controller.run(&input, &options(&["es"])).await?;

    assert_eq!(summary.failed, 1);
    assert!(summary.written.is_empty());
    Ok(())
}

/// Without targets from the caller the configured languages are used
#[tokio::test]
async fn test_run_withoutTargets_shouldFallBackToConfigLangs() -> Result<()> {
    let dir = TempDir::new()?;
    let input = common::create_test_file(dir.path(), "talk.vtt", SAMPLE_VTT)?;
    let controller = controller(MockEngine::identity())?;

    let summary = controller.run(&input, &TranslateOptions::default()).await?;

    // fast_config() lists es and fr
    assert_eq!(summary.written.len(), 2);
    Ok(())
}
