/*!
 * Integration tests for the job lifecycle: submit, process, poll and fetch
 */

use anyhow::Result;
use serde_json::json;
use yttrans::database::models::JobState;
use yttrans::errors::ServiceError;
use yttrans::jobs::PayloadStore;
use yttrans::jobs::worker::MISSING_PAYLOAD;
use yttrans::providers::mock::MockEngine;

use crate::common::{self, MULTI_CUE_VTT, SAMPLE_VTT, meta_strings, submit_request};

/// A job runs from QUEUED to DONE and its result holds one entry per language
#[tokio::test]
async fn test_lifecycle_withUppercaseEngine_shouldTranslateEveryLanguage() -> Result<()> {
    let h = common::harness(MockEngine::uppercase());
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es", "fr"]))
        .await?;

    let queued = h.service.get_status(&job_id).await?;
    assert_eq!(queued.state, JobState::Queued);

    let (stop_tx, handle) = h.start();
    let job = h.wait_terminal(&job_id).await?;
    h.stop(stop_tx, handle).await?;

    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.percent, 100);
    assert_eq!(job.message, "done");

    let result = h.service.get_result(&job_id).await?;
    assert_eq!(result.video_id, "v1");
    assert_eq!(result.default_lang, "en");
    let langs: Vec<&str> = result.entries.iter().map(|e| e.lang.as_str()).collect();
    assert_eq!(langs, vec!["es", "fr"]);
    for entry in &result.entries {
        assert_eq!(
            entry.vtt,
            "WEBVTT\n\n1\n00:00:00.000 --> 00:00:01.000\nHELLO\n"
        );
    }
    assert_eq!(result.meta["source_lang"], json!("en"));
    assert_eq!(result.meta["engine"], json!("dummy"));
    assert!(result.meta.contains_key("duration_ms"));
    assert!(meta_strings(&result.meta, "failed_langs").is_empty());

    // Payload is released once the job is terminal
    assert!(h.payloads.is_empty());
    Ok(())
}

/// Fetching a result consumes it
#[tokio::test]
async fn test_getResult_calledTwice_shouldReturnNotFound() -> Result<()> {
    let h = common::harness(MockEngine::identity());
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es"]))
        .await?;

    let (stop_tx, handle) = h.start();
    h.wait_terminal(&job_id).await?;
    h.stop(stop_tx, handle).await?;

    assert!(h.service.get_result(&job_id).await.is_ok());
    let second = h.service.get_result(&job_id).await;
    assert!(matches!(second, Err(ServiceError::NotFound(_))));
    Ok(())
}

/// A language failing in both modes is recorded; the job still completes
#[tokio::test]
async fn test_partialFailure_withUnsupportedLanguage_shouldFinishDoneWithFailures() -> Result<()> {
    let h = common::harness(MockEngine::failing_for(&["xx-unsupported"]));
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es", "xx-unsupported"]))
        .await?;

    let (stop_tx, handle) = h.start();
    let job = h.wait_terminal(&job_id).await?;
    h.stop(stop_tx, handle).await?;

    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.percent, 100);
    assert!(job.message.contains("failures: 1/2"));
    assert_eq!(meta_strings(&job.meta, "failed_langs"), vec!["xx-unsupported"]);

    let partial = h.service.get_partial_result(&job_id).await?;
    assert_eq!(partial.state, JobState::Done);
    assert_eq!(partial.ready_langs, vec!["es"]);
    assert_eq!(partial.total_langs, 2);

    let result = h.service.get_result(&job_id).await?;
    assert_eq!(result.entries.len(), 1);
    assert_eq!(result.entries[0].lang, "es");
    assert_eq!(meta_strings(&result.meta, "failed_langs"), vec!["xx-unsupported"]);
    let errors = result.meta["errors"].as_object().expect("errors map");
    assert!(errors.contains_key("xx-unsupported"));
    Ok(())
}

/// A corrupted delimiter sends the language to the line-by-line fallback
#[tokio::test]
async fn test_markerCorruption_shouldFallBackLineByLine() -> Result<()> {
    let h = common::harness(MockEngine::strip_punctuation());
    let job_id = h
        .service
        .submit(submit_request("v2", MULTI_CUE_VTT, "en", &["es"]))
        .await?;

    let (stop_tx, handle) = h.start();
    let job = h.wait_terminal(&job_id).await?;
    h.stop(stop_tx, handle).await?;

    assert_eq!(job.state, JobState::Done);
    assert_eq!(job.message, "done");
    assert_eq!(meta_strings(&job.meta, "fallback_langs"), vec!["es"]);

    let result = h.service.get_result(&job_id).await?;
    let vtt = &result.entries[0].vtt;
    assert!(vtt.contains("00:00:01.000 --> 00:00:02.000\nHowareyou\n"));
    assert!(vtt.contains("\nHelloworld\n"));
    assert!(vtt.starts_with("WEBVTT\n"));
    Ok(())
}

/// A job claimed without its payload fails immediately
#[tokio::test]
async fn test_missingPayload_shouldFailWithoutResult() -> Result<()> {
    let h = common::harness(MockEngine::identity());
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es"]))
        .await?;
    h.payloads.delete(&job_id);

    let (stop_tx, handle) = h.start();
    let job = h.wait_terminal(&job_id).await?;
    h.stop(stop_tx, handle).await?;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.err, MISSING_PAYLOAD);
    assert_eq!(job.message, "missing request payload");
    assert_eq!(h.engine.call_count(), 0);
    assert!(h.store.load_result(&job_id).await?.is_none());

    let status = h.service.get_status(&job_id).await?;
    assert_eq!(status.meta["err"], json!(MISSING_PAYLOAD));

    let fetch = h.service.get_result(&job_id).await;
    assert!(matches!(fetch, Err(ServiceError::FailedPrecondition(_))));
    Ok(())
}

/// Languages come back in submission order
#[tokio::test]
async fn test_entries_shouldFollowSubmissionOrder() -> Result<()> {
    let h = common::harness(MockEngine::identity());
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "", &["fr", "es", "de", "fr"]))
        .await?;

    let (stop_tx, handle) = h.start();
    h.wait_terminal(&job_id).await?;
    h.stop(stop_tx, handle).await?;

    let result = h.service.get_result(&job_id).await?;
    let langs: Vec<&str> = result.entries.iter().map(|e| e.lang.as_str()).collect();
    assert_eq!(langs, vec!["fr", "es", "de"]);
    assert_eq!(result.default_lang, "auto");
    Ok(())
}

/// The progressive result is readable while later languages are still running
#[tokio::test]
async fn test_progress_shouldPublishPartialSnapshotsWhileRunning() -> Result<()> {
    let mut config = common::fast_config();
    config.pacing.base_delay_ms = 300;
    let h = common::harness_with(MockEngine::identity(), config);
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es", "fr"]))
        .await?;

    let (stop_tx, handle) = h.start();
    let job = h
        .wait_for(&job_id, std::time::Duration::from_secs(5), |job| {
            job.message.starts_with("translated 1/2")
        })
        .await?;
    assert_eq!(job.state, JobState::Running);
    assert_eq!(job.percent, 50);

    let partial = h.service.get_partial_result(&job_id).await?;
    assert_eq!(partial.ready_langs, vec!["es"]);
    assert_eq!(partial.total_langs, 2);

    let progressive = h.store.load_result(&job_id).await?.expect("progressive result");
    assert_eq!(progressive.entries.len(), 1);

    let done = h.wait_terminal(&job_id).await?;
    h.stop(stop_tx, handle).await?;
    assert_eq!(done.state, JobState::Done);
    Ok(())
}

/// A store write failing mid-job fails the whole job with the error text
#[tokio::test]
async fn test_storeWriteFailure_shouldFailJobWithErrorText() -> Result<()> {
    let h = common::harness(MockEngine::identity());
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es", "fr"]))
        .await?;
    h.store
        .repository()
        .connection()
        .execute(|conn| Ok(conn.execute_batch("DROP TABLE job_results")?))?;

    let (stop_tx, handle) = h.start();
    let job = h.wait_terminal(&job_id).await?;
    h.stop(stop_tx, handle).await?;

    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.percent, 0);
    assert!(!job.err.is_empty());
    assert_eq!(job.message, job.err);
    assert!(job.err.contains("job_results"));

    let partial = h.service.get_partial_result(&job_id).await?;
    assert_eq!(partial.state, JobState::Failed);
    assert_eq!(partial.percent, 0);
    assert_eq!(partial.message, job.err);
    assert!(h.payloads.get(&job_id).is_none());
    Ok(())
}

/// No pacing delay follows the last language of a job
#[tokio::test]
async fn test_pacing_afterLastLanguage_shouldNotSleep() -> Result<()> {
    let mut config = common::fast_config();
    config.pacing.base_delay_ms = 3_000;
    let h = common::harness_with(MockEngine::identity(), config);
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es"]))
        .await?;

    let started = std::time::Instant::now();
    let (stop_tx, handle) = h.start();
    let job = h.wait_terminal(&job_id).await?;
    let elapsed = started.elapsed();
    h.stop(stop_tx, handle).await?;

    assert_eq!(job.state, JobState::Done);
    assert!(
        elapsed < std::time::Duration::from_millis(1_500),
        "single-language job took {:?}",
        elapsed
    );
    Ok(())
}

/// Unknown job IDs surface as not found
#[tokio::test]
async fn test_unknownJob_shouldReturnNotFoundEverywhere() -> Result<()> {
    let h = common::harness(MockEngine::identity());

    assert!(matches!(h.service.get_status("ghost").await, Err(ServiceError::NotFound(_))));
    assert!(matches!(
        h.service.get_partial_result("ghost").await,
        Err(ServiceError::NotFound(_))
    ));
    assert!(matches!(h.service.get_result("ghost").await, Err(ServiceError::NotFound(_))));
    Ok(())
}
