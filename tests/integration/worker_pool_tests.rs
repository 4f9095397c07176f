/*!
 * Integration tests for the worker pool: admission, skipping and shutdown
 */

use std::time::Duration;

use anyhow::Result;
use yttrans::database::models::JobState;
use yttrans::jobs::worker::SHUTDOWN;
use yttrans::providers::mock::MockEngine;

use crate::common::{self, SAMPLE_VTT, submit_request};

/// No more than `max_parallel` jobs are RUNNING at any time
#[tokio::test]
async fn test_admission_withSingleSlot_shouldRunJobsOneAtATime() -> Result<()> {
    let mut config = common::fast_config();
    config.worker.max_parallel = 1;
    let h = common::harness_with(MockEngine::slow(150), config);

    let first = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es"]))
        .await?;
    let second = h
        .service
        .submit(submit_request("v2", SAMPLE_VTT, "en", &["es"]))
        .await?;

    let (stop_tx, handle) = h.start();
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    loop {
        let a = h.store.get(&first).await?.expect("first job");
        let b = h.store.get(&second).await?.expect("second job");
        assert!(
            !(a.state == JobState::Running && b.state == JobState::Running),
            "both jobs running with a single slot"
        );
        if a.state.is_terminal() && b.state.is_terminal() {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "jobs did not finish");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    h.stop(stop_tx, handle).await?;

    assert_eq!(h.store.get(&first).await?.expect("first").state, JobState::Done);
    assert_eq!(h.store.get(&second).await?.expect("second").state, JobState::Done);
    Ok(())
}

/// Queued IDs without a job record are skipped
#[tokio::test]
async fn test_dispatch_withUnknownQueuedId_shouldSkipIt() -> Result<()> {
    let h = common::harness(MockEngine::identity());
    h.queue.push("no-such-job").await?;
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es"]))
        .await?;

    let (stop_tx, handle) = h.start();
    let job = h.wait_terminal(&job_id).await?;
    h.stop(stop_tx, handle).await?;

    assert_eq!(job.state, JobState::Done);
    assert!(h.store.get("no-such-job").await?.is_none());
    assert!(h.queue.is_empty().await?);
    Ok(())
}

/// Jobs still running after the grace period are cancelled and marked FAILED
#[tokio::test]
async fn test_shutdown_afterGracePeriod_shouldMarkRunningJobsFailed() -> Result<()> {
    let h = common::harness(MockEngine::slow(5_000));
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es"]))
        .await?;

    let (stop_tx, handle) = h.start();
    h.wait_for(&job_id, Duration::from_secs(5), |job| job.state == JobState::Running)
        .await?;

    let started = std::time::Instant::now();
    h.stop(stop_tx, handle).await?;
    assert!(started.elapsed() < Duration::from_secs(3));

    let job = h.store.get(&job_id).await?.expect("job record");
    assert_eq!(job.state, JobState::Failed);
    assert_eq!(job.err, SHUTDOWN);

    let partial = h.service.get_partial_result(&job_id).await?;
    assert_eq!(partial.state, JobState::Failed);
    assert!(h.payloads.is_empty());
    Ok(())
}

/// Jobs that finish inside the grace period complete normally
#[tokio::test]
async fn test_shutdown_withinGracePeriod_shouldLetJobsFinish() -> Result<()> {
    let mut config = common::fast_config();
    config.worker.shutdown_grace_ms = 3_000;
    let h = common::harness_with(MockEngine::slow(200), config);
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es"]))
        .await?;

    let (stop_tx, handle) = h.start();
    h.wait_for(&job_id, Duration::from_secs(5), |job| job.state == JobState::Running)
        .await?;
    h.stop(stop_tx, handle).await?;

    let job = h.store.get(&job_id).await?.expect("job record");
    assert_eq!(job.state, JobState::Done);
    assert!(job.err.is_empty());
    Ok(())
}

/// Running a single job directly bypasses the queue
#[tokio::test]
async fn test_runJob_shouldProcessWithoutDispatchLoop() -> Result<()> {
    let h = common::harness(MockEngine::uppercase());
    let job_id = h
        .service
        .submit(submit_request("v1", SAMPLE_VTT, "en", &["es"]))
        .await?;

    h.worker.run_job(&job_id).await;

    let job = h.store.get(&job_id).await?.expect("job record");
    assert_eq!(job.state, JobState::Done);
    assert!(h.worker.active_jobs().is_empty());
    Ok(())
}
