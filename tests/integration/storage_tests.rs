/*!
 * Integration tests for the file-backed job store and queue
 */

use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use yttrans::database::models::{JobResult, JobState, JobUpdate, ResultMeta, TranslationEntry};
use yttrans::database::{DatabaseConnection, Repository};
use yttrans::jobs::{JobQueue, JobStore};

fn sample_result() -> JobResult {
    JobResult {
        video_id: "v1".to_string(),
        default_lang: "en".to_string(),
        entries: vec![TranslationEntry {
            lang: "es".to_string(),
            vtt: "WEBVTT\n".to_string(),
        }],
        meta: ResultMeta::default(),
    }
}

fn open_repo(dir: &TempDir) -> Result<Repository> {
    Ok(Repository::new(DatabaseConnection::new(dir.path().join("jobs.db"))?))
}

/// Jobs and queued IDs survive reopening the database file
#[tokio::test]
async fn test_fileDatabase_shouldPersistJobsAndQueueAcrossConnections() -> Result<()> {
    let dir = TempDir::new()?;
    let langs = vec!["es".to_string(), "fr".to_string()];

    let job_id = {
        let repo = open_repo(&dir)?;
        let store = JobStore::with_ttls(repo.clone(), 3600, 3600);
        let job_id = store.create("v1", "dummy", &langs, "en").await?;
        JobQueue::new(repo).push(&job_id).await?;
        store
            .update(&job_id, JobUpdate::new().percent(40).message("translated 1/2"))
            .await?;
        job_id
    };

    let repo = open_repo(&dir)?;
    let store = JobStore::with_ttls(repo.clone(), 3600, 3600);
    let job = store.get(&job_id).await?.expect("persisted job");
    assert_eq!(job.state, JobState::Queued);
    assert_eq!(job.percent, 40);
    assert_eq!(job.target_langs, langs);

    let queue = JobQueue::new(repo);
    assert_eq!(queue.pop(Duration::from_millis(50)).await?, Some(job_id));
    Ok(())
}

/// A queue on one connection sees pushes made through another
#[tokio::test]
async fn test_queue_withSecondConnection_shouldPickUpPushOnNextPoll() -> Result<()> {
    let dir = TempDir::new()?;
    let producer = JobQueue::new(open_repo(&dir)?);
    let consumer = JobQueue::new(open_repo(&dir)?);

    let waiter = tokio::spawn(async move { consumer.pop(Duration::from_secs(3)).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    producer.push("from-elsewhere").await?;

    assert_eq!(waiter.await??.as_deref(), Some("from-elsewhere"));
    Ok(())
}

/// Results expire after their TTL and are purged
#[tokio::test]
async fn test_results_afterTtl_shouldExpireAndPurge() -> Result<()> {
    let dir = TempDir::new()?;
    let repo = open_repo(&dir)?;
    let expired = JobStore::with_ttls(repo.clone(), 0, 0);
    let live = JobStore::with_ttls(repo.clone(), 3600, 3600);

    expired.store_result("old", &sample_result()).await?;
    live.store_result("new", &sample_result()).await?;

    let purged = live.purge_expired().await?;
    assert_eq!(purged.results, 1);
    assert!(live.load_result("old").await?.is_none());
    assert_eq!(live.load_result("new").await?, Some(sample_result()));

    let stats = repo.connection().stats()?;
    assert_eq!(stats.result_count, 1);
    Ok(())
}

/// Taking a result removes it for every later reader
#[tokio::test]
async fn test_takeResult_shouldBeSingleConsumption() -> Result<()> {
    let dir = TempDir::new()?;
    let store = JobStore::with_ttls(open_repo(&dir)?, 3600, 3600);
    store.store_result("job", &sample_result()).await?;

    let (a, b) = tokio::join!(store.take_result("job"), store.take_result("job"));
    let taken = [a?, b?].into_iter().flatten().count();
    assert_eq!(taken, 1);
    Ok(())
}
