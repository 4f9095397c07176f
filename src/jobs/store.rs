/*!
 * Job store: the authoritative job ledger plus TTL-bound result records.
 *
 * Workers hold no private copy of job state; every read and write goes
 * through this store. Job records are never deleted here, while results
 * and partial snapshots expire after their configured TTL.
 */

use anyhow::Result;
use log::debug;
use uuid::Uuid;

use crate::app_config::StorageConfig;
use crate::database::models::{JobRecord, JobResult, JobState, JobUpdate, PartialResult};
use crate::database::{PurgeStats, Repository};

/// Job store backed by the repository
#[derive(Clone, Debug)]
pub struct JobStore {
    repo: Repository,
    result_ttl_secs: u64,
    partial_ttl_secs: u64,
}

impl JobStore {
    /// Create a store using the TTLs of the storage configuration
    pub fn new(repo: Repository, storage: &StorageConfig) -> Self {
        Self::with_ttls(repo, storage.result_ttl_secs, storage.partial_ttl_secs)
    }

    /// Create a store with explicit TTLs
    pub fn with_ttls(repo: Repository, result_ttl_secs: u64, partial_ttl_secs: u64) -> Self {
        Self {
            repo,
            result_ttl_secs,
            partial_ttl_secs,
        }
    }

    /// Underlying repository (shared with the queue)
    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Create a QUEUED job and return its ID
    pub async fn create(
        &self,
        video_id: &str,
        engine: &str,
        target_langs: &[String],
        src_lang: &str,
    ) -> Result<String> {
        let job_id = Uuid::new_v4().to_string();
        let job = JobRecord::queued(&job_id, video_id, engine, src_lang, target_langs.to_vec());

        self.repo.create_job(&job).await?;
        debug!("job={} video_id={} state=QUEUED", job_id, video_id);
        Ok(job_id)
    }

    /// Merge the provided fields into a job; `None` when the job is unknown
    pub async fn update(&self, job_id: &str, update: JobUpdate) -> Result<Option<JobRecord>> {
        self.repo.update_job(job_id, update).await
    }

    /// Read a job's status record
    pub async fn get(&self, job_id: &str) -> Result<Option<JobRecord>> {
        self.repo.get_job(job_id).await
    }

    /// Most recently created jobs first, optionally only those in `state`
    pub async fn list_recent(&self, state: Option<JobState>, limit: usize) -> Result<Vec<JobRecord>> {
        self.repo.list_jobs(state, limit).await
    }

    pub async fn store_result(&self, job_id: &str, result: &JobResult) -> Result<()> {
        self.repo
            .store_result(job_id, result, self.result_ttl_secs)
            .await
    }

    pub async fn load_result(&self, job_id: &str) -> Result<Option<JobResult>> {
        self.repo.load_result(job_id).await
    }

    pub async fn delete_result(&self, job_id: &str) -> Result<()> {
        self.repo.delete_result(job_id).await
    }

    /// Load and delete a result atomically
    pub async fn take_result(&self, job_id: &str) -> Result<Option<JobResult>> {
        self.repo.take_result(job_id).await
    }

    pub async fn store_partial(&self, job_id: &str, partial: &PartialResult) -> Result<()> {
        self.repo
            .store_partial(job_id, partial, self.partial_ttl_secs)
            .await
    }

    pub async fn load_partial(&self, job_id: &str) -> Result<Option<PartialResult>> {
        self.repo.load_partial(job_id).await
    }

    pub async fn delete_partial(&self, job_id: &str) -> Result<()> {
        self.repo.delete_partial(job_id).await
    }

    /// Remove expired results and partial snapshots
    pub async fn purge_expired(&self) -> Result<PurgeStats> {
        self.repo.purge_expired().await
    }
}
