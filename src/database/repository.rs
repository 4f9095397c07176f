/*!
 * Repository layer for database operations.
 *
 * This module provides a high-level API for the job ledger, the TTL-bound
 * result and partial snapshot records and the job queue, abstracting away
 * the SQL details and providing type-safe access.
 */

use anyhow::{Context, Result};
use log::debug;
use rusqlite::{Connection, OptionalExtension, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::connection::DatabaseConnection;
use super::models::{
    JobRecord, JobResult, JobState, JobUpdate, Meta, PartialResult, now_epoch_secs, now_iso_utc,
};

/// Tables holding TTL-bound JSON documents keyed by job ID
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExpiringTable {
    Results,
    Partials,
}

impl ExpiringTable {
    fn name(&self) -> &'static str {
        match self {
            ExpiringTable::Results => "job_results",
            ExpiringTable::Partials => "job_partials",
        }
    }
}

/// Counts of rows removed by a purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub results: usize,
    pub partials: usize,
}

impl PurgeStats {
    pub fn total(&self) -> usize {
        self.results + self.partials
    }
}

/// Raw `jobs` row before JSON columns are decoded
type JobRow = (
    String,
    String,
    String,
    i64,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
    String,
);

/// Repository for database operations
#[derive(Clone, Debug)]
pub struct Repository {
    /// Database connection
    db: DatabaseConnection,
}

impl Repository {
    /// Create a new repository with the given database connection
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Create a repository with an in-memory database (for testing)
    pub fn new_in_memory() -> Result<Self> {
        let db = DatabaseConnection::new_in_memory()?;
        Ok(Self::new(db))
    }

    /// Underlying connection
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    // =========================================================================
    // Job Operations
    // =========================================================================

    /// Insert a new job record
    pub async fn create_job(&self, job: &JobRecord) -> Result<()> {
        let job = job.clone();
        let target_langs = serde_json::to_string(&job.target_langs)?;
        let meta = serde_json::to_string(&job.meta)?;

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    r#"
                    INSERT INTO jobs (
                        id, video_id, state, percent, message, engine, src_lang,
                        target_langs, err, meta, created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                    "#,
                    params![
                        job.job_id,
                        job.video_id,
                        job.state.to_string(),
                        job.percent as i64,
                        job.message,
                        job.engine,
                        job.src_lang,
                        target_langs,
                        job.err,
                        meta,
                        job.created_at,
                        job.updated_at,
                    ],
                )
                .with_context(|| format!("Failed to insert job {}", job.job_id))?;
                Ok(())
            })
            .await
    }

    /// Get a job by ID
    pub async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| Self::get_job_sync(conn, &job_id))
            .await
    }

    /// Get a job by ID (synchronous version for use within transactions)
    fn get_job_sync(conn: &Connection, job_id: &str) -> Result<Option<JobRecord>> {
        let row: Option<JobRow> = conn
            .query_row(
                r#"
                SELECT id, video_id, state, percent, message, engine, src_lang,
                       target_langs, err, meta, created_at, updated_at
                FROM jobs WHERE id = ?1
                "#,
                [job_id],
                |row| {
                    Ok((
                        row.get(0)?,
                        row.get(1)?,
                        row.get(2)?,
                        row.get(3)?,
                        row.get(4)?,
                        row.get(5)?,
                        row.get(6)?,
                        row.get(7)?,
                        row.get(8)?,
                        row.get(9)?,
                        row.get(10)?,
                        row.get(11)?,
                    ))
                },
            )
            .optional()?;

        row.map(Self::job_from_row).transpose()
    }

    fn job_from_row(row: JobRow) -> Result<JobRecord> {
        let (
            job_id,
            video_id,
            state,
            percent,
            message,
            engine,
            src_lang,
            target_langs,
            err,
            meta,
            created_at,
            updated_at,
        ) = row;

        // Unreadable JSON columns degrade to empty values rather than hiding the job
        let target_langs: Vec<String> = serde_json::from_str(&target_langs).unwrap_or_default();
        let meta: Meta = serde_json::from_str(&meta).unwrap_or_default();

        Ok(JobRecord {
            state: state
                .parse::<JobState>()
                .with_context(|| format!("Corrupt state for job {}", job_id))?,
            job_id,
            video_id,
            percent: percent.clamp(0, 100) as u8,
            message,
            engine,
            src_lang,
            target_langs,
            err,
            meta,
            created_at,
            updated_at,
        })
    }

    /// Apply an update to a job; returns the updated record, `None` if unknown
    pub async fn update_job(&self, job_id: &str, update: JobUpdate) -> Result<Option<JobRecord>> {
        let job_id = job_id.to_string();

        self.db
            .transaction_async(move |tx| {
                let Some(mut job) = Self::get_job_sync(tx, &job_id)? else {
                    return Ok(None);
                };

                update.apply_to(&mut job);

                tx.execute(
                    r#"
                    UPDATE jobs
                    SET state = ?1, percent = ?2, message = ?3, err = ?4, meta = ?5, updated_at = ?6
                    WHERE id = ?7
                    "#,
                    params![
                        job.state.to_string(),
                        job.percent as i64,
                        job.message,
                        job.err,
                        serde_json::to_string(&job.meta)?,
                        job.updated_at,
                        job_id,
                    ],
                )?;

                Ok(Some(job))
            })
            .await
    }

    /// List jobs, most recently created first
    pub async fn list_jobs(&self, state_filter: Option<JobState>, limit: usize) -> Result<Vec<JobRecord>> {
        self.db
            .execute_async(move |conn| {
                let ids: Vec<String> = match state_filter {
                    Some(state) => {
                        let mut stmt = conn.prepare(
                            "SELECT id FROM jobs WHERE state = ?1 ORDER BY created_at DESC LIMIT ?2",
                        )?;
                        let rows = stmt
                            .query_map(params![state.to_string(), limit as i64], |row| row.get(0))?;
                        rows.collect::<rusqlite::Result<_>>()?
                    }
                    None => {
                        let mut stmt =
                            conn.prepare("SELECT id FROM jobs ORDER BY created_at DESC LIMIT ?1")?;
                        let rows = stmt.query_map([limit as i64], |row| row.get(0))?;
                        rows.collect::<rusqlite::Result<_>>()?
                    }
                };

                let mut jobs = Vec::with_capacity(ids.len());
                for id in ids {
                    if let Some(job) = Self::get_job_sync(conn, &id)? {
                        jobs.push(job);
                    }
                }
                Ok(jobs)
            })
            .await
    }

    // =========================================================================
    // Result and Partial Snapshot Operations
    // =========================================================================

    /// Store (or replace) the result of a job for `ttl_secs`
    pub async fn store_result(&self, job_id: &str, result: &JobResult, ttl_secs: u64) -> Result<()> {
        self.store_expiring(ExpiringTable::Results, job_id, result, ttl_secs)
            .await
    }

    /// Load the result of a job if present and not expired
    pub async fn load_result(&self, job_id: &str) -> Result<Option<JobResult>> {
        self.load_expiring(ExpiringTable::Results, job_id).await
    }

    /// Delete the result of a job
    pub async fn delete_result(&self, job_id: &str) -> Result<()> {
        self.delete_expiring(ExpiringTable::Results, job_id).await
    }

    /// Load and delete the result of a job in one transaction
    pub async fn take_result(&self, job_id: &str) -> Result<Option<JobResult>> {
        let job_id = job_id.to_string();

        self.db
            .transaction_async(move |tx| {
                let payload =
                    Self::load_expiring_sync(tx, ExpiringTable::Results, &job_id)?;
                Self::delete_expiring_sync(tx, ExpiringTable::Results, &job_id)?;

                payload
                    .map(|p| {
                        serde_json::from_str::<JobResult>(&p)
                            .with_context(|| format!("Corrupt result for job {}", job_id))
                    })
                    .transpose()
            })
            .await
    }

    /// Store (or replace) the partial snapshot of a job for `ttl_secs`
    pub async fn store_partial(
        &self,
        job_id: &str,
        partial: &PartialResult,
        ttl_secs: u64,
    ) -> Result<()> {
        self.store_expiring(ExpiringTable::Partials, job_id, partial, ttl_secs)
            .await
    }

    /// Load the partial snapshot of a job if present and not expired
    pub async fn load_partial(&self, job_id: &str) -> Result<Option<PartialResult>> {
        self.load_expiring(ExpiringTable::Partials, job_id).await
    }

    /// Delete the partial snapshot of a job
    pub async fn delete_partial(&self, job_id: &str) -> Result<()> {
        self.delete_expiring(ExpiringTable::Partials, job_id).await
    }

    /// Remove every expired result and partial snapshot
    pub async fn purge_expired(&self) -> Result<PurgeStats> {
        self.db
            .transaction_async(|tx| {
                let now = now_epoch_secs();
                let results = tx.execute(
                    "DELETE FROM job_results WHERE expires_at <= ?1",
                    [now],
                )?;
                let partials = tx.execute(
                    "DELETE FROM job_partials WHERE expires_at <= ?1",
                    [now],
                )?;
                Ok(PurgeStats { results, partials })
            })
            .await
    }

    async fn store_expiring<T: Serialize>(
        &self,
        table: ExpiringTable,
        job_id: &str,
        value: &T,
        ttl_secs: u64,
    ) -> Result<()> {
        let job_id = job_id.to_string();
        let payload = serde_json::to_string(value)?;
        let expires_at = now_epoch_secs().saturating_add(ttl_secs.min(i64::MAX as u64) as i64);

        self.db
            .execute_async(move |conn| {
                let sql = format!(
                    r#"
                    INSERT INTO {} (job_id, payload, expires_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(job_id) DO UPDATE SET
                        payload = excluded.payload,
                        expires_at = excluded.expires_at,
                        updated_at = excluded.updated_at
                    "#,
                    table.name()
                );
                conn.execute(&sql, params![job_id, payload, expires_at, now_iso_utc()])?;
                Ok(())
            })
            .await
    }

    async fn load_expiring<T: DeserializeOwned + Send + 'static>(
        &self,
        table: ExpiringTable,
        job_id: &str,
    ) -> Result<Option<T>> {
        let job_id = job_id.to_string();

        let payload = self
            .db
            .execute_async(move |conn| Self::load_expiring_sync(conn, table, &job_id))
            .await?;

        payload
            .map(|p| serde_json::from_str::<T>(&p).context("Failed to decode stored record"))
            .transpose()
    }

    /// Payload of a live record; an expired record is deleted on sight
    fn load_expiring_sync(
        conn: &Connection,
        table: ExpiringTable,
        job_id: &str,
    ) -> Result<Option<String>> {
        let row: Option<(String, i64)> = conn
            .query_row(
                &format!(
                    "SELECT payload, expires_at FROM {} WHERE job_id = ?1",
                    table.name()
                ),
                [job_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        match row {
            Some((_, expires_at)) if expires_at <= now_epoch_secs() => {
                debug!("Dropping expired {} record for job {}", table.name(), job_id);
                Self::delete_expiring_sync(conn, table, job_id)?;
                Ok(None)
            }
            Some((payload, _)) => Ok(Some(payload)),
            None => Ok(None),
        }
    }

    async fn delete_expiring(&self, table: ExpiringTable, job_id: &str) -> Result<()> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| Self::delete_expiring_sync(conn, table, &job_id))
            .await
    }

    fn delete_expiring_sync(conn: &Connection, table: ExpiringTable, job_id: &str) -> Result<()> {
        conn.execute(
            &format!("DELETE FROM {} WHERE job_id = ?1", table.name()),
            [job_id],
        )?;
        Ok(())
    }

    // =========================================================================
    // Queue Operations
    // =========================================================================

    /// Append a job ID to the queue
    pub async fn enqueue(&self, job_id: &str) -> Result<()> {
        let job_id = job_id.to_string();

        self.db
            .execute_async(move |conn| {
                conn.execute(
                    "INSERT INTO job_queue (job_id, enqueued_at) VALUES (?1, ?2)",
                    params![job_id, now_iso_utc()],
                )?;
                Ok(())
            })
            .await
    }

    /// Remove and return the oldest queued job ID
    pub async fn dequeue(&self) -> Result<Option<String>> {
        self.db
            .transaction_async(|tx| {
                let head: Option<(i64, String)> = tx
                    .query_row(
                        "SELECT seq, job_id FROM job_queue ORDER BY seq ASC LIMIT 1",
                        [],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;

                match head {
                    Some((seq, job_id)) => {
                        tx.execute("DELETE FROM job_queue WHERE seq = ?1", [seq])?;
                        Ok(Some(job_id))
                    }
                    None => Ok(None),
                }
            })
            .await
    }

    /// Number of queued job IDs
    pub async fn queue_len(&self) -> Result<usize> {
        self.db
            .execute_async(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM job_queue", [], |row| row.get(0))?;
                Ok(count as usize)
            })
            .await
    }
}
