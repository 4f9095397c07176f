/*!
 * Worker pool: drives queued jobs through translation.
 *
 * A single dispatch loop pops job IDs off the queue and spawns one task per
 * job. A semaphore bounds how many jobs run at once; within a job, target
 * languages are translated one after the other with a pacing delay.
 *
 * Per job: QUEUED -> RUNNING -> DONE | FAILED. A language whose batch
 * translation fails falls back to line-by-line translation; if that fails
 * too the language is recorded as failed and the job moves on. Only
 * pipeline-level errors (store writes, ...) or a missing payload fail the job.
 */

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;
use tokio::time::Instant;

use crate::app_config::{Config, PacingConfig};
use crate::database::models::{
    JobResult, JobState, JobUpdate, Meta, PartialMeta, PartialResult, ResultMeta,
    TranslationEntry, now_iso_utc,
};
use crate::errors::ProviderError;
use crate::providers::TranslationEngine;
use crate::subtitle_processor::CaptionLines;
use crate::translation::{BatchTranslator, translate_line_by_line};

use super::pacing::{delay_for_job, job_weight};
use super::payloads::{PayloadStore, RequestPayload};
use super::queue::JobQueue;
use super::store::JobStore;

/// Error code stored on jobs claimed without a payload
pub const MISSING_PAYLOAD: &str = "missing_payload";

/// Error code stored on jobs cancelled by a shutdown
pub const SHUTDOWN: &str = "shutdown";

/// Create the stop signal shared by the dispatch loop and its owner
pub fn stop_signal() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    watch::channel(false)
}

/// How a language was translated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranslationMode {
    Batch,
    LineByLine,
}

impl std::fmt::Display for TranslationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranslationMode::Batch => write!(f, "batch"),
            TranslationMode::LineByLine => write!(f, "line_by_line"),
        }
    }
}

/// Worker tuning, resolved from the configuration
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    /// Engine name recorded in job metadata
    pub engine_name: String,
    pub max_parallel: usize,
    pub poll_timeout: Duration,
    pub shutdown_grace: Duration,
    pub purge_interval: Duration,
    /// Character budget per engine call
    pub max_total_chars: usize,
    pub pacing: PacingConfig,
}

impl WorkerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            engine_name: config.engine.trim().to_lowercase(),
            max_parallel: config.worker.max_parallel.max(1),
            poll_timeout: config.worker.poll_timeout(),
            shutdown_grace: config.worker.shutdown_grace(),
            purge_interval: config.worker.purge_interval(),
            max_total_chars: config.batching.max_total_chars,
            pacing: config.pacing.clone(),
        }
    }
}

/// Percent reported after `done` of `total` languages: 1 at start, 99 at most
pub fn progress_percent(done: usize, total: usize) -> u8 {
    let total = total.max(1);
    let done = done.min(total);
    (1 + done * 98 / total) as u8
}

/// Progress message, e.g. `translated 2/3, failed=1`
pub fn progress_message(done: usize, total: usize, failed: usize, fallback: usize) -> String {
    let mut message = format!("translated {}/{}", done, total);
    if failed > 0 {
        message.push_str(&format!(", failed={}", failed));
    }
    if fallback > 0 {
        message.push_str(&format!(", fallback={}", fallback));
    }
    message
}

/// What a job has produced so far
#[derive(Debug, Default)]
struct JobProgress {
    entries: Vec<TranslationEntry>,
    failed_langs: Vec<String>,
    fallback_langs: Vec<String>,
    errors: BTreeMap<String, String>,
    weight: u64,
}

impl JobProgress {
    fn partial_meta(&self, engine: &str) -> PartialMeta {
        PartialMeta {
            engine: engine.to_string(),
            weight: self.weight,
            failed_langs: self.failed_langs.clone(),
            fallback_langs: self.fallback_langs.clone(),
            errors: self.errors.clone(),
        }
    }

    fn ready_langs(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.lang.trim().is_empty())
            .map(|e| e.lang.clone())
            .collect()
    }
}

/// Runs single jobs end to end
#[derive(Debug)]
struct JobRunner {
    store: JobStore,
    payloads: Arc<dyn PayloadStore>,
    engine: Arc<dyn TranslationEngine>,
    settings: WorkerSettings,
}

impl JobRunner {
    async fn process(&self, job_id: &str) {
        let Some(payload) = self.payloads.get(job_id) else {
            warn!("job={} state=FAILED err={}", job_id, MISSING_PAYLOAD);
            let update = JobUpdate::new()
                .state(JobState::Failed)
                .percent(0)
                .message("missing request payload")
                .err(MISSING_PAYLOAD);
            if let Err(e) = self.store.update(job_id, update).await {
                error!("job={} status_update_failed err={:#}", job_id, e);
            }
            return;
        };

        let mut progress = JobProgress::default();
        if let Err(e) = self.run_pipeline(job_id, &payload, &mut progress).await {
            let err_text = format!("{:#}", e);
            error!(
                "job={} video_id={} state=FAILED err={}",
                job_id, payload.video_id, err_text
            );

            let mut meta = Meta::new();
            meta.insert("engine".to_string(), json!(self.settings.engine_name));
            let update = JobUpdate::new()
                .state(JobState::Failed)
                .percent(0)
                .message(err_text.clone())
                .err(err_text.clone())
                .meta(meta);
            if let Err(e) = self.store.update(job_id, update).await {
                error!("job={} status_update_failed err={:#}", job_id, e);
            }

            self.publish_partial(job_id, &payload, JobState::Failed, 0, &err_text, &progress)
                .await;
        }

        self.payloads.delete(job_id);
    }

    async fn run_pipeline(
        &self,
        job_id: &str,
        payload: &RequestPayload,
        progress: &mut JobProgress,
    ) -> Result<()> {
        let engine_name = self.settings.engine_name.as_str();
        let started = Instant::now();
        let started_at = now_iso_utc();
        let num_langs = payload.target_langs.len();

        info!(
            "job={} video_id={} state=RUNNING engine={} langs={}",
            job_id, payload.video_id, engine_name, num_langs
        );

        let mut meta = Meta::new();
        meta.insert("engine".to_string(), json!(engine_name));
        meta.insert("started_at".to_string(), json!(started_at));
        self.store
            .update(
                job_id,
                JobUpdate::new()
                    .state(JobState::Running)
                    .percent(1)
                    .message("running")
                    .meta(meta),
            )
            .await?;

        let caption = CaptionLines::extract(&payload.src_vtt);
        progress.weight = job_weight(&payload.src_vtt, num_langs);
        let delay = delay_for_job(&self.settings.pacing, progress.weight, num_langs);

        let source_lang = if payload.src_lang.trim().is_empty() {
            "auto".to_string()
        } else {
            payload.src_lang.clone()
        };

        let mut result = JobResult {
            video_id: payload.video_id.clone(),
            default_lang: source_lang.clone(),
            entries: Vec::new(),
            meta: ResultMeta {
                source_lang: source_lang.clone(),
                engine: engine_name.to_string(),
                options: payload.options.clone(),
                started_at: Some(started_at),
                weight: progress.weight,
                ..ResultMeta::default()
            },
        };

        self.publish_partial(job_id, payload, JobState::Running, 1, "running", progress)
            .await;

        let total = num_langs.max(1);
        for (idx, lang) in payload.target_langs.iter().enumerate() {
            let lang_started = Instant::now();
            info!(
                "job={} video_id={} lang={} state=TRANSLATING weight={} delay_ms={} max_total_chars={}",
                job_id,
                payload.video_id,
                lang,
                progress.weight,
                delay.as_millis(),
                self.settings.max_total_chars
            );

            match self
                .translate_language(job_id, &caption, payload, &source_lang, lang)
                .await
            {
                Ok((vtt, mode)) => {
                    progress.entries.push(TranslationEntry {
                        lang: lang.clone(),
                        vtt,
                    });
                    if mode == TranslationMode::LineByLine {
                        progress.fallback_langs.push(lang.clone());
                    }
                    info!(
                        "job={} video_id={} lang={} state=OK mode={} duration_ms={}",
                        job_id,
                        payload.video_id,
                        lang,
                        mode,
                        lang_started.elapsed().as_millis()
                    );
                }
                Err(e) => {
                    let err_text = e.to_string();
                    warn!(
                        "job={} video_id={} lang={} state=FAILED duration_ms={} err={}",
                        job_id,
                        payload.video_id,
                        lang,
                        lang_started.elapsed().as_millis(),
                        err_text
                    );
                    progress.failed_langs.push(lang.clone());
                    progress.errors.insert(lang.clone(), err_text);
                }
            }

            // Progressive result, readable before the job completes
            result.entries = progress.entries.clone();
            result.meta.failed_langs = progress.failed_langs.clone();
            result.meta.fallback_langs = progress.fallback_langs.clone();
            result.meta.errors = progress.errors.clone();
            self.store.store_result(job_id, &result).await?;

            let done = idx + 1;
            let percent = progress_percent(done, total);
            let message = progress_message(
                done,
                total,
                progress.failed_langs.len(),
                progress.fallback_langs.len(),
            );

            let mut meta = Meta::new();
            meta.insert("engine".to_string(), json!(engine_name));
            meta.insert("failed_langs".to_string(), json!(progress.failed_langs));
            meta.insert("fallback_langs".to_string(), json!(progress.fallback_langs));
            meta.insert("weight".to_string(), json!(progress.weight));
            self.store
                .update(
                    job_id,
                    JobUpdate::new()
                        .percent(percent)
                        .message(message.clone())
                        .meta(meta),
                )
                .await?;

            self.publish_partial(job_id, payload, JobState::Running, percent, &message, progress)
                .await;

            if done < num_langs && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        let duration_ms = started.elapsed().as_millis() as u64;
        result.meta.duration_ms = Some(duration_ms);
        result.meta.completed_at = Some(now_iso_utc());
        self.store.store_result(job_id, &result).await?;

        let message = if progress.failed_langs.is_empty() {
            "done".to_string()
        } else {
            format!(
                "done with failures: {}/{}",
                progress.failed_langs.len(),
                num_langs
            )
        };

        let mut meta = Meta::new();
        meta.insert("engine".to_string(), json!(engine_name));
        meta.insert("duration_ms".to_string(), json!(duration_ms));
        meta.insert("failed_langs".to_string(), json!(progress.failed_langs));
        meta.insert("fallback_langs".to_string(), json!(progress.fallback_langs));
        meta.insert("weight".to_string(), json!(progress.weight));
        self.store
            .update(
                job_id,
                JobUpdate::new()
                    .state(JobState::Done)
                    .percent(100)
                    .message(message.clone())
                    .meta(meta),
            )
            .await?;

        self.publish_partial(job_id, payload, JobState::Done, 100, &message, progress)
            .await;

        info!(
            "job={} video_id={} state=DONE duration_ms={} ok_langs={} failed_langs={} fallback_langs={}",
            job_id,
            payload.video_id,
            duration_ms,
            progress.entries.len(),
            progress.failed_langs.len(),
            progress.fallback_langs.len()
        );

        Ok(())
    }

    /// Batch first, line by line when the batch attempt fails
    async fn translate_language(
        &self,
        job_id: &str,
        caption: &CaptionLines,
        payload: &RequestPayload,
        source_lang: &str,
        lang: &str,
    ) -> Result<(String, TranslationMode), ProviderError> {
        let batch = BatchTranslator::new(self.engine.as_ref(), self.settings.max_total_chars);

        match batch.translate_texts(&caption.texts, source_lang, lang).await {
            Ok(texts) => match caption.rebuild(&texts) {
                Ok(vtt) => return Ok((vtt, TranslationMode::Batch)),
                Err(e) => warn!(
                    "job={} video_id={} lang={} batch_failed -> fallback=line_by_line err={}",
                    job_id, payload.video_id, lang, e
                ),
            },
            Err(e) if e.is_delimiter_mismatch() => warn!(
                "job={} video_id={} lang={} batch_failed_delim_mismatch -> fallback=line_by_line err={}",
                job_id, payload.video_id, lang, e
            ),
            Err(e) => warn!(
                "job={} video_id={} lang={} batch_failed -> fallback=line_by_line err={}",
                job_id, payload.video_id, lang, e
            ),
        }

        let vtt =
            translate_line_by_line(&payload.src_vtt, self.engine.as_ref(), source_lang, lang)
                .await?;
        Ok((vtt, TranslationMode::LineByLine))
    }

    /// Best effort: a failed snapshot write is logged and ignored
    async fn publish_partial(
        &self,
        job_id: &str,
        payload: &RequestPayload,
        state: JobState,
        percent: u8,
        message: &str,
        progress: &JobProgress,
    ) {
        let partial = PartialResult {
            job_id: job_id.to_string(),
            video_id: payload.video_id.clone(),
            state,
            percent,
            message: message.to_string(),
            ready_langs: progress.ready_langs(),
            total_langs: payload.target_langs.len(),
            meta: progress.partial_meta(&self.settings.engine_name),
        };

        if let Err(e) = self.store.store_partial(job_id, &partial).await {
            error!(
                "job={} video_id={} partial_publish_failed err={:#}",
                job_id, payload.video_id, e
            );
        }
    }

    /// Record a job cancelled by shutdown as FAILED
    async fn mark_shutdown(&self, job_id: &str) {
        // A task can be cancelled after its terminal write; DONE and FAILED stay final
        match self.store.get(job_id).await {
            Ok(Some(job)) if job.state.is_terminal() => {
                debug!("job={} already {}, keeping state", job_id, job.state);
                self.payloads.delete(job_id);
                return;
            }
            Ok(Some(_)) => {}
            Ok(None) => return,
            Err(e) => {
                error!("job={} status_read_failed err={:#}", job_id, e);
                return;
            }
        }

        let update = JobUpdate::new()
            .state(JobState::Failed)
            .message(SHUTDOWN)
            .err(SHUTDOWN);

        let job = match self.store.update(job_id, update).await {
            Ok(Some(job)) => job,
            Ok(None) => return,
            Err(e) => {
                error!("job={} status_update_failed err={:#}", job_id, e);
                return;
            }
        };

        let partial = match self.store.load_partial(job_id).await {
            Ok(Some(mut partial)) => {
                partial.state = JobState::Failed;
                partial.message = SHUTDOWN.to_string();
                partial
            }
            _ => PartialResult {
                job_id: job_id.to_string(),
                video_id: job.video_id.clone(),
                state: JobState::Failed,
                percent: job.percent,
                message: SHUTDOWN.to_string(),
                ready_langs: Vec::new(),
                total_langs: job.target_langs.len(),
                meta: PartialMeta {
                    engine: self.settings.engine_name.clone(),
                    ..PartialMeta::default()
                },
            },
        };

        if let Err(e) = self.store.store_partial(job_id, &partial).await {
            error!(
                "job={} video_id={} partial_publish_failed err={:#}",
                job_id, job.video_id, e
            );
        }
        self.payloads.delete(job_id);
    }
}

/// Pool of job tasks fed by the queue
#[derive(Debug)]
pub struct WorkerPool {
    runner: Arc<JobRunner>,
    queue: JobQueue,
    semaphore: Arc<Semaphore>,
    active: Arc<Mutex<HashSet<String>>>,
}

impl WorkerPool {
    /// Creates a new worker pool
    pub fn new(
        store: JobStore,
        queue: JobQueue,
        payloads: Arc<dyn PayloadStore>,
        engine: Arc<dyn TranslationEngine>,
        settings: WorkerSettings,
    ) -> Self {
        let semaphore = Arc::new(Semaphore::new(settings.max_parallel.max(1)));
        Self {
            runner: Arc::new(JobRunner {
                store,
                payloads,
                engine,
                settings,
            }),
            queue,
            semaphore,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Run one job to completion on the current task, bypassing the queue
    pub async fn run_job(&self, job_id: &str) {
        self.runner.process(job_id).await;
    }

    /// IDs of jobs dispatched and not yet finished
    pub fn active_jobs(&self) -> Vec<String> {
        self.active.lock().iter().cloned().collect()
    }

    /// Dispatch loop; returns once `stop` is raised and running jobs are settled
    pub async fn run(&self, stop: watch::Receiver<bool>) -> Result<()> {
        let settings = &self.runner.settings;
        info!(
            "Starting worker pool (engine: {}, max_parallel: {}, poll_timeout: {:?})",
            settings.engine_name, settings.max_parallel, settings.poll_timeout
        );

        let mut tasks: JoinSet<()> = JoinSet::new();
        let mut last_purge = Instant::now();

        loop {
            // A dropped sender counts as a stop request
            if *stop.borrow() || stop.has_changed().is_err() {
                break;
            }

            while let Some(finished) = tasks.try_join_next() {
                if let Err(e) = finished {
                    warn!("Job task panicked: {}", e);
                }
            }

            if last_purge.elapsed() >= settings.purge_interval {
                last_purge = Instant::now();
                match self.runner.store.purge_expired().await {
                    Ok(stats) if stats.total() > 0 => info!(
                        "Purged {} expired results and {} partial snapshots",
                        stats.results, stats.partials
                    ),
                    Ok(_) => {}
                    Err(e) => error!("Failed to purge expired records: {:#}", e),
                }
            }

            let job_id = match self.queue.pop(settings.poll_timeout).await {
                Ok(Some(job_id)) => job_id,
                Ok(None) => continue,
                Err(e) => {
                    error!("Failed to pop job queue: {:#}", e);
                    tokio::time::sleep(settings.poll_timeout).await;
                    continue;
                }
            };

            match self.runner.store.get(&job_id).await {
                Ok(Some(_)) => {}
                Ok(None) => {
                    debug!("job={} not in store, skipping", job_id);
                    continue;
                }
                Err(e) => {
                    error!("job={} status_read_failed err={:#}", job_id, e);
                    continue;
                }
            }

            self.spawn_job_task(&mut tasks, job_id);
        }

        self.drain(tasks).await;
        info!("Worker pool stopped");
        Ok(())
    }

    /// Spawns a task to execute a single job once a permit is available
    fn spawn_job_task(&self, tasks: &mut JoinSet<()>, job_id: String) {
        let runner = Arc::clone(&self.runner);
        let semaphore = Arc::clone(&self.semaphore);
        let active = Arc::clone(&self.active);

        active.lock().insert(job_id.clone());

        tasks.spawn(async move {
            match semaphore.acquire_owned().await {
                Ok(_permit) => runner.process(&job_id).await,
                Err(e) => error!("job={} semaphore_closed err={}", job_id, e),
            }
            active.lock().remove(&job_id);
        });
    }

    /// Give running jobs the grace period, then cancel and mark the rest
    async fn drain(&self, mut tasks: JoinSet<()>) {
        if tasks.is_empty() {
            return;
        }

        let grace = self.runner.settings.shutdown_grace;
        info!(
            "Waiting up to {:?} for {} running job(s)",
            grace,
            tasks.len()
        );

        let settled = tokio::time::timeout(grace, async {
            while let Some(finished) = tasks.join_next().await {
                if let Err(e) = finished {
                    warn!("Job task panicked: {}", e);
                }
            }
        })
        .await;

        if settled.is_ok() {
            return;
        }

        tasks.abort_all();
        while tasks.join_next().await.is_some() {}

        let leftovers: Vec<String> = self.active.lock().drain().collect();
        for job_id in leftovers {
            warn!("job={} state=FAILED err={}", job_id, SHUTDOWN);
            self.runner.mark_shutdown(&job_id).await;
        }
    }
}
