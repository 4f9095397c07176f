/*!
 * Transport-facing translator service.
 *
 * Implements the operations exposed to the RPC layer: submit a caption
 * document for translation, poll its status or partial progress, fetch the
 * final result once (fetching consumes it), and list the target languages.
 */

use std::collections::HashSet;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::app_config::Config;
use crate::database::models::{JobRecord, JobState, Meta, TranslationEntry};
use crate::errors::ServiceError;
use crate::jobs::{JobQueue, JobStore, PayloadStore, RequestPayload};
use crate::providers::TranslationEngine;
use crate::subtitle_processor::has_webvtt_header;

/// Submission input
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitRequest {
    pub video_id: String,
    pub src_vtt: String,
    #[serde(default)]
    pub src_lang: String,
    pub target_langs: Vec<String>,
    #[serde(default)]
    pub options: Meta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReply {
    pub job_id: String,
    pub state: JobState,
    pub percent: u8,
    pub message: String,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialReply {
    pub job_id: String,
    pub video_id: String,
    pub state: JobState,
    pub percent: u8,
    pub message: String,
    pub ready_langs: Vec<String>,
    pub total_langs: usize,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultReply {
    pub job_id: String,
    pub video_id: String,
    pub default_lang: String,
    pub entries: Vec<TranslationEntry>,
    pub meta: Meta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguagesReply {
    pub target_langs: Vec<String>,
    pub default_source_lang: String,
    pub meta: Meta,
}

/// Service facade over the job store, queue and engine
#[derive(Debug, Clone)]
pub struct TranslatorService {
    store: JobStore,
    queue: JobQueue,
    payloads: Arc<dyn PayloadStore>,
    engine: Arc<dyn TranslationEngine>,
    // @field: Engine name recorded on jobs
    engine_name: String,
    // @field: Configured target languages, used when the engine cannot list its own
    langs: Vec<String>,
    default_source_lang: String,
}

impl TranslatorService {
    pub fn new(
        store: JobStore,
        queue: JobQueue,
        payloads: Arc<dyn PayloadStore>,
        engine: Arc<dyn TranslationEngine>,
        config: &Config,
    ) -> Self {
        Self {
            store,
            queue,
            payloads,
            engine,
            engine_name: config.engine.trim().to_lowercase(),
            langs: config.langs.clone(),
            default_source_lang: config.default_source_lang.clone(),
        }
    }

    /// Validate a submission, create the job and queue it
    pub async fn submit(&self, request: SubmitRequest) -> Result<String, ServiceError> {
        let video_id = request.video_id.trim().to_string();
        if video_id.is_empty() {
            return Err(ServiceError::InvalidArgument("video_id is required".to_string()));
        }
        if !has_webvtt_header(&request.src_vtt) {
            return Err(ServiceError::InvalidArgument(
                "src_vtt must be a WEBVTT document".to_string(),
            ));
        }

        let target_langs = normalize_targets(&request.target_langs);
        if target_langs.is_empty() {
            return Err(ServiceError::InvalidArgument(
                "target_langs is required".to_string(),
            ));
        }

        let src_lang = match request.src_lang.trim() {
            "" => self.default_src_lang(),
            lang => lang.to_string(),
        };

        let job_id = self
            .store
            .create(&video_id, &self.engine_name, &target_langs, &src_lang)
            .await?;

        self.payloads.put(
            &job_id,
            RequestPayload {
                video_id: video_id.clone(),
                src_vtt: request.src_vtt,
                src_lang: src_lang.clone(),
                target_langs: target_langs.clone(),
                options: request.options,
            },
        );

        if let Err(e) = self.queue.push(&job_id).await {
            self.payloads.delete(&job_id);
            return Err(e.into());
        }

        info!(
            "job={} video_id={} state=QUEUED src_lang={} langs={}",
            job_id,
            video_id,
            src_lang,
            target_langs.join(",")
        );
        Ok(job_id)
    }

    /// Current status of a job
    pub async fn get_status(&self, job_id: &str) -> Result<StatusReply, ServiceError> {
        let job = self.require_job(job_id).await?;
        let meta = self.status_meta(&job);

        Ok(StatusReply {
            job_id: job.job_id,
            state: job.state,
            percent: job.percent,
            message: job.message,
            meta,
        })
    }

    /// Languages ready so far; valid in every job state
    pub async fn get_partial_result(&self, job_id: &str) -> Result<PartialReply, ServiceError> {
        let job = self.require_job(job_id).await?;

        let reply = match self.store.load_partial(job_id).await? {
            Some(partial) => {
                let mut meta = to_meta(&partial.meta);
                self.enrich_meta(&mut meta, &job);
                PartialReply {
                    job_id: job.job_id,
                    video_id: partial.video_id,
                    state: partial.state,
                    percent: partial.percent,
                    message: partial.message,
                    ready_langs: partial.ready_langs,
                    total_langs: partial.total_langs,
                    meta,
                }
            }
            None => {
                let meta = self.status_meta(&job);
                PartialReply {
                    total_langs: job.target_langs.len(),
                    job_id: job.job_id,
                    video_id: job.video_id,
                    state: job.state,
                    percent: job.percent,
                    message: job.message,
                    ready_langs: Vec::new(),
                    meta,
                }
            }
        };

        Ok(reply)
    }

    /// Final result of a DONE job. The stored result is consumed.
    pub async fn get_result(&self, job_id: &str) -> Result<ResultReply, ServiceError> {
        let job = self.require_job(job_id).await?;
        if job.state != JobState::Done {
            return Err(ServiceError::FailedPrecondition(format!(
                "job is not DONE (state={})",
                job.state
            )));
        }

        let result = self.store.take_result(job_id).await?.ok_or_else(|| {
            ServiceError::NotFound("result not found (expired or already fetched)".to_string())
        })?;

        let mut meta = to_meta(&result.meta);
        self.enrich_meta(&mut meta, &job);

        info!(
            "job={} video_id={} result_fetched entries={}",
            job_id,
            result.video_id,
            result.entries.len()
        );

        Ok(ResultReply {
            job_id: job.job_id,
            video_id: result.video_id,
            default_lang: result.default_lang,
            entries: result.entries,
            meta,
        })
    }

    /// Engine languages, or the configured allowlist when the engine cannot say
    pub async fn list_languages(&self) -> LanguagesReply {
        let mut meta = Meta::new();
        meta.insert("engine".to_string(), json!(self.engine_name));

        let target_langs = match self.engine.list_languages().await {
            Ok(langs) if !langs.is_empty() => langs,
            Ok(_) => self.langs.clone(),
            Err(e) => {
                warn!("engine={} list_languages_failed err={}", self.engine_name, e);
                meta.insert(
                    "warning".to_string(),
                    json!(format!("provider_list_languages_failed: {}", e)),
                );
                self.langs.clone()
            }
        };

        LanguagesReply {
            target_langs,
            default_source_lang: self.default_src_lang(),
            meta,
        }
    }

    fn default_src_lang(&self) -> String {
        match self.default_source_lang.trim() {
            "" => "auto".to_string(),
            lang => lang.to_string(),
        }
    }

    async fn require_job(&self, job_id: &str) -> Result<JobRecord, ServiceError> {
        let job_id = job_id.trim();
        if job_id.is_empty() {
            return Err(ServiceError::InvalidArgument("job_id is required".to_string()));
        }
        self.store
            .get(job_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("job {} not found", job_id)))
    }

    fn status_meta(&self, job: &JobRecord) -> Meta {
        let mut meta = job.meta.clone();
        self.enrich_meta(&mut meta, job);
        meta
    }

    fn enrich_meta(&self, meta: &mut Meta, job: &JobRecord) {
        if !meta.contains_key("engine") {
            let engine = if job.engine.is_empty() {
                &self.engine_name
            } else {
                &job.engine
            };
            meta.insert("engine".to_string(), json!(engine));
        }
        if !job.err.is_empty() {
            meta.insert("err".to_string(), json!(job.err));
        }
    }
}

/// Trim, drop empties and de-duplicate while keeping submission order
fn normalize_targets(langs: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    langs
        .iter()
        .map(|lang| lang.trim())
        .filter(|lang| !lang.is_empty())
        .filter(|lang| seen.insert(lang.to_string()))
        .map(str::to_string)
        .collect()
}

fn to_meta<T: Serialize>(value: &T) -> Meta {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => map,
        _ => Meta::new(),
    }
}
