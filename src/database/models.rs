/*!
 * Database entity models and DTOs.
 *
 * These structures map to the job tables and to the JSON documents kept in
 * the result and partial snapshot tables.
 */

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Free-form metadata attached to jobs and results
pub type Meta = Map<String, Value>;

/// Current time as an ISO 8601 UTC string with a `Z` suffix
pub fn now_iso_utc() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in whole seconds since the Unix epoch
pub fn now_epoch_secs() -> i64 {
    Utc::now().timestamp()
}

/// Job state enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    /// Waiting in the queue
    Queued,
    /// Claimed by a worker, languages in progress
    Running,
    /// Every language attempted; some may have failed
    Done,
    /// Pipeline failure, missing payload or shutdown
    Failed,
}

impl JobState {
    /// Whether no further transitions happen from this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Done | JobState::Failed)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobState::Queued => write!(f, "QUEUED"),
            JobState::Running => write!(f, "RUNNING"),
            JobState::Done => write!(f, "DONE"),
            JobState::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for JobState {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "QUEUED" => Ok(JobState::Queued),
            "RUNNING" => Ok(JobState::Running),
            "DONE" => Ok(JobState::Done),
            "FAILED" => Ok(JobState::Failed),
            _ => Err(anyhow::anyhow!("Invalid job state: {}", s)),
        }
    }
}

/// Job ledger record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    /// Unique identifier (UUID v4)
    pub job_id: String,
    /// Originating document identifier
    pub video_id: String,
    /// Lifecycle state
    pub state: JobState,
    /// Progress, 0 to 100
    pub percent: u8,
    /// Human readable progress message
    pub message: String,
    /// Selected engine name
    pub engine: String,
    /// Source language tag or "auto"
    pub src_lang: String,
    /// Requested target languages, in request order
    pub target_langs: Vec<String>,
    /// Error text, empty unless the job failed
    pub err: String,
    /// Worker-provided metadata
    pub meta: Meta,
    /// ISO 8601 creation timestamp
    pub created_at: String,
    /// ISO 8601 last update timestamp
    pub updated_at: String,
}

impl JobRecord {
    /// Build a freshly queued job
    pub fn queued(
        job_id: impl Into<String>,
        video_id: impl Into<String>,
        engine: impl Into<String>,
        src_lang: impl Into<String>,
        target_langs: Vec<String>,
    ) -> Self {
        let now = now_iso_utc();
        let src_lang = src_lang.into();
        Self {
            job_id: job_id.into(),
            video_id: video_id.into(),
            state: JobState::Queued,
            percent: 0,
            message: "queued".to_string(),
            engine: engine.into(),
            src_lang: if src_lang.trim().is_empty() {
                "auto".to_string()
            } else {
                src_lang
            },
            target_langs,
            err: String::new(),
            meta: Meta::new(),
            created_at: now.clone(),
            updated_at: now,
        }
    }
}

/// Field changes applied to a job record; unset fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JobUpdate {
    pub state: Option<JobState>,
    pub percent: Option<u8>,
    pub message: Option<String>,
    pub err: Option<String>,
    /// Replaces the whole metadata map
    pub meta: Option<Meta>,
}

impl JobUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: JobState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn percent(mut self, percent: u8) -> Self {
        self.percent = Some(percent.min(100));
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn err(mut self, err: impl Into<String>) -> Self {
        self.err = Some(err.into());
        self
    }

    pub fn meta(mut self, meta: Meta) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Apply the changes to a record, refreshing its update timestamp
    pub fn apply_to(&self, record: &mut JobRecord) {
        if let Some(state) = self.state {
            record.state = state;
        }
        if let Some(percent) = self.percent {
            record.percent = percent;
        }
        if let Some(message) = &self.message {
            record.message = message.clone();
        }
        if let Some(err) = &self.err {
            record.err = err.clone();
        }
        if let Some(meta) = &self.meta {
            record.meta = meta.clone();
        }
        record.updated_at = now_iso_utc();
    }
}

/// One translated document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationEntry {
    /// Target language tag
    pub lang: String,
    /// Translated caption document
    pub vtt: String,
}

/// Diagnostics stored with a result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultMeta {
    pub source_lang: String,
    pub engine: String,
    #[serde(default)]
    pub options: Meta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub failed_langs: Vec<String>,
    #[serde(default)]
    pub fallback_langs: Vec<String>,
    /// Error text per failed language
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
    #[serde(default)]
    pub weight: u64,
}

/// Translated documents of a job, progressive until the job is done
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub video_id: String,
    /// Source language, "auto" when unknown
    pub default_lang: String,
    /// One entry per successful language, in request order
    pub entries: Vec<TranslationEntry>,
    pub meta: ResultMeta,
}

/// Diagnostics stored with a partial snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialMeta {
    pub engine: String,
    #[serde(default)]
    pub weight: u64,
    #[serde(default)]
    pub failed_langs: Vec<String>,
    #[serde(default)]
    pub fallback_langs: Vec<String>,
    #[serde(default)]
    pub errors: BTreeMap<String, String>,
}

/// Lightweight progress snapshot for polling clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialResult {
    pub job_id: String,
    pub video_id: String,
    pub state: JobState,
    pub percent: u8,
    pub message: String,
    /// Languages whose documents are ready
    pub ready_langs: Vec<String>,
    /// Number of requested languages
    pub total_langs: usize,
    pub meta: PartialMeta,
}
