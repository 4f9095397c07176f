/*!
 * Request payload side-channel.
 *
 * Submissions carry the source document, which is too large for the job
 * ledger. It is parked here under the job ID until a worker claims the job.
 * The in-memory implementation loses payloads on restart; a job claimed
 * without its payload fails with `missing_payload`. Swap in another
 * [`PayloadStore`] to make payloads durable.
 */

use std::collections::HashMap;
use std::fmt::Debug;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::database::models::Meta;

/// Everything a worker needs to run a job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestPayload {
    pub video_id: String,
    /// Source caption document
    pub src_vtt: String,
    pub src_lang: String,
    pub target_langs: Vec<String>,
    #[serde(default)]
    pub options: Meta,
}

/// Key-value store of request payloads by job ID
pub trait PayloadStore: Send + Sync + Debug {
    fn put(&self, job_id: &str, payload: RequestPayload);

    fn get(&self, job_id: &str) -> Option<RequestPayload>;

    fn delete(&self, job_id: &str);
}

/// Volatile payload store
#[derive(Debug, Default)]
pub struct InMemoryPayloadStore {
    inner: Mutex<HashMap<String, RequestPayload>>,
}

impl InMemoryPayloadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl PayloadStore for InMemoryPayloadStore {
    fn put(&self, job_id: &str, payload: RequestPayload) {
        self.inner.lock().insert(job_id.to_string(), payload);
    }

    fn get(&self, job_id: &str) -> Option<RequestPayload> {
        self.inner.lock().get(job_id).cloned()
    }

    fn delete(&self, job_id: &str) {
        self.inner.lock().remove(job_id);
    }
}
