/*!
 * Asynchronous translation jobs.
 *
 * Submissions become QUEUED jobs in the store, their IDs go to the queue and
 * their documents to the payload store. The worker pool picks them up and
 * publishes status, partial snapshots and results back to the store.
 */

pub mod pacing;
pub mod payloads;
pub mod queue;
pub mod store;
pub mod worker;

pub use payloads::{InMemoryPayloadStore, PayloadStore, RequestPayload};
pub use queue::JobQueue;
pub use store::JobStore;
pub use worker::{WorkerPool, WorkerSettings, stop_signal};
