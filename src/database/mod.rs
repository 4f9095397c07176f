/*!
 * Database module for persistent job state.
 *
 * This module provides SQLite-based persistence for:
 * - The job ledger (status records, never expired)
 * - Final results and partial progress snapshots with a TTL
 * - The FIFO queue of pending job IDs
 */

pub mod connection;
pub mod models;
pub mod repository;
pub mod schema;

// Re-export main types
pub use connection::DatabaseConnection;
pub use repository::{PurgeStats, Repository};
