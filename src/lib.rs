/*!
 * # yttrans - subtitle translation job service
 *
 * A Rust library that translates WebVTT caption documents into several
 * target languages through asynchronous jobs.
 *
 * ## Features
 *
 * - Caption line extraction and re-injection that keeps cue timing intact
 * - Chunked batch translation joined by randomized delimiter markers, with a
 *   tolerant re-split and a line-by-line fallback per language
 * - SQLite job store: job ledger, TTL-bound results and partial snapshots
 * - FIFO job queue with a bounded blocking pop
 * - Worker pool with admission control, pacing and graceful shutdown
 * - Pluggable translation engines (`dummy`, `ollama`)
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `subtitle_processor`: Caption line extraction and injection
 * - `translation`: Delimiter protocol, chunking, batch and fallback translation
 * - `database`: SQLite persistence for jobs, results and the queue
 * - `jobs`: Job store, queue, payloads, pacing and the worker pool
 * - `translator_service`: Submit / status / partial / result / languages
 * - `app_controller`: File-based driver used by the CLI
 * - `file_utils`: File system operations
 * - `language_utils`: Language tag utilities
 * - `providers`: Translation engines
 * - `errors`: Custom error types for the application
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

// Public modules
pub mod app_config;
pub mod app_controller;
pub mod database;
pub mod errors;
pub mod file_utils;
pub mod jobs;
pub mod language_utils;
pub mod providers;
pub mod subtitle_processor;
pub mod translation;
pub mod translator_service;

// Re-export main types for easier usage
pub use app_config::Config;
pub use errors::{BatchError, ExtractError, ProviderError, ServiceError};
pub use jobs::{JobQueue, JobStore, WorkerPool};
pub use language_utils::{get_language_name, normalize_language_tag};
pub use providers::TranslationEngine;
pub use subtitle_processor::{CaptionLines, extract_translatable_lines, inject_translated_lines};
pub use translation::{batch_translate_texts, translate_line_by_line};
pub use translator_service::TranslatorService;
