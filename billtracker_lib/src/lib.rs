//! Library layer for billtracker: change-aware LegiScan sync, storage, and summaries.
//!
//! Wraps the `legiscan_api` crate with an in-memory TTL cache keyed by change
//! hash, request pacing, and a sync engine that refetches only bills whose
//! hash moved. The ingestion adapter persists results and tracks each run as a job.

pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod rate_limiter;
pub mod summarize;
pub mod sync;
pub mod text;
pub mod validation;

pub use legiscan_api;
pub use legiscan_api::types;

pub use cache::{CacheKey, CacheStats, CacheTtls, ResponseCache};
pub use client::{CachedClient, MasterList};
pub use config::ClientConfig;
pub use db::{Db, DbError, Job, JobStatus, QuotaUsage, Storage, StoredBill};
pub use error::BillTrackerError;
pub use ingest::{IngestOptions, IngestOutcome, IngestionAdapter};
pub use rate_limiter::RateLimiter;
pub use summarize::{
    BillSummary, GeminiSummarizer, OfflineSummarizer, Priority, Summarizer, SummaryOutcome,
};
pub use sync::{BillStatus, ResolvedBill, SyncEngine, SyncError, SyncOptions, SyncReport};
pub use text::{resolve_text, ResolvedText};
