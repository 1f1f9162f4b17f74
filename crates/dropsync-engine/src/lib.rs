//! Sync and feed pipelines: deduplication, job tracking, the sync
//! orchestrator, the feed generator, and an in-memory store backend.

pub mod dedupe;
pub mod error;
pub mod feed;
pub mod memory;
pub mod orchestrator;
pub mod report;
pub mod tracker;

pub use dedupe::{BatchKeys, Deduplicator, Resolution};
pub use error::{FeedError, SyncError};
pub use feed::{render_rss, FeedGenerator};
pub use memory::MemoryStore;
pub use orchestrator::{SyncOrchestrator, SyncRequest, SyncSettings, ERROR_SAMPLE_SIZE};
pub use tracker::{JobTracker, TrackerSettings};
