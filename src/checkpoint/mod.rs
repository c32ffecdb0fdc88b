//! Checkpoint module for resumable harvests
//!
//! This module handles the single piece of durable state a harvest keeps:
//! - The records accumulated so far
//! - The last page the run finished
//! - Pages that were given up on after exhausting their retries
//! - When the snapshot was taken
//!
//! Every save replaces the whole file atomically, so a reader never sees a
//! half-written checkpoint.

mod store;

pub use store::CheckpointStore;

use crate::record::Record;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur while persisting a checkpoint
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for checkpoint operations
pub type CheckpointResult<T> = Result<T, CheckpointError>;

/// Timestamp format written into checkpoint files
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Durable snapshot of a harvest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Records collected through `last_page`, in extraction order
    pub data: Vec<Record>,

    /// Last page the run finished
    pub last_page: u32,

    /// Local time the snapshot was written
    pub timestamp: String,

    /// Pages up to `last_page` that were skipped after exhausting retries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unfetched_pages: Vec<u32>,
}

impl Checkpoint {
    /// Returns true if no record claims a page after `last_page`
    pub fn is_consistent(&self) -> bool {
        self.data.iter().all(|record| record.page <= self.last_page)
    }

    /// First page a resumed run should fetch
    pub fn resume_page(&self) -> u32 {
        self.last_page.saturating_add(1)
    }
}
