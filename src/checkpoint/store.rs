//! File-backed checkpoint store
//!
//! Snapshots are written to a temporary file next to the target and then
//! renamed over it, which is atomic on the same filesystem.

use crate::checkpoint::{Checkpoint, CheckpointResult, TIMESTAMP_FORMAT};
use crate::record::Record;
use serde::Serialize;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Borrowed view of a checkpoint for serialization
#[derive(Serialize)]
struct CheckpointSnapshot<'a> {
    data: &'a [Record],
    last_page: u32,
    timestamp: String,
    #[serde(skip_serializing_if = "no_pages")]
    unfetched_pages: &'a [u32],
}

fn no_pages(pages: &&[u32]) -> bool {
    pages.is_empty()
}

/// Checkpoint file at a fixed path
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    /// Creates a store for the given checkpoint path
    ///
    /// Nothing is read or written until [`load`](Self::load) or
    /// [`save`](Self::save) is called.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the checkpoint file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the checkpoint, if a readable one exists
    ///
    /// The checkpoint is returned exactly as it was saved.
    ///
    /// # Returns
    ///
    /// * `Some(Checkpoint)` - The last saved snapshot
    /// * `None` - No checkpoint exists, or it is unreadable or corrupt
    pub fn load(&self) -> Option<Checkpoint> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("No checkpoint at {}", self.path.display());
                return None;
            }
            Err(e) => {
                tracing::warn!(
                    "Checkpoint {} is unreadable, starting fresh: {}",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        let checkpoint: Checkpoint = match serde_json::from_str(&content) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                tracing::warn!(
                    "Checkpoint {} is corrupt, starting fresh: {}",
                    self.path.display(),
                    e
                );
                return None;
            }
        };

        tracing::info!(
            "Loaded checkpoint: {} records through page {} (saved {})",
            checkpoint.data.len(),
            checkpoint.last_page,
            checkpoint.timestamp
        );

        Some(checkpoint)
    }

    /// Writes a full snapshot of `records` with `last_page`
    ///
    /// The previous checkpoint is replaced only once the new one is fully
    /// on disk.
    pub fn save(&self, records: &[Record], last_page: u32) -> CheckpointResult<()> {
        self.save_progress(records, last_page, &[])
    }

    /// Like [`save`](Self::save), also recording pages skipped so far
    pub fn save_progress(
        &self,
        records: &[Record],
        last_page: u32,
        unfetched_pages: &[u32],
    ) -> CheckpointResult<()> {
        let snapshot = CheckpointSnapshot {
            data: records,
            last_page,
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            unfetched_pages,
        };

        let directory = self.directory();
        std::fs::create_dir_all(&directory)?;

        let mut file = NamedTempFile::new_in(&directory)?;
        serde_json::to_writer_pretty(&mut file, &snapshot)?;
        file.flush()?;
        file.as_file().sync_all()?;
        file.persist(&self.path).map_err(|e| e.error)?;

        tracing::debug!(
            "Checkpoint saved: {} records through page {}",
            records.len(),
            last_page
        );

        Ok(())
    }

    /// Removes the checkpoint file, if present
    pub fn clear(&self) -> CheckpointResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Removed checkpoint {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Directory holding the checkpoint (and its temporary sibling)
    fn directory(&self) -> PathBuf {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
