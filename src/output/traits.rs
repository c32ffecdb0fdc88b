//! Exporter traits and error types
//!
//! This module defines the trait interface for record exporters and the
//! errors they share.

use crate::config::ExportFormat;
use crate::record::Record;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Trait for record exporters
///
/// An exporter writes a complete snapshot of the records to one file,
/// replacing whatever the file held before.
pub trait RecordExporter {
    /// The format this exporter produces
    fn format(&self) -> ExportFormat;

    /// Writes all records, in order, to `path`
    ///
    /// # Arguments
    ///
    /// * `records` - The records to write
    /// * `path` - Destination file
    fn write(&self, records: &[Record], path: &Path) -> OutputResult<()>;
}
