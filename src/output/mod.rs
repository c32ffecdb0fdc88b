//! Output module for harvest exports and summaries
//!
//! This module handles:
//! - Writing record snapshots in the configured formats
//! - Naming exports after the page range they cover
//! - Computing and printing summary statistics

mod csv_export;
mod json_export;
pub mod stats;
mod text_export;
mod traits;

pub use csv_export::CsvExporter;
pub use json_export::JsonExporter;
pub use stats::{print_summary, summarize, RunSummary};
pub use text_export::TextExporter;
pub use traits::{OutputError, OutputResult, RecordExporter};

use crate::config::{ExportFormat, OutputConfig};
use crate::record::Record;
use std::path::PathBuf;

/// Returns the exporter for a format
pub fn exporter_for(format: ExportFormat) -> Box<dyn RecordExporter> {
    match format {
        ExportFormat::Csv => Box::new(CsvExporter),
        ExportFormat::Json => Box::new(JsonExporter),
        ExportFormat::Text => Box::new(TextExporter),
    }
}

/// Builds an export file name encoding the covered page range
///
/// # Example
///
/// ```
/// use sinta_harvest::config::ExportFormat;
/// use sinta_harvest::output::export_file_name;
///
/// assert_eq!(
///     export_file_name("sinta", 6673, 7506, false, ExportFormat::Csv),
///     "sinta_6673_7506.csv"
/// );
/// assert_eq!(
///     export_file_name("sinta", 6673, 6690, true, ExportFormat::Json),
///     "sinta_6673_6690_partial.json"
/// );
/// ```
pub fn export_file_name(
    prefix: &str,
    first_page: u32,
    last_page: u32,
    partial: bool,
    format: ExportFormat,
) -> String {
    let suffix = if partial { "_partial" } else { "" };
    format!(
        "{}_{}_{}{}.{}",
        prefix,
        first_page,
        last_page,
        suffix,
        format.extension()
    )
}

/// Writes `records` in every configured format
///
/// # Arguments
///
/// * `config` - Output directory, prefix and formats
/// * `records` - The records to export
/// * `first_page` - First page covered by the records
/// * `last_page` - Last page covered by the records
/// * `partial` - Whether this is an intermediate snapshot
///
/// # Returns
///
/// * `Ok(Vec<PathBuf>)` - Paths of the written files, in format order
/// * `Err(OutputError)` - A file could not be written
pub fn export_records(
    config: &OutputConfig,
    records: &[Record],
    first_page: u32,
    last_page: u32,
    partial: bool,
) -> OutputResult<Vec<PathBuf>> {
    std::fs::create_dir_all(&config.directory)?;

    let mut written = Vec::with_capacity(config.formats.len());
    for format in &config.formats {
        let path = config.directory.join(export_file_name(
            &config.file_prefix,
            first_page,
            last_page,
            partial,
            *format,
        ));
        exporter_for(*format).write(records, &path)?;
        tracing::debug!("Exported {} records to {}", records.len(), path.display());
        written.push(path);
    }

    Ok(written)
}

/// Deletes superseded export files
///
/// Paths also listed in `keep` are left alone, so rewriting a snapshot under
/// the same name never removes it. Files that are already gone are ignored;
/// other failures are logged and the remaining files are still processed.
pub fn remove_stale_exports(stale: &[PathBuf], keep: &[PathBuf]) {
    for path in stale.iter().filter(|path| !keep.contains(path)) {
        match std::fs::remove_file(path) {
            Ok(()) => tracing::debug!("Removed superseded export {}", path.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
        }
    }
}
