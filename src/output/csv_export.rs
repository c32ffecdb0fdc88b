//! CSV exporter: one row per record, header row always present

use crate::config::ExportFormat;
use crate::output::traits::{OutputResult, RecordExporter};
use crate::record::Record;
use std::path::Path;

/// Writes records as comma-separated values
#[derive(Debug, Default, Clone, Copy)]
pub struct CsvExporter;

impl RecordExporter for CsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Csv
    }

    fn write(&self, records: &[Record], path: &Path) -> OutputResult<()> {
        // Headers are written by hand so an empty export still has them
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(path)?;

        writer.write_record(Record::headers())?;
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;

        Ok(())
    }
}
