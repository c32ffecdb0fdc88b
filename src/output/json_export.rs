//! JSON exporter: a pretty-printed array of records

use crate::config::ExportFormat;
use crate::output::traits::{OutputResult, RecordExporter};
use crate::record::Record;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes records as a JSON array
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonExporter;

impl RecordExporter for JsonExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Json
    }

    fn write(&self, records: &[Record], path: &Path) -> OutputResult<()> {
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, records)?;
        writer.flush()?;
        Ok(())
    }
}
