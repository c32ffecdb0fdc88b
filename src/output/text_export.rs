//! Plain text exporter: one `Title: ..., Link: ...` line per record

use crate::config::ExportFormat;
use crate::output::traits::{OutputResult, RecordExporter};
use crate::record::Record;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes a human-readable listing of titles and links
#[derive(Debug, Default, Clone, Copy)]
pub struct TextExporter;

impl RecordExporter for TextExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Text
    }

    fn write(&self, records: &[Record], path: &Path) -> OutputResult<()> {
        let mut writer = BufWriter::new(std::fs::File::create(path)?);
        for record in records {
            writeln!(writer, "Title: {}, Link: {}", record.title, record.link)?;
        }
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let mut record = Record::new(1, "Batik Motif Recognition");
        record.link = "https://x.org/batik".to_string();

        TextExporter
            .write(&[record, Record::new(1, "Untitled Link")], &path)
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Title: Batik Motif Recognition, Link: https://x.org/batik",
                "Title: Untitled Link, Link: N/A",
            ]
        );
    }
}
