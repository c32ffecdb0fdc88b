//! Summary statistics over harvested records
//!
//! Every statistic is optional: anything that cannot be computed from the
//! records at hand (an empty harvest, no parseable years) is reported as
//! "unavailable" instead of failing.

use crate::record::Record;
use std::collections::HashSet;
use std::fmt;

const UNAVAILABLE: &str = "unavailable";

/// Harvest summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Number of records collected
    pub total_records: usize,

    /// Earliest and latest publication year
    pub year_range: Option<(u32, u32)>,

    /// Sum of all citation counts; non-numeric counts contribute zero
    pub citation_total: Option<u64>,

    /// Number of distinct institutions, ignoring "N/A"
    pub distinct_institutions: Option<usize>,
}

/// Computes summary statistics for `records`
pub fn summarize(records: &[Record]) -> RunSummary {
    if records.is_empty() {
        return RunSummary::default();
    }

    let year_range = records
        .iter()
        .filter_map(Record::year_value)
        .fold(None, |range: Option<(u32, u32)>, year| match range {
            Some((low, high)) => Some((low.min(year), high.max(year))),
            None => Some((year, year)),
        });

    let citation_total = records
        .iter()
        .map(Record::citation_count)
        .fold(0u64, u64::saturating_add);

    let institutions: HashSet<&str> = records.iter().filter_map(Record::institution_name).collect();

    RunSummary {
        total_records: records.len(),
        year_range,
        citation_total: Some(citation_total),
        distinct_institutions: Some(institutions.len()),
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  Records collected: {}", self.total_records)?;

        match self.year_range {
            Some((low, high)) => writeln!(f, "  Year range: {} - {}", low, high)?,
            None => writeln!(f, "  Year range: {}", UNAVAILABLE)?,
        }

        match self.citation_total {
            Some(total) => writeln!(f, "  Total citations: {}", total)?,
            None => writeln!(f, "  Total citations: {}", UNAVAILABLE)?,
        }

        match self.distinct_institutions {
            Some(count) => write!(f, "  Distinct institutions: {}", count),
            None => write!(f, "  Distinct institutions: {}", UNAVAILABLE),
        }
    }
}

/// Prints the summary to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");
    println!("{}", summary);
}
