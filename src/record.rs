//! Publication record definitions
//!
//! A [`Record`] is one listing entry extracted from a directory page. Records
//! are immutable once built and are kept in the order they were extracted.

use serde::{Deserialize, Serialize};

/// Placeholder for text fields that could not be extracted
pub const NOT_AVAILABLE: &str = "N/A";

/// Default citation count when none could be extracted
pub const NO_CITATIONS: &str = "0";

/// One publication entry from a listing page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    /// Page the record was extracted from
    pub page: u32,

    /// Publication title (always present)
    pub title: String,

    /// Link to the publication, or "N/A"
    pub link: String,

    /// Author list as displayed, or "N/A"
    pub authors: String,

    /// Four-digit publication year, or "N/A"
    pub year: String,

    /// Citation count as a digit string, "0" when unknown
    pub citations: String,

    /// Publishing institution or venue, or "N/A"
    pub institution: String,
}

impl Record {
    /// Creates a record with every optional field set to its default
    pub fn new(page: u32, title: impl Into<String>) -> Self {
        Self {
            page,
            title: title.into(),
            link: NOT_AVAILABLE.to_string(),
            authors: NOT_AVAILABLE.to_string(),
            year: NOT_AVAILABLE.to_string(),
            citations: NO_CITATIONS.to_string(),
            institution: NOT_AVAILABLE.to_string(),
        }
    }

    /// Citation count as a number; non-numeric values count as zero
    pub fn citation_count(&self) -> u64 {
        self.citations.trim().parse().unwrap_or(0)
    }

    /// Publication year as a number, if the field holds one
    pub fn year_value(&self) -> Option<u32> {
        self.year.trim().parse().ok()
    }

    /// Institution name, or `None` when it is the placeholder
    pub fn institution_name(&self) -> Option<&str> {
        let name = self.institution.trim();
        if name.is_empty() || name == NOT_AVAILABLE {
            None
        } else {
            Some(name)
        }
    }

    /// Column names used by tabular exports, in field order
    pub fn headers() -> [&'static str; 7] {
        [
            "Page",
            "Title",
            "Link",
            "Authors",
            "Year",
            "Citations",
            "Institution",
        ]
    }
}
