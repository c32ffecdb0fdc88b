//! Record extractor for listing pages
//!
//! This module turns the HTML of one listing page into [`Record`]s:
//! - Locating entry containers (current layout, then legacy layout)
//! - Reading every field through its fallback chain
//! - Applying field defaults when no strategy yields a value
//! - Dropping (and logging) entries that cannot become a record
//!
//! Extraction never fails as a whole: a page either yields records or an
//! empty [`Extraction`] flagged as a possible markup change.

use crate::crawler::selectors::{ContainerLayout, Field, SelectorTable, DEFAULT_TABLE};
use crate::record::Record;
use scraper::{ElementRef, Html, Selector};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector {
        selector: &'static str,
        message: String,
    },

    #[error("Entry {index} on page {page} has no title")]
    MissingTitle { page: u32, index: usize },
}

/// Records extracted from one page
#[derive(Debug, Clone)]
pub struct Extraction {
    /// Extracted records, in page order
    pub records: Vec<Record>,

    /// Which container selector matched
    pub layout: ContainerLayout,

    /// Containers that were found but could not become records
    pub skipped: usize,
}

impl Extraction {
    /// Returns true if no container selector matched at all
    pub fn is_structure_change(&self) -> bool {
        self.layout == ContainerLayout::NotFound
    }
}

struct CompiledStrategy {
    layout: Option<ContainerLayout>,
    selector: Option<Selector>,
    read: crate::crawler::selectors::FieldReader,
}

struct CompiledField {
    field: Field,
    strategies: Vec<CompiledStrategy>,
}

/// Extractor with its selector table compiled once
pub struct RecordExtractor {
    containers: Vec<(Selector, ContainerLayout)>,
    fields: Vec<CompiledField>,
}

impl RecordExtractor {
    /// Creates an extractor for the default listing layout
    pub fn new() -> Result<Self, ExtractError> {
        Self::with_table(&DEFAULT_TABLE)
    }

    /// Creates an extractor for a custom selector table
    pub fn with_table(table: &SelectorTable) -> Result<Self, ExtractError> {
        let containers = table
            .containers
            .iter()
            .map(|rule| Ok((compile(rule.selector)?, rule.layout)))
            .collect::<Result<Vec<_>, ExtractError>>()?;

        let fields = table
            .fields
            .iter()
            .map(|rule| {
                let strategies = rule
                    .strategies
                    .iter()
                    .map(|strategy| {
                        Ok(CompiledStrategy {
                            layout: strategy.layout,
                            selector: strategy.selector.map(compile).transpose()?,
                            read: strategy.read,
                        })
                    })
                    .collect::<Result<Vec<_>, ExtractError>>()?;
                Ok(CompiledField {
                    field: rule.field,
                    strategies,
                })
            })
            .collect::<Result<Vec<_>, ExtractError>>()?;

        Ok(Self { containers, fields })
    }

    /// Parses a page and extracts every record on it
    ///
    /// # Arguments
    ///
    /// * `html` - The raw page content
    /// * `page` - The page number, stored on every record
    ///
    /// # Returns
    ///
    /// The extracted records together with the layout that matched
    ///
    /// # Example
    ///
    /// ```
    /// use sinta_harvest::crawler::RecordExtractor;
    ///
    /// let html = r#"<div class="ar-list-item">
    ///     <div class="ar-title"><a href="https://x.org/p">Rice Yield</a></div>
    /// </div>"#;
    /// let extraction = RecordExtractor::new().unwrap().extract_records(html, 3);
    /// assert_eq!(extraction.records[0].title, "Rice Yield");
    /// assert_eq!(extraction.records[0].authors, "N/A");
    /// ```
    pub fn extract_records(&self, html: &str, page: u32) -> Extraction {
        let document = Html::parse_document(html);

        let located = self.containers.iter().find_map(|(selector, layout)| {
            let found: Vec<ElementRef<'_>> = document.select(selector).collect();
            if found.is_empty() {
                None
            } else {
                Some((found, *layout))
            }
        });

        let Some((containers, layout)) = located else {
            tracing::warn!(
                "No entry containers found on page {}, the listing markup may have changed",
                page
            );
            return Extraction {
                records: Vec::new(),
                layout: ContainerLayout::NotFound,
                skipped: 0,
            };
        };

        if layout == ContainerLayout::Legacy {
            tracing::debug!("Page {} matched the legacy container selector", page);
        }

        let mut records = Vec::with_capacity(containers.len());
        let mut skipped = 0;

        for (index, container) in containers.into_iter().enumerate() {
            match self.extract_record(container, layout, page, index) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!("Skipping entry: {}", e);
                    skipped += 1;
                }
            }
        }

        tracing::debug!(
            "Page {}: {} records extracted, {} skipped ({:?} layout)",
            page,
            records.len(),
            skipped,
            layout
        );

        Extraction {
            records,
            layout,
            skipped,
        }
    }

    /// Builds one record from its container
    fn extract_record(
        &self,
        container: ElementRef<'_>,
        layout: ContainerLayout,
        page: u32,
        index: usize,
    ) -> Result<Record, ExtractError> {
        let title = self
            .read_field(container, layout, Field::Title)
            .ok_or(ExtractError::MissingTitle { page, index })?;

        let mut record = Record::new(page, title);

        for compiled in &self.fields {
            let Some(value) = first_match(container, layout, &compiled.strategies) else {
                continue;
            };
            match compiled.field {
                Field::Title => {}
                Field::Link => record.link = value,
                Field::Authors => record.authors = value,
                Field::Year => record.year = value,
                Field::Citations => record.citations = value,
                Field::Institution => record.institution = value,
            }
        }

        Ok(record)
    }

    fn read_field(
        &self,
        container: ElementRef<'_>,
        layout: ContainerLayout,
        field: Field,
    ) -> Option<String> {
        self.fields
            .iter()
            .find(|compiled| compiled.field == field)
            .and_then(|compiled| first_match(container, layout, &compiled.strategies))
    }
}

/// Evaluates a fallback chain, returning the first non-empty value
fn first_match(
    container: ElementRef<'_>,
    layout: ContainerLayout,
    strategies: &[CompiledStrategy],
) -> Option<String> {
    strategies
        .iter()
        .filter(|strategy| strategy.layout.map_or(true, |only| only == layout))
        .find_map(|strategy| match &strategy.selector {
            Some(selector) => container
                .select(selector)
                .find_map(|element| (strategy.read)(element)),
            None => (strategy.read)(container),
        })
}

fn compile(selector: &'static str) -> Result<Selector, ExtractError> {
    Selector::parse(selector).map_err(|e| ExtractError::InvalidSelector {
        selector,
        message: e.to_string(),
    })
}

/// Saves a raw page that produced no records, for offline inspection
///
/// # Returns
///
/// * `Ok(PathBuf)` - Where the page was written (`page_{n}.html`)
/// * `Err(std::io::Error)` - The directory or file could not be written
pub fn save_debug_page(directory: &Path, page: u32, html: &str) -> std::io::Result<PathBuf> {
    std::fs::create_dir_all(directory)?;
    let path = directory.join(format!("page_{}.html", page));
    std::fs::write(&path, html)?;
    Ok(path)
}
