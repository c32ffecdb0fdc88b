//! Declarative selector table for listing pages
//!
//! Listing markup drifts over time. Each field is therefore described by an
//! ordered list of `(selector, reader)` strategies: the current layout first,
//! the legacy layout second. Supporting a new layout means adding a row here.

use scraper::ElementRef;

/// Reads a field value out of a matched element
pub type FieldReader = fn(ElementRef<'_>) -> Option<String>;

/// Which container selector located a page's entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerLayout {
    /// Current listing markup
    Primary,

    /// Older listing markup
    Legacy,

    /// Neither selector matched; the markup has probably changed
    NotFound,
}

/// Record fields filled from the page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Title,
    Link,
    Authors,
    Year,
    Citations,
    Institution,
}

/// A selector locating entry containers
#[derive(Debug, Clone, Copy)]
pub struct ContainerRule {
    pub selector: &'static str,
    pub layout: ContainerLayout,
}

/// One way of reading a field, relative to its container
#[derive(Clone, Copy)]
pub struct FieldStrategy {
    /// Only applies to containers located with this layout
    pub layout: Option<ContainerLayout>,

    /// Descendant to read; `None` reads the container element itself
    pub selector: Option<&'static str>,

    pub read: FieldReader,
}

impl FieldStrategy {
    /// Reads the first matching descendant, whatever the layout
    pub const fn select(selector: &'static str, read: FieldReader) -> Self {
        Self {
            layout: None,
            selector: Some(selector),
            read,
        }
    }

    /// Reads the first matching descendant of a `layout` container
    pub const fn within(
        layout: ContainerLayout,
        selector: &'static str,
        read: FieldReader,
    ) -> Self {
        Self {
            layout: Some(layout),
            selector: Some(selector),
            read,
        }
    }

    /// Reads a `layout` container itself
    pub const fn container(layout: ContainerLayout, read: FieldReader) -> Self {
        Self {
            layout: Some(layout),
            selector: None,
            read,
        }
    }

    /// Returns true if this strategy may run on a container of `layout`
    pub fn applies_to(&self, layout: ContainerLayout) -> bool {
        self.layout.map_or(true, |only| only == layout)
    }
}

/// Ordered fallback chain for one field
#[derive(Clone, Copy)]
pub struct FieldRule {
    pub field: Field,
    pub strategies: &'static [FieldStrategy],
}

/// Full description of a listing layout
#[derive(Clone, Copy)]
pub struct SelectorTable {
    pub containers: &'static [ContainerRule],
    pub fields: &'static [FieldRule],
}

/// Selectors for the SINTA listing, current layout first
///
/// The legacy listing rendered each entry as a bare
/// `<div class="article-title"><a href="...">Title</a></div>`, so its title is
/// the container text and its link the anchor inside it.
pub const DEFAULT_TABLE: SelectorTable = SelectorTable {
    containers: &[
        ContainerRule {
            selector: "div.ar-list-item",
            layout: ContainerLayout::Primary,
        },
        ContainerRule {
            selector: "div.article-title",
            layout: ContainerLayout::Legacy,
        },
    ],
    fields: &[
        FieldRule {
            field: Field::Title,
            strategies: &[
                FieldStrategy::select("div.ar-title a", read_text),
                FieldStrategy::container(ContainerLayout::Legacy, read_text),
            ],
        },
        FieldRule {
            field: Field::Link,
            strategies: &[
                FieldStrategy::select("div.ar-title a[href]", read_href),
                FieldStrategy::within(ContainerLayout::Legacy, "a[href]", read_href),
            ],
        },
        FieldRule {
            field: Field::Authors,
            strategies: &[
                FieldStrategy::select("div.ar-meta .ar-authors", read_authors),
                FieldStrategy::select(".article-authors", read_authors),
            ],
        },
        FieldRule {
            field: Field::Year,
            strategies: &[
                FieldStrategy::select("div.ar-meta .ar-year", read_year),
                FieldStrategy::select(".article-year", read_year),
            ],
        },
        FieldRule {
            field: Field::Citations,
            strategies: &[
                FieldStrategy::select("div.ar-meta .ar-cited", read_count),
                FieldStrategy::select(".article-cited", read_count),
            ],
        },
        FieldRule {
            field: Field::Institution,
            strategies: &[
                FieldStrategy::select("div.ar-meta .ar-pub", read_text),
                FieldStrategy::select(".article-institution", read_text),
            ],
        },
    ],
};

/// Visible text with whitespace collapsed
pub fn read_text(element: ElementRef<'_>) -> Option<String> {
    let text = element.text().collect::<Vec<_>>().join(" ");
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    non_empty(collapsed)
}

/// The `href` attribute, ignoring placeholder anchors such as `#!`
pub fn read_href(element: ElementRef<'_>) -> Option<String> {
    let href = element.value().attr("href")?.trim();
    if href.starts_with('#') || href.starts_with("javascript:") {
        return None;
    }
    non_empty(href.to_string())
}

/// Author list with a leading "Authors :" label removed
pub fn read_authors(element: ElementRef<'_>) -> Option<String> {
    let text = read_text(element)?;
    let stripped = match text.split_once(':') {
        Some((label, rest)) if label.trim().eq_ignore_ascii_case("authors") => rest.trim(),
        _ => text.as_str(),
    };
    non_empty(stripped.to_string())
}

/// First run of exactly four digits in the element text
pub fn read_year(element: ElementRef<'_>) -> Option<String> {
    let text = read_text(element)?;
    let year = digit_runs(&text).find(|run| run.len() == 4).map(str::to_string);
    year
}

/// First run of digits in the element text
pub fn read_count(element: ElementRef<'_>) -> Option<String> {
    let text = read_text(element)?;
    let run = digit_runs(&text).next()?;
    // Normalise leading zeros through a numeric parse
    run.parse::<u64>().ok().map(|count| count.to_string())
}

fn digit_runs(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
