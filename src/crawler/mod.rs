//! Crawler module for page fetching and record extraction
//!
//! This module contains the core harvesting logic, including:
//! - HTTP sessions with rotating client identities
//! - Page fetching with retry, backoff and jitter
//! - Record extraction through fallback selector chains
//! - Cooperative shutdown and overall run coordination

mod driver;
mod extractor;
mod fetcher;
pub mod selectors;
mod session;
mod shutdown;

pub use driver::{run_harvest, Accumulator, Driver, PageRange, RunOptions, RunPlan, RunReport};
pub use extractor::{save_debug_page, ExtractError, Extraction, RecordExtractor};
pub use fetcher::{build_url, FetchFailure, FetchOutcome, FetchResult, PageFetcher, PageRequest};
pub use selectors::{ContainerLayout, Field, SelectorTable, DEFAULT_TABLE};
pub use session::{create_session, Session, USER_AGENTS};
pub use shutdown::{shutdown_channel, ShutdownSignal, ShutdownTrigger};
