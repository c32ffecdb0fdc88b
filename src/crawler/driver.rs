//! Harvest driver - main pipeline orchestration
//!
//! This module contains the page loop that coordinates a harvest:
//! - Resolving the page range from overrides, checkpoint and defaults
//! - Fetching, extracting and accumulating records page by page
//! - Periodic checkpoints and partial exports
//! - Guaranteed checkpoint flush on interruption, failure and panic
//! - Final exports and summary on completion

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::{validate, validate_page_range, Config};
use crate::crawler::extractor::{save_debug_page, RecordExtractor};
use crate::crawler::fetcher::{FetchOutcome, PageFetcher};
use crate::crawler::session::create_session;
use crate::crawler::shutdown::ShutdownSignal;
use crate::output::{export_records, remove_stale_exports, summarize, RunSummary};
use crate::record::Record;
use crate::state::RunState;
use crate::HarvestError;
use rand::Rng;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// Caller-supplied run options, already resolved by the command line
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Explicit first page; wins over the checkpoint and the configured default
    pub start_page: Option<u32>,

    /// Explicit last page; wins over the configured default
    pub end_page: Option<u32>,

    /// Ignore and remove any existing checkpoint
    pub reset_checkpoint: bool,
}

/// Inclusive page range; empty when `start > end`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRange {
    pub start: u32,
    pub end: u32,
}

impl PageRange {
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }

    /// Number of pages in the range
    pub fn len(&self) -> u32 {
        if self.is_empty() {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn pages(&self) -> std::ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// Records collected so far, with the last page they cover
///
/// Owned by the driver for the duration of one run.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    records: Vec<Record>,
    last_page: Option<u32>,
    unfetched_pages: Vec<u32>,
}

impl Accumulator {
    /// Starts from previously collected records
    pub fn seeded(records: Vec<Record>, last_page: Option<u32>) -> Self {
        Self {
            records,
            last_page,
            unfetched_pages: Vec::new(),
        }
    }

    /// Starts from everything a checkpoint holds
    pub fn from_checkpoint(checkpoint: Checkpoint) -> Self {
        Self {
            records: checkpoint.data,
            last_page: Some(checkpoint.last_page),
            unfetched_pages: checkpoint.unfetched_pages,
        }
    }

    /// Marks `page` finished, appending whatever it yielded
    pub fn complete_page(&mut self, page: u32, records: Vec<Record>) {
        self.records.extend(records);
        self.last_page = Some(page);
    }

    /// Marks `page` finished without data after its retries ran out
    pub fn skip_page(&mut self, page: u32) {
        self.unfetched_pages.push(page);
        self.last_page = Some(page);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn last_page(&self) -> Option<u32> {
        self.last_page
    }

    /// Pages skipped so far, earlier runs included
    pub fn unfetched_pages(&self) -> &[u32] {
        &self.unfetched_pages
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }
}

/// Holds the accumulator while pages are being fetched
///
/// If the guard is dropped before [`into_inner`](Self::into_inner), the
/// loop was abandoned (a panic, or the run future being dropped), and the
/// accumulator is written to the checkpoint on the way out.
struct FlushGuard {
    store: CheckpointStore,
    accumulator: Accumulator,
    armed: bool,
}

impl FlushGuard {
    fn new(store: CheckpointStore, accumulator: Accumulator) -> Self {
        Self {
            store,
            accumulator,
            armed: true,
        }
    }

    fn accumulator_mut(&mut self) -> &mut Accumulator {
        &mut self.accumulator
    }

    fn into_inner(mut self) -> Accumulator {
        self.armed = false;
        std::mem::take(&mut self.accumulator)
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        if self.armed {
            tracing::error!("Harvest loop abandoned, saving progress");
            save_checkpoint(&self.store, &self.accumulator);
        }
    }
}

/// Resolved starting point of a run
#[derive(Debug, Clone)]
pub struct RunPlan {
    /// Pages this run will fetch
    pub range: PageRange,

    /// Checkpoint page the run resumes after, if any
    pub resumed_from: Option<u32>,

    /// Records carried over from the checkpoint
    pub seed: Accumulator,
}

/// Outcome of a finished run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Terminal state of the run
    pub state: RunState,

    /// Pages the run set out to fetch
    pub range: PageRange,

    /// Checkpoint page the run resumed after, if any
    pub resumed_from: Option<u32>,

    /// All records, checkpoint records first
    pub records: Vec<Record>,

    /// Last page finished (and checkpointed)
    pub last_page: Option<u32>,

    /// Pages retrieved successfully during this run
    pub pages_fetched: u32,

    /// Pages skipped after exhausting their retries, earlier runs included
    pub unfetched_pages: Vec<u32>,

    /// Pages retrieved but yielding no records
    pub empty_pages: Vec<u32>,

    /// Files written by the last export
    pub exports: Vec<PathBuf>,

    /// Summary statistics over `records`
    pub summary: RunSummary,
}

/// Why the page loop stopped without an error
enum LoopExit {
    Completed,
    Interrupted,
}

/// Per-run counters kept alongside the accumulator
#[derive(Debug, Default)]
struct Progress {
    pages_fetched: u32,
    empty_pages: Vec<u32>,
    exports: Vec<PathBuf>,
    partial_exports: Vec<PathBuf>,
}

/// Main harvest driver structure
pub struct Driver {
    config: Config,
    options: RunOptions,
    store: CheckpointStore,
    shutdown: ShutdownSignal,
    state: RunState,
}

impl Driver {
    /// Creates a new driver instance
    ///
    /// # Arguments
    ///
    /// * `config` - The harvest configuration, validated again by [`plan`](Self::plan)
    /// * `options` - Range overrides and the reset flag
    /// * `shutdown` - Signal that interrupts the run
    pub fn new(config: Config, options: RunOptions, shutdown: ShutdownSignal) -> Self {
        let store = CheckpointStore::new(config.checkpoint.path.clone());
        Self {
            config,
            options,
            store,
            shutdown,
            state: RunState::Init,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Validates the configuration and resolves the page range and the
    /// records carried over
    ///
    /// Precedence for the first page: explicit override, then the page after
    /// the checkpoint, then the configured default. With an explicit start,
    /// only checkpoint records from earlier pages are kept.
    pub fn plan(&self) -> Result<RunPlan, HarvestError> {
        validate(&self.config)?;

        let checkpoint = if self.options.reset_checkpoint {
            if let Err(e) = self.store.clear() {
                tracing::warn!("Failed to remove checkpoint: {}", e);
            }
            None
        } else {
            self.store.load()
        };

        if let Some(checkpoint) = &checkpoint {
            if !checkpoint.is_consistent() {
                tracing::warn!(
                    "Checkpoint holds records for pages after last_page {}; keeping them",
                    checkpoint.last_page
                );
            }
        }

        let end = self.options.end_page.unwrap_or(self.config.range.end_page);

        if let Some(start) = self.options.start_page {
            validate_page_range(start, end)
                .map_err(|_| HarvestError::InvalidRange { start, end })?;

            let seed = match checkpoint {
                Some(checkpoint) => carry_over(checkpoint, start),
                None => Accumulator::default(),
            };

            return Ok(RunPlan {
                range: PageRange { start, end },
                resumed_from: None,
                seed,
            });
        }

        match checkpoint {
            Some(checkpoint) => {
                let range = PageRange {
                    start: checkpoint.resume_page(),
                    end,
                };
                tracing::info!(
                    "Resuming after page {} with {} records",
                    checkpoint.last_page,
                    checkpoint.data.len()
                );
                if !checkpoint.unfetched_pages.is_empty() {
                    tracing::warn!(
                        "{} pages were skipped in earlier runs and will not be retried \
                         unless requested with an explicit start page: {:?}",
                        checkpoint.unfetched_pages.len(),
                        checkpoint.unfetched_pages
                    );
                }
                Ok(RunPlan {
                    range,
                    resumed_from: Some(checkpoint.last_page),
                    seed: Accumulator::from_checkpoint(checkpoint),
                })
            }
            None => {
                let start = self.config.range.start_page;
                validate_page_range(start, end)
                    .map_err(|_| HarvestError::InvalidRange { start, end })?;
                Ok(RunPlan {
                    range: PageRange { start, end },
                    resumed_from: None,
                    seed: Accumulator::default(),
                })
            }
        }
    }

    /// Runs the harvest to a terminal state
    ///
    /// Interruption is not an error: the report carries
    /// [`RunState::Interrupted`]. Any other failure flushes a checkpoint
    /// and is returned as `Err`.
    pub async fn run(&mut self) -> Result<RunReport, HarvestError> {
        let plan = match self.plan() {
            Ok(plan) => plan,
            Err(e) => {
                self.transition(RunState::Failed)?;
                return Err(e);
            }
        };

        let range = plan.range;
        let mut progress = Progress::default();

        self.transition(RunState::Running)?;
        if range.is_empty() {
            tracing::info!("Nothing left to fetch: checkpoint already covers the range");
        } else {
            tracing::info!(
                "Harvesting pages {}..={} ({} pages)",
                range.start,
                range.end,
                range.len()
            );
        }

        let mut guard = FlushGuard::new(self.store.clone(), plan.seed);
        let exit = self
            .run_pages(range, guard.accumulator_mut(), &mut progress)
            .await;
        let accumulator = guard.into_inner();

        match exit {
            Ok(LoopExit::Completed) => {
                self.save_checkpoint(&accumulator);
                let first_page = covered_start(&accumulator, range);
                let last_page = accumulator.last_page().unwrap_or(range.end).max(range.end);
                match export_records(
                    &self.config.output,
                    accumulator.records(),
                    first_page,
                    last_page,
                    false,
                ) {
                    Ok(paths) => {
                        remove_stale_exports(&progress.partial_exports, &paths);
                        progress.exports = paths;
                    }
                    Err(e) => {
                        tracing::error!("Final export failed: {}", e);
                        self.transition(RunState::Failed)?;
                        return Err(e.into());
                    }
                }
                self.transition(RunState::Completed)?;
                tracing::info!(
                    "Harvest completed: {} records, {} pages skipped",
                    accumulator.records().len(),
                    accumulator.unfetched_pages().len()
                );
            }
            Ok(LoopExit::Interrupted) => {
                tracing::warn!("Harvest interrupted, saving progress");
                self.save_checkpoint(&accumulator);
                self.export_partial(&accumulator, range, &mut progress);
                self.transition(RunState::Interrupted)?;
            }
            Err(e) => {
                tracing::error!("Harvest failed: {}", e);
                self.save_checkpoint(&accumulator);
                self.transition(RunState::Failed)?;
                return Err(e);
            }
        }

        let last_page = accumulator.last_page();
        let unfetched_pages = accumulator.unfetched_pages().to_vec();
        let records = accumulator.into_records();
        let summary = summarize(&records);

        Ok(RunReport {
            state: self.state,
            range,
            resumed_from: plan.resumed_from,
            records,
            last_page,
            pages_fetched: progress.pages_fetched,
            unfetched_pages,
            empty_pages: progress.empty_pages,
            exports: progress.exports,
            summary,
        })
    }

    /// The per-page loop: fetch, extract, accumulate, checkpoint, throttle
    async fn run_pages(
        &self,
        range: PageRange,
        accumulator: &mut Accumulator,
        progress: &mut Progress,
    ) -> Result<LoopExit, HarvestError> {
        if range.is_empty() {
            return Ok(LoopExit::Completed);
        }

        let base_url = Url::parse(&self.config.source.base_url)?;
        let extractor = RecordExtractor::new()?;
        let fetcher = PageFetcher::new(base_url, self.config.fetch.clone(), self.shutdown.clone());
        let mut session = create_session(&self.config.fetch)?;
        let interval = self.config.checkpoint.interval.max(1);

        for (index, page) in range.pages().enumerate() {
            if self.shutdown.is_triggered() {
                tracing::info!("Shutdown requested before page {}", page);
                return Ok(LoopExit::Interrupted);
            }

            let result = fetcher.fetch_page(&mut session, page).await;
            match result.outcome {
                FetchOutcome::Success { body, .. } => {
                    let extraction = extractor.extract_records(&body, page);
                    progress.pages_fetched += 1;

                    if extraction.records.is_empty() {
                        progress.empty_pages.push(page);
                        match save_debug_page(&self.config.output.debug_directory, page, &body) {
                            Ok(path) => tracing::warn!(
                                "Page {} yielded no records, raw page saved to {}",
                                page,
                                path.display()
                            ),
                            Err(e) => tracing::warn!(
                                "Page {} yielded no records and could not be saved: {}",
                                page,
                                e
                            ),
                        }
                    }

                    let found = extraction.records.len();
                    accumulator.complete_page(page, extraction.records);
                    tracing::info!(
                        "Page {} ({}/{}): {} records, {} total",
                        page,
                        index + 1,
                        range.len(),
                        found,
                        accumulator.records().len()
                    );
                }
                FetchOutcome::Failed(failure) => {
                    tracing::warn!(
                        "Page {} ({}/{}) skipped after {} attempts: {}",
                        page,
                        index + 1,
                        range.len(),
                        result.attempts,
                        failure
                    );
                    accumulator.skip_page(page);
                }
                FetchOutcome::Cancelled => {
                    tracing::info!("Shutdown requested while fetching page {}", page);
                    return Ok(LoopExit::Interrupted);
                }
            }

            if (index as u32 + 1) % interval == 0 {
                self.save_checkpoint(accumulator);
                self.export_partial(accumulator, range, progress);
            }

            if page < range.end && self.shutdown.sleep(self.throttle_delay()).await {
                tracing::info!("Shutdown requested after page {}", page);
                return Ok(LoopExit::Interrupted);
            }
        }

        Ok(LoopExit::Completed)
    }

    fn save_checkpoint(&self, accumulator: &Accumulator) {
        save_checkpoint(&self.store, accumulator);
    }

    /// Writes an intermediate snapshot, replacing the previous one
    fn export_partial(&self, accumulator: &Accumulator, range: PageRange, progress: &mut Progress) {
        let Some(last_page) = accumulator.last_page() else {
            return;
        };

        match export_records(
            &self.config.output,
            accumulator.records(),
            covered_start(accumulator, range),
            last_page,
            true,
        ) {
            Ok(paths) => {
                remove_stale_exports(&progress.partial_exports, &paths);
                progress.partial_exports = paths.clone();
                progress.exports = paths;
            }
            Err(e) => tracing::warn!("Partial export failed: {}", e),
        }
    }

    /// Randomised pause between two pages
    fn throttle_delay(&self) -> Duration {
        let throttle = &self.config.throttle;
        let millis = rand::thread_rng().gen_range(throttle.min_delay_ms..=throttle.max_delay_ms);
        Duration::from_millis(millis)
    }

    fn transition(&mut self, next: RunState) -> Result<(), HarvestError> {
        if !self.state.can_transition_to(next) {
            return Err(HarvestError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!("Run state: {} -> {}", self.state, next);
        self.state = next;
        Ok(())
    }
}

/// Persists the accumulator; failures only cost future resumability
fn save_checkpoint(store: &CheckpointStore, accumulator: &Accumulator) {
    let Some(last_page) = accumulator.last_page() else {
        tracing::debug!("No page finished yet, nothing to checkpoint");
        return;
    };

    match store.save_progress(
        accumulator.records(),
        last_page,
        accumulator.unfetched_pages(),
    ) {
        Ok(()) => tracing::info!(
            "Checkpoint saved: {} records through page {}",
            accumulator.records().len(),
            last_page
        ),
        Err(e) => tracing::warn!(
            "Failed to save checkpoint at page {} (run continues): {}",
            last_page,
            e
        ),
    }
}

/// Keeps the checkpoint records and skipped pages that precede an explicit
/// start page
fn carry_over(checkpoint: Checkpoint, start: u32) -> Accumulator {
    let before_start = start.saturating_sub(1);
    let last_page = checkpoint.last_page.min(before_start);
    if last_page == 0 {
        return Accumulator::default();
    }

    let records: Vec<Record> = checkpoint
        .data
        .into_iter()
        .filter(|record| record.page < start)
        .collect();
    let unfetched_pages: Vec<u32> = checkpoint
        .unfetched_pages
        .into_iter()
        .filter(|page| *page < start)
        .collect();

    tracing::info!(
        "Explicit start page {}: keeping {} checkpoint records through page {}",
        start,
        records.len(),
        last_page
    );
    Accumulator {
        records,
        last_page: Some(last_page),
        unfetched_pages,
    }
}

/// First page covered by the accumulated records
fn covered_start(accumulator: &Accumulator, range: PageRange) -> u32 {
    accumulator
        .records()
        .first()
        .map(|record| record.page)
        .unwrap_or(range.start)
        .min(range.start)
}

/// Runs a harvest with the given configuration and options
///
/// # Example
///
/// ```no_run
/// use sinta_harvest::config::load_config;
/// use sinta_harvest::crawler::{run_harvest, shutdown_channel, RunOptions};
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("harvest.toml"))?;
/// let (_trigger, signal) = shutdown_channel();
/// let report = run_harvest(config, RunOptions::default(), signal).await?;
/// println!("{} records", report.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(
    config: Config,
    options: RunOptions,
    shutdown: ShutdownSignal,
) -> Result<RunReport, HarvestError> {
    let mut driver = Driver::new(config, options, shutdown);
    driver.run().await
}
