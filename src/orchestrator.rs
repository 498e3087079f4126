// src/orchestrator.rs

//! Per-request coordination: fetch pages through the pacing controller,
//! feed them to the assembler/aggregator, decide when to stop.
//!
//! Page fetches within one request are strictly sequential: whether page
//! N+1 is needed depends on page N's net-new yield, so there is no
//! speculative prefetch. Independent requests share only the pacing
//! controller and the read-only taxonomy snapshot.

use std::sync::Arc;

use crate::aggregator::ListingAggregator;
use crate::assembler::{PushOutcome, SequenceAssembler};
use crate::error::{AppError, Result};
use crate::models::{
    AssembledThread, BoardEntry, CrawlerConfig, PageBatch, RankedListing, ResolutionCandidate,
};
use crate::pacing::PacingController;
use crate::source::{PageSource, SourceDescriptor};
use crate::taxonomy::TaxonomyResolver;

/// Lifecycle of one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestState {
    Fetching,
    Assembling,
    Aggregating,
    Done,
    Failed,
}

/// Per-request options for thread crawls.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlOptions {
    /// Return whatever was gathered when the source becomes unavailable
    /// mid-crawl. Off by default: a silently truncated thread is easily
    /// mistaken for a complete one.
    pub allow_partial: bool,
}

/// Coordinates one page source, the shared pacing controller, and the
/// taxonomy resolver behind the engine's public operations.
pub struct Orchestrator<S: PageSource> {
    source: S,
    pacer: Arc<PacingController>,
    taxonomy: Arc<TaxonomyResolver>,
    config: CrawlerConfig,
}

impl<S: PageSource> Orchestrator<S> {
    pub fn new(
        source: S,
        pacer: Arc<PacingController>,
        taxonomy: Arc<TaxonomyResolver>,
        config: CrawlerConfig,
    ) -> Self {
        Self {
            source,
            pacer,
            taxonomy,
            config,
        }
    }

    /// Crawl a thread up to `cap` posts.
    pub async fn crawl_thread(
        &self,
        source: &SourceDescriptor,
        cap: usize,
        options: CrawlOptions,
    ) -> Result<AssembledThread> {
        let mut assembler =
            SequenceAssembler::with_stall_limit(cap, self.config.stall_limit);
        let mut state = RequestState::Fetching;
        let mut page = 1u32;

        while state == RequestState::Fetching {
            let batch = match self.fetch_page(source, page).await {
                Ok(batch) => batch,
                Err(e @ AppError::SourceUnavailable { .. })
                    if options.allow_partial && !assembler.is_empty() =>
                {
                    log::warn!("{source}: returning partial thread after: {e}");
                    break;
                }
                Err(e) => {
                    state = RequestState::Failed;
                    log::debug!("{source}: {state:?} at page {page}: {e}");
                    return Err(e);
                }
            };

            state = RequestState::Assembling;
            log::trace!("{source}: {state:?} page {page}");
            match assembler.push_page(batch) {
                Ok(PushOutcome::NeedsMore) if page < self.config.max_pages => {
                    page += 1;
                    state = RequestState::Fetching;
                }
                Ok(PushOutcome::NeedsMore) if options.allow_partial => {
                    log::warn!("{source}: page ceiling {} reached", self.config.max_pages);
                    state = RequestState::Done;
                }
                Ok(PushOutcome::NeedsMore) => {
                    // A thread truncated by the ceiling reads as complete;
                    // callers must opt in to that.
                    return Err(AppError::PageCeiling { pages: page });
                }
                Ok(PushOutcome::CapReached) | Ok(PushOutcome::SourceExhausted) => {
                    state = RequestState::Done;
                }
                Err(e) => {
                    // OutOfOrderPage/StalledCrawl reproduce on retry;
                    // fatal to this request.
                    state = RequestState::Failed;
                    log::debug!("{source}: {state:?} while assembling: {e}");
                    return Err(e);
                }
            }
        }

        let thread = assembler.finish();
        log::info!("{source}: assembled {} posts over {page} page(s)", thread.len());
        Ok(thread)
    }

    /// Gather the top `topk` listing entries of a board.
    pub async fn list_board(
        &self,
        source: &SourceDescriptor,
        topk: usize,
    ) -> Result<RankedListing> {
        let mut aggregator = ListingAggregator::with_stall_limit(self.config.stall_limit);
        let mut state = if aggregator.needs_more(topk) {
            RequestState::Fetching
        } else {
            RequestState::Done
        };
        let mut page = 1u32;

        while state == RequestState::Fetching {
            // Listings fail closed: a truncated ranking looks complete.
            let batch = self.fetch_page(source, page).await?;
            state = RequestState::Aggregating;
            log::trace!("{source}: {state:?} page {page}");
            aggregator.push_page(batch)?;

            if aggregator.needs_more(topk) && page < self.config.max_pages {
                page += 1;
                state = RequestState::Fetching;
            } else {
                state = RequestState::Done;
            }
        }

        let listing = aggregator.finish(topk);
        log::info!("{source}: ranked {} entries over {page} page(s)", listing.len());
        Ok(listing)
    }

    /// Resolve a board name against the loaded taxonomy. Pure in-memory
    /// lookup; never fetches.
    pub fn resolve_board(
        &self,
        query: &str,
        topk: usize,
    ) -> Result<Vec<ResolutionCandidate>> {
        self.taxonomy.resolve(query, topk)
    }

    /// All boards of a category matching the query.
    pub fn resolve_category(&self, query: &str) -> Result<Vec<BoardEntry>> {
        self.taxonomy.resolve_category(query)
    }

    /// The full loaded taxonomy.
    pub fn taxonomy(&self) -> Result<Vec<BoardEntry>> {
        self.taxonomy.entries()
    }

    /// Fetch one page through the pacing controller with bounded retry.
    ///
    /// Only transient failures are retried; access and existence failures
    /// surface verbatim on the first attempt. Exhausting retries yields
    /// `SourceUnavailable`.
    async fn fetch_page(&self, source: &SourceDescriptor, page: u32) -> Result<PageBatch> {
        let mut attempt = 0u32;
        loop {
            self.pacer.acquire().await;
            match self.source.fetch(source, page).await {
                Ok(batch) => return Ok(batch),
                Err(e) if !e.is_transient() => return Err(e),
                Err(e) if attempt >= self.pacer.max_retries() => {
                    return Err(AppError::SourceUnavailable {
                        source_desc: source.to_string(),
                        page,
                        message: e.to_string(),
                    });
                }
                Err(e) => {
                    attempt += 1;
                    log::warn!(
                        "{source}: page {page} fetch failed (attempt {attempt}): {e}"
                    );
                    self.pacer.back_off(attempt).await;
                }
            }
        }
    }
}
