// src/assembler.rs

//! Sequence assembler: merges per-page post lists into one thread.
//!
//! Pages of a live thread overlap when a page boundary shifts under
//! concurrent edits, so the same post can appear on two adjacent fetches.
//! The assembler keeps the first occurrence, preserves source order, and
//! tells the orchestrator when it has gathered enough.

use std::collections::HashSet;

use crate::error::{AppError, Result};
use crate::models::{AssembledThread, PageBatch, Record};

/// Default number of consecutive no-progress pages tolerated.
pub const DEFAULT_STALL_LIMIT: u32 = 3;

/// Answer to the orchestrator's "do you need more pages?" question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// Below cap and the source reports further pages
    NeedsMore,
    /// The requested cap has been reached
    CapReached,
    /// The source reported no further pages
    SourceExhausted,
}

/// Incremental assembler for one thread-crawl request.
#[derive(Debug)]
pub struct SequenceAssembler {
    cap: usize,
    stall_limit: u32,
    seen: HashSet<String>,
    records: Vec<Record>,
    last_ordinal: Option<u32>,
    consecutive_stalls: u32,
    exhausted: bool,
    title: Option<String>,
    description: Option<String>,
}

impl SequenceAssembler {
    pub fn new(cap: usize) -> Self {
        Self::with_stall_limit(cap, DEFAULT_STALL_LIMIT)
    }

    pub fn with_stall_limit(cap: usize, stall_limit: u32) -> Self {
        Self {
            cap,
            stall_limit: stall_limit.max(1),
            seen: HashSet::new(),
            records: Vec::new(),
            last_ordinal: None,
            consecutive_stalls: 0,
            exhausted: false,
            title: None,
            description: None,
        }
    }

    /// Merge one fetched page into the accumulated sequence.
    ///
    /// Pages must arrive in strictly increasing ordinal order. A record
    /// whose id was already accumulated is dropped (the later occurrence,
    /// never the earlier). Accumulation stops at the cap, discarding the
    /// remainder of the page.
    pub fn push_page(&mut self, batch: PageBatch) -> Result<PushOutcome> {
        if let Some(last) = self.last_ordinal {
            if batch.ordinal <= last {
                return Err(AppError::OutOfOrderPage {
                    got: batch.ordinal,
                    last,
                });
            }
        }
        self.last_ordinal = Some(batch.ordinal);

        if self.title.is_none() {
            self.title = batch.thread_title.clone();
        }
        if self.description.is_none() {
            self.description = batch.thread_description.clone();
        }

        let mut net_new = 0usize;
        let capped = {
            let mut capped = self.records.len() >= self.cap;
            for record in batch.records {
                if capped {
                    break;
                }
                if self.seen.insert(record.id.clone()) {
                    self.records.push(record);
                    net_new += 1;
                }
                capped = self.records.len() >= self.cap;
            }
            capped
        };

        log::debug!(
            "assembler: page {} merged, {} new, {} total",
            batch.ordinal,
            net_new,
            self.records.len()
        );

        if !batch.has_next {
            self.exhausted = true;
        }
        if capped {
            return Ok(PushOutcome::CapReached);
        }
        if self.exhausted {
            return Ok(PushOutcome::SourceExhausted);
        }

        if net_new == 0 {
            self.consecutive_stalls += 1;
            if self.consecutive_stalls >= self.stall_limit {
                return Err(AppError::StalledCrawl {
                    pages: self.consecutive_stalls,
                });
            }
        } else {
            self.consecutive_stalls = 0;
        }

        Ok(PushOutcome::NeedsMore)
    }

    /// Whether another page could still contribute records.
    pub fn needs_more(&self) -> bool {
        !self.exhausted && self.records.len() < self.cap
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Finalize into an assembled thread.
    pub fn finish(self) -> AssembledThread {
        // The opening post carries the thread timestamp.
        let posted_at = self
            .records
            .iter()
            .find(|r| r.sequence_index == 0)
            .and_then(|r| r.timestamp);

        AssembledThread {
            title: self.title.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            posted_at,
            records: self.records,
        }
    }
}

/// Assemble an already-fetched, ordered page sequence in one call.
pub fn assemble(
    pages: impl IntoIterator<Item = PageBatch>,
    cap: usize,
) -> Result<AssembledThread> {
    let mut assembler = SequenceAssembler::new(cap);
    for page in pages {
        if let PushOutcome::CapReached = assembler.push_page(page)? {
            break;
        }
    }
    Ok(assembler.finish())
}
