// src/aggregator.rs

//! Listing aggregator: merges board-listing pages into a ranked top-k.
//!
//! Listing pages are freshness-ordered, so on overlap the first occurrence
//! of an id is the authoritative one. Ranking and truncation happen only
//! after every supplied page has been merged; the globally top entries may
//! sit on any fetched page.

use std::cmp::Ordering;
use std::collections::HashSet;

use crate::assembler::DEFAULT_STALL_LIMIT;
use crate::error::{AppError, Result};
use crate::models::{PageBatch, RankedListing, Record};

/// Incremental aggregator for one board-listing request.
#[derive(Debug)]
pub struct ListingAggregator {
    stall_limit: u32,
    seen: HashSet<String>,
    entries: Vec<Record>,
    consecutive_stalls: u32,
    exhausted: bool,
}

impl Default for ListingAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingAggregator {
    pub fn new() -> Self {
        Self::with_stall_limit(DEFAULT_STALL_LIMIT)
    }

    pub fn with_stall_limit(stall_limit: u32) -> Self {
        Self {
            stall_limit: stall_limit.max(1),
            seen: HashSet::new(),
            entries: Vec::new(),
            consecutive_stalls: 0,
            exhausted: false,
        }
    }

    /// Merge one listing page; first occurrence of an id wins.
    ///
    /// A run of `stall_limit` consecutive pages with zero net-new entries,
    /// while the source still claims further pages, aborts the request.
    pub fn push_page(&mut self, batch: PageBatch) -> Result<()> {
        let mut net_new = 0usize;
        for record in batch.records {
            if self.seen.insert(record.id.clone()) {
                self.entries.push(record);
                net_new += 1;
            }
        }
        if !batch.has_next {
            self.exhausted = true;
        }
        log::debug!(
            "aggregator: page {} merged, {} new, {} unique",
            batch.ordinal,
            net_new,
            self.entries.len()
        );

        if self.exhausted {
            return Ok(());
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
        Ok(())
    }

    /// Number of unique entries gathered so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether another page could still be worth fetching for `topk`.
    ///
    /// More pages only add older entries, so once `topk` unique entries
    /// exist the ranking can only reorder within what is already held.
    pub fn needs_more(&self, topk: usize) -> bool {
        !self.exhausted && self.entries.len() < topk
    }

    /// Rank all gathered entries and truncate to `topk`.
    pub fn finish(mut self, topk: usize) -> RankedListing {
        self.entries.sort_by(compare_rank);
        self.entries.truncate(topk);
        RankedListing {
            entries: self.entries,
        }
    }
}

/// Hot-discussion ordering: latest activity first, then reply count,
/// then id descending (newer ids are larger).
fn compare_rank(a: &Record, b: &Record) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.reply_count.unwrap_or(0).cmp(&a.reply_count.unwrap_or(0)))
        .then_with(|| compare_ids_desc(&a.id, &b.id))
}

fn compare_ids_desc(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(na), Ok(nb)) => nb.cmp(&na),
        _ => b.cmp(a),
    }
}

/// Aggregate an already-fetched, ordered page sequence in one call.
pub fn aggregate(
    pages: impl IntoIterator<Item = PageBatch>,
    topk: usize,
) -> Result<RankedListing> {
    let mut aggregator = ListingAggregator::new();
    for page in pages {
        aggregator.push_page(page)?;
    }
    Ok(aggregator.finish(topk))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;
    use crate::utils::parse_forum_time;

    fn entry(id: u64, replies: u32, ts: &str) -> Record {
        let mut record = Record::bare(id.to_string(), 0);
        record.reply_count = Some(replies);
        record.timestamp = parse_forum_time(ts);
        record
    }

    fn page(ordinal: u32, records: Vec<Record>, has_next: bool) -> PageBatch {
        PageBatch::new(ordinal, records, has_next)
    }

    fn ids(listing: &RankedListing) -> Vec<String> {
        listing.entries.iter().map(|r| r.id.clone()).collect()
    }

    #[test]
    fn test_recency_outranks_reply_count() {
        // id 5 has fewer replies but newer activity; recency is the
        // primary key, so it wins the single slot.
        let pages = vec![page(
            1,
            vec![
                entry(5, 10, "2024-01-01 00:01:40"),
                entry(6, 50, "2024-01-01 00:01:30"),
            ],
            false,
        )];
        let listing = aggregate(pages, 1).unwrap();
        assert_eq!(ids(&listing), vec!["5"]);
    }

    #[test]
    fn test_reply_count_breaks_timestamp_ties() {
        let pages = vec![page(
            1,
            vec![
                entry(5, 10, "2024-01-01 00:00:00"),
                entry(6, 50, "2024-01-01 00:00:00"),
            ],
            false,
        )];
        let listing = aggregate(pages, 2).unwrap();
        assert_eq!(ids(&listing), vec!["6", "5"]);
    }

    #[test]
    fn test_id_desc_breaks_full_ties() {
        let pages = vec![page(
            1,
            vec![
                entry(9, 5, "2024-01-01 00:00:00"),
                entry(10, 5, "2024-01-01 00:00:00"),
            ],
            false,
        )];
        // Numeric compare: 10 > 9 even though "10" < "9" lexically.
        let listing = aggregate(pages, 2).unwrap();
        assert_eq!(ids(&listing), vec!["10", "9"]);
    }

    #[test]
    fn test_first_occurrence_wins_across_pages() {
        let mut newer = entry(7, 3, "2024-01-02 00:00:00");
        newer.title = "fresh".to_string();
        let mut stale = entry(7, 2, "2024-01-01 00:00:00");
        stale.title = "stale".to_string();

        let pages = vec![
            page(1, vec![newer], true),
            page(2, vec![stale, entry(8, 1, "2023-12-30 00:00:00")], false),
        ];
        let listing = aggregate(pages, 10).unwrap();
        assert_eq!(listing.len(), 2);
        assert_eq!(listing.entries[0].id, "7");
        assert_eq!(listing.entries[0].title, "fresh");
    }

    #[test]
    fn test_truncates_after_full_merge() {
        // The globally newest entry sits on the second page; per-page
        // truncation would have missed it.
        let pages = vec![
            page(1, vec![entry(1, 0, "2024-01-01 00:00:00")], true),
            page(2, vec![entry(2, 0, "2024-06-01 00:00:00")], false),
        ];
        let listing = aggregate(pages, 1).unwrap();
        assert_eq!(ids(&listing), vec!["2"]);
    }

    #[test]
    fn test_fewer_than_topk_is_not_an_error() {
        let pages = vec![page(1, vec![entry(1, 0, "2024-01-01 00:00:00")], false)];
        let listing = aggregate(pages, 30).unwrap();
        assert_eq!(listing.len(), 1);
    }

    #[test]
    fn test_topk_zero_returns_empty() {
        let pages = vec![page(1, vec![entry(1, 0, "2024-01-01 00:00:00")], false)];
        assert!(aggregate(pages, 0).unwrap().is_empty());
    }

    #[test]
    fn test_missing_timestamps_rank_last() {
        let pages = vec![page(
            1,
            vec![entry(3, 99, ""), entry(4, 1, "2024-01-01 00:00:00")],
            false,
        )];
        let listing = aggregate(pages, 2).unwrap();
        assert_eq!(ids(&listing), vec!["4", "3"]);
    }

    #[test]
    fn test_idempotent_on_same_input() {
        let pages = vec![
            page(1, vec![entry(1, 2, "2024-01-01 00:00:00"), entry(2, 9, "")], true),
            page(2, vec![entry(2, 9, ""), entry(3, 4, "2024-02-01 00:00:00")], false),
        ];
        let a = aggregate(pages.clone(), 2).unwrap();
        let b = aggregate(pages, 2).unwrap();
        assert_eq!(ids(&a), ids(&b));
    }

    #[test]
    fn test_stall_after_consecutive_no_progress_pages() {
        // The source keeps claiming more pages but every page repeats the
        // same entries.
        let mut aggregator = ListingAggregator::with_stall_limit(3);
        aggregator
            .push_page(page(1, vec![entry(1, 0, ""), entry(2, 0, "")], true))
            .unwrap();
        aggregator
            .push_page(page(2, vec![entry(1, 0, ""), entry(2, 0, "")], true))
            .unwrap();
        aggregator
            .push_page(page(3, vec![entry(1, 0, ""), entry(2, 0, "")], true))
            .unwrap();
        let err = aggregator
            .push_page(page(4, vec![entry(2, 0, "")], true))
            .unwrap_err();
        assert!(matches!(err, AppError::StalledCrawl { pages: 3 }));
    }

    #[test]
    fn test_progress_resets_stall_counter() {
        let mut aggregator = ListingAggregator::with_stall_limit(2);
        aggregator.push_page(page(1, vec![entry(1, 0, "")], true)).unwrap();
        aggregator.push_page(page(2, vec![entry(1, 0, "")], true)).unwrap();
        // New content arrives before the limit; the counter starts over.
        aggregator.push_page(page(3, vec![entry(2, 0, "")], true)).unwrap();
        aggregator.push_page(page(4, vec![entry(2, 0, "")], true)).unwrap();
        assert!(aggregator.push_page(page(5, vec![], true)).is_err());
    }

    #[test]
    fn test_last_page_without_progress_is_not_a_stall() {
        let mut aggregator = ListingAggregator::with_stall_limit(1);
        aggregator.push_page(page(1, vec![entry(1, 0, "")], true)).unwrap();
        aggregator.push_page(page(2, vec![entry(1, 0, "")], false)).unwrap();
        assert_eq!(aggregator.finish(10).len(), 1);
    }

    #[test]
    fn test_needs_more_stops_at_topk_or_exhaustion() {
        let mut aggregator = ListingAggregator::new();
        aggregator.push_page(page(1, vec![entry(1, 0, "")], true)).unwrap();
        assert!(aggregator.needs_more(2));
        aggregator.push_page(page(2, vec![entry(2, 0, "")], true)).unwrap();
        assert!(!aggregator.needs_more(2));

        let mut aggregator = ListingAggregator::new();
        aggregator.push_page(page(1, vec![entry(1, 0, "")], false)).unwrap();
        assert!(!aggregator.needs_more(5));
    }
}
