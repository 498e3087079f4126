// src/models/record.rs

//! Record and page-level data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of forum content: a post/reply within a thread, or a topic
/// entry within a board listing.
///
/// Identity is `id`. Two records with the same `id` fetched from
/// overlapping pages are the same logical entity and collapse to one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    /// Stable identity, unique within its thread or listing
    pub id: String,

    /// Position as emitted by the source (floor number for posts, row
    /// order for listing entries); monotonic within a page, not unique
    /// across overlapping pages
    pub sequence_index: u64,

    /// Topic title (listing entries; empty for replies)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    /// Author display name (empty when the source omits it)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,

    /// Best-effort parsed timestamp of the post or latest activity
    pub timestamp: Option<DateTime<Utc>>,

    /// Cleaned body text
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub body: String,

    /// Reply count (listing entries only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_count: Option<u32>,

    /// View count (listing entries only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,

    /// Like/recommend score (posts only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub likes: Option<i32>,

    /// Floor number this post quotes, when it quotes one on the same page
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quote_floor: Option<u64>,

    /// Canonical URL of the record (listing entries)
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl Record {
    /// A minimal record carrying only identity and position.
    ///
    /// Used as the starting point by parsers and heavily by tests.
    pub fn bare(id: impl Into<String>, sequence_index: u64) -> Self {
        Self {
            id: id.into(),
            sequence_index,
            title: String::new(),
            author: String::new(),
            timestamp: None,
            body: String::new(),
            reply_count: None,
            view_count: None,
            likes: None,
            quote_floor: None,
            url: String::new(),
        }
    }
}

/// Raw output of fetching one page of a paginated source.
///
/// Ephemeral: produced and consumed within one orchestrator request.
#[derive(Debug, Clone, Default)]
pub struct PageBatch {
    /// 1-based page number this batch was fetched as
    pub ordinal: u32,

    /// Records in source order
    pub records: Vec<Record>,

    /// Whether the source reports further pages after this one
    pub has_next: bool,

    /// Thread title, present on the first page of a thread
    pub thread_title: Option<String>,

    /// Thread opening-post text, present on the first page of a thread
    pub thread_description: Option<String>,
}

impl PageBatch {
    pub fn new(ordinal: u32, records: Vec<Record>, has_next: bool) -> Self {
        Self {
            ordinal,
            records,
            has_next,
            thread_title: None,
            thread_description: None,
        }
    }
}

/// A fully assembled thread: ordered, deduplicated posts up to the
/// requested cap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssembledThread {
    /// Cleaned thread title
    pub title: String,

    /// Opening-post text
    pub description: String,

    /// Timestamp of the opening post, when the source exposed one
    pub posted_at: Option<DateTime<Utc>>,

    /// Posts in strictly increasing thread order, no duplicate ids
    pub records: Vec<Record>,
}

impl AssembledThread {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A ranked, deduplicated board listing truncated to the requested size.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedListing {
    /// Entries in ranking order, no duplicate ids, at most `topk`
    pub entries: Vec<Record>,
}

impl RankedListing {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
