// src/source/mod.rs

//! Page source abstraction.
//!
//! The engine consumes a "fetch page N of source X" capability; how the
//! page is obtained and parsed is the source's concern. `NgaPageSource`
//! is the concrete HTTP implementation.

mod nga;

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::PageBatch;
use crate::utils::{thread_page_url, with_page_param};

pub use nga::NgaPageSource;

/// What kind of paginated view a URL points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A thread of posts (`read.php?tid=...`)
    Thread,
    /// A board/collection topic listing (`thread.php?fid=...` / `stid=...`)
    Listing,
}

/// One paginated source: a URL plus the view kind it points at.
#[derive(Debug, Clone)]
pub struct SourceDescriptor {
    pub url: String,
    pub kind: SourceKind,
}

impl SourceDescriptor {
    pub fn thread(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: SourceKind::Thread,
        }
    }

    pub fn listing(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            kind: SourceKind::Listing,
        }
    }

    /// URL of page `page` of this source.
    pub fn page_url(&self, page: u32) -> Result<String> {
        match self.kind {
            SourceKind::Thread => thread_page_url(&self.url, page),
            SourceKind::Listing => with_page_param(&self.url, page),
        }
    }
}

impl fmt::Display for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SourceKind::Thread => write!(f, "thread {}", self.url),
            SourceKind::Listing => write!(f, "listing {}", self.url),
        }
    }
}

/// A capability that fetches and parses one page of a paginated source.
///
/// Implementations own all network and parsing latency; everything above
/// this trait is non-blocking in-memory computation.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch page `page` (1-based) of `source`.
    ///
    /// Failures map to the error taxonomy: `Timeout`, `NotFound`,
    /// `AccessDenied`, or a transport-level error.
    async fn fetch(&self, source: &SourceDescriptor, page: u32) -> Result<PageBatch>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thread_descriptor_page_url() {
        let desc = SourceDescriptor::thread("https://bbs.nga.cn/read.php?tid=42");
        assert_eq!(
            desc.page_url(2).unwrap(),
            "https://bbs.nga.cn/read.php?tid=42&page=2"
        );
    }

    #[test]
    fn test_listing_descriptor_page_url() {
        let desc = SourceDescriptor::listing("https://bbs.nga.cn/thread.php?fid=7");
        assert_eq!(
            desc.page_url(3).unwrap(),
            "https://bbs.nga.cn/thread.php?fid=7&page=3"
        );
    }
}
