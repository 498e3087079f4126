// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod board;
mod config;
mod record;

// Re-export all public types
pub use board::{BoardEntry, BoardsIndexFile, ChildLink, IndexedBoard, ResolutionCandidate};
pub use config::{Config, CrawlerConfig, PacingConfig};
pub use record::{AssembledThread, PageBatch, RankedListing, Record};
