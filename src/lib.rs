// src/lib.rs

//! NGA Crawler Library
//!
//! Retrieves paginated forum content and exposes it as deduplicated,
//! ranked results: thread assembly, listing aggregation, and fuzzy board
//! name resolution against a static taxonomy.

pub mod aggregator;
pub mod assembler;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod pacing;
pub mod source;
pub mod taxonomy;
pub mod utils;
