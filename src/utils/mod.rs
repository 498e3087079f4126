// src/utils/mod.rs

//! Utility functions and helpers.

pub mod text;
pub mod url;

pub use text::{clean_text, clean_title, parse_forum_time};
pub use url::{extract_query_id, thread_page_url, with_page_param};
