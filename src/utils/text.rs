// src/utils/text.rs

//! Text normalization for scraped forum content.

use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;

/// Site suffixes the forum appends to page titles.
const TITLE_SUFFIXES: &[&str] = &["NGA玩家社区", "艾泽拉斯国家地理论坛"];

fn artifact_patterns() -> &'static [Regex; 2] {
    static PATTERNS: OnceLock<[Regex; 2]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            Regex::new(r".*?\(undefined\)").unwrap(),
            Regex::new(r"显示图片\([^)]*\)").unwrap(),
        ]
    })
}

/// Clean scraped body text: strip zero-width characters and client-side
/// rendering artifacts, collapse runs of whitespace.
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    let mut t = text.replace('\u{200b}', "");
    for pattern in artifact_patterns() {
        t = pattern.replace_all(&t, "").into_owned();
    }
    t.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Clean a thread title: trim and strip the site-name suffix a page
/// `<title>` carries.
pub fn clean_title(title: &str) -> String {
    let mut t = title.trim();
    for suffix in TITLE_SUFFIXES {
        if let Some(stripped) = t.strip_suffix(suffix) {
            t = stripped.trim_end().trim_end_matches('-').trim_end();
        }
    }
    t.to_string()
}

/// Parse a forum timestamp string.
///
/// The forum renders times in a handful of formats depending on age and
/// on whether the value came from a `title` attribute.
pub fn parse_forum_time(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    const DATETIME_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
    ];
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.and_utc());
        }
    }

    const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%y-%m-%d"];
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, format) {
            return Some(d.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_strips_artifacts() {
        assert_eq!(
            clean_text("foo\u{200b} 显示图片(x.jpg) bar"),
            "foo bar"
        );
        assert_eq!(clean_text("  a \n\n b  "), "a b");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_clean_title_strips_site_suffix() {
        assert_eq!(clean_title("周常讨论帖 - NGA玩家社区"), "周常讨论帖");
        assert_eq!(clean_title("plain title"), "plain title");
    }

    #[test]
    fn test_parse_forum_time_formats() {
        assert!(parse_forum_time("2024-03-01 12:30:00").is_some());
        assert!(parse_forum_time("2024-03-01 12:30").is_some());
        assert!(parse_forum_time("24-03-01 12:30").is_some());
        assert!(parse_forum_time("2024-03-01").is_some());
        assert!(parse_forum_time("").is_none());
        assert!(parse_forum_time("昨天").is_none());
    }

    #[test]
    fn test_parse_forum_time_ordering() {
        let older = parse_forum_time("2024-03-01 10:00").unwrap();
        let newer = parse_forum_time("2024-03-01 11:00").unwrap();
        assert!(newer > older);
    }
}
