// src/utils/url.rs

//! Page URL construction for paginated forum views.

use url::Url;

use crate::error::Result;

/// Extract a numeric query parameter (e.g. `tid`, `fid`, `stid`) from a URL.
pub fn extract_query_id(url_str: &str, key: &str) -> Option<String> {
    let parsed = Url::parse(url_str).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty() && v.chars().all(|c| c.is_ascii_digit() || c == '-'))
}

/// Build the URL for page `page` of a thread.
///
/// When the URL carries a `tid`, the pagination URL is rebuilt in canonical
/// form (`read.php?tid=N&page=M`) dropping any anchor/extra params that a
/// shared link tends to carry. Otherwise the `page` param is substituted
/// in place.
pub fn thread_page_url(post_url: &str, page: u32) -> Result<String> {
    let parsed = Url::parse(post_url)?;

    if let Some(tid) = extract_query_id(post_url, "tid") {
        let mut canonical = parsed.clone();
        canonical.set_fragment(None);
        if canonical.path() == "/" || canonical.path().is_empty() {
            canonical.set_path("/read.php");
        }
        canonical.set_query(Some(&format!("tid={tid}&page={page}")));
        return Ok(canonical.to_string());
    }

    with_page_param(post_url, page)
}

/// Substitute or append the `page` query parameter, preserving all others.
pub fn with_page_param(url_str: &str, page: u32) -> Result<String> {
    let parsed = Url::parse(url_str)?;
    let mut rebuilt = parsed.clone();

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "page")
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    rebuilt.set_query(None);
    {
        let mut qp = rebuilt.query_pairs_mut();
        for (k, v) in &pairs {
            qp.append_pair(k, v);
        }
        qp.append_pair("page", &page.to_string());
    }
    Ok(rebuilt.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_query_id() {
        assert_eq!(
            extract_query_id("https://bbs.nga.cn/read.php?tid=12345&page=2", "tid"),
            Some("12345".to_string())
        );
        assert_eq!(
            extract_query_id("https://bbs.nga.cn/thread.php?fid=-7", "fid"),
            Some("-7".to_string())
        );
        assert_eq!(
            extract_query_id("https://bbs.nga.cn/thread.php?fid=7", "tid"),
            None
        );
    }

    #[test]
    fn test_thread_page_url_canonical_from_tid() {
        let url = thread_page_url("https://bbs.nga.cn/read.php?tid=42&rand=99#pid7", 3).unwrap();
        assert_eq!(url, "https://bbs.nga.cn/read.php?tid=42&page=3");
    }

    #[test]
    fn test_thread_page_url_fallback_replaces_page() {
        let url = thread_page_url("https://bbs.nga.cn/view?post=9&page=1", 5).unwrap();
        assert_eq!(url, "https://bbs.nga.cn/view?post=9&page=5");
    }

    #[test]
    fn test_with_page_param_appends_when_missing() {
        let url = with_page_param("https://bbs.nga.cn/thread.php?fid=7", 2).unwrap();
        assert_eq!(url, "https://bbs.nga.cn/thread.php?fid=7&page=2");
    }
}
