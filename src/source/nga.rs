// src/source/nga.rs

//! HTTP page source for NGA-style forum HTML.
//!
//! Fetches rendered pages with a plain HTTP client and extracts records
//! with CSS selectors. Thread pages carry posts keyed by `pid` anchors and
//! floor numbers; listing pages carry topic rows with reply counts and
//! activity dates.

use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{CrawlerConfig, PageBatch, Record};
use crate::utils::{clean_text, clean_title, parse_forum_time};

use super::{PageSource, SourceDescriptor, SourceKind};

/// Body marker of the guest interstitial page. Reaching it means the
/// content needs an authenticated session.
const GUEST_INTERSTITIAL: &str = "访客不能直接访问";

/// Anchor texts that are board navigation, not topics.
const NAV_ANCHOR_TEXTS: &[&str] = &["版面", "合集"];

struct ThreadSelectors {
    row: Selector,
    container: Selector,
    pid_anchor: Selector,
    floor_anchor: Selector,
    post_date: Selector,
    post_date_fallback: Selector,
    content: Selector,
    author: Selector,
    likes: Selector,
    quote_link: Selector,
    subject: Selector,
    opening_content: Selector,
    html_title: Selector,
}

struct ListingSelectors {
    row: Selector,
    row_fallback: Selector,
    cell_main: Selector,
    topic_link: Selector,
    any_topic_link: Selector,
    replies: Selector,
    post_date: Selector,
    reply_date: Selector,
}

struct Patterns {
    pid: Regex,
    floor_name: Regex,
    container_floor: Regex,
    page_param: Regex,
    tid: Regex,
    quote_pid: Regex,
}

/// Page source backed by `reqwest` + `scraper`.
pub struct NgaPageSource {
    client: Client,
    thread: ThreadSelectors,
    listing: ListingSelectors,
    pagination: Selector,
    patterns: Patterns,
}

impl NgaPageSource {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()?;
        Self::with_client(client)
    }

    fn with_client(client: Client) -> Result<Self> {
        let thread = ThreadSelectors {
            row: parse_selector("tr.postrow")?,
            container: parse_selector("td.c2[id^='postcontainer']")?,
            pid_anchor: parse_selector("a[id^='pid'][id$='Anchor']")?,
            floor_anchor: parse_selector("a[name^='l']")?,
            post_date: parse_selector("[id^='postdate']")?,
            post_date_fallback: parse_selector(".postInfo .postdatec")?,
            content: parse_selector("[id^='postcontent']")?,
            author: parse_selector("a[id^='postauthor']")?,
            likes: parse_selector(".goodbad .recommendvalue")?,
            quote_link: parse_selector("div.quote a[href*='#pid']")?,
            subject: parse_selector("h3#postsubject0")?,
            opening_content: parse_selector("p#postcontent0")?,
            html_title: parse_selector("title")?,
        };
        let listing = ListingSelectors {
            row: parse_selector("#topicrows tr.topicrow")?,
            row_fallback: parse_selector("tr.topicrow")?,
            cell_main: parse_selector("td.c2")?,
            topic_link: parse_selector("a.topic")?,
            any_topic_link: parse_selector("a[href*='read.php?tid=']")?,
            replies: parse_selector("td.c1 a.replies")?,
            post_date: parse_selector("td.c3 .postdate")?,
            reply_date: parse_selector("td.c4 .replydate")?,
        };
        let patterns = Patterns {
            pid: Regex::new(r"^pid(\d+)Anchor$").expect("valid regex"),
            floor_name: Regex::new(r"^l(\d+)$").expect("valid regex"),
            container_floor: Regex::new(r"postcontainer(\d+)").expect("valid regex"),
            page_param: Regex::new(r"(?:\?|&|&amp;)page=(\d+)").expect("valid regex"),
            tid: Regex::new(r"read\.php\?tid=(\d+)").expect("valid regex"),
            quote_pid: Regex::new(r"#pid(\d+)Anchor").expect("valid regex"),
        };
        Ok(Self {
            client,
            thread,
            listing,
            pagination: parse_selector("a[href*='page=']")?,
            patterns,
        })
    }

    async fn fetch_html(&self, url: &str, source: &SourceDescriptor, page: u32) -> Result<String> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                AppError::Timeout {
                    source_desc: source.to_string(),
                    page,
                }
            } else {
                AppError::Http(e)
            }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(AppError::NotFound {
                    source_desc: source.to_string(),
                    page,
                });
            }
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                return Err(AppError::AccessDenied {
                    source_desc: source.to_string(),
                    page,
                });
            }
            _ => {}
        }
        let response = response.error_for_status()?;
        let body = response.text().await?;

        if body.contains(GUEST_INTERSTITIAL) {
            return Err(AppError::AccessDenied {
                source_desc: source.to_string(),
                page,
            });
        }
        Ok(body)
    }

    /// Parse one thread page into a batch of post records.
    fn parse_thread_page(&self, html: &str, ordinal: u32) -> PageBatch {
        let document = Html::parse_document(html);
        let rows: Vec<ElementRef> = document.select(&self.thread.row).collect();

        // First pass: pid -> floor, for resolving quote targets.
        let mut pid_to_floor: Vec<(String, u64)> = Vec::new();
        for row in &rows {
            if let (Some(pid), Some(floor)) = (self.row_pid(row), self.row_floor(row)) {
                pid_to_floor.push((pid, floor));
            }
        }

        let mut records = Vec::new();
        for row in &rows {
            let Some(container) = row.select(&self.thread.container).next() else {
                continue;
            };
            let Some(floor) = self.row_floor(row) else {
                continue;
            };
            let pid = self.row_pid(row);

            let timestamp = self
                .floor_element(&container, &self.thread.post_date, "postdate", floor)
                .map(element_text)
                .or_else(|| {
                    container
                        .select(&self.thread.post_date_fallback)
                        .next()
                        .map(element_text)
                })
                .and_then(|raw| parse_forum_time(&raw));

            let content = self.floor_element(&container, &self.thread.content, "postcontent", floor);
            let body = content
                .map(|el| clean_text(&text_without_quotes(el)))
                .unwrap_or_default();

            let quote_floor = content
                .and_then(|el| el.select(&self.thread.quote_link).next())
                .and_then(|link| link.value().attr("href"))
                .and_then(|href| self.patterns.quote_pid.captures(href))
                .and_then(|caps| {
                    let pid = caps.get(1)?.as_str();
                    pid_to_floor
                        .iter()
                        .find(|(p, _)| p == pid)
                        .map(|(_, floor)| *floor)
                });

            let likes = container
                .select(&self.thread.likes)
                .next()
                .and_then(|el| element_text(el).parse::<i32>().ok());

            let author = container
                .select(&self.thread.author)
                .next()
                .map(|el| element_text(el))
                .unwrap_or_default();

            let mut record = Record::bare(
                pid.unwrap_or_else(|| format!("floor-{floor}")),
                floor,
            );
            record.author = author;
            record.timestamp = timestamp;
            record.body = body;
            record.likes = likes;
            record.quote_floor = quote_floor;
            records.push(record);
        }

        let mut batch = PageBatch::new(ordinal, records, self.has_next(&document, ordinal));
        if ordinal == 1 {
            batch.thread_title = Some(self.thread_title(&document));
            batch.thread_description = document
                .select(&self.thread.opening_content)
                .next()
                .map(|el| clean_text(&text_without_quotes(el)));
        }
        batch
    }

    /// Parse one board-listing page into a batch of topic records.
    fn parse_listing_page(&self, html: &str, base_url: &str, ordinal: u32) -> PageBatch {
        let document = Html::parse_document(html);
        let base = Url::parse(base_url).ok();

        let mut rows: Vec<ElementRef> = document.select(&self.listing.row).collect();
        if rows.is_empty() {
            rows = document.select(&self.listing.row_fallback).collect();
        }

        let mut records = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let Some(cell) = row.select(&self.listing.cell_main).next() else {
                continue;
            };
            let Some(link) = self.pick_topic_link(&cell) else {
                continue;
            };

            let href = link.value().attr("href").unwrap_or_default();
            let url = base
                .as_ref()
                .and_then(|b| b.join(href).ok())
                .map(|u| u.to_string())
                .unwrap_or_else(|| href.to_string());
            let Some(tid) = self
                .patterns
                .tid
                .captures(&url)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
            else {
                continue;
            };

            let reply_count = row
                .select(&self.listing.replies)
                .next()
                .and_then(|el| element_text(el).parse::<u32>().ok());

            let post_date = row
                .select(&self.listing.post_date)
                .next()
                .map(date_cell_text)
                .unwrap_or_default();
            let reply_date = row
                .select(&self.listing.reply_date)
                .next()
                .map(date_cell_text)
                .unwrap_or_default();
            // Latest activity ranks the listing; fall back to post time.
            let timestamp =
                parse_forum_time(&reply_date).or_else(|| parse_forum_time(&post_date));

            let mut record = Record::bare(tid, index as u64);
            record.title = clean_title(&element_text(link));
            record.timestamp = timestamp;
            record.reply_count = reply_count.or(Some(0));
            record.url = url;
            records.push(record);
        }

        PageBatch::new(ordinal, records, self.has_next(&document, ordinal))
    }

    fn pick_topic_link<'a>(&self, cell: &ElementRef<'a>) -> Option<ElementRef<'a>> {
        if let Some(link) = cell.select(&self.listing.topic_link).next() {
            let href = link.value().attr("href").unwrap_or_default();
            if self.patterns.tid.is_match(href) {
                return Some(link);
            }
        }
        cell.select(&self.listing.any_topic_link).find(|link| {
            let text = element_text(*link);
            let classes: Vec<&str> = link.value().classes().collect();
            !NAV_ANCHOR_TEXTS.contains(&text.as_str()) && !classes.contains(&"vertmod")
        })
    }

    fn row_pid(&self, row: &ElementRef) -> Option<String> {
        let anchor = row.select(&self.thread.pid_anchor).next()?;
        let id = anchor.value().attr("id")?;
        self.patterns
            .pid
            .captures(id)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }

    fn row_floor(&self, row: &ElementRef) -> Option<u64> {
        if let Some(anchor) = row.select(&self.thread.floor_anchor).next() {
            if let Some(name) = anchor.value().attr("name") {
                if let Some(caps) = self.patterns.floor_name.captures(name) {
                    return caps.get(1)?.as_str().parse().ok();
                }
            }
        }
        let container = row.select(&self.thread.container).next()?;
        let id = container.value().attr("id")?;
        self.patterns
            .container_floor
            .captures(id)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Find the element whose id is exactly `{prefix}{floor}` (or the
    /// `postcontentandsubject` variant for the opening post).
    fn floor_element<'a>(
        &self,
        container: &ElementRef<'a>,
        selector: &Selector,
        prefix: &str,
        floor: u64,
    ) -> Option<ElementRef<'a>> {
        let exact = format!("{prefix}{floor}");
        let with_subject = format!("postcontentandsubject{floor}");
        let mut fallback = None;
        for el in container.select(selector) {
            match el.value().attr("id") {
                Some(id) if id == exact || id == with_subject => return Some(el),
                Some(_) if fallback.is_none() => fallback = Some(el),
                _ => {}
            }
        }
        fallback
    }

    fn thread_title(&self, document: &Html) -> String {
        if let Some(subject) = document.select(&self.thread.subject).next() {
            let title = clean_title(&element_text(subject));
            if !title.is_empty() {
                return title;
            }
        }
        document
            .select(&self.thread.html_title)
            .next()
            .map(|el| clean_title(&element_text(el)))
            .unwrap_or_default()
    }

    /// Whether pagination anchors point past `ordinal`.
    fn has_next(&self, document: &Html, ordinal: u32) -> bool {
        let mut max_page = 1u32;
        for anchor in document.select(&self.pagination) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            if let Some(caps) = self.patterns.page_param.captures(href) {
                if let Ok(page) = caps[1].parse::<u32>() {
                    max_page = max_page.max(page);
                }
            }
        }
        max_page > ordinal
    }
}

#[async_trait]
impl PageSource for NgaPageSource {
    async fn fetch(&self, source: &SourceDescriptor, page: u32) -> Result<PageBatch> {
        let url = source.page_url(page)?;
        log::debug!("fetching {url}");
        let html = self.fetch_html(&url, source, page).await?;
        let batch = match source.kind {
            SourceKind::Thread => self.parse_thread_page(&html, page),
            SourceKind::Listing => self.parse_listing_page(&html, &url, page),
        };
        log::debug!(
            "parsed page {page} of {source}: {} records, has_next={}",
            batch.records.len(),
            batch.has_next
        );
        Ok(batch)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Date cells put the full timestamp in the `title` attribute and an
/// abbreviated one in the text.
fn date_cell_text(el: ElementRef) -> String {
    el.value()
        .attr("title")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| element_text(el))
}

/// Collect descendant text, skipping quoted-post blocks (`div.quote`).
fn text_without_quotes(el: ElementRef) -> String {
    let mut out = String::new();
    collect_text(*el, &mut out);
    out
}

fn collect_text(node: ego_tree::NodeRef<'_, scraper::Node>, out: &mut String) {
    for child in node.children() {
        match child.value() {
            scraper::Node::Text(text) => out.push_str(&text),
            scraper::Node::Element(element) => {
                if element.name() == "div" && element.classes().any(|c| c == "quote") {
                    continue;
                }
                collect_text(child, out);
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> NgaPageSource {
        NgaPageSource::with_client(Client::new()).unwrap()
    }

    const THREAD_PAGE: &str = r##"
        <html><head><title>测试帖 - NGA玩家社区</title></head><body>
        <h3 id="postsubject0">测试帖</h3>
        <table>
        <tr class="postrow">
          <td class="c1"><a class="small_colored_text_btn">#0</a></td>
          <td class="c2" id="postcontainer0">
            <a id="pid100Anchor"></a><a name="l0"></a>
            <a id="postauthor0" href="#">楼主</a>
            <span id="postdate0">2024-03-01 10:00</span>
            <p id="postcontent0">主楼内容 显示图片(a.jpg)</p>
          </td>
        </tr>
        <tr class="postrow">
          <td class="c1"></td>
          <td class="c2" id="postcontainer1">
            <a id="pid101Anchor"></a><a name="l1"></a>
            <a id="postauthor1" href="#">回帖人</a>
            <span id="postdate1">2024-03-01 11:00</span>
            <span id="postcontent1"><div class="quote"><a href="/read.php?tid=1#pid100Anchor">引用</a>被引内容</div>回复正文</span>
            <div class="goodbad"><span class="recommendvalue">12</span></div>
          </td>
        </tr>
        </table>
        <a href="/read.php?tid=1&page=2" title="下一页">&gt;</a>
        <a href="/read.php?tid=1&page=3" title="最后页">&gt;&gt;</a>
        </body></html>
    "##;

    #[test]
    fn test_parse_thread_page_records() {
        let batch = source().parse_thread_page(THREAD_PAGE, 1);
        assert_eq!(batch.records.len(), 2);

        let opening = &batch.records[0];
        assert_eq!(opening.id, "100");
        assert_eq!(opening.sequence_index, 0);
        assert_eq!(opening.author, "楼主");
        assert_eq!(opening.body, "主楼内容");
        assert!(opening.timestamp.is_some());

        let reply = &batch.records[1];
        assert_eq!(reply.id, "101");
        assert_eq!(reply.sequence_index, 1);
        assert_eq!(reply.likes, Some(12));
        // Quote text excluded from the body, quoted floor resolved.
        assert_eq!(reply.body, "回复正文");
        assert_eq!(reply.quote_floor, Some(0));
    }

    #[test]
    fn test_parse_thread_page_metadata_and_pagination() {
        let batch = source().parse_thread_page(THREAD_PAGE, 1);
        assert_eq!(batch.thread_title.as_deref(), Some("测试帖"));
        assert_eq!(batch.thread_description.as_deref(), Some("主楼内容"));
        assert!(batch.has_next);

        let last = source().parse_thread_page(THREAD_PAGE, 3);
        assert!(!last.has_next);
        assert!(last.thread_title.is_none());
    }

    #[test]
    fn test_parse_thread_page_floor_fallback_without_pid() {
        let html = r#"
            <table><tr class="postrow">
              <td class="c2" id="postcontainer5">
                <p id="postcontent5">五楼</p>
              </td>
            </tr></table>
        "#;
        let batch = source().parse_thread_page(html, 2);
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.records[0].id, "floor-5");
        assert_eq!(batch.records[0].sequence_index, 5);
    }

    const LISTING_PAGE: &str = r#"
        <html><body>
        <table id="topicrows">
        <tr class="topicrow">
          <td class="c1"><a class="replies">42</a></td>
          <td class="c2"><a href="/read.php?tid=555" class="topic">热门话题</a></td>
          <td class="c3"><span class="postdate" title="2024-02-28 09:00">02-28</span></td>
          <td class="c4"><span class="replydate" title="2024-03-01 18:30">18:30</span></td>
        </tr>
        <tr class="topicrow">
          <td class="c1"></td>
          <td class="c2">
            <a href="/thread.php?fid=9">版面</a>
            <a href="/read.php?tid=556" class="vertmod">置顶</a>
            <a href="/read.php?tid=557">普通话题</a>
          </td>
          <td class="c3"><span class="postdate">2024-02-20 08:00</span></td>
          <td class="c4"></td>
        </tr>
        </table>
        <a href="/thread.php?fid=7&page=2">2</a>
        </body></html>
    "#;

    #[test]
    fn test_parse_listing_page_records() {
        let batch =
            source().parse_listing_page(LISTING_PAGE, "https://bbs.nga.cn/thread.php?fid=7", 1);
        assert_eq!(batch.records.len(), 2);

        let hot = &batch.records[0];
        assert_eq!(hot.id, "555");
        assert_eq!(hot.title, "热门话题");
        assert_eq!(hot.reply_count, Some(42));
        assert_eq!(hot.url, "https://bbs.nga.cn/read.php?tid=555");
        // Reply date (latest activity) preferred over post date.
        assert_eq!(
            hot.timestamp,
            parse_forum_time("2024-03-01 18:30")
        );

        // Board-navigation and vertmod anchors skipped.
        let plain = &batch.records[1];
        assert_eq!(plain.id, "557");
        assert_eq!(plain.timestamp, parse_forum_time("2024-02-20 08:00"));

        assert!(batch.has_next);
    }

    #[test]
    fn test_listing_last_page_has_no_next() {
        let batch =
            source().parse_listing_page(LISTING_PAGE, "https://bbs.nga.cn/thread.php?fid=7", 2);
        assert!(!batch.has_next);
    }
}
