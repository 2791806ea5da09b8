// src/services/extractor.rs

//! Listing and detail page extraction.
//!
//! Parsing is done on HTML snapshots so that it can be tested without a
//! live browser; only [`ContentExtractor::extract`] touches a session.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{AttachmentRef, DetailContent, DetailSelectors, ListSelectors, ListingEntry};
use crate::services::browser::BrowserSession;
use crate::services::dates;

/// Labels that introduce a write date on detail pages.
static DATE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:등록일자|등록일|작성일자|작성일|게시일|공고일|Date)\s*[:：]?\s*(.{6,30})")
        .expect("valid date label regex")
});

/// Link texts that open a viewer instead of downloading.
const VIEWER_LABELS: &[&str] = &["미리보기", "바로보기", "뷰어", "preview"];

/// Extracts listing rows and detail content with a site's selectors.
pub struct ContentExtractor {
    listing: ListSelectors,
    detail: DetailSelectors,
}

impl ContentExtractor {
    pub fn new(listing: ListSelectors, detail: DetailSelectors) -> Self {
        Self { listing, detail }
    }

    /// Scan a listing page.
    pub fn listing(&self, html: &str) -> Result<Vec<ListingEntry>> {
        parse_listing(html, &self.listing)
    }

    /// Navigate to a detail page and extract its content.
    pub async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
        timeout: Duration,
    ) -> Result<DetailContent> {
        let html = session.navigate(url, timeout).await?;
        parse_detail(&html, url, &self.detail)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Collapse runs of whitespace into single spaces.
fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: &ElementRef) -> String {
    clean_text(&element.text().collect::<String>())
}

fn non_empty_attr(element: &ElementRef, name: &str) -> Option<String> {
    element
        .value()
        .attr(name)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Extract one [`ListingEntry`] per row that carries a title.
pub fn parse_listing(html: &str, selectors: &ListSelectors) -> Result<Vec<ListingEntry>> {
    let document = Html::parse_document(html);

    let row_sel = parse_selector(&selectors.row_selector)?;
    let title_sel = parse_selector(&selectors.title_selector)?;
    let date_sel = parse_selector(&selectors.date_selector)?;
    let link_sel = selectors
        .link_selector
        .as_ref()
        .map(|s| parse_selector(s))
        .transpose()?;

    let entries = document
        .select(&row_sel)
        .filter_map(|row| {
            let title_elem = row.select(&title_sel).next()?;
            let title = element_text(&title_elem);
            if title.is_empty() {
                return None;
            }

            let raw_date_text = row
                .select(&date_sel)
                .next()
                .map(|e| element_text(&e))
                .unwrap_or_default();

            let link_elem = link_sel
                .as_ref()
                .and_then(|sel| row.select(sel).next())
                .unwrap_or(title_elem);

            // Handlers and actions may sit on the link or on the row itself.
            let inline_handler = non_empty_attr(&link_elem, &selectors.handler_attr)
                .or_else(|| non_empty_attr(&row, &selectors.handler_attr));
            let explicit_action = selectors.action_attr.as_ref().and_then(|attr| {
                non_empty_attr(&link_elem, attr).or_else(|| non_empty_attr(&row, attr))
            });

            Some(ListingEntry {
                title,
                raw_date_text,
                link: non_empty_attr(&link_elem, &selectors.attr_name),
                inline_handler,
                explicit_action,
            })
        })
        .collect();

    Ok(entries)
}

/// Extract body text, write date and attachments from a detail page.
pub fn parse_detail(html: &str, url: &str, selectors: &DetailSelectors) -> Result<DetailContent> {
    let document = Html::parse_document(html);

    let body_sel = parse_selector(&selectors.body_selector)?;
    let body = match document.select(&body_sel).next() {
        Some(element) => block_text(&element),
        None => {
            let fallback = parse_selector("body")?;
            document
                .select(&fallback)
                .next()
                .map(|e| block_text(&e))
                .unwrap_or_default()
        }
    };

    let date = match &selectors.date_selector {
        Some(selector) => {
            let date_sel = parse_selector(selector)?;
            document
                .select(&date_sel)
                .find_map(|e| dates::normalize(&element_text(&e)))
        }
        None => None,
    }
    .or_else(|| labelled_date(&document));

    let attachment_sel = parse_selector(&selectors.attachment_selector)?;
    let mut attachments: Vec<AttachmentRef> = Vec::new();
    for element in document.select(&attachment_sel) {
        let name = element_text(&element);
        let name = if name.is_empty() {
            non_empty_attr(&element, "title")
                .or_else(|| non_empty_attr(&element, "download"))
                .unwrap_or_default()
        } else {
            name
        };
        if VIEWER_LABELS.iter().any(|l| name.eq_ignore_ascii_case(l)) {
            continue;
        }

        let attachment = AttachmentRef {
            name,
            url: non_empty_attr(&element, "href"),
            handler: non_empty_attr(&element, &selectors.handler_attr),
        };
        if attachment.name.is_empty() && attachment.url.is_none() && attachment.handler.is_none()
        {
            continue;
        }
        if !attachments.contains(&attachment) {
            attachments.push(attachment);
        }
    }

    Ok(DetailContent {
        url: url.to_string(),
        body,
        date,
        attachments,
    })
}

/// Text of an element with one line per text run and blank lines squeezed.
fn block_text(element: &ElementRef) -> String {
    let lines: Vec<String> = element
        .text()
        .map(clean_text)
        .filter(|line| !line.is_empty())
        .collect();
    lines.join("\n")
}

/// Find a date introduced by a label such as `등록일`.
fn labelled_date(document: &Html) -> Option<crate::models::AnnouncementDate> {
    let text = clean_text(&document.root_element().text().collect::<Vec<_>>().join(" "));
    DATE_LABEL
        .captures_iter(&text)
        .find_map(|caps| dates::normalize(caps.get(1)?.as_str()))
}
