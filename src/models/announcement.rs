//! Announcement data structures.

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// One row of a listing page, as scraped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingEntry {
    pub title: String,

    /// Date text exactly as displayed in the row
    pub raw_date_text: String,

    /// Plain `href` value, if any
    pub link: Option<String>,

    /// Inline script handler text (e.g. an `onclick` call)
    pub inline_handler: Option<String>,

    /// Pre-computed detail URL carried by the markup
    pub explicit_action: Option<String>,
}

/// A calendar date without time component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnnouncementDate(NaiveDate);

impl AnnouncementDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn is_before(&self, other: &Self) -> bool {
        self < other
    }
}

impl fmt::Display for AnnouncementDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for AnnouncementDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// An attachment reference found on a detail page.
///
/// Script-driven attachments carry their parameters inside `handler`
/// (or inside a `javascript:` pseudo-URL in `url`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub name: String,
    pub url: Option<String>,
    pub handler: Option<String>,
}

impl AttachmentRef {
    /// Text that script patterns are matched against.
    pub fn script_text(&self) -> Option<&str> {
        self.handler
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .or_else(|| self.url.as_deref().filter(|u| is_script_url(u)))
    }

    /// The declared URL when it is an ordinary, fetchable link.
    pub fn plain_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| {
            !u.is_empty() && *u != "#" && !u.starts_with('#') && !is_script_url(u)
        })
    }
}

fn is_script_url(url: &str) -> bool {
    url.trim_start().to_ascii_lowercase().starts_with("javascript:")
}

/// Everything extracted from one detail page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailContent {
    pub url: String,
    pub body: String,
    pub date: Option<AnnouncementDate>,
    pub attachments: Vec<AttachmentRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_ordering() {
        let a = AnnouncementDate::from_ymd(2024, 12, 31).unwrap();
        let b = AnnouncementDate::from_ymd(2025, 1, 1).unwrap();
        assert!(a.is_before(&b));
        assert!(!b.is_before(&a));
        assert_eq!(a.to_string(), "2024-12-31");
    }

    #[test]
    fn test_script_text_prefers_handler() {
        let attachment = AttachmentRef {
            name: "공고문.hwp".into(),
            url: Some("javascript:void(0)".into()),
            handler: Some("fn_down('a.hwp','b.hwp','/p')".into()),
        };
        assert_eq!(attachment.script_text(), Some("fn_down('a.hwp','b.hwp','/p')"));
        assert_eq!(attachment.plain_url(), None);
    }

    #[test]
    fn test_script_url_used_without_handler() {
        let attachment = AttachmentRef {
            name: "x".into(),
            url: Some("javascript:fileDown('a','b','c')".into()),
            handler: None,
        };
        assert_eq!(
            attachment.script_text(),
            Some("javascript:fileDown('a','b','c')")
        );
    }

    #[test]
    fn test_plain_url_rejects_placeholders() {
        let placeholder = AttachmentRef {
            name: "x".into(),
            url: Some("#".into()),
            handler: None,
        };
        assert_eq!(placeholder.plain_url(), None);

        let real = AttachmentRef {
            name: "x".into(),
            url: Some("/files/a.pdf".into()),
            handler: None,
        };
        assert_eq!(real.plain_url(), Some("/files/a.pdf"));
    }
}
