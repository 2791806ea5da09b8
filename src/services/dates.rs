// src/services/dates.rs

//! Date normalization for listing and detail pages.
//!
//! Portals print dates in many shapes (`2025-09-10`, `24.12.31`,
//! `2025년 9월 30일(화)`, `등록일 2025.09.10 14:02`, `Sep 30, 2025`).
//! Everything is reduced to an [`AnnouncementDate`] or to "no date";
//! an unparseable string never becomes a guessed date.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::models::AnnouncementDate;

/// A 4-digit-year date embedded anywhere in the text.
static EMBEDDED_FULL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(\d{4})\s*[-./]\s*(\d{1,2})\s*[-./]\s*(\d{1,2})(?:\D|$)")
        .expect("valid regex")
});

/// `YY.MM.DD`, assumed to be in the 2000s.
static TWO_DIGIT_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|\D)(\d{2})\.(\d{1,2})\.(\d{1,2})(?:\D|$)").expect("valid regex")
});

/// `2025년 9월 30일`
static KOREAN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{4})\s*년\s*(\d{1,2})\s*월\s*(\d{1,2})\s*일").expect("valid regex")
});

static HAS_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|\D)\d{4}(?:\D|$)").expect("valid regex"));

/// Month-name phrases such as `Sep 30, 2025` or `30 September 2025`.
static MONTH_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z]{3,9}\.?\s+\d{1,2},?\s+\d{4})|(\d{1,2}\s+[A-Za-z]{3,9}\.?,?\s+\d{4})")
        .expect("valid regex")
});

const STRICT_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y.%m.%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y.%m.%d %H:%M",
];

const LENIENT_FORMATS: &[&str] = &[
    "%B %d, %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%b %d %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Parse free-form date text into a calendar date.
///
/// Returns `None` when nothing matches; callers treat that as
/// "cannot decide" rather than as an error.
pub fn normalize(text: &str) -> Option<AnnouncementDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(candidate) = canonical_candidate(text) {
        return parse_strict(&candidate);
    }

    if let Some(date) = parse_strict(text) {
        return Some(date);
    }

    // Only numbers that look like a year justify the lenient pass.
    if HAS_YEAR.is_match(text) {
        return parse_lenient(text);
    }

    None
}

/// Reduce recognized shapes to `YYYY-MM-DD`.
fn canonical_candidate(text: &str) -> Option<String> {
    if let Some(caps) = EMBEDDED_FULL.captures(text) {
        return Some(format!("{}-{:0>2}-{:0>2}", &caps[1], &caps[2], &caps[3]));
    }
    if let Some(caps) = TWO_DIGIT_YEAR.captures(text) {
        return Some(format!("20{}-{:0>2}-{:0>2}", &caps[1], &caps[2], &caps[3]));
    }
    if let Some(caps) = KOREAN.captures(text) {
        return Some(format!("{}-{:0>2}-{:0>2}", &caps[1], &caps[2], &caps[3]));
    }
    None
}

fn parse_strict(text: &str) -> Option<AnnouncementDate> {
    STRICT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(AnnouncementDate::new)
}

fn parse_lenient(text: &str) -> Option<AnnouncementDate> {
    let phrase = MONTH_NAME.find(text)?.as_str().replace('.', "");
    LENIENT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&phrase, format).ok())
        .map(AnnouncementDate::new)
}
