//! Crawl options, cutoff and per-run state.

use std::fmt;
use std::path::PathBuf;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::AnnouncementDate;
use crate::services::DuplicateIndex;

/// The date before which collection stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cutoff {
    /// Stop at entries older than 1 January of this year
    Year(i32),
    /// Stop at entries older than this date
    Date(NaiveDate),
    /// Never stop on dates
    None,
}

impl Cutoff {
    /// First date that is still collected.
    pub fn threshold(&self) -> Option<AnnouncementDate> {
        match self {
            Self::Year(year) => AnnouncementDate::from_ymd(*year, 1, 1),
            Self::Date(date) => Some(AnnouncementDate::new(*date)),
            Self::None => None,
        }
    }

    /// Whether a known date lies strictly before the cutoff.
    ///
    /// An absent date never stops the crawl.
    pub fn is_stale(&self, date: Option<AnnouncementDate>) -> bool {
        match (date, self.threshold()) {
            (Some(date), Some(threshold)) => date.is_before(&threshold),
            _ => false,
        }
    }
}

/// Per-run crawl options, usually taken from the command line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlOptions {
    pub cutoff: Cutoff,
    pub start_page: u32,
    /// Re-process announcements already materialized on disk
    pub force: bool,
    /// Resolve and record detail URLs only
    pub urls_only: bool,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            cutoff: Cutoff::None,
            start_page: 1,
            force: false,
            urls_only: false,
        }
    }
}

/// Mutable state of one site run.
///
/// Loaded from the output directory at startup so that a re-run resumes:
/// the counter continues from the highest existing prefix and titles
/// already on disk are known duplicates.
#[derive(Debug, Clone)]
pub struct CrawlState {
    pub page: u32,
    /// Highest folder prefix used so far
    pub counter: u32,
    pub duplicates: DuplicateIndex,
}

impl CrawlState {
    pub fn new(start_page: u32, counter: u32, duplicates: DuplicateIndex) -> Self {
        Self {
            page: start_page.max(1),
            counter,
            duplicates,
        }
    }

    /// Reserve the next folder prefix.
    pub fn next_counter(&mut self) -> u32 {
        self.counter += 1;
        self.counter
    }
}

/// Why a crawl ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// An entry older than the cutoff was reached
    CutoffReached,
    /// A listing page had no entries
    EmptyPage,
    /// Too many listing fetches failed in a row
    ConsecutiveErrors,
    /// The configured page limit was reached
    MaxPages,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::CutoffReached => "cutoff date reached",
            Self::EmptyPage => "empty listing page",
            Self::ConsecutiveErrors => "too many consecutive page failures",
            Self::MaxPages => "page limit reached",
        };
        f.write_str(text)
    }
}

/// Summary of one site run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CrawlOutcome {
    pub pages_visited: u32,
    pub entries_seen: usize,
    pub persisted: usize,
    pub duplicates: usize,
    pub failures: usize,
    pub urls_recorded: usize,
    pub attachments_ok: usize,
    pub attachments_failed: usize,
    pub stop_reason: Option<StopReason>,
    /// Folders written during this run
    pub folders: Vec<PathBuf>,
}
