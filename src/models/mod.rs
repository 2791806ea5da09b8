// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod announcement;
mod attachment;
mod config;
mod selectors;
mod site;
mod state;

// Re-export all public types
pub use announcement::{AnnouncementDate, AttachmentRef, DetailContent, ListingEntry};
pub use attachment::{AttachmentFailure, AttachmentResult, DownloadStrategy};
pub use config::{BrowserSettings, Config, CrawlerConfig, OutputConfig, RetryPolicy};
pub use selectors::{DetailSelectors, ListSelectors};
pub use site::{
    AttachmentPattern, Pagination, PostForm, SiteProfile, TokenExchange,
    default_attachment_patterns,
};
pub use state::{CrawlOptions, CrawlOutcome, CrawlState, Cutoff, StopReason};
