//! Service layer for the crawler application.
//!
//! This module contains the engine's building blocks:
//! - Date normalization (`dates`)
//! - Duplicate suppression (`DuplicateIndex`)
//! - Detail URL resolution (`DetailUrlResolver`)
//! - Page extraction (`ContentExtractor`)
//! - Attachment retrieval (`AttachmentAcquirer`)
//! - Browser sessions (`BrowserSession`)
//! - Failure and URL collaborators

pub mod attachments;
pub mod browser;
pub mod collaborators;
pub mod dates;
mod dedup;
pub mod extractor;
mod resolver;

pub use attachments::AttachmentAcquirer;
pub use browser::{BrowserSession, HttpSession};
#[cfg(feature = "browser")]
pub use browser::ChromiumSession;
pub use collaborators::{
    FailureRecord, FailureSink, LogFailureSink, MemoryFailureSink, MemoryUrlRegistry, UrlRecord,
    UrlRegistry,
};
pub use dedup::DuplicateIndex;
pub use extractor::ContentExtractor;
pub use resolver::DetailUrlResolver;
