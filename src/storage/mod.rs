//! Output persistence.
//!
//! Every announcement becomes a numbered folder under the site directory.
//! Folder names are the only crawl state kept between runs.
//!
//! ## Directory Structure
//!
//! ```text
//! {root}/
//! └── {site}/
//!     ├── 001_첫 번째 공고/
//!     │   ├── content.md
//!     │   └── attachments/
//!     │       └── 공고문.hwp
//!     ├── 002_두 번째 공고/
//!     │   └── content.md
//!     ├── .003_작성 중.partial/   # staged, renamed into place when complete
//!     └── urls_2025-09-30.json    # URL-extraction mode
//! ```

mod document;
pub mod local;

pub use document::AnnouncementDocument;
pub use local::{ExistingOutput, LocalStorage, StagedAnnouncement};

/// Name of the summary file inside an announcement folder.
pub const CONTENT_FILE: &str = "content.md";

/// Sub-directory holding downloaded attachments.
pub const ATTACHMENTS_DIR: &str = "attachments";
