//! Browser session abstraction.
//!
//! The crawl engine touches live pages only through [`BrowserSession`].
//! [`HttpSession`] serves plain server-rendered portals; `ChromiumSession`
//! (feature `browser`) drives a headless Chromium for script-driven
//! navigation and downloads.

mod capture;
#[cfg(feature = "browser")]
mod chromium;
#[cfg(test)]
pub(crate) mod fake;
mod http;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

pub use capture::CaptureState;
#[cfg(feature = "browser")]
pub use chromium::ChromiumSession;
pub use http::HttpSession;

/// A file delivered through the browser's own download mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedDownload {
    /// Where the browser left the file
    pub temp_path: PathBuf,
    /// URL the browser downloaded from
    pub url: String,
    pub suggested_filename: String,
}

/// A download response observed while intercepting page requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedResponse {
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    /// Raw `Content-Disposition` bytes
    pub content_disposition: Option<Vec<u8>>,
    pub body: Vec<u8>,
}

/// A single page context reused for the whole crawl.
#[async_trait]
pub trait BrowserSession: Send {
    /// Navigate to `url` and return the loaded page's HTML.
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<String>;

    /// HTML of the current page.
    async fn html(&mut self) -> Result<String>;

    /// URL of the current page.
    async fn current_url(&mut self) -> Result<String>;

    /// Whether page scripts can be executed.
    fn supports_scripts(&self) -> bool;

    /// Click the first link whose text starts with `text` and return the
    /// URL of the page it leads to, or `None` if nothing was clicked or
    /// the page did not change.
    async fn click_link_by_text(&mut self, text: &str, timeout: Duration)
    -> Result<Option<String>>;

    /// Run `script` with downloads funnelled into `staging_dir` and wait
    /// for the browser to finish a download.
    async fn capture_download(
        &mut self,
        script: &str,
        staging_dir: &Path,
        timeout: Duration,
    ) -> Result<CaptureState<CapturedDownload>>;

    /// Run `script` while intercepting requests and return the first
    /// completed response whose URL contains `endpoint`.
    async fn intercept_download(
        &mut self,
        script: &str,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<CaptureState<InterceptedResponse>>;

    /// Whether the underlying connection is still alive.
    fn is_connected(&self) -> bool;

    /// Re-create the session after a crash or disconnect.
    async fn reconnect(&mut self) -> Result<()>;

    /// Release the underlying browser, if any.
    async fn close(&mut self) {}
}
