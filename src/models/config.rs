//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Headless browser settings
    #[serde(default)]
    pub browser: BrowserSettings,

    /// Output layout settings
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.navigation_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.navigation_timeout_secs must be > 0",
            ));
        }
        if self.crawler.download_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.download_timeout_secs must be > 0",
            ));
        }
        if self.crawler.intercept_timeout_secs == 0 {
            return Err(AppError::validation(
                "crawler.intercept_timeout_secs must be > 0",
            ));
        }
        if self.crawler.max_retries == 0 {
            return Err(AppError::validation("crawler.max_retries must be > 0"));
        }
        if self.crawler.max_consecutive_errors == 0 {
            return Err(AppError::validation(
                "crawler.max_consecutive_errors must be > 0",
            ));
        }
        if self.output.root.trim().is_empty() {
            return Err(AppError::validation("output.root is empty"));
        }
        Ok(())
    }
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Page navigation timeout in seconds
    #[serde(default = "defaults::navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Browser download-event wait in seconds
    #[serde(default = "defaults::download_timeout")]
    pub download_timeout_secs: u64,

    /// Network interception window in seconds
    #[serde(default = "defaults::intercept_timeout")]
    pub intercept_timeout_secs: u64,

    /// Delay between announcements in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Delay between listing pages in milliseconds
    #[serde(default = "defaults::page_delay")]
    pub page_delay_ms: u64,

    /// Attempts per navigation before giving up
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Base delay for linear retry backoff in milliseconds
    #[serde(default = "defaults::retry_base_delay")]
    pub retry_base_delay_ms: u64,

    /// Consecutive listing-page failures that end the crawl
    #[serde(default = "defaults::max_consecutive_errors")]
    pub max_consecutive_errors: u32,

    /// Optional upper bound on listing pages per run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,

    /// Smallest response body accepted as a real attachment
    #[serde(default = "defaults::min_attachment_bytes")]
    pub min_attachment_bytes: usize,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            navigation_timeout_secs: defaults::navigation_timeout(),
            download_timeout_secs: defaults::download_timeout(),
            intercept_timeout_secs: defaults::intercept_timeout(),
            request_delay_ms: defaults::request_delay(),
            page_delay_ms: defaults::page_delay(),
            max_retries: defaults::max_retries(),
            retry_base_delay_ms: defaults::retry_base_delay(),
            max_consecutive_errors: defaults::max_consecutive_errors(),
            max_pages: None,
            min_attachment_bytes: defaults::min_attachment_bytes(),
        }
    }
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout_secs)
    }

    pub fn intercept_timeout(&self) -> Duration {
        Duration::from_secs(self.intercept_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn page_delay(&self) -> Duration {
        Duration::from_millis(self.page_delay_ms)
    }

    /// Retry policy for navigations and listing fetches.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

/// Bounded retry with linear backoff (`base_delay × attempt`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the given (1-based) failed attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Headless browser settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserSettings {
    /// Drive a real browser; when false only plain HTTP is used
    #[serde(default = "defaults::browser_enabled")]
    pub enabled: bool,

    /// Explicit Chromium executable path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executable: Option<String>,

    /// Run without a visible window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// Extra command-line switches passed to the browser
    #[serde(default = "defaults::browser_args")]
    pub args: Vec<String>,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            enabled: defaults::browser_enabled(),
            executable: None,
            headless: defaults::headless(),
            args: defaults::browser_args(),
        }
    }
}

/// Output layout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root directory; each site gets `{root}/{site_code}`
    #[serde(default = "defaults::output_root")]
    pub root: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: defaults::output_root(),
        }
    }
}

mod defaults {
    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; gosi-crawler/0.1; +public notice archiver)".into()
    }
    pub fn navigation_timeout() -> u64 {
        30
    }
    pub fn download_timeout() -> u64 {
        60
    }
    pub fn intercept_timeout() -> u64 {
        35
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn page_delay() -> u64 {
        1000
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_base_delay() -> u64 {
        2000
    }
    pub fn max_consecutive_errors() -> u32 {
        3
    }
    pub fn min_attachment_bytes() -> usize {
        100
    }

    // Browser defaults
    pub fn browser_enabled() -> bool {
        true
    }
    pub fn headless() -> bool {
        true
    }
    pub fn browser_args() -> Vec<String> {
        vec![
            "--disable-gpu".into(),
            "--no-sandbox".into(),
            "--disable-dev-shm-usage".into(),
        ]
    }

    // Output defaults
    pub fn output_root() -> String {
        "output".into()
    }
}
