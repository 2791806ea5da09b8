// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, HeaderMap};

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
///
/// Cookies are kept so that session-bound download endpoints accept the
/// requests that follow a page visit.
pub fn create_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.navigation_timeout_secs))
        .cookie_store(true)
        .build()?;
    Ok(client)
}

/// Fetch a page as text, failing on non-success status codes.
pub async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(AppError::crawl(url, format!("HTTP {status}")));
    }
    Ok(response.text().await?)
}

/// Lower-cased media type of a response, without parameters.
pub fn content_type(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
}

/// Raw `Content-Disposition` header bytes.
pub fn content_disposition(headers: &HeaderMap) -> Option<Vec<u8>> {
    headers
        .get(CONTENT_DISPOSITION)
        .map(|v| v.as_bytes().to_vec())
}
