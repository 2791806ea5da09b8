//! Script-less session backed by reqwest.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use super::{BrowserSession, CaptureState, CapturedDownload, InterceptedResponse};
use crate::error::{AppError, Result};
use crate::utils::http::fetch_text;

/// Session that fetches pages over plain HTTP.
///
/// Navigation is a GET; script-driven operations are unavailable.
pub struct HttpSession {
    client: reqwest::Client,
    current_url: String,
    current_html: String,
}

impl HttpSession {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            current_url: "about:blank".to_string(),
            current_html: String::new(),
        }
    }
}

#[async_trait]
impl BrowserSession for HttpSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<String> {
        let html = tokio::time::timeout(timeout, fetch_text(&self.client, url))
            .await
            .map_err(|_| AppError::timeout(format!("navigation to {url}"), timeout.as_secs()))??;
        self.current_url = url.to_string();
        self.current_html = html.clone();
        Ok(html)
    }

    async fn html(&mut self) -> Result<String> {
        Ok(self.current_html.clone())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.current_url.clone())
    }

    fn supports_scripts(&self) -> bool {
        false
    }

    async fn click_link_by_text(
        &mut self,
        _text: &str,
        _timeout: Duration,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    async fn capture_download(
        &mut self,
        _script: &str,
        _staging_dir: &Path,
        _timeout: Duration,
    ) -> Result<CaptureState<CapturedDownload>> {
        Err(AppError::browser("script execution is unavailable over plain HTTP"))
    }

    async fn intercept_download(
        &mut self,
        _script: &str,
        _endpoint: &str,
        _timeout: Duration,
    ) -> Result<CaptureState<InterceptedResponse>> {
        Err(AppError::browser("request interception is unavailable over plain HTTP"))
    }

    fn is_connected(&self) -> bool {
        true
    }

    async fn reconnect(&mut self) -> Result<()> {
        Ok(())
    }
}
