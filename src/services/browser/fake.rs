//! Scripted in-memory session for tests.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

use super::{BrowserSession, CaptureState, CapturedDownload, InterceptedResponse};
use crate::error::{AppError, Result};

/// A download the fake browser "delivers" when a capture is armed.
#[derive(Debug, Clone)]
pub struct FakeDownload {
    pub url: String,
    pub suggested_filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct FakeSession {
    pub pages: HashMap<String, String>,
    /// Link text prefix -> URL reached by clicking it
    pub links: HashMap<String, String>,
    pub download: Option<FakeDownload>,
    pub intercepted: Option<InterceptedResponse>,
    pub connected: bool,
    pub current: String,
    /// Every operation, in order
    pub calls: Vec<String>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self {
            connected: true,
            current: "about:blank".to_string(),
            ..Self::default()
        }
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str, _timeout: Duration) -> Result<String> {
        self.calls.push(format!("navigate {url}"));
        let html = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::crawl(url, "HTTP 404 Not Found"))?;
        self.current = url.to_string();
        Ok(html)
    }

    async fn html(&mut self) -> Result<String> {
        Ok(self.pages.get(&self.current).cloned().unwrap_or_default())
    }

    async fn current_url(&mut self) -> Result<String> {
        Ok(self.current.clone())
    }

    fn supports_scripts(&self) -> bool {
        true
    }

    async fn click_link_by_text(
        &mut self,
        text: &str,
        _timeout: Duration,
    ) -> Result<Option<String>> {
        self.calls.push(format!("click {text}"));
        let target = self
            .links
            .iter()
            .find(|(label, _)| label.starts_with(text))
            .map(|(_, url)| url.clone());
        if let Some(url) = &target {
            self.current = url.clone();
        }
        Ok(target)
    }

    async fn capture_download(
        &mut self,
        script: &str,
        staging_dir: &Path,
        _timeout: Duration,
    ) -> Result<CaptureState<CapturedDownload>> {
        self.calls.push(format!("capture {script}"));
        let state = CaptureState::arm();
        let Some(download) = self.download.clone() else {
            return Ok(state.settle(async { None }, Duration::from_millis(1)).await);
        };

        tokio::fs::create_dir_all(staging_dir).await?;
        let temp_path = staging_dir.join("4f1c-guid");
        tokio::fs::write(&temp_path, &download.bytes).await?;
        let captured = CapturedDownload {
            temp_path,
            url: download.url,
            suggested_filename: download.suggested_filename,
        };
        Ok(state
            .settle(async { Some(captured) }, Duration::from_millis(50))
            .await)
    }

    async fn intercept_download(
        &mut self,
        script: &str,
        endpoint: &str,
        _timeout: Duration,
    ) -> Result<CaptureState<InterceptedResponse>> {
        self.calls.push(format!("intercept {endpoint} {script}"));
        let response = self
            .intercepted
            .clone()
            .filter(|r| r.url.contains(endpoint));
        Ok(CaptureState::arm()
            .settle(async { response }, Duration::from_millis(50))
            .await)
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn reconnect(&mut self) -> Result<()> {
        self.calls.push("reconnect".to_string());
        self.connected = true;
        Ok(())
    }
}
