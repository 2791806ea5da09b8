//! Chromium-backed session using chromiumoxide.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{
    DownloadProgressState, EventDownloadProgress, EventDownloadWillBegin,
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::cdp::browser_protocol::fetch::{
    self, ContinueRequestParams, EventRequestPaused, GetResponseBodyParams, HeaderEntry,
    RequestPattern, RequestStage,
};
use chromiumoxide::page::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;

use super::{BrowserSession, CaptureState, CapturedDownload, InterceptedResponse};
use crate::error::{AppError, Result};
use crate::models::BrowserSettings;

/// Protocol-level timeout for individual CDP commands.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Headless Chromium with a single reused page.
pub struct ChromiumSession {
    settings: BrowserSettings,
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    /// Launch a browser and open the page used for the whole crawl.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let (browser, page, handler) = Self::start(settings).await?;
        Ok(Self {
            settings: settings.clone(),
            browser,
            page,
            handler,
        })
    }

    async fn start(settings: &BrowserSettings) -> Result<(Browser, Page, JoinHandle<()>)> {
        let mut builder = BrowserConfig::builder().request_timeout(REQUEST_TIMEOUT);
        if let Some(path) = &settings.executable {
            builder = builder.chrome_executable(PathBuf::from(path));
        }
        if !settings.headless {
            builder = builder.with_head();
        }
        for arg in &settings.args {
            builder = builder.arg(arg.clone());
        }
        let config = builder.build().map_err(AppError::browser)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| AppError::browser(format!("failed to launch Chromium: {e}")))?;

        // The handler drives the CDP connection; it ends when the browser goes away.
        let handle = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("CDP handler event error: {}", e);
                }
            }
            log::warn!("Browser connection closed");
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| AppError::browser(format!("failed to open page: {e}")))?;

        Ok((browser, page, handle))
    }

    /// Evaluate a script, discarding its value.
    async fn run_script(&self, script: &str) -> Result<()> {
        self.page
            .evaluate(script)
            .await
            .map_err(|e| AppError::browser(format!("script failed: {e}")))?;
        Ok(())
    }
}

fn header_value(headers: Option<&Vec<HeaderEntry>>, name: &str) -> Option<String> {
    headers?
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.clone())
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<String> {
        tokio::time::timeout(timeout, self.page.goto(url))
            .await
            .map_err(|_| AppError::timeout(format!("navigation to {url}"), timeout.as_secs()))?
            .map_err(|e| AppError::browser(format!("navigation to {url} failed: {e}")))?;
        self.html().await
    }

    async fn html(&mut self) -> Result<String> {
        self.page.content().await.map_err(AppError::browser)
    }

    async fn current_url(&mut self) -> Result<String> {
        let url = self.page.url().await.map_err(AppError::browser)?;
        Ok(url.unwrap_or_default())
    }

    fn supports_scripts(&self) -> bool {
        true
    }

    async fn click_link_by_text(
        &mut self,
        text: &str,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let before = self.current_url().await?;
        let needle = serde_json::to_string(text)?;
        let script = format!(
            r#"(() => {{
                const needle = {needle};
                const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
                const link = Array.from(document.querySelectorAll('a'))
                    .find((a) => norm(a.textContent).startsWith(needle));
                if (!link) return false;
                link.click();
                return true;
            }})()"#
        );

        let clicked: bool = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(AppError::browser)?
            .into_value()
            .unwrap_or(false);
        if !clicked {
            return Ok(None);
        }

        if tokio::time::timeout(timeout, self.page.wait_for_navigation())
            .await
            .is_err()
        {
            log::debug!("No navigation within {}s after clicking '{}'", timeout.as_secs(), text);
        }

        let after = self.current_url().await?;
        Ok((after != before && !after.is_empty()).then_some(after))
    }

    async fn capture_download(
        &mut self,
        script: &str,
        staging_dir: &Path,
        timeout: Duration,
    ) -> Result<CaptureState<CapturedDownload>> {
        tokio::fs::create_dir_all(staging_dir).await?;

        let behavior = SetDownloadBehaviorParams::builder()
            .behavior(SetDownloadBehaviorBehavior::AllowAndName)
            .download_path(staging_dir.to_string_lossy().into_owned())
            .events_enabled(true)
            .build()
            .map_err(AppError::browser)?;
        self.browser
            .execute(behavior)
            .await
            .map_err(AppError::browser)?;

        let mut begins = self
            .browser
            .event_listener::<EventDownloadWillBegin>()
            .await
            .map_err(AppError::browser)?;
        let mut progress = self
            .browser
            .event_listener::<EventDownloadProgress>()
            .await
            .map_err(AppError::browser)?;

        let state = CaptureState::arm();
        self.run_script(script).await?;

        let event = async {
            let begin = begins.next().await?;
            while let Some(update) = progress.next().await {
                if update.guid != begin.guid {
                    continue;
                }
                match update.state {
                    DownloadProgressState::Completed => {
                        return Some(CapturedDownload {
                            // AllowAndName stores the file under its guid.
                            temp_path: staging_dir.join(&begin.guid),
                            url: begin.url.clone(),
                            suggested_filename: begin.suggested_filename.clone(),
                        });
                    }
                    DownloadProgressState::Canceled => return None,
                    _ => {}
                }
            }
            None
        };

        Ok(state.settle(event, timeout).await)
    }

    async fn intercept_download(
        &mut self,
        script: &str,
        endpoint: &str,
        timeout: Duration,
    ) -> Result<CaptureState<InterceptedResponse>> {
        let pattern = RequestPattern::builder()
            .url_pattern(format!("*{endpoint}*"))
            .request_stage(RequestStage::Response)
            .build();
        self.page
            .execute(fetch::EnableParams::builder().patterns(vec![pattern]).build())
            .await
            .map_err(AppError::browser)?;

        let mut paused = self
            .page
            .event_listener::<EventRequestPaused>()
            .await
            .map_err(AppError::browser)?;

        let state = CaptureState::arm();
        self.run_script(script).await?;

        let page = self.page.clone();
        let event = async {
            while let Some(event) = paused.next().await {
                let request_id = event.request_id.clone();
                let Some(status) = event.response_status_code else {
                    let _ = page.execute(ContinueRequestParams::new(request_id)).await;
                    continue;
                };

                let body = page
                    .execute(GetResponseBodyParams::new(request_id.clone()))
                    .await;
                let _ = page.execute(ContinueRequestParams::new(request_id)).await;

                let Ok(body) = body else {
                    continue;
                };
                let bytes = if body.result.base64_encoded {
                    match STANDARD.decode(&body.result.body) {
                        Ok(bytes) => bytes,
                        Err(_) => continue,
                    }
                } else {
                    body.result.body.clone().into_bytes()
                };

                let headers = event.response_headers.as_ref();
                return Some(InterceptedResponse {
                    url: event.request.url.clone(),
                    status: u16::try_from(status).unwrap_or(0),
                    content_type: header_value(headers, "content-type"),
                    content_disposition: header_value(headers, "content-disposition")
                        .map(String::into_bytes),
                    body: bytes,
                });
            }
            None
        };

        let settled = state.settle(event, timeout).await;
        if let Err(e) = self.page.execute(fetch::DisableParams::default()).await {
            log::debug!("Failed to disable interception: {}", e);
        }
        Ok(settled)
    }

    fn is_connected(&self) -> bool {
        !self.handler.is_finished()
    }

    async fn reconnect(&mut self) -> Result<()> {
        log::warn!("Reinitializing browser session");
        self.handler.abort();
        let (browser, page, handler) = Self::start(&self.settings).await?;
        self.browser = browser;
        self.page = page;
        self.handler = handler;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.browser.close().await {
            log::debug!("Browser close failed: {}", e);
        }
        self.handler.abort();
    }
}
