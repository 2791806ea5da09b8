// src/services/attachments/mod.rs

//! Attachment acquisition.
//!
//! Each [`AttachmentRef`] is classified once, then fetched through the
//! cascade that fits its source. Whatever happens, the caller receives
//! exactly one [`AttachmentResult`] per reference; no error escapes.

mod fetch;
mod filename;
mod source;

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::{
    AttachmentFailure, AttachmentRef, AttachmentResult, CrawlerConfig, DownloadStrategy,
    RetryPolicy, SiteProfile,
};
use crate::services::browser::{BrowserSession, CaptureState};

pub use fetch::{HiddenForm, parse_hidden_form};
pub use filename::{choose as choose_filename, from_disposition};
pub use source::{AttachmentSource, PatternSet, ScriptedCall};

/// Scratch directory for browser downloads, inside the destination.
const STAGING_DIR: &str = ".downloading";

/// Retrieves attachments for one site.
pub struct AttachmentAcquirer {
    client: reqwest::Client,
    patterns: PatternSet,
    download_timeout: Duration,
    intercept_timeout: Duration,
    min_bytes: usize,
    retry: RetryPolicy,
}

impl AttachmentAcquirer {
    pub fn new(client: reqwest::Client, profile: &SiteProfile, config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client,
            patterns: PatternSet::new(profile)?,
            download_timeout: config.download_timeout(),
            intercept_timeout: config.intercept_timeout(),
            min_bytes: config.min_attachment_bytes,
            retry: config.retry_policy(),
        })
    }

    /// Run an HTTP download step, retrying transient failures with backoff.
    async fn with_retry<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.retry.max_attempts => {
                    let delay = self.retry.backoff(attempt);
                    log::warn!(
                        "{} failed (attempt {}/{}), retrying in {:?}: {}",
                        label,
                        attempt,
                        self.retry.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub fn classify(&self, attachment: &AttachmentRef, page_url: &str) -> AttachmentSource {
        self.patterns.classify(attachment, page_url)
    }

    /// Acquire every attachment of a page, one at a time.
    pub async fn acquire_all(
        &self,
        attachments: &[AttachmentRef],
        page_url: &str,
        session: &mut dyn BrowserSession,
        dest_dir: &Path,
    ) -> Vec<AttachmentResult> {
        let mut results = Vec::with_capacity(attachments.len());
        for attachment in attachments {
            let result = self.acquire(attachment, page_url, session, dest_dir).await;
            if result.success {
                log::info!(
                    "    ✓ {} ({} bytes, {})",
                    result.display_name(),
                    result.size,
                    result
                        .strategy
                        .map(|s| s.to_string())
                        .unwrap_or_default()
                );
            } else {
                log::warn!(
                    "    ✗ {}: {}",
                    attachment.name,
                    result.error.as_deref().unwrap_or("unknown error")
                );
            }
            results.push(result);
        }
        results
    }

    /// Acquire one attachment into `dest_dir`.
    pub async fn acquire(
        &self,
        attachment: &AttachmentRef,
        page_url: &str,
        session: &mut dyn BrowserSession,
        dest_dir: &Path,
    ) -> AttachmentResult {
        let name = attachment.name.as_str();
        match self.classify(attachment, page_url) {
            AttachmentSource::Direct { url } => {
                let target = url.as_str();
                let fetched = self
                    .with_retry(target, || {
                        fetch::stream_get(
                            &self.client,
                            target,
                            page_url,
                            name,
                            dest_dir,
                            self.download_timeout,
                        )
                    })
                    .await;
                match fetched {
                    Ok((path, size)) => AttachmentResult::success(
                        name,
                        path,
                        Some(url),
                        DownloadStrategy::DirectGet,
                        size,
                    ),
                    Err(e) => {
                        AttachmentResult::failure(name, Some(url), AttachmentFailure::Exhausted, e.to_string())
                    }
                }
            }
            AttachmentSource::TokenExchange { url } => {
                let target = url.as_str();
                let saved = async {
                    let payload = self
                        .with_retry(target, || {
                            fetch::token_exchange(
                                &self.client,
                                target,
                                page_url,
                                self.download_timeout,
                                self.min_bytes,
                            )
                        })
                        .await?;
                    fetch::save_payload(&payload, name, dest_dir).await
                }
                .await;
                match saved {
                    Ok((path, size)) => AttachmentResult::success(
                        name,
                        path,
                        Some(url),
                        DownloadStrategy::TokenExchange,
                        size,
                    ),
                    Err(e) => {
                        AttachmentResult::failure(name, Some(url), AttachmentFailure::Exhausted, e.to_string())
                    }
                }
            }
            AttachmentSource::Scripted(call) => {
                self.acquire_scripted(name, &call, page_url, session, dest_dir)
                    .await
            }
            AttachmentSource::Unsupported { script } => {
                log::debug!("Unsupported attachment script: {}", script);
                AttachmentResult::failure(
                    name,
                    None,
                    AttachmentFailure::UnsupportedPattern,
                    format!("no known download pattern matches '{script}'"),
                )
            }
            AttachmentSource::NoSource => AttachmentResult::failure(
                name,
                None,
                AttachmentFailure::NoSource,
                "attachment has neither a URL nor a handler",
            ),
        }
    }

    /// The scripted cascade: download event, interception, POST form,
    /// then a GET of the synthesized URL.
    async fn acquire_scripted(
        &self,
        name: &str,
        call: &ScriptedCall,
        page_url: &str,
        session: &mut dyn BrowserSession,
        dest_dir: &Path,
    ) -> AttachmentResult {
        // Prefer the name embedded in the call over the link text.
        let declared = if call.name.trim().is_empty() {
            name
        } else {
            call.name.as_str()
        };
        let mut errors: Vec<String> = Vec::new();

        if session.supports_scripts() {
            match self.via_download_event(declared, call, session, dest_dir).await {
                Ok(Some((path, size, observed))) => {
                    return AttachmentResult::success(
                        name,
                        path,
                        call.synthesized_url.clone().or(Some(observed)),
                        DownloadStrategy::DownloadEvent,
                        size,
                    );
                }
                Ok(None) => errors.push(format!(
                    "download event: timed out after {}s",
                    self.download_timeout.as_secs()
                )),
                Err(e) => errors.push(format!("download event: {e}")),
            }

            match self.via_interception(declared, call, session, dest_dir).await {
                Ok(Some((path, size, observed))) => {
                    return AttachmentResult::success(
                        name,
                        path,
                        call.synthesized_url.clone().or(Some(observed)),
                        DownloadStrategy::NetworkIntercept,
                        size,
                    );
                }
                Ok(None) => errors.push(format!(
                    "interception: no download response within {}s",
                    self.intercept_timeout.as_secs()
                )),
                Err(e) => errors.push(format!("interception: {e}")),
            }
        }

        if let Some(form) = &call.post {
            let fields = vec![
                (form.name_field.clone(), call.name.clone()),
                (form.server_field.clone(), call.server.clone()),
                (form.path_field.clone(), call.path.clone()),
            ];
            let saved = async {
                let endpoint = crate::utils::url::resolve(page_url, &form.endpoint)
                    .ok_or_else(|| AppError::download(format!("bad endpoint {}", form.endpoint)))?;
                let payload = self
                    .with_retry(&endpoint, || {
                        fetch::post_payload(
                            &self.client,
                            &endpoint,
                            page_url,
                            &fields,
                            self.download_timeout,
                            self.min_bytes,
                        )
                    })
                    .await?;
                fetch::save_payload(&payload, declared, dest_dir).await
            }
            .await;
            match saved {
                Ok((path, size)) => {
                    return AttachmentResult::success(
                        name,
                        path,
                        call.synthesized_url.clone(),
                        DownloadStrategy::PostForm,
                        size,
                    );
                }
                Err(e) => errors.push(format!("post form: {e}")),
            }
        }

        if let Some(url) = &call.synthesized_url {
            let saved = async {
                let payload = self
                    .with_retry(url, || {
                        fetch::get_payload(
                            &self.client,
                            url,
                            page_url,
                            self.download_timeout,
                            self.min_bytes,
                        )
                    })
                    .await?;
                fetch::save_payload(&payload, declared, dest_dir).await
            }
            .await;
            match saved {
                Ok((path, size)) => {
                    return AttachmentResult::success(
                        name,
                        path,
                        Some(url.clone()),
                        DownloadStrategy::DirectGet,
                        size,
                    );
                }
                Err(e) => errors.push(format!("synthesized GET: {e}")),
            }
        }

        if errors.is_empty() {
            errors.push("no strategy applies without a script-capable session".to_string());
        }
        AttachmentResult::failure(
            name,
            call.synthesized_url.clone(),
            AttachmentFailure::Exhausted,
            errors.join("; "),
        )
    }

    /// Run the call and wait for the browser to deliver a file.
    async fn via_download_event(
        &self,
        declared: &str,
        call: &ScriptedCall,
        session: &mut dyn BrowserSession,
        dest_dir: &Path,
    ) -> Result<Option<(std::path::PathBuf, u64, String)>> {
        let staging = dest_dir.join(STAGING_DIR);
        let outcome = session
            .capture_download(&call.script, &staging, self.download_timeout)
            .await;

        let adopted = match outcome {
            Ok(CaptureState::Fired(download)) => {
                let name = choose_filename(declared, Some(&download.suggested_filename));
                fetch::adopt_file(&download.temp_path, &name, dest_dir)
                    .await
                    .map(|(path, size)| Some((path, size, download.url)))
            }
            Ok(_) => Ok(None),
            Err(e) => Err(e),
        };
        let _ = tokio::fs::remove_dir_all(&staging).await;

        match adopted? {
            Some((path, 0, _)) => {
                let _ = tokio::fs::remove_file(&path).await;
                Err(AppError::download("browser delivered an empty file"))
            }
            other => Ok(other),
        }
    }

    /// Re-run the call while intercepting the download endpoint.
    async fn via_interception(
        &self,
        declared: &str,
        call: &ScriptedCall,
        session: &mut dyn BrowserSession,
        dest_dir: &Path,
    ) -> Result<Option<(std::path::PathBuf, u64, String)>> {
        let state = session
            .intercept_download(&call.script, &call.endpoint, self.intercept_timeout)
            .await?;
        let Some(response) = state.into_fired() else {
            return Ok(None);
        };

        fetch::validate_body(
            response.content_type.as_deref(),
            response.status,
            response.body.len(),
            self.min_bytes,
        )?;
        let payload = fetch::Payload {
            url: response.url,
            content_type: response.content_type,
            disposition: response.content_disposition,
            body: response.body,
        };
        let (path, size) = fetch::save_payload(&payload, declared, dest_dir).await?;
        Ok(Some((path, size, payload.url)))
    }
}
