// src/pipeline/crawl.rs

//! The date-bounded pagination loop.
//!
//! ```text
//! FETCH_LIST ──► for each entry:
//!                  DATE_CHECK ─► DUPLICATE_CHECK ─► RESOLVE ─► FETCH_DETAIL
//!                  ─► DATE_RECHECK ─► PERSIST
//!            ──► ADVANCE_PAGE ──► FETCH_LIST ...
//! ```
//!
//! The loop stops on the first stale date, an empty page, the page limit,
//! or too many consecutive listing failures. Per-announcement errors are
//! handed to the [`FailureSink`] and never stop the loop.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;

use crate::error::{AppError, Result};
use crate::models::{
    AnnouncementDate, CrawlOptions, CrawlOutcome, CrawlState, CrawlerConfig, DetailContent,
    ListingEntry, SiteProfile, StopReason,
};
use crate::services::{
    AttachmentAcquirer, BrowserSession, ContentExtractor, DetailUrlResolver, FailureRecord,
    FailureSink, LogFailureSink, MemoryUrlRegistry, UrlRecord, UrlRegistry, dates,
};
use crate::storage::{AnnouncementDocument, ExistingOutput, LocalStorage};
use crate::utils::console;

/// What happened to one listing entry.
#[derive(Debug)]
enum EntryOutcome {
    Persisted {
        dir: PathBuf,
        attachments_ok: usize,
        attachments_failed: usize,
    },
    /// The detail page's own date is before the cutoff
    Stale,
    UrlRecorded(UrlRecord),
    UrlSeen,
}

/// Crawls one site, page by page.
///
/// Listings are assumed to be newest first: one entry dated before the
/// cutoff ends the crawl. Pinned or out-of-order rows are not detected.
pub struct PaginationCrawler {
    profile: SiteProfile,
    config: CrawlerConfig,
    options: CrawlOptions,
    extractor: ContentExtractor,
    resolver: DetailUrlResolver,
    acquirer: AttachmentAcquirer,
    storage: LocalStorage,
    failures: Arc<dyn FailureSink>,
    registry: Arc<dyn UrlRegistry>,
}

impl PaginationCrawler {
    pub fn new(
        profile: SiteProfile,
        config: CrawlerConfig,
        options: CrawlOptions,
        client: reqwest::Client,
        storage: LocalStorage,
    ) -> Result<Self> {
        let acquirer = AttachmentAcquirer::new(client, &profile, &config)?;
        Ok(Self {
            extractor: ContentExtractor::new(profile.listing.clone(), profile.detail.clone()),
            resolver: DetailUrlResolver::new(&profile),
            acquirer,
            profile,
            config,
            options,
            storage,
            failures: Arc::new(LogFailureSink),
            registry: Arc::new(MemoryUrlRegistry::default()),
        })
    }

    pub fn with_failure_sink(mut self, sink: Arc<dyn FailureSink>) -> Self {
        self.failures = sink;
        self
    }

    pub fn with_url_registry(mut self, registry: Arc<dyn UrlRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Run the crawl to completion.
    ///
    /// Only a failure to read the output directory is returned as an
    /// error; every stop condition ends in an `Ok` outcome.
    pub async fn run(&self, session: &mut dyn BrowserSession) -> Result<CrawlOutcome> {
        let existing = self.storage.scan().await?;
        let mut duplicates = existing.duplicate_index();
        if self.options.force && duplicates.persisted_len() > 0 {
            log::info!(
                "Force mode: {} existing folder(s) may be overwritten",
                duplicates.persisted_len()
            );
            duplicates.forget_persisted();
        }
        let mut state = CrawlState::new(self.options.start_page, existing.max_counter, duplicates);

        let batch_date = Local::now().date_naive().format("%Y-%m-%d").to_string();
        let mut outcome = CrawlOutcome::default();
        let mut url_records: Vec<UrlRecord> = Vec::new();
        let mut consecutive_errors: u32 = 0;

        console::header(&format!(
            "{} from page {} (cutoff: {})",
            self.profile.code,
            state.page,
            self.options
                .cutoff
                .threshold()
                .map_or_else(|| "none".to_string(), |d| d.to_string())
        ));

        'pages: loop {
            if self
                .config
                .max_pages
                .is_some_and(|max| outcome.pages_visited >= max)
            {
                outcome.stop_reason = Some(StopReason::MaxPages);
                break;
            }

            // FETCH_LIST
            let page_url = self
                .profile
                .pagination
                .page_url(&self.profile.list_url, state.page)?;
            let entries = match self.fetch_listing(session, &page_url).await {
                Ok(entries) => {
                    consecutive_errors = 0;
                    entries
                }
                Err(e) => {
                    consecutive_errors += 1;
                    log::warn!(
                        "Listing page {} failed ({}/{}): {}",
                        state.page,
                        consecutive_errors,
                        self.config.max_consecutive_errors,
                        e
                    );
                    if consecutive_errors >= self.config.max_consecutive_errors {
                        outcome.stop_reason = Some(StopReason::ConsecutiveErrors);
                        break;
                    }
                    tokio::time::sleep(self.config.retry_policy().backoff(consecutive_errors)).await;
                    continue;
                }
            };
            outcome.pages_visited += 1;
            console::step(state.page, &format!("{} entries", entries.len()));

            if entries.is_empty() {
                outcome.stop_reason = Some(StopReason::EmptyPage);
                break;
            }

            for entry in &entries {
                outcome.entries_seen += 1;

                // DATE_CHECK
                let list_date = dates::normalize(&entry.raw_date_text);
                if self.options.cutoff.is_stale(list_date) {
                    log::info!(
                        "Reached '{}' dated {}; stopping",
                        entry.title,
                        entry.raw_date_text
                    );
                    outcome.stop_reason = Some(StopReason::CutoffReached);
                    break 'pages;
                }

                // DUPLICATE_CHECK
                if state.duplicates.contains(&entry.title) {
                    log::debug!("Skipping duplicate '{}'", entry.title);
                    outcome.duplicates += 1;
                    continue;
                }
                state.duplicates.insert(&entry.title);

                match self
                    .process_entry(session, &mut state, &existing, entry, &page_url, list_date, &batch_date)
                    .await
                {
                    Ok(EntryOutcome::Persisted {
                        dir,
                        attachments_ok,
                        attachments_failed,
                    }) => {
                        outcome.persisted += 1;
                        outcome.attachments_ok += attachments_ok;
                        outcome.attachments_failed += attachments_failed;
                        console::sub_item(&format!("Saved {}", dir.display()));
                        outcome.folders.push(dir);
                    }
                    Ok(EntryOutcome::Stale) => {
                        log::info!("Detail date of '{}' is before the cutoff; stopping", entry.title);
                        outcome.stop_reason = Some(StopReason::CutoffReached);
                        break 'pages;
                    }
                    Ok(EntryOutcome::UrlRecorded(record)) => {
                        outcome.urls_recorded += 1;
                        url_records.push(record);
                    }
                    Ok(EntryOutcome::UrlSeen) => outcome.duplicates += 1,
                    Err(e) => {
                        outcome.failures += 1;
                        log::warn!("Failed '{}': {}", entry.title, e);
                        self.record_failure(entry, &page_url, &e);
                    }
                }

                tokio::time::sleep(self.config.request_delay()).await;
            }

            state.page += 1;
            tokio::time::sleep(self.config.page_delay()).await;
        }

        if self.options.urls_only && !url_records.is_empty() {
            let file_name = format!("urls_{batch_date}.json");
            match self.storage.write_json(&file_name, &url_records).await {
                Ok(path) => log::info!("Wrote {} URL(s) to {}", url_records.len(), path.display()),
                Err(e) => log::warn!("Could not write {}: {}", file_name, e),
            }
        }

        Ok(outcome)
    }

    async fn fetch_listing(
        &self,
        session: &mut dyn BrowserSession,
        page_url: &str,
    ) -> Result<Vec<ListingEntry>> {
        self.ensure_session(session).await?;
        let html = session
            .navigate(page_url, self.config.navigation_timeout())
            .await?;
        self.extractor.listing(&html)
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_entry(
        &self,
        session: &mut dyn BrowserSession,
        state: &mut CrawlState,
        existing: &ExistingOutput,
        entry: &ListingEntry,
        page_url: &str,
        list_date: Option<AnnouncementDate>,
        batch_date: &str,
    ) -> Result<EntryOutcome> {
        self.ensure_session(session).await?;
        let detail_url = self
            .resolver
            .resolve(entry, session, page_url, self.config.navigation_timeout())
            .await?;

        if self.options.urls_only {
            let record = UrlRecord {
                site_code: self.profile.code.clone(),
                title: entry.title.clone(),
                list_url: page_url.to_string(),
                detail_url,
                list_date: list_date.map(|d| d.to_string()),
                batch_date: batch_date.to_string(),
            };
            if self.registry.contains(&record) {
                return Ok(EntryOutcome::UrlSeen);
            }
            self.registry.record(record.clone());
            return Ok(EntryOutcome::UrlRecorded(record));
        }

        // FETCH_DETAIL
        let detail = self.fetch_detail(session, &detail_url).await?;

        // DATE_RECHECK
        if self.options.cutoff.is_stale(detail.date) {
            return Ok(EntryOutcome::Stale);
        }

        // PERSIST
        let counter = match existing.counter_for(&entry.title) {
            Some(counter) if self.options.force => counter,
            _ => state.next_counter(),
        };
        let staged = self.storage.stage(counter, &entry.title).await?;
        let attachments = self
            .acquirer
            .acquire_all(&detail.attachments, &detail.url, session, &staged.attachments_dir())
            .await;
        let attachments_ok = attachments.iter().filter(|a| a.success).count();
        let attachments_failed = attachments.len() - attachments_ok;

        let mut document = AnnouncementDocument {
            title: entry.title.clone(),
            url: detail.url,
            date: detail.date.or(list_date),
            body: detail.body,
            attachments,
        };
        let dir = match self.storage.commit(&staged, &mut document).await {
            Ok(dir) => dir,
            Err(e) => {
                self.storage.discard(&staged).await;
                return Err(e);
            }
        };

        Ok(EntryOutcome::Persisted {
            dir,
            attachments_ok,
            attachments_failed,
        })
    }

    /// Navigate to a detail page, retrying transient failures.
    async fn fetch_detail(
        &self,
        session: &mut dyn BrowserSession,
        url: &str,
    ) -> Result<DetailContent> {
        let policy = self.config.retry_policy();
        let mut attempt = 0;
        loop {
            attempt += 1;
            self.ensure_session(session).await?;
            match self
                .extractor
                .extract(session, url, self.config.navigation_timeout())
                .await
            {
                Ok(detail) => return Ok(detail),
                Err(e) if e.is_retryable() && attempt < policy.max_attempts => {
                    let delay = policy.backoff(attempt);
                    log::warn!(
                        "Detail fetch failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt,
                        policy.max_attempts,
                        delay,
                        e
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Reconnect a session that has gone away.
    async fn ensure_session(&self, session: &mut dyn BrowserSession) -> Result<()> {
        if session.is_connected() {
            return Ok(());
        }
        log::warn!("Browser session lost; reconnecting");
        session.reconnect().await
    }

    fn record_failure(&self, entry: &ListingEntry, page_url: &str, error: &AppError) {
        let detail_url = match error {
            AppError::Crawl { context, .. } if context.starts_with("http") => Some(context.clone()),
            _ => None,
        };
        self.failures.record(FailureRecord {
            site_code: self.profile.code.clone(),
            title: entry.title.clone(),
            url: page_url.to_string(),
            detail_url,
            error_type: error.kind().to_string(),
            error_message: error.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Cutoff, DetailSelectors, ListSelectors};
    use crate::services::browser::fake::FakeSession;
    use crate::services::{HttpSession, MemoryFailureSink};
    use std::time::Duration;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config() -> CrawlerConfig {
        CrawlerConfig {
            navigation_timeout_secs: 5,
            download_timeout_secs: 5,
            intercept_timeout_secs: 5,
            request_delay_ms: 0,
            page_delay_ms: 0,
            retry_base_delay_ms: 10,
            ..CrawlerConfig::default()
        }
    }

    fn profile(base_url: &str) -> SiteProfile {
        let mut profile =
            SiteProfile::generic("test", &format!("{base_url}/board/list.do")).unwrap();
        profile.listing = ListSelectors {
            row_selector: "ul.list li".to_string(),
            title_selector: "a".to_string(),
            date_selector: "span.date".to_string(),
            ..ListSelectors::default()
        };
        profile.detail = DetailSelectors {
            body_selector: "div.body".to_string(),
            date_selector: Some("span.written".to_string()),
            attachment_selector: "div.files a".to_string(),
            ..DetailSelectors::default()
        };
        profile
    }

    fn listing(entries: &[(&str, &str, &str)]) -> String {
        let items: String = entries
            .iter()
            .map(|(id, title, date)| {
                format!(r#"<li><a href="/board/view.do?id={id}">{title}</a><span class="date">{date}</span></li>"#)
            })
            .collect();
        format!("<html><body><ul class=\"list\">{items}</ul></body></html>")
    }

    fn detail(id: &str, date: &str) -> String {
        format!(
            r#"<html><body>
                 <span class="written">{date}</span>
                 <div class="body">공고 {id} 본문</div>
                 <div class="files"><a href="/files/{id}.pdf">첨부{id}.pdf</a></div>
               </body></html>"#
        )
    }

    async fn mount_page(server: &MockServer, page: u32, html: String) {
        Mock::given(method("GET"))
            .and(path("/board/list.do"))
            .and(query_param("page", page.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(html))
            .mount(server)
            .await;
    }

    async fn mount_detail(server: &MockServer, id: &str, date: &str, expected: u64) {
        Mock::given(method("GET"))
            .and(path("/board/view.do"))
            .and(query_param("id", id))
            .respond_with(ResponseTemplate::new(200).set_body_string(detail(id, date)))
            .expect(expected)
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/files/{id}.pdf")))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(vec![0x25u8; 300]),
            )
            .mount(server)
            .await;
    }

    fn crawler(server: &MockServer, root: &TempDir, options: CrawlOptions) -> PaginationCrawler {
        crawler_with(&server.uri(), config(), root, options)
    }

    fn crawler_with(
        base_url: &str,
        config: CrawlerConfig,
        root: &TempDir,
        options: CrawlOptions,
    ) -> PaginationCrawler {
        PaginationCrawler::new(
            profile(base_url),
            config,
            options,
            reqwest::Client::new(),
            LocalStorage::new(root.path(), "test"),
        )
        .unwrap()
    }

    fn year(y: i32) -> CrawlOptions {
        CrawlOptions {
            cutoff: Cutoff::Year(y),
            ..CrawlOptions::default()
        }
    }

    fn folders(root: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root.path().join("test"))
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    /// Two listing pages; the second starts with a 2024 entry.
    async fn two_page_site(detail_hits: u64) -> MockServer {
        let server = MockServer::start().await;
        mount_page(
            &server,
            1,
            listing(&[("1", "가을 축제 안내", "2025-09-20"), ("2", "도로 공사 공고", "2025-09-10")]),
        )
        .await;
        mount_page(
            &server,
            2,
            listing(&[("3", "작년 공고", "2024-12-01"), ("4", "더 오래된 공고", "2024-11-01")]),
        )
        .await;
        mount_detail(&server, "1", "2025-09-20", detail_hits).await;
        mount_detail(&server, "2", "2025-09-10", detail_hits).await;
        mount_detail(&server, "3", "2024-12-01", 0).await;
        mount_detail(&server, "4", "2024-11-01", 0).await;
        server
    }

    #[tokio::test]
    async fn test_end_to_end_two_pages() {
        let server = two_page_site(1).await;
        let root = TempDir::new().unwrap();
        let mut session = HttpSession::new(reqwest::Client::new());

        let outcome = crawler(&server, &root, year(2025))
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(outcome.persisted, 2);
        assert_eq!(outcome.pages_visited, 2);
        assert_eq!(outcome.attachments_ok, 2);
        assert_eq!(outcome.stop_reason, Some(StopReason::CutoffReached));
        assert_eq!(
            folders(&root),
            vec!["001_가을 축제 안내".to_string(), "002_도로 공사 공고".to_string()]
        );

        let content =
            std::fs::read_to_string(root.path().join("test/001_가을 축제 안내/content.md")).unwrap();
        assert!(content.starts_with("# 가을 축제 안내\n"));
        assert!(content.contains("**작성일**: 2025-09-20"));
        assert!(content.contains("공고 1 본문"));
        assert!(content.contains("1. 첨부1.pdf: http"));

        let attachment = root
            .path()
            .join("test/001_가을 축제 안내/attachments/첨부1.pdf");
        assert_eq!(std::fs::metadata(attachment).unwrap().len(), 300);
    }

    #[tokio::test]
    async fn test_second_run_creates_nothing() {
        let root = TempDir::new().unwrap();
        let mut session = HttpSession::new(reqwest::Client::new());

        let first = two_page_site(1).await;
        crawler(&first, &root, year(2025))
            .run(&mut session)
            .await
            .unwrap();

        let second = two_page_site(0).await;
        let outcome = crawler(&second, &root, year(2025))
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(outcome.persisted, 0);
        assert_eq!(outcome.duplicates, 2);
        assert_eq!(folders(&root).len(), 2);
    }

    #[tokio::test]
    async fn test_stops_at_first_stale_entry() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            1,
            listing(&[
                ("1", "공고 하나", "2025-03-01"),
                ("2", "공고 둘", "2025-02-01"),
                ("3", "공고 셋", "2025-01-01"),
                ("4", "공고 넷", "2024-12-31"),
                ("5", "공고 다섯", "2025-05-01"),
            ]),
        )
        .await;
        for id in ["1", "2", "3"] {
            mount_detail(&server, id, "", 1).await;
        }
        mount_detail(&server, "4", "", 0).await;
        mount_detail(&server, "5", "", 0).await;

        let root = TempDir::new().unwrap();
        let mut session = HttpSession::new(reqwest::Client::new());
        let outcome = crawler(&server, &root, year(2025))
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(outcome.persisted, 3);
        assert_eq!(outcome.entries_seen, 4);
        assert_eq!(outcome.stop_reason, Some(StopReason::CutoffReached));
    }

    #[tokio::test]
    async fn test_counter_continues_after_existing_folders() {
        let server = two_page_site(1).await;
        let root = TempDir::new().unwrap();
        std::fs::create_dir_all(root.path().join("test/007_이전 공고")).unwrap();
        let mut session = HttpSession::new(reqwest::Client::new());

        crawler(&server, &root, year(2025))
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(
            folders(&root),
            vec![
                "007_이전 공고".to_string(),
                "008_가을 축제 안내".to_string(),
                "009_도로 공사 공고".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_detail_date_recheck_stops() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            1,
            listing(&[("1", "날짜 없는 공고", ""), ("2", "다음 공고", "")]),
        )
        .await;
        mount_detail(&server, "1", "2024-06-30", 1).await;
        mount_detail(&server, "2", "2025-01-02", 0).await;

        let root = TempDir::new().unwrap();
        let mut session = HttpSession::new(reqwest::Client::new());
        let outcome = crawler(&server, &root, year(2025))
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(outcome.persisted, 0);
        assert_eq!(outcome.stop_reason, Some(StopReason::CutoffReached));
        assert!(folders(&root).is_empty());
    }

    #[tokio::test]
    async fn test_failed_entry_is_recorded_and_skipped() {
        let server = MockServer::start().await;
        mount_page(
            &server,
            1,
            listing(&[("1", "깨진 공고", "2025-09-20"), ("2", "정상 공고", "2025-09-10")]),
        )
        .await;
        mount_page(&server, 2, listing(&[])).await;
        Mock::given(method("GET"))
            .and(path("/board/view.do"))
            .and(query_param("id", "1"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_detail(&server, "2", "2025-09-10", 1).await;

        let root = TempDir::new().unwrap();
        let sink = Arc::new(MemoryFailureSink::default());
        let mut session = HttpSession::new(reqwest::Client::new());
        let outcome = crawler(&server, &root, year(2025))
            .with_failure_sink(sink.clone())
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(outcome.persisted, 1);
        assert_eq!(outcome.failures, 1);
        assert_eq!(outcome.stop_reason, Some(StopReason::EmptyPage));
        let records = sink.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "깨진 공고");
        assert_eq!(records[0].error_type, "crawl");
        assert!(records[0].detail_url.as_deref().unwrap().contains("id=1"));
        assert_eq!(folders(&root), vec!["001_정상 공고".to_string()]);
    }

    #[tokio::test]
    async fn test_consecutive_listing_failures_end_crawl() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/board/list.do"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&server)
            .await;

        let root = TempDir::new().unwrap();
        let mut session = HttpSession::new(reqwest::Client::new());
        let outcome = crawler(&server, &root, CrawlOptions::default())
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(outcome.stop_reason, Some(StopReason::ConsecutiveErrors));
        assert_eq!(outcome.pages_visited, 0);
    }

    #[tokio::test]
    async fn test_urls_only_mode() {
        let server = two_page_site(0).await;
        let root = TempDir::new().unwrap();
        let registry = Arc::new(MemoryUrlRegistry::default());
        let mut session = HttpSession::new(reqwest::Client::new());

        let options = CrawlOptions {
            urls_only: true,
            ..year(2025)
        };
        let outcome = crawler(&server, &root, options)
            .with_url_registry(registry.clone())
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(outcome.urls_recorded, 2);
        assert_eq!(outcome.persisted, 0);
        assert_eq!(registry.len(), 2);
        let written: Vec<String> = std::fs::read_dir(root.path().join("test"))
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with("urls_") && written[0].ends_with(".json"));
    }

    #[tokio::test]
    async fn test_force_reuses_existing_prefix() {
        let server = two_page_site(1).await;
        let root = TempDir::new().unwrap();
        let old = root.path().join("test/004_가을 축제 안내");
        std::fs::create_dir_all(&old).unwrap();
        std::fs::write(old.join("content.md"), "old").unwrap();

        let mut session = HttpSession::new(reqwest::Client::new());
        let options = CrawlOptions {
            force: true,
            ..year(2025)
        };
        let outcome = crawler(&server, &root, options)
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(outcome.persisted, 2);
        assert_eq!(
            folders(&root),
            vec!["004_가을 축제 안내".to_string(), "005_도로 공사 공고".to_string()]
        );
        let content = std::fs::read_to_string(old.join("content.md")).unwrap();
        assert!(content.contains("공고 1 본문"));
    }

    #[tokio::test]
    async fn test_lost_session_is_reconnected() {
        let base = "https://www.gu.go.kr";
        let mut session = FakeSession::new()
            .with_page(
                &format!("{base}/board/list.do?page=1"),
                &listing(&[("1", "재연결 공고", "2025-09-20")]),
            )
            .with_page(&format!("{base}/board/list.do?page=2"), &listing(&[]))
            .with_page(
                &format!("{base}/board/view.do?id=1"),
                r#"<html><body><div class="body">본문</div></body></html>"#,
            );
        session.connected = false;

        let root = TempDir::new().unwrap();
        let outcome = crawler_with(base, config(), &root, year(2025))
            .run(&mut session)
            .await
            .unwrap();

        assert_eq!(session.calls[0], "reconnect");
        assert_eq!(session.calls.iter().filter(|c| *c == "reconnect").count(), 1);
        assert_eq!(outcome.persisted, 1);
        assert_eq!(outcome.stop_reason, Some(StopReason::EmptyPage));
    }

    #[tokio::test]
    async fn test_detail_timeout_is_retried() {
        let server = MockServer::start().await;
        mount_page(&server, 1, listing(&[("1", "느린 공고", "2025-09-20")])).await;
        mount_page(&server, 2, listing(&[])).await;
        Mock::given(method("GET"))
            .and(path("/board/view.do"))
            .and(query_param("id", "1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(detail("1", "2025-09-20"))
                    .set_delay(Duration::from_secs(3)),
            )
            .up_to_n_times(1)
            .mount(&server)
            .await;
        mount_detail(&server, "1", "2025-09-20", 1).await;

        let config = CrawlerConfig {
            navigation_timeout_secs: 1,
            ..config()
        };
        let root = TempDir::new().unwrap();
        let sink = Arc::new(MemoryFailureSink::default());
        let mut session = HttpSession::new(reqwest::Client::new());
        let outcome = crawler_with(&server.uri(), config, &root, year(2025))
            .with_failure_sink(sink.clone())
            .run(&mut session)
            .await
            .unwrap();

        let detail_requests = server
            .received_requests()
            .await
            .unwrap()
            .iter()
            .filter(|r| r.url.path() == "/board/view.do")
            .count();
        assert_eq!(detail_requests, 2);
        assert_eq!(outcome.persisted, 1);
        assert!(sink.records().is_empty());
        assert_eq!(folders(&root), vec!["001_느린 공고".to_string()]);
    }
}
