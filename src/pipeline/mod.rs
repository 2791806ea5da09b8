//! Pipeline entry points for crawler operations.
//!
//! - `PaginationCrawler`: the per-site crawl loop
//! - `run_site`: wire config, session and storage together and crawl once

pub mod crawl;

pub use crawl::PaginationCrawler;

use std::sync::Arc;

use crate::error::Result;
use crate::models::{Config, CrawlOptions, CrawlOutcome, SiteProfile};
use crate::services::{BrowserSession, FailureSink, HttpSession, UrlRegistry};
use crate::storage::LocalStorage;
use crate::utils::http;

/// Optional collaborators for [`run_site`].
#[derive(Default)]
pub struct Collaborators {
    pub failures: Option<Arc<dyn FailureSink>>,
    pub registry: Option<Arc<dyn UrlRegistry>>,
}

/// Crawl one site with the configured session type.
///
/// A browser session is launched when the `browser` feature is built and
/// `config.browser.enabled` is set; otherwise pages are fetched over plain
/// HTTP. Failing to launch the browser is an error.
pub async fn run_site(
    config: &Config,
    profile: SiteProfile,
    options: CrawlOptions,
    collaborators: Collaborators,
) -> Result<CrawlOutcome> {
    let client = http::create_client(&config.crawler)?;
    let storage = LocalStorage::new(&config.output.root, &profile.code);

    let mut crawler = PaginationCrawler::new(
        profile,
        config.crawler.clone(),
        options,
        client.clone(),
        storage,
    )?;
    if let Some(failures) = collaborators.failures {
        crawler = crawler.with_failure_sink(failures);
    }
    if let Some(registry) = collaborators.registry {
        crawler = crawler.with_url_registry(registry);
    }

    let mut session = open_session(config, client).await?;
    let outcome = crawler.run(session.as_mut()).await;
    session.close().await;
    outcome
}

#[cfg(feature = "browser")]
async fn open_session(config: &Config, client: reqwest::Client) -> Result<Box<dyn BrowserSession>> {
    if config.browser.enabled {
        log::info!("Launching browser session");
        let session = crate::services::ChromiumSession::launch(&config.browser).await?;
        return Ok(Box::new(session));
    }
    log::info!("Browser disabled; using plain HTTP");
    Ok(Box::new(HttpSession::new(client)))
}

#[cfg(not(feature = "browser"))]
async fn open_session(config: &Config, client: reqwest::Client) -> Result<Box<dyn BrowserSession>> {
    if config.browser.enabled {
        log::warn!("Built without browser support; using plain HTTP");
    }
    Ok(Box::new(HttpSession::new(client)))
}
