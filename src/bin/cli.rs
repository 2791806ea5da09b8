//! Gosi Crawler CLI
//!
//! Crawls one site per invocation.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use gosi_crawler::{
    config::{load_config, load_profile},
    error::Result,
    models::{CrawlOptions, CrawlOutcome, Cutoff},
    pipeline::{self, Collaborators},
    utils::console,
};

/// gosi - Public Announcement Crawler
#[derive(Parser, Debug)]
#[command(
    name = "gosi",
    version,
    about = "Collects public announcements from government portals"
)]
struct Cli {
    /// Site code; also the output sub-directory
    #[arg(long)]
    site: String,

    /// Listing URL (first page)
    #[arg(long)]
    url: String,

    /// Collect announcements from 1 January of this year onwards
    #[arg(long, conflicts_with = "date")]
    year: Option<i32>,

    /// Collect announcements dated on or after this day (YYYY-MM-DD)
    #[arg(long)]
    date: Option<NaiveDate>,

    /// Output root directory (overrides the config file)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Listing page to start from
    #[arg(long, default_value_t = 1)]
    start_page: u32,

    /// Re-process announcements that already have a folder
    #[arg(long)]
    force: bool,

    /// Only resolve and record detail URLs
    #[arg(long)]
    urls_only: bool,

    /// Site profile (TOML)
    #[arg(long)]
    profile: Option<PathBuf>,

    /// Crawler configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fetch pages over plain HTTP instead of a browser
    #[arg(long)]
    no_browser: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn cutoff(&self) -> Cutoff {
        match (self.year, self.date) {
            (Some(year), _) => Cutoff::Year(year),
            (None, Some(date)) => Cutoff::Date(date),
            (None, None) => Cutoff::None,
        }
    }
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_summary(site: &str, outcome: &CrawlOutcome) {
    console::summary(
        site,
        &[
            ("Pages visited", outcome.pages_visited.to_string()),
            ("Entries seen", outcome.entries_seen.to_string()),
            ("Saved", outcome.persisted.to_string()),
            ("Duplicates", outcome.duplicates.to_string()),
            ("Failures", outcome.failures.to_string()),
            ("URLs recorded", outcome.urls_recorded.to_string()),
            (
                "Attachments",
                format!(
                    "{} ok, {} failed",
                    outcome.attachments_ok, outcome.attachments_failed
                ),
            ),
            (
                "Stopped",
                outcome
                    .stop_reason
                    .map(|r| r.to_string())
                    .unwrap_or_else(|| "-".to_string()),
            ),
        ],
    );
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Gosi Crawler starting...");

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(output) = &cli.output {
        config.output.root = output.to_string_lossy().into_owned();
    }
    if cli.no_browser {
        config.browser.enabled = false;
    }

    let profile = load_profile(cli.profile.as_deref(), &cli.site, &cli.url)?;
    let options = CrawlOptions {
        cutoff: cli.cutoff(),
        start_page: cli.start_page,
        force: cli.force,
        urls_only: cli.urls_only,
    };

    let outcome = pipeline::run_site(&config, profile, options, Collaborators::default()).await?;
    print_summary(&cli.site, &outcome);

    log::info!("Done!");

    Ok(())
}
