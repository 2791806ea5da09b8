// src/services/resolver.rs

//! Detail URL resolution from heterogeneous listing markup.
//!
//! Strategies, first success wins:
//! 1. explicit action attribute
//! 2. record-id call in the inline handler, through the view template
//! 3. absolute link
//! 4. relative link
//! 5. script navigation (`location.href=`, `window.open(`, `href=`)
//! 6. clicking the on-screen link (live session only)

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::{AppError, Result};
use crate::models::{ListingEntry, SiteProfile};
use crate::services::browser::BrowserSession;
use crate::utils::url::{is_absolute, is_root_relative, resolve};

/// `name(arg, ...)`
static CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<func>[A-Za-z_$][\w$.]*)\s*\((?P<args>[^()]*)\)").expect("valid regex")
});

static RECORD_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w-]+$").expect("valid regex"));

static SCRIPT_NAVIGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:location(?:\.href)?\s*=|window\.open\s*\(|href\s*=)\s*['"](?P<url>[^'"]+)['"]"#,
    )
    .expect("valid regex")
});

/// Calls that navigate by themselves and are left to strategy 5.
const NAVIGATION_CALLS: &[&str] = &["window.open", "open", "location.assign", "location.replace"];

/// Turns listing entries into detail page URLs.
#[derive(Debug, Clone)]
pub struct DetailUrlResolver {
    base_url: String,
    list_url: String,
    view_template: Option<String>,
    click_title_chars: usize,
}

impl DetailUrlResolver {
    pub fn new(profile: &SiteProfile) -> Self {
        Self {
            base_url: profile.base_url.clone(),
            list_url: profile.list_url.clone(),
            view_template: profile.view_template.clone(),
            click_title_chars: profile.click_title_chars.max(1),
        }
    }

    /// Resolve an entry, falling back to a click on `listing_url` when the
    /// markup alone is not enough.
    pub async fn resolve(
        &self,
        entry: &ListingEntry,
        session: &mut dyn BrowserSession,
        listing_url: &str,
        timeout: Duration,
    ) -> Result<String> {
        if let Some(url) = self.resolve_static(entry) {
            return Ok(url);
        }

        if session.supports_scripts() && self.needs_click(entry) {
            if let Some(url) = self.click_through(entry, session, listing_url, timeout).await? {
                return Ok(url);
            }
        }

        Err(AppError::Resolution(entry.title.clone()))
    }

    /// Strategies 1 to 5, which only look at the markup.
    pub fn resolve_static(&self, entry: &ListingEntry) -> Option<String> {
        let handler = entry.inline_handler.as_deref().map(str::trim);

        if let Some(action) = entry.explicit_action.as_deref() {
            if let Some(url) = resolve(&self.base_url, action) {
                return Some(url);
            }
        }

        if let Some(url) = handler.and_then(|h| self.from_record_call(h)) {
            return Some(url);
        }

        if let Some(link) = entry.link.as_deref().map(str::trim) {
            if is_absolute(link) {
                return Some(link.to_string());
            }
            if is_root_relative(link) {
                return resolve(&self.base_url, link);
            }
            if is_page_relative(link) {
                return resolve(&self.list_url, link);
            }
        }

        handler.and_then(|h| self.from_script_navigation(h))
    }

    /// Synthesize a view URL from `fn('id')` or `fn('board', 'id')`.
    fn from_record_call(&self, handler: &str) -> Option<String> {
        let template = self.view_template.as_deref()?;
        let caps = CALL.captures(handler)?;
        if NAVIGATION_CALLS.contains(&&caps["func"]) || SCRIPT_NAVIGATION.is_match(handler) {
            return None;
        }

        let args = record_args(&caps["args"])?;
        if args.is_empty() || args.len() > 2 {
            return None;
        }

        let (board, id) = match args.as_slice() {
            [id] => (None, id),
            [board, id] => (Some(board), id),
            _ => return None,
        };
        if template.contains("{board}") && board.is_none() {
            return None;
        }

        let mut path = template.replace("{id}", id);
        if let Some(board) = board {
            path = path.replace("{board}", board);
        }
        resolve(&self.base_url, &path)
    }

    fn from_script_navigation(&self, handler: &str) -> Option<String> {
        let url = SCRIPT_NAVIGATION.captures(handler)?.name("url")?.as_str().trim();
        if is_absolute(url) || is_root_relative(url) {
            resolve(&self.base_url, url)
        } else {
            None
        }
    }

    /// Whether the entry looks like a form submission or an inert link.
    fn needs_click(&self, entry: &ListingEntry) -> bool {
        let inert_link = entry
            .link
            .as_deref()
            .map(str::trim)
            .is_none_or(|l| l.is_empty() || l.starts_with('#') || is_script_link(l));
        entry.inline_handler.is_some() || inert_link
    }

    /// Click the link titled like the entry and capture where it leads.
    ///
    /// The session is left on the listing page afterwards.
    async fn click_through(
        &self,
        entry: &ListingEntry,
        session: &mut dyn BrowserSession,
        listing_url: &str,
        timeout: Duration,
    ) -> Result<Option<String>> {
        let original = session.current_url().await?;
        if original != listing_url {
            session.navigate(listing_url, timeout).await?;
        }

        let prefix: String = entry.title.chars().take(self.click_title_chars).collect();
        log::debug!("Resolving '{}' by clicking its link", prefix);
        let clicked = session.click_link_by_text(&prefix, timeout).await;

        let restored = session.navigate(listing_url, timeout).await;
        let target = clicked?;
        if let Err(e) = restored {
            log::warn!("Could not return to listing page {}: {}", listing_url, e);
        }
        Ok(target)
    }
}

/// Unquoted arguments of a call, when every one is a record id.
///
/// Ids are quoted identifiers or bare numbers; a bare name such as
/// `this` or `event` disqualifies the call.
fn record_args(args: &str) -> Option<Vec<String>> {
    let mut ids = Vec::new();
    for arg in args.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        let id = match unquote(arg) {
            Some(inner) => inner.trim(),
            None if arg.chars().all(|c| c.is_ascii_digit()) => arg,
            None => return None,
        };
        if !RECORD_ID.is_match(id) {
            return None;
        }
        ids.push(id.to_string());
    }
    Some(ids)
}

fn unquote(arg: &str) -> Option<&str> {
    ['\'', '"'].into_iter().find_map(|q| {
        arg.strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
    })
}

fn is_script_link(link: &str) -> bool {
    link.to_ascii_lowercase().starts_with("javascript:")
}

fn is_page_relative(link: &str) -> bool {
    !link.is_empty()
        && !link.starts_with('#')
        && !link.starts_with("//")
        && !is_script_link(link)
        && !link.contains(':')
}
