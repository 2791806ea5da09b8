// src/models/site.rs

//! Declarative site profiles.
//!
//! One crawl engine serves every portal; what differs between portals is
//! data: selectors, the base URL, how pages are numbered, how listing
//! scripts map onto a view endpoint, and which script shapes trigger
//! attachment downloads.

use std::fs;
use std::path::Path;

use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{DetailSelectors, ListSelectors};

/// Configuration for one portal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteProfile {
    /// Short code used as the output sub-directory
    pub code: String,

    /// Scheme + host used to resolve relative links
    pub base_url: String,

    /// First listing page
    pub list_url: String,

    /// How listing pages are numbered
    #[serde(default)]
    pub pagination: Pagination,

    #[serde(default)]
    pub listing: ListSelectors,

    #[serde(default)]
    pub detail: DetailSelectors,

    /// View endpoint for script-encoded record ids, e.g.
    /// `/board/view.do?bbsId={board}&nttId={id}`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_template: Option<String>,

    /// Ordered attachment script shapes; first match wins
    #[serde(default = "default_attachment_patterns")]
    pub attachment_patterns: Vec<AttachmentPattern>,

    /// Intermediate-form download rule for sites with encoded download links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_exchange: Option<TokenExchange>,

    /// Title prefix length used when clicking through to a detail page
    #[serde(default = "default_click_title_chars")]
    pub click_title_chars: usize,
}

fn default_click_title_chars() -> usize {
    20
}

impl SiteProfile {
    /// Load a site profile from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Generic table-board profile for a listing URL.
    pub fn generic(code: impl Into<String>, list_url: &str) -> Result<Self> {
        Ok(Self {
            code: code.into(),
            base_url: origin_of(list_url)?,
            list_url: list_url.to_string(),
            pagination: Pagination::default(),
            listing: ListSelectors::default(),
            detail: DetailSelectors::default(),
            view_template: None,
            attachment_patterns: default_attachment_patterns(),
            token_exchange: None,
            click_title_chars: default_click_title_chars(),
        })
    }

    /// Override the listing URL, keeping the base URL consistent with it.
    pub fn with_list_url(mut self, list_url: &str) -> Result<Self> {
        if self.base_url.trim().is_empty() {
            self.base_url = origin_of(list_url)?;
        }
        self.list_url = list_url.to_string();
        Ok(self)
    }

    /// Check that selectors parse, regexes compile and templates are usable.
    pub fn validate(&self) -> Result<()> {
        if self.code.trim().is_empty() {
            return Err(AppError::validation("site code is empty"));
        }
        Url::parse(&self.base_url)?;
        Url::parse(&self.list_url)?;

        let selectors = [
            Some(&self.listing.row_selector),
            Some(&self.listing.title_selector),
            Some(&self.listing.date_selector),
            self.listing.link_selector.as_ref(),
            Some(&self.detail.body_selector),
            self.detail.date_selector.as_ref(),
            Some(&self.detail.attachment_selector),
        ];
        for selector in selectors.into_iter().flatten() {
            Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }

        if let Pagination::Template { template } = &self.pagination {
            if !template.contains("{page}") {
                return Err(AppError::validation(
                    "pagination template must contain {page}",
                ));
            }
        }
        if let Some(template) = &self.view_template {
            if !template.contains("{id}") {
                return Err(AppError::validation("view_template must contain {id}"));
            }
        }
        for pattern in &self.attachment_patterns {
            pattern.compile()?;
        }
        Ok(())
    }
}

/// Scheme and authority of a URL, e.g. `https://www.example.go.kr`.
fn origin_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    Ok(parsed.origin().ascii_serialization())
}

/// How listing pages are addressed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Pagination {
    /// Set a query parameter on the listing URL, keeping the others.
    Query { param: String },
    /// Substitute `{page}` in a URL template.
    Template { template: String },
}

impl Default for Pagination {
    fn default() -> Self {
        Self::Query {
            param: "page".to_string(),
        }
    }
}

impl Pagination {
    /// URL of listing page `page` (1-based).
    pub fn page_url(&self, list_url: &str, page: u32) -> Result<String> {
        match self {
            Self::Query { param } => {
                let mut url = Url::parse(list_url)?;
                let kept: Vec<(String, String)> = url
                    .query_pairs()
                    .filter(|(key, _)| key != param.as_str())
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                url.query_pairs_mut()
                    .clear()
                    .extend_pairs(kept)
                    .append_pair(param, &page.to_string());
                Ok(url.to_string())
            }
            Self::Template { template } => Ok(template.replace("{page}", &page.to_string())),
        }
    }
}

/// A script shape that triggers an attachment download.
///
/// `regex` must define the named groups `name` (user-visible filename),
/// `server` (server-side filename) and `path` (storage path). A `func`
/// group, when present, captures the called function's name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentPattern {
    /// Identifier used in diagnostics
    pub name: String,

    pub regex: String,

    /// Script re-invoked in the page, with `{func}`, `{name}`, `{server}`,
    /// `{path}` placeholders
    pub trigger: String,

    /// Canonical download URL, with the same placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_template: Option<String>,

    /// Path fragment identifying the real download request
    pub endpoint: String,

    /// Direct form submission equivalent of the script
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post: Option<PostForm>,
}

impl AttachmentPattern {
    /// Compile the pattern regex, checking its required groups.
    pub fn compile(&self) -> Result<Regex> {
        let regex = Regex::new(&self.regex)
            .map_err(|e| AppError::config(format!("pattern '{}': {e}", self.name)))?;
        let names: Vec<&str> = regex.capture_names().flatten().collect();
        for group in ["name", "server", "path"] {
            if !names.contains(&group) {
                return Err(AppError::config(format!(
                    "pattern '{}' is missing the '{group}' group",
                    self.name
                )));
            }
        }
        Ok(regex)
    }
}

/// Form fields for a direct POST download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostForm {
    pub endpoint: String,
    pub name_field: String,
    pub server_field: String,
    pub path_field: String,
}

/// Sites whose download links point at an intermediate page with a hidden form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenExchange {
    /// Substring identifying such links
    pub url_contains: String,
}

/// The three-argument download call common to eGovFrame-style boards.
pub fn default_attachment_patterns() -> Vec<AttachmentPattern> {
    vec![AttachmentPattern {
        name: "three_arg_download".to_string(),
        regex: r#"(?P<func>[A-Za-z_$][\w$]*(?:[Dd]own|[Ff]ile)[\w$]*)\s*\(\s*['"](?P<name>[^'"]*)['"]\s*,\s*['"](?P<server>[^'"]*)['"]\s*,\s*['"](?P<path>[^'"]*)['"]\s*\)"#.to_string(),
        trigger: "{func}('{name}', '{server}', '{path}')".to_string(),
        download_template: Some(
            "/common/download.do?orgFileName={name}&saveFileName={server}&filePath={path}"
                .to_string(),
        ),
        endpoint: "download".to_string(),
        post: None,
    }]
}
