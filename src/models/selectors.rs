// src/models/selectors.rs

//! CSS selectors for scraping listing and detail pages.

use serde::{Deserialize, Serialize};

/// CSS selectors for the rows of a listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListSelectors {
    /// Selector for each row/item in the listing
    pub row_selector: String,

    /// Selector for the title element within a row
    pub title_selector: String,

    /// Selector for the date element within a row
    pub date_selector: String,

    /// Optional selector for the link element (if different from title)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_selector: Option<String>,

    /// HTML attribute name for extracting links (usually "href")
    #[serde(default = "default_attr_name")]
    pub attr_name: String,

    /// Attribute carrying inline script handlers
    #[serde(default = "default_handler_attr")]
    pub handler_attr: String,

    /// Attribute carrying a pre-computed detail URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_attr: Option<String>,
}

fn default_attr_name() -> String {
    "href".to_string()
}

fn default_handler_attr() -> String {
    "onclick".to_string()
}

impl Default for ListSelectors {
    fn default() -> Self {
        Self {
            row_selector: "table tbody tr:has(a)".to_string(),
            title_selector: "a".to_string(),
            date_selector: "td:nth-last-child(2)".to_string(),
            link_selector: None,
            attr_name: default_attr_name(),
            handler_attr: default_handler_attr(),
            action_attr: None,
        }
    }
}

/// CSS selectors for a detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailSelectors {
    /// Selector for the announcement body
    pub body_selector: String,

    /// Selector for an element holding the write date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_selector: Option<String>,

    /// Selector for attachment links
    #[serde(default = "default_attachment_selector")]
    pub attachment_selector: String,

    /// Attribute carrying attachment script handlers
    #[serde(default = "default_handler_attr")]
    pub handler_attr: String,
}

fn default_attachment_selector() -> String {
    ".file a, .attach a, a[href*='download'], a[onclick*='download'], a[href*='fileDown']"
        .to_string()
}

impl Default for DetailSelectors {
    fn default() -> Self {
        Self {
            body_selector: ".view_cont, .board_view, .bbs_view, .view-content, #content"
                .to_string(),
            date_selector: None,
            attachment_selector: default_attachment_selector(),
            handler_attr: default_handler_attr(),
        }
    }
}
