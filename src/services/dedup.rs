// src/services/dedup.rs

//! Duplicate suppression across and within runs.

use std::collections::HashSet;

use crate::utils::fs::sanitize_title;

/// Identities of announcements already handled.
///
/// Two views are kept: titles seen during this run, and titles
/// materialized as output folders by earlier runs. Folder names only keep
/// the sanitized, truncated title, so both views compare on that form.
#[derive(Debug, Clone, Default)]
pub struct DuplicateIndex {
    seen: HashSet<String>,
    persisted: HashSet<String>,
}

impl DuplicateIndex {
    /// Build an index from the title parts of existing output folders.
    pub fn from_persisted<I, S>(folder_titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            seen: HashSet::new(),
            persisted: folder_titles
                .into_iter()
                .map(|t| Self::key(t.as_ref()))
                .collect(),
        }
    }

    /// Identity key of a title.
    pub fn key(title: &str) -> String {
        sanitize_title(title)
    }

    /// Whether this title has been handled, in this run or a previous one.
    pub fn contains(&self, title: &str) -> bool {
        let key = Self::key(title);
        self.seen.contains(&key) || self.persisted.contains(&key)
    }

    /// Record a title as handled in this run. Returns false if it already was.
    pub fn insert(&mut self, title: &str) -> bool {
        self.seen.insert(Self::key(title))
    }

    /// Forget what earlier runs persisted (used when overwriting).
    pub fn forget_persisted(&mut self) {
        self.persisted.clear();
    }

    /// Number of titles known from earlier runs.
    pub fn persisted_len(&self) -> usize {
        self.persisted.len()
    }
}
