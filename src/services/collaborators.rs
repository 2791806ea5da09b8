// src/services/collaborators.rs

//! Narrow interfaces to the failure log and the URL registry.
//!
//! Both are fire-and-forget from the crawler's point of view: their own
//! failures are logged by the implementation and never returned.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::utils::url::normalize_detail_url;

/// One announcement that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub site_code: String,
    pub title: String,
    /// Listing page the entry came from
    pub url: String,
    pub detail_url: Option<String>,
    pub error_type: String,
    pub error_message: String,
}

/// Receives failure records.
pub trait FailureSink: Send + Sync {
    fn record(&self, failure: FailureRecord);
}

/// Writes failures to the log.
#[derive(Debug, Default)]
pub struct LogFailureSink;

impl FailureSink for LogFailureSink {
    fn record(&self, failure: FailureRecord) {
        match serde_json::to_string(&failure) {
            Ok(json) => log::warn!("[FAILURE] {}", json),
            Err(_) => log::warn!(
                "[FAILURE] {} {}: {}",
                failure.site_code,
                failure.title,
                failure.error_message
            ),
        }
    }
}

/// Keeps failures in memory.
#[derive(Debug, Default)]
pub struct MemoryFailureSink {
    records: Mutex<Vec<FailureRecord>>,
}

impl MemoryFailureSink {
    pub fn records(&self) -> Vec<FailureRecord> {
        self.records
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

impl FailureSink for MemoryFailureSink {
    fn record(&self, failure: FailureRecord) {
        match self.records.lock() {
            Ok(mut records) => records.push(failure),
            Err(_) => log::warn!("Failure sink poisoned; dropping record for {}", failure.title),
        }
    }
}

/// A detail URL found while extracting URLs only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub site_code: String,
    pub title: String,
    pub list_url: String,
    pub detail_url: String,
    pub list_date: Option<String>,
    /// Day the batch was collected, `YYYY-MM-DD`
    pub batch_date: String,
}

impl UrlRecord {
    /// SHA-256 of the normalized detail URL.
    pub fn url_hash(&self) -> String {
        hash_url(&self.detail_url)
    }
}

/// Hash of a detail URL after dropping paging and session parameters.
pub fn hash_url(detail_url: &str) -> String {
    let normalized = normalize_detail_url(detail_url);
    hex::encode(Sha256::digest(normalized.as_bytes()))
}

/// Records which detail URLs were seen for a batch date.
pub trait UrlRegistry: Send + Sync {
    /// Whether this URL was already recorded for the record's batch date.
    fn contains(&self, record: &UrlRecord) -> bool;

    /// Record a URL. Returns false if it was already present.
    fn record(&self, record: UrlRecord) -> bool;
}

/// In-memory registry keyed by batch date and URL hash.
#[derive(Debug, Default)]
pub struct MemoryUrlRegistry {
    seen: Mutex<HashMap<String, HashSet<String>>>,
}

impl MemoryUrlRegistry {
    pub fn len(&self) -> usize {
        self.seen
            .lock()
            .map(|s| s.values().map(HashSet::len).sum())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UrlRegistry for MemoryUrlRegistry {
    fn contains(&self, record: &UrlRecord) -> bool {
        self.seen
            .lock()
            .map(|s| {
                s.get(&record.batch_date)
                    .is_some_and(|hashes| hashes.contains(&record.url_hash()))
            })
            .unwrap_or(false)
    }

    fn record(&self, record: UrlRecord) -> bool {
        match self.seen.lock() {
            Ok(mut seen) => seen
                .entry(record.batch_date.clone())
                .or_default()
                .insert(record.url_hash()),
            Err(_) => {
                log::warn!("URL registry poisoned; dropping {}", record.detail_url);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(url: &str, batch: &str) -> UrlRecord {
        UrlRecord {
            site_code: "gu".into(),
            title: "공고".into(),
            list_url: "https://a.go.kr/list".into(),
            detail_url: url.into(),
            list_date: Some("2025-09-10".into()),
            batch_date: batch.into(),
        }
    }

    #[test]
    fn test_hash_ignores_paging_and_session() {
        assert_eq!(
            hash_url("https://a.go.kr/view.do?id=1&pageIndex=3"),
            hash_url("https://a.go.kr/view.do;jsessionid=ABC?id=1")
        );
        assert_ne!(
            hash_url("https://a.go.kr/view.do?id=1"),
            hash_url("https://a.go.kr/view.do?id=2")
        );
        assert_eq!(hash_url("https://a.go.kr/view.do?id=1").len(), 64);
    }

    #[test]
    fn test_registry_is_per_batch() {
        let registry = MemoryUrlRegistry::default();
        let first = record("https://a.go.kr/view.do?id=1", "2025-09-30");
        assert!(!registry.contains(&first));
        assert!(registry.record(first.clone()));
        assert!(registry.contains(&first));
        assert!(!registry.record(record("https://a.go.kr/view.do?id=1&page=2", "2025-09-30")));
        assert!(!registry.contains(&record("https://a.go.kr/view.do?id=1", "2025-10-01")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_memory_failure_sink() {
        let sink = MemoryFailureSink::default();
        sink.record(FailureRecord {
            site_code: "gu".into(),
            title: "공고".into(),
            url: "https://a.go.kr/list".into(),
            detail_url: None,
            error_type: "resolution".into(),
            error_message: "Could not resolve detail URL for '공고'".into(),
        });
        assert_eq!(sink.records().len(), 1);
        assert_eq!(sink.records()[0].error_type, "resolution");
    }
}
