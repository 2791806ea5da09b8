//! Local filesystem storage.
//!
//! Announcements are assembled in a hidden staging folder
//! (`.NNN_title.partial`) and renamed into place once `content.md` is
//! written, so a crash never leaves a half-written folder that a later
//! run would mistake for a finished one.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use super::{ATTACHMENTS_DIR, AnnouncementDocument, CONTENT_FILE};
use crate::error::Result;
use crate::models::AttachmentResult;
use crate::services::DuplicateIndex;
use crate::utils::fs::{sanitize_filename, sanitize_title, write_atomic};

static FOLDER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{3,})_(.+)$").expect("valid regex"));

const PARTIAL_SUFFIX: &str = ".partial";
const REPLACED_SUFFIX: &str = ".replaced";

/// What earlier runs left in the site directory.
#[derive(Debug, Clone, Default)]
pub struct ExistingOutput {
    /// Highest folder prefix, 0 when empty
    pub max_counter: u32,
    /// Title part of each folder, keyed by duplicate key, with its prefix
    pub folders: HashMap<String, u32>,
}

impl ExistingOutput {
    /// Duplicate index seeded with the persisted titles.
    pub fn duplicate_index(&self) -> DuplicateIndex {
        DuplicateIndex::from_persisted(self.folders.keys())
    }

    /// Prefix of the folder already holding this title.
    pub fn counter_for(&self, title: &str) -> Option<u32> {
        self.folders.get(&DuplicateIndex::key(title)).copied()
    }
}

/// An announcement folder under construction.
#[derive(Debug, Clone)]
pub struct StagedAnnouncement {
    pub counter: u32,
    /// Final folder name, `NNN_title`
    pub name: String,
    /// Staging folder
    pub dir: PathBuf,
}

impl StagedAnnouncement {
    pub fn attachments_dir(&self) -> PathBuf {
        self.dir.join(ATTACHMENTS_DIR)
    }
}

/// Local filesystem backend for one site.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    site_dir: PathBuf,
}

impl LocalStorage {
    /// Storage rooted at `{root}/{site_code}`.
    pub fn new(root: impl AsRef<Path>, site_code: &str) -> Self {
        Self {
            site_dir: root.as_ref().join(sanitize_filename(site_code)),
        }
    }

    pub fn site_dir(&self) -> &Path {
        &self.site_dir
    }

    /// Folder name for a counter and title.
    pub fn folder_name(counter: u32, title: &str) -> String {
        format!("{:03}_{}", counter, sanitize_title(title))
    }

    /// Scan existing folders and clean up after interrupted runs.
    pub async fn scan(&self) -> Result<ExistingOutput> {
        tokio::fs::create_dir_all(&self.site_dir).await?;

        let mut existing = ExistingOutput::default();
        let mut entries = tokio::fs::read_dir(&self.site_dir).await?;
        let mut leftovers = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with('.') {
                leftovers.push(name);
                continue;
            }
            if let Some(caps) = FOLDER_NAME.captures(&name) {
                let Ok(counter) = caps[1].parse::<u32>() else {
                    continue;
                };
                existing.max_counter = existing.max_counter.max(counter);
                existing
                    .folders
                    .insert(DuplicateIndex::key(&caps[2]), counter);
            }
        }

        for name in leftovers {
            self.clean_leftover(&name, &mut existing).await?;
        }

        log::info!(
            "Found {} existing folder(s) in {} (max prefix {:03})",
            existing.folders.len(),
            self.site_dir.display(),
            existing.max_counter
        );
        Ok(existing)
    }

    async fn clean_leftover(&self, name: &str, existing: &mut ExistingOutput) -> Result<()> {
        let path = self.site_dir.join(name);
        let hidden = &name[1..];

        if let Some(original) = hidden.strip_suffix(REPLACED_SUFFIX) {
            // Interrupted replacement: keep the old copy if the new one never landed.
            let target = self.site_dir.join(original);
            if !target.exists() {
                tokio::fs::rename(&path, &target).await?;
                if let Some(caps) = FOLDER_NAME.captures(original) {
                    if let Ok(counter) = caps[1].parse::<u32>() {
                        existing.max_counter = existing.max_counter.max(counter);
                        existing
                            .folders
                            .insert(DuplicateIndex::key(&caps[2]), counter);
                    }
                }
                log::info!("Restored {} after an interrupted overwrite", original);
                return Ok(());
            }
        } else if !hidden.ends_with(PARTIAL_SUFFIX) {
            return Ok(());
        }

        log::info!("Removing stale staging folder {}", name);
        tokio::fs::remove_dir_all(&path).await?;
        Ok(())
    }

    /// Create the staging folder for an announcement.
    pub async fn stage(&self, counter: u32, title: &str) -> Result<StagedAnnouncement> {
        let name = Self::folder_name(counter, title);
        let dir = self.site_dir.join(format!(".{name}{PARTIAL_SUFFIX}"));
        if dir.exists() {
            tokio::fs::remove_dir_all(&dir).await?;
        }
        tokio::fs::create_dir_all(&dir).await?;
        Ok(StagedAnnouncement { counter, name, dir })
    }

    /// Write `content.md` and move the staged folder into place.
    ///
    /// An existing folder with the same name is replaced. Saved attachment
    /// paths are rebased onto the final folder.
    pub async fn commit(
        &self,
        staged: &StagedAnnouncement,
        document: &mut AnnouncementDocument,
    ) -> Result<PathBuf> {
        let target = self.site_dir.join(&staged.name);
        rebase_paths(&mut document.attachments, &staged.dir, &target);
        write_atomic(&staged.dir.join(CONTENT_FILE), document.render().as_bytes()).await?;

        // Empty attachment folders are left out.
        let attachments = staged.attachments_dir();
        if attachments.exists() && is_empty_dir(&attachments).await? {
            tokio::fs::remove_dir(&attachments).await?;
        }

        if target.exists() {
            let replaced = self
                .site_dir
                .join(format!(".{}{REPLACED_SUFFIX}", staged.name));
            tokio::fs::rename(&target, &replaced).await?;
            tokio::fs::rename(&staged.dir, &target).await?;
            tokio::fs::remove_dir_all(&replaced).await?;
        } else {
            tokio::fs::rename(&staged.dir, &target).await?;
        }
        Ok(target)
    }

    /// Drop a staged folder after a failure.
    pub async fn discard(&self, staged: &StagedAnnouncement) {
        if let Err(e) = tokio::fs::remove_dir_all(&staged.dir).await {
            log::debug!("Could not remove {}: {}", staged.dir.display(), e);
        }
    }

    /// Write a JSON file into the site directory.
    pub async fn write_json<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.site_dir.join(file_name);
        let bytes = serde_json::to_vec_pretty(value)?;
        write_atomic(&path, &bytes).await?;
        Ok(path)
    }
}

async fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut entries = tokio::fs::read_dir(path).await?;
    Ok(entries.next_entry().await?.is_none())
}

fn rebase_paths(results: &mut [AttachmentResult], from: &Path, to: &Path) {
    for result in results {
        if let Some(path) = &result.saved_path {
            if let Ok(relative) = path.strip_prefix(from) {
                result.saved_path = Some(to.join(relative));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DownloadStrategy;
    use tempfile::TempDir;

    fn document(title: &str) -> AnnouncementDocument {
        AnnouncementDocument {
            title: title.to_string(),
            url: "https://a.go.kr/view.do?id=1".to_string(),
            date: None,
            body: "본문".to_string(),
            attachments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_stage_and_commit() {
        let root = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path(), "gu");
        storage.scan().await.unwrap();

        let staged = storage.stage(1, "채용: 공고").await.unwrap();
        let file = staged.attachments_dir().join("a.pdf");
        tokio::fs::create_dir_all(staged.attachments_dir()).await.unwrap();
        tokio::fs::write(&file, b"pdf").await.unwrap();

        let mut doc = document("채용: 공고");
        doc.attachments.push(AttachmentResult::success(
            "a.pdf",
            file,
            None,
            DownloadStrategy::DirectGet,
            3,
        ));
        let target = storage.commit(&staged, &mut doc).await.unwrap();

        assert_eq!(target.file_name().unwrap(), "001_채용_ 공고");
        assert!(target.join(CONTENT_FILE).exists());
        let saved = doc.attachments[0].saved_path.clone().unwrap();
        assert_eq!(saved, target.join(ATTACHMENTS_DIR).join("a.pdf"));
        assert!(saved.exists());
        assert!(!staged.dir.exists());
    }

    #[tokio::test]
    async fn test_scan_resumes_and_cleans_up() {
        let root = TempDir::new().unwrap();
        let site = root.path().join("gu");
        std::fs::create_dir_all(site.join("001_첫 공고")).unwrap();
        std::fs::create_dir_all(site.join("012_두 번째 공고")).unwrap();
        std::fs::create_dir_all(site.join(".013_중단된 공고.partial")).unwrap();
        std::fs::create_dir_all(site.join("notes")).unwrap();
        std::fs::write(site.join("urls_2025-09-30.json"), b"[]").unwrap();

        let storage = LocalStorage::new(root.path(), "gu");
        let existing = storage.scan().await.unwrap();

        assert_eq!(existing.max_counter, 12);
        assert_eq!(existing.folders.len(), 2);
        assert_eq!(existing.counter_for("두 번째 공고"), Some(12));
        assert!(existing.duplicate_index().contains("첫 공고"));
        assert!(!site.join(".013_중단된 공고.partial").exists());
    }

    #[tokio::test]
    async fn test_commit_replaces_existing_folder() {
        let root = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path(), "gu");
        let old = storage.site_dir().join("004_공고");
        std::fs::create_dir_all(old.join(ATTACHMENTS_DIR)).unwrap();
        std::fs::write(old.join(ATTACHMENTS_DIR).join("old.pdf"), b"old").unwrap();

        let staged = storage.stage(4, "공고").await.unwrap();
        let target = storage.commit(&staged, &mut document("공고")).await.unwrap();

        assert_eq!(target, old);
        assert!(target.join(CONTENT_FILE).exists());
        assert!(!target.join(ATTACHMENTS_DIR).exists());
        assert_eq!(std::fs::read_dir(storage.site_dir()).unwrap().count(), 1);
    }

    #[tokio::test]
    async fn test_interrupted_replacement_is_restored() {
        let root = TempDir::new().unwrap();
        let site = root.path().join("gu");
        std::fs::create_dir_all(site.join(".007_공고.replaced")).unwrap();

        let storage = LocalStorage::new(root.path(), "gu");
        let existing = storage.scan().await.unwrap();

        assert!(site.join("007_공고").exists());
        assert_eq!(existing.max_counter, 7);
    }

    #[tokio::test]
    async fn test_write_json() {
        let root = TempDir::new().unwrap();
        let storage = LocalStorage::new(root.path(), "gu");
        let path = storage
            .write_json("urls_2025-09-30.json", &vec!["a", "b"])
            .await
            .unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("\"a\""));
    }
}
