// src/utils/fs.rs

//! Filesystem helpers: name sanitizing and all-or-nothing writes.

use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;

/// Placeholder used when a filename cannot be trusted.
pub const PLACEHOLDER_NAME: &str = "attachment";

/// Maximum title length (in graphemes) used in folder names.
pub const MAX_TITLE_GRAPHEMES: usize = 80;

/// Suffix for files that are still being written.
const PARTIAL_SUFFIX: &str = ".part";

/// Replace filesystem-unsafe characters and collapse whitespace.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => ' ',
            c => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = collapsed.trim_matches(|c: char| c == '.' || c == ' ');

    if trimmed.is_empty() {
        PLACEHOLDER_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Sanitized, length-bounded title for use in a folder name.
pub fn sanitize_title(title: &str) -> String {
    let sanitized = sanitize_filename(title);
    let truncated: String = sanitized.graphemes(true).take(MAX_TITLE_GRAPHEMES).collect();
    truncated.trim_end().to_string()
}

/// Whether a decoded filename shows signs of a wrong charset.
///
/// UTF-8 bytes read as Latin-1 yield C1 controls and `Ã`/`ì`-style pairs;
/// failed decodes leave U+FFFD.
pub fn is_garbled(name: &str) -> bool {
    if name.contains('\u{FFFD}') {
        return true;
    }
    if name.chars().any(|c| ('\u{0080}'..='\u{009F}').contains(&c)) {
        return true;
    }
    let chars: Vec<char> = name.chars().collect();
    chars.windows(2).any(|pair| {
        matches!(pair[0], '\u{00C2}'..='\u{00EF}') && matches!(pair[1], '\u{00A0}'..='\u{00BF}')
    })
}

/// Pick a path inside `dir` that does not collide with an existing file.
pub fn unique_path(dir: &Path, file_name: &str) -> PathBuf {
    let candidate = dir.join(file_name);
    if !candidate.exists() {
        return candidate;
    }

    let (stem, ext) = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (file_name, None),
    };
    (1..)
        .map(|n| match ext {
            Some(ext) => dir.join(format!("{stem}_{n}.{ext}")),
            None => dir.join(format!("{stem}_{n}")),
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Temporary sibling path used while a file is being written.
pub fn partial_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(PARTIAL_SUFFIX);
    path.with_file_name(name)
}

/// Write bytes atomically (write to temp, then rename).
pub async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let tmp = partial_path(path);
    let written = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);
        tokio::fs::rename(&tmp, path).await
    }
    .await;

    if let Err(e) = written {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sanitize_unsafe_characters() {
        assert_eq!(
            sanitize_filename("2025년 공고: 모집/선정 <결과>?.hwp"),
            "2025년 공고_ 모집_선정 _결과__.hwp"
        );
    }

    #[test]
    fn test_sanitize_empty_uses_placeholder() {
        assert_eq!(sanitize_filename("  ..  "), PLACEHOLDER_NAME);
        assert_eq!(sanitize_filename("///"), "___");
    }

    #[test]
    fn test_sanitize_title_truncates_on_graphemes() {
        let long = "가".repeat(200);
        let title = sanitize_title(&long);
        assert_eq!(title.chars().count(), MAX_TITLE_GRAPHEMES);
    }

    #[test]
    fn test_garbled_detection() {
        assert!(is_garbled("ê³µê³ ë¬¸.hwp"));
        assert!(is_garbled("file\u{FFFD}.pdf"));
        assert!(!is_garbled("공고문.hwp"));
        assert!(!is_garbled("report-2025.pdf"));
        assert!(!is_garbled("Café.pdf"));
    }

    #[test]
    fn test_unique_path_appends_counter() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("a.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("a_1.pdf"), b"x").unwrap();
        assert_eq!(unique_path(tmp.path(), "a.pdf"), tmp.path().join("a_2.pdf"));
        assert_eq!(unique_path(tmp.path(), "b.pdf"), tmp.path().join("b.pdf"));
    }

    #[tokio::test]
    async fn test_write_atomic_leaves_no_partial() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("content.md");
        write_atomic(&path, b"# title").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"# title");
        assert!(!partial_path(&path).exists());
    }
}
