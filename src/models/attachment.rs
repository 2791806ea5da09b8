//! Attachment download outcomes.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The mechanism that materialized an attachment's bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStrategy {
    /// Plain streamed GET of a reachable URL
    DirectGet,
    /// Browser download event after running the page script
    DownloadEvent,
    /// Response captured while intercepting the page's requests
    NetworkIntercept,
    /// Intermediate hidden form, then the real POST
    TokenExchange,
    /// Direct POST of the script's form fields
    PostForm,
}

impl fmt::Display for DownloadStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::DirectGet => "direct_get",
            Self::DownloadEvent => "download_event",
            Self::NetworkIntercept => "network_intercept",
            Self::TokenExchange => "token_exchange",
            Self::PostForm => "post_form",
        };
        f.write_str(name)
    }
}

/// Why an attachment could not be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentFailure {
    /// Handler text matched no known script shape; nothing was attempted
    UnsupportedPattern,
    /// Neither a URL nor a handler was present
    NoSource,
    /// Every applicable strategy was tried and none produced a file
    Exhausted,
    /// An I/O error while writing the file
    Write,
}

impl fmt::Display for AttachmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnsupportedPattern => "unsupported_pattern",
            Self::NoSource => "no_source",
            Self::Exhausted => "exhausted",
            Self::Write => "write",
        };
        f.write_str(name)
    }
}

/// Uniform result of acquiring one attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentResult {
    /// Declared name as shown on the detail page
    pub name: String,
    pub success: bool,
    pub saved_path: Option<PathBuf>,
    /// Download URL to report; may differ from the declared one
    pub actual_url: Option<String>,
    pub strategy: Option<DownloadStrategy>,
    pub size: u64,
    pub failure: Option<AttachmentFailure>,
    pub error: Option<String>,
}

impl AttachmentResult {
    pub fn success(
        name: impl Into<String>,
        saved_path: PathBuf,
        actual_url: Option<String>,
        strategy: DownloadStrategy,
        size: u64,
    ) -> Self {
        Self {
            name: name.into(),
            success: true,
            saved_path: Some(saved_path),
            actual_url,
            strategy: Some(strategy),
            size,
            failure: None,
            error: None,
        }
    }

    pub fn failure(
        name: impl Into<String>,
        actual_url: Option<String>,
        failure: AttachmentFailure,
        error: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            success: false,
            saved_path: None,
            actual_url,
            strategy: None,
            size: 0,
            failure: Some(failure),
            error: Some(error.into()),
        }
    }

    /// Saved file name, or the declared name when nothing was written.
    pub fn display_name(&self) -> String {
        self.saved_path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_has_no_path() {
        let result = AttachmentResult::failure(
            "a.hwp",
            None,
            AttachmentFailure::UnsupportedPattern,
            "no known script shape",
        );
        assert!(!result.success);
        assert!(result.saved_path.is_none());
        assert_eq!(result.size, 0);
        assert_eq!(result.display_name(), "a.hwp");
        assert_eq!(
            result.failure.as_ref().map(|f| f.to_string()).as_deref(),
            Some("unsupported_pattern")
        );
    }

    #[test]
    fn test_display_name_uses_saved_file() {
        let result = AttachmentResult::success(
            "첨부",
            PathBuf::from("/tmp/x/attachments/공고문.pdf"),
            Some("https://a.go.kr/f/1".into()),
            DownloadStrategy::DirectGet,
            1024,
        );
        assert_eq!(result.display_name(), "공고문.pdf");
        assert_eq!(result.strategy.map(|s| s.to_string()).as_deref(), Some("direct_get"));
    }
}
