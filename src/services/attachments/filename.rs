//! Choosing a trustworthy filename for a downloaded attachment.

use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::utils::fs::{PLACEHOLDER_NAME, is_garbled, sanitize_filename};

static EXTENDED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)filename\*\s*=\s*(?:[\w-]+)?'[^']*'([^;]+)"#).expect("valid regex")
});

static PLAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i-u)filename\s*=\s*(?:"([^"]*)"|([^;]+))"#).expect("valid regex")
});

/// Names servers send when they have nothing better.
const GENERIC_NAMES: &[&str] = &[
    "attachment",
    "download",
    "file",
    "filedown",
    "filedownload",
    "download.do",
    "filedown.do",
    "download.jsp",
    "noname",
    "unknown",
];

/// Filename announced by a `Content-Disposition` header.
///
/// `filename*=` (RFC 5987) takes precedence. Plain `filename=` values are
/// percent-decoded when they look encoded. Bytes that are not valid UTF-8
/// come back lossily decoded, which [`is_garbled`] then rejects.
pub fn from_disposition(header: &[u8]) -> Option<String> {
    if let Some(caps) = EXTENDED.captures(header) {
        let raw = String::from_utf8_lossy(caps.get(1)?.as_bytes());
        if let Ok(decoded) = urlencoding::decode(raw.trim()) {
            return non_empty(decoded.into_owned());
        }
    }

    let caps = PLAIN.captures(header)?;
    let raw = caps.get(1).or_else(|| caps.get(2))?.as_bytes();
    let text = String::from_utf8_lossy(raw).trim().to_string();
    let text = if text.contains('%') {
        urlencoding::decode(&text)
            .map(|d| d.into_owned())
            .unwrap_or(text)
    } else {
        text
    };
    non_empty(text)
}

fn non_empty(name: String) -> Option<String> {
    let name = name.trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// Whether a name carries no information about the file.
pub fn is_generic(name: &str) -> bool {
    let lower = name.trim().to_lowercase();
    lower.is_empty() || GENERIC_NAMES.contains(&lower.as_str())
}

/// Pick the name to save under: the server's name when it is meaningful,
/// else the declared one, else the placeholder. The result is sanitized.
pub fn choose(declared: &str, server_name: Option<&str>) -> String {
    let usable = |name: &&str| !is_generic(name) && !is_garbled(name);

    let chosen = server_name
        .filter(usable)
        .or(Some(declared).filter(usable))
        .unwrap_or(PLACEHOLDER_NAME);
    sanitize_filename(chosen)
}
