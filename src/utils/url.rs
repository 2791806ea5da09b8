// src/utils/url.rs

//! URL manipulation utilities.

use url::Url;

/// Query parameters that only carry paging or session state.
const VOLATILE_PARAMS: &[&str] = &[
    "page",
    "pageindex",
    "pageno",
    "pagenum",
    "pgno",
    "cpage",
    "currentpage",
    "curpage",
    "jsessionid",
    "phpsessid",
    "sessionid",
    "sid",
];

/// Resolve a potentially relative URL against a base URL.
///
/// # Examples
/// ```
/// use gosi_crawler::utils::url::resolve;
///
/// assert_eq!(
///     resolve("https://example.go.kr/board/", "view.do?id=1"),
///     Some("https://example.go.kr/board/view.do?id=1".to_string())
/// );
/// ```
pub fn resolve(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let base = Url::parse(base).ok()?;
    base.join(href).ok().map(|u| u.to_string())
}

/// Whether the string is an absolute http(s) URL.
pub fn is_absolute(href: &str) -> bool {
    let href = href.trim();
    href.starts_with("http://") || href.starts_with("https://")
}

/// Whether the string is a root-relative path (`/x`, not `//host`).
pub fn is_root_relative(href: &str) -> bool {
    let href = href.trim();
    href.starts_with('/') && !href.starts_with("//")
}

/// Extract domain from a URL.
pub fn get_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(|s| s.to_lowercase()))
}

/// Canonical form of a detail URL for deduplication.
///
/// Drops the fragment, `;jsessionid=` path parameters and paging/session
/// query parameters, and sorts what remains.
pub fn normalize_detail_url(url: &str) -> String {
    let Ok(mut parsed) = Url::parse(url.trim()) else {
        return url.trim().to_string();
    };

    parsed.set_fragment(None);

    let path = parsed.path().to_string();
    if let Some(idx) = path.to_ascii_lowercase().find(";jsessionid=") {
        parsed.set_path(&path[..idx]);
    }

    let mut pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| !VOLATILE_PARAMS.contains(&key.to_ascii_lowercase().as_str()))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    pairs.sort();

    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(pairs);
    }
    parsed.to_string()
}
