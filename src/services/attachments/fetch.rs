//! HTTP-level download strategies and all-or-nothing file placement.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::REFERER;
use scraper::{Html, Selector};
use tokio::io::AsyncWriteExt;

use super::filename;
use crate::error::{AppError, Result};
use crate::utils::fs::{partial_path, unique_path, write_atomic};
use crate::utils::http::{content_disposition, content_type};
use crate::utils::url::resolve;

/// A fully buffered download response.
#[derive(Debug)]
pub struct Payload {
    pub url: String,
    pub content_type: Option<String>,
    pub disposition: Option<Vec<u8>>,
    pub body: Vec<u8>,
}

impl Payload {
    fn server_name(&self) -> Option<String> {
        self.disposition.as_deref().and_then(filename::from_disposition)
    }
}

/// Reject bodies that are error pages rather than files.
pub fn validate_body(
    content_type: Option<&str>,
    status: u16,
    len: usize,
    min_bytes: usize,
) -> Result<()> {
    if !(200..300).contains(&status) {
        return Err(AppError::download(format!("HTTP {status}")));
    }
    if content_type.is_some_and(|ct| ct.to_ascii_lowercase().starts_with("text/html")) {
        return Err(AppError::download("response is an HTML page"));
    }
    if len <= min_bytes {
        return Err(AppError::download(format!(
            "response too small ({len} bytes)"
        )));
    }
    Ok(())
}

/// Write a validated payload into `dir`, returning the path and size.
pub async fn save_payload(payload: &Payload, declared: &str, dir: &Path) -> Result<(PathBuf, u64)> {
    let name = filename::choose(declared, payload.server_name().as_deref());
    let path = unique_path(dir, &name);
    write_atomic(&path, &payload.body).await?;
    log::debug!(
        "Saved {} from {} ({})",
        path.display(),
        payload.url,
        payload.content_type.as_deref().unwrap_or("unknown type")
    );
    Ok((path, payload.body.len() as u64))
}

/// Move a file the browser downloaded into `dir`.
///
/// The file is copied next to its destination first so that a failed copy
/// never leaves a file under the final name.
pub async fn adopt_file(source: &Path, name: &str, dir: &Path) -> Result<(PathBuf, u64)> {
    tokio::fs::create_dir_all(dir).await?;
    let path = unique_path(dir, name);
    let tmp = partial_path(&path);

    let copied = async {
        let size = tokio::fs::copy(source, &tmp).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok::<u64, std::io::Error>(size)
    }
    .await;

    match copied {
        Ok(size) => {
            let _ = tokio::fs::remove_file(source).await;
            Ok((path, size))
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(e.into())
        }
    }
}

/// Streamed GET of an ordinary URL straight to disk.
pub async fn stream_get(
    client: &reqwest::Client,
    url: &str,
    referer: &str,
    declared: &str,
    dir: &Path,
    timeout: Duration,
) -> Result<(PathBuf, u64)> {
    let mut response = client
        .get(url)
        .header(REFERER, referer)
        .timeout(timeout)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        return Err(AppError::download(format!("HTTP {status} for {url}")));
    }
    let media_type = content_type(response.headers());
    if media_type.as_deref() == Some("text/html") && !is_html_name(declared) {
        return Err(AppError::download(format!("{url} returned an HTML page")));
    }

    let server_name = content_disposition(response.headers())
        .and_then(|d| filename::from_disposition(&d));
    let name = filename::choose(declared, server_name.as_deref());

    tokio::fs::create_dir_all(dir).await?;
    let path = unique_path(dir, &name);
    let tmp = partial_path(&path);

    let streamed = async {
        let mut file = tokio::fs::File::create(&tmp).await?;
        let mut size = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            size += chunk.len() as u64;
        }
        file.flush().await?;
        drop(file);
        if size == 0 {
            return Err(AppError::download(format!("{url} returned an empty body")));
        }
        tokio::fs::rename(&tmp, &path).await?;
        Ok::<u64, AppError>(size)
    }
    .await;

    match streamed {
        Ok(size) => Ok((path, size)),
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp).await;
            Err(e)
        }
    }
}

fn is_html_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".html") || lower.ends_with(".htm")
}

/// Buffered GET used for synthesized URLs.
pub async fn get_payload(
    client: &reqwest::Client,
    url: &str,
    referer: &str,
    timeout: Duration,
    min_bytes: usize,
) -> Result<Payload> {
    let response = client
        .get(url)
        .header(REFERER, referer)
        .timeout(timeout)
        .send()
        .await?;
    into_payload(response, min_bytes).await
}

/// Form POST of download parameters.
pub async fn post_payload(
    client: &reqwest::Client,
    url: &str,
    referer: &str,
    fields: &[(String, String)],
    timeout: Duration,
    min_bytes: usize,
) -> Result<Payload> {
    let response = client
        .post(url)
        .header(REFERER, referer)
        .form(fields)
        .timeout(timeout)
        .send()
        .await?;
    into_payload(response, min_bytes).await
}

async fn into_payload(response: reqwest::Response, min_bytes: usize) -> Result<Payload> {
    let url = response.url().to_string();
    let status = response.status().as_u16();
    let media_type = content_type(response.headers());
    let disposition = content_disposition(response.headers());
    let body = response.bytes().await?.to_vec();

    validate_body(media_type.as_deref(), status, body.len(), min_bytes)?;
    Ok(Payload {
        url,
        content_type: media_type,
        disposition,
        body,
    })
}

/// The hidden download form of an intermediate page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HiddenForm {
    pub action: String,
    pub fields: Vec<(String, String)>,
}

/// Parse the first form carrying hidden inputs.
pub fn parse_hidden_form(html: &str, page_url: &str) -> Result<HiddenForm> {
    let document = Html::parse_document(html);
    let form_sel = Selector::parse("form").map_err(|e| AppError::selector("form", format!("{e:?}")))?;
    let input_sel = Selector::parse("input[type='hidden'], input[type=hidden]")
        .map_err(|e| AppError::selector("input[type=hidden]", format!("{e:?}")))?;

    for form in document.select(&form_sel) {
        let fields: Vec<(String, String)> = form
            .select(&input_sel)
            .filter_map(|input| {
                let name = input.value().attr("name")?.trim();
                if name.is_empty() {
                    return None;
                }
                let value = input.value().attr("value").unwrap_or("");
                Some((name.to_string(), value.to_string()))
            })
            .collect();
        if fields.is_empty() {
            continue;
        }

        let action = form
            .value()
            .attr("action")
            .filter(|a| !a.trim().is_empty())
            .and_then(|a| resolve(page_url, a))
            .unwrap_or_else(|| page_url.to_string());
        return Ok(HiddenForm { action, fields });
    }

    Err(AppError::download(format!(
        "no hidden download form on {page_url}"
    )))
}

/// Fetch the intermediate page, then submit its hidden form.
pub async fn token_exchange(
    client: &reqwest::Client,
    url: &str,
    referer: &str,
    timeout: Duration,
    min_bytes: usize,
) -> Result<Payload> {
    let page = client
        .get(url)
        .header(REFERER, referer)
        .timeout(timeout)
        .send()
        .await?;
    let status = page.status();
    if !status.is_success() {
        return Err(AppError::download(format!("HTTP {status} for {url}")));
    }
    let page_url = page.url().to_string();
    let html = page.text().await?;

    let form = parse_hidden_form(&html, &page_url)?;
    log::debug!(
        "Token exchange: posting {} field(s) to {}",
        form.fields.len(),
        form.action
    );
    post_payload(client, &form.action, &page_url, &form.fields, timeout, min_bytes).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_validate_body() {
        assert!(validate_body(Some("application/pdf"), 200, 500, 100).is_ok());
        assert!(validate_body(Some("text/html"), 200, 500, 100).is_err());
        assert!(validate_body(Some("application/pdf"), 200, 100, 100).is_err());
        assert!(validate_body(None, 404, 500, 100).is_err());
    }

    #[test]
    fn test_parse_hidden_form() {
        let html = r#"
            <form id="search"><input type="text" name="q"></form>
            <form action="/common/fileDown.do" method="post">
              <input type="hidden" name="orgFileName" value="공고문.hwp">
              <input type="hidden" name="saveFileName" value="20250901_1.hwp">
              <input type="hidden" name="filePath" value="/upload/">
            </form>"#;
        let form = parse_hidden_form(html, "https://a.go.kr/common/fileToken.do?t=x").unwrap();
        assert_eq!(form.action, "https://a.go.kr/common/fileDown.do");
        assert_eq!(form.fields.len(), 3);
        assert_eq!(form.fields[0], ("orgFileName".into(), "공고문.hwp".into()));
    }

    #[test]
    fn test_parse_hidden_form_missing() {
        assert!(parse_hidden_form("<p>만료된 링크</p>", "https://a.go.kr/t").is_err());
    }

    #[tokio::test]
    async fn test_stream_get_uses_disposition_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header(
                        "content-disposition",
                        "attachment; filename*=UTF-8''%EA%B3%B5%EA%B3%A0%EB%AC%B8.pdf",
                    )
                    .set_body_bytes(vec![7u8; 256]),
            )
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let (saved, size) = stream_get(
            &reqwest::Client::new(),
            &format!("{}/files/1", server.uri()),
            &server.uri(),
            "첨부",
            dir.path(),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(size, 256);
        assert_eq!(saved.file_name().unwrap(), "공고문.pdf");
        assert_eq!(std::fs::metadata(&saved).unwrap().len(), 256);
        assert!(!partial_path(&saved).exists());
    }

    #[tokio::test]
    async fn test_stream_get_failure_leaves_no_file() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let result = stream_get(
            &reqwest::Client::new(),
            &format!("{}/files/2", server.uri()),
            &server.uri(),
            "공고문.pdf",
            dir.path(),
            Duration::from_secs(5),
        )
        .await;

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_token_exchange_posts_hidden_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fileToken.do"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<form action="/fileDown.do" method="post">
                     <input type="hidden" name="saveFileName" value="S123.pdf">
                   </form>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/fileDown.do"))
            .and(body_string_contains("saveFileName=S123.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(vec![1u8; 300]),
            )
            .expect(1)
            .mount(&server)
            .await;

        let payload = token_exchange(
            &reqwest::Client::new(),
            &format!("{}/fileToken.do?t=abc", server.uri()),
            &server.uri(),
            Duration::from_secs(5),
            100,
        )
        .await
        .unwrap();

        assert_eq!(payload.body.len(), 300);
        assert!(payload.url.ends_with("/fileDown.do"));
    }
}
