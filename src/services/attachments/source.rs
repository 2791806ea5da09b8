//! Classification of attachment references.

use regex::Regex;

use crate::error::Result;
use crate::models::{AttachmentPattern, AttachmentRef, PostForm, SiteProfile};
use crate::utils::url::resolve;

/// Where an attachment's bytes can come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttachmentSource {
    /// An ordinary reachable URL
    Direct { url: String },
    /// A link to an intermediate page holding a hidden download form
    TokenExchange { url: String },
    /// A recognized download script call
    Scripted(ScriptedCall),
    /// Script text that matches no known shape
    Unsupported { script: String },
    /// Neither a URL nor a handler
    NoSource,
}

/// A download script call with its decoded parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedCall {
    pub pattern: String,
    /// User-visible filename
    pub name: String,
    /// Server-side filename
    pub server: String,
    /// Storage path
    pub path: String,
    /// Script to run in the page
    pub script: String,
    /// Best-guess canonical download URL
    pub synthesized_url: Option<String>,
    pub endpoint: String,
    pub post: Option<PostForm>,
}

/// Compiled attachment patterns of one site.
#[derive(Debug, Clone)]
pub struct PatternSet {
    base_url: String,
    patterns: Vec<(AttachmentPattern, Regex)>,
    token_marker: Option<String>,
}

impl PatternSet {
    pub fn new(profile: &SiteProfile) -> Result<Self> {
        let patterns = profile
            .attachment_patterns
            .iter()
            .map(|p| Ok((p.clone(), p.compile()?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            base_url: profile.base_url.clone(),
            patterns,
            token_marker: profile.token_exchange.as_ref().map(|t| t.url_contains.clone()),
        })
    }

    /// Decide how an attachment will be fetched.
    ///
    /// A recognized script call wins over a plain URL. Script text that
    /// matches nothing is only tolerated when a plain URL is present.
    pub fn classify(&self, attachment: &AttachmentRef, page_url: &str) -> AttachmentSource {
        let script = attachment.script_text();
        if let Some(call) = script.and_then(|s| self.match_script(s)) {
            return AttachmentSource::Scripted(call);
        }

        if let Some(url) = attachment.plain_url().and_then(|u| resolve(page_url, u)) {
            let is_token = self
                .token_marker
                .as_deref()
                .is_some_and(|marker| url.contains(marker));
            return if is_token {
                AttachmentSource::TokenExchange { url }
            } else {
                AttachmentSource::Direct { url }
            };
        }

        match script {
            Some(script) => AttachmentSource::Unsupported {
                script: script.to_string(),
            },
            None => AttachmentSource::NoSource,
        }
    }

    fn match_script(&self, script: &str) -> Option<ScriptedCall> {
        self.patterns.iter().find_map(|(pattern, regex)| {
            let caps = regex.captures(script)?;
            let func = caps.name("func").map_or("", |m| m.as_str());
            let name = decode(caps.name("name")?.as_str());
            let server = decode(caps.name("server")?.as_str());
            let path = decode(caps.name("path")?.as_str());

            let script = render(&pattern.trigger, func, &name, &server, &path, escape_js);
            let synthesized_url = pattern.download_template.as_deref().and_then(|template| {
                let rendered = render(template, func, &name, &server, &path, |v| {
                    urlencoding::encode(v).into_owned()
                });
                resolve(&self.base_url, &rendered)
            });

            Some(ScriptedCall {
                pattern: pattern.name.clone(),
                name,
                server,
                path,
                script,
                synthesized_url,
                endpoint: pattern.endpoint.clone(),
                post: pattern.post.clone(),
            })
        })
    }
}

/// Percent-decode a parameter, keeping the raw text if it does not decode.
fn decode(value: &str) -> String {
    let value = value.trim();
    if !value.contains('%') {
        return value.to_string();
    }
    urlencoding::decode(value)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

fn escape_js(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

fn render(
    template: &str,
    func: &str,
    name: &str,
    server: &str,
    path: &str,
    encode: impl Fn(&str) -> String,
) -> String {
    template
        .replace("{func}", func)
        .replace("{name}", &encode(name))
        .replace("{server}", &encode(server))
        .replace("{path}", &encode(path))
}
