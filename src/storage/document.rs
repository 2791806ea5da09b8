//! `content.md` rendering.

use std::fmt::Write as _;

use crate::models::{AnnouncementDate, AttachmentResult};

/// Everything written to an announcement's `content.md`.
#[derive(Debug, Clone)]
pub struct AnnouncementDocument {
    pub title: String,
    pub url: String,
    pub date: Option<AnnouncementDate>,
    pub body: String,
    pub attachments: Vec<AttachmentResult>,
}

impl AnnouncementDocument {
    /// Render the fixed Markdown template.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", self.title);
        let _ = writeln!(out, "**원본 URL**: {}", self.url);
        if let Some(date) = self.date {
            let _ = writeln!(out, "**작성일**: {date}");
        }
        out.push_str("\n---\n\n");

        let body = self.body.trim();
        if !body.is_empty() {
            out.push_str(body);
            out.push('\n');
        }

        if !self.attachments.is_empty() {
            out.push_str("\n---\n\n**첨부파일**:\n");
            for (index, attachment) in self.attachments.iter().enumerate() {
                let name = attachment.display_name();
                match attachment.actual_url.as_deref().filter(|u| !u.is_empty()) {
                    Some(url) => {
                        let _ = writeln!(out, "{}. {}: {}", index + 1, name, url);
                    }
                    None => {
                        let _ = writeln!(out, "{}. {}", index + 1, name);
                    }
                }
            }
        }
        out
    }
}
