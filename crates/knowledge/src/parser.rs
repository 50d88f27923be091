//! Source file parsing and text extraction.

use crate::types::Document;
use notewise_core::{AppError, AppResult};
use std::fs;
use std::path::Path;

/// Content type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Markdown,
    Html,
    PlainText,
    Unknown,
}

impl ContentType {
    /// Detect content type from file extension.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("md") | Some("markdown") => Self::Markdown,
            Some("html") | Some("htm") => Self::Html,
            Some("txt") => Self::PlainText,
            _ => Self::Unknown,
        }
    }

    /// Get string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::PlainText => "text",
            Self::Unknown => "unknown",
        }
    }
}

/// Read a source file and extract clean text.
///
/// Fails with [`AppError::Io`] for unreadable or non-UTF-8 files and with
/// [`AppError::BadRequest`] for files that look binary; the ingestion
/// pipeline skips both.
pub fn parse_file(path: &Path) -> AppResult<Document> {
    let content_type = ContentType::from_path(path);
    let raw = fs::read_to_string(path)?;

    if !is_likely_text(&raw) {
        tracing::warn!("Skipping likely binary file: {:?}", path);
        return Err(AppError::BadRequest(format!(
            "{} looks like a binary file",
            path.display()
        )));
    }

    let text = match content_type {
        ContentType::Markdown => clean_markdown(&raw),
        ContentType::Html => clean_html(&raw),
        ContentType::PlainText | ContentType::Unknown => raw.trim().to_string(),
    };

    Ok(Document {
        path: path.to_path_buf(),
        size_bytes: raw.len() as u64,
        text,
        content_type,
    })
}

/// Clean markdown by removing excess formatting.
fn clean_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for line in text.lines() {
        // Remove markdown headers
        let trimmed = line.trim_start_matches('#').trim();

        // Skip horizontal rules, front matter delimiters and code fences
        if trimmed.starts_with("---") || trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            continue;
        }

        if !trimmed.is_empty() {
            result.push_str(trimmed);
            result.push('\n');
        }
    }

    result.trim().to_string()
}

/// Clean HTML by stripping tags (simple approach).
fn clean_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_tag = false;
    let mut in_script = false;
    let mut in_style = false;

    for (i, ch) in text.char_indices() {
        if ch == '<' {
            in_tag = true;
            let rest = &text[i..];

            if starts_with_ignore_case(rest, "<script") {
                in_script = true;
            } else if starts_with_ignore_case(rest, "</script") {
                in_script = false;
            } else if starts_with_ignore_case(rest, "<style") {
                in_style = true;
            } else if starts_with_ignore_case(rest, "</style") {
                in_style = false;
            }
        } else if ch == '>' {
            in_tag = false;
            result.push(' ');
        } else if !in_tag && !in_script && !in_style {
            result.push(ch);
        }
    }

    // Collapse whitespace
    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn starts_with_ignore_case(haystack: &str, prefix: &str) -> bool {
    haystack
        .get(..prefix.len())
        .map(|head| head.eq_ignore_ascii_case(prefix))
        .unwrap_or(false)
}

/// Check if text is likely UTF-8 text (not binary).
fn is_likely_text(data: &str) -> bool {
    !data.contains('\0')
}
