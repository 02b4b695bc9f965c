//! Binary download results.
//!
//! A download hands back an owned buffer with the filename recovered from
//! `content-disposition`. Dropping it releases the bytes; `save_into` writes
//! them out.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use bytes::Bytes;
use regex::Regex;

use super::transport::HttpResponse;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct DownloadedFile {
    /// Server-supplied filename, if the response carried one.
    pub file_name: Option<String>,
    pub content_type: String,
    pub data: Bytes,
}

impl DownloadedFile {
    pub(crate) fn from_response(response: HttpResponse, fallback_name: Option<&str>) -> Self {
        let file_name = response
            .header("content-disposition")
            .and_then(filename_from_disposition)
            .or_else(|| fallback_name.map(str::to_string));
        let content_type = response
            .header("content-type")
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        Self {
            file_name,
            content_type,
            data: response.body,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Write the file into `dir` under its server name (or `default_name`).
    ///
    /// Path separators in the server name are replaced so the file always
    /// lands directly inside `dir`.
    pub fn save_into(&self, dir: &Path, default_name: &str) -> std::io::Result<PathBuf> {
        let name = self
            .file_name
            .as_deref()
            .map(sanitize)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_name.to_string());
        let path = dir.join(name);
        std::fs::write(&path, &self.data)?;
        Ok(path)
    }
}

fn disposition_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    // filename[^;=\n]*=((['"]).*?\2|[^;\n]*), spelled out without the back-reference.
    PATTERN.get_or_init(|| {
        Regex::new(r#"filename[^;=\n]*=("[^"]*"|'[^']*'|[^;\n]*)"#)
            .unwrap_or_else(|e| unreachable!("static pattern: {}", e))
    })
}

/// Extract the filename from a `content-disposition` header value.
///
/// Quotes are stripped and the result percent-decoded; when decoding fails
/// the raw name is kept.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let captures = disposition_pattern().captures(header)?;
    let raw = captures.get(1)?.as_str();
    let unquoted: String = raw.chars().filter(|c| *c != '"' && *c != '\'').collect();
    if unquoted.is_empty() {
        return None;
    }

    match urlencoding::decode(&unquoted) {
        Ok(decoded) => Some(decoded.into_owned()),
        Err(e) => {
            log::warn!("Failed to decode filename {:?}: {}", unquoted, e);
            Some(unquoted)
        }
    }
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '/' | '\\' | '\0') { '_' } else { c })
        .collect::<String>()
        .trim_matches('.')
        .to_string()
}
