//! Exact file text at a revision
//!
//! Absence is the normal case here: a missing path, a directory, or a
//! failed request all come back as `None` so callers can move on to the
//! next candidate.

use crate::source::{Encoding, FileEntry, RevisionContent};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Fetch the text of `path` at `revision`
pub fn fetch_text(source: &dyn RevisionContent, revision: &str, path: &str) -> Option<String> {
    match source.file(revision, path) {
        Ok(Some(entry)) => read_entry(source, entry, path),
        Ok(None) => {
            tracing::debug!(path, revision, "file not present");
            None
        }
        Err(e) => {
            tracing::warn!(path, revision, error = %e, "failed to fetch file");
            None
        }
    }
}

/// Fetch the text of a blob by its content identity
pub fn fetch_blob_text(source: &dyn RevisionContent, id: &str, path: &str) -> Option<String> {
    match source.blob(id) {
        Ok(Some(entry)) => read_entry(source, entry, path),
        Ok(None) => {
            tracing::debug!(path, blob = id, "blob not present");
            None
        }
        Err(e) => {
            tracing::warn!(path, blob = id, error = %e, "failed to fetch blob");
            None
        }
    }
}

fn read_entry(source: &dyn RevisionContent, entry: FileEntry, path: &str) -> Option<String> {
    let FileEntry::File {
        encoding,
        content,
        size,
        download_url,
    } = entry
    else {
        tracing::debug!(path, "path is a directory");
        return None;
    };

    // Bodies over the inline limit come back with an empty content field.
    let inline_missing = content.is_empty() && size > 0;
    if encoding == Encoding::None || inline_missing {
        let Some(url) = download_url else {
            tracing::warn!(path, size, "content not inlined and no download reference");
            return None;
        };
        return match source.download(&url) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(e) => {
                tracing::warn!(path, error = %e, "failed to download content");
                None
            }
        };
    }

    match encoding {
        Encoding::Base64 => match decode_base64(&content) {
            Some(text) => Some(text),
            None => {
                tracing::warn!(path, "inline content is not valid base64");
                None
            }
        },
        _ => Some(content),
    }
}

/// Decode base64 that may be wrapped across lines
pub fn decode_base64(content: &str) -> Option<String> {
    let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD.decode(compact.as_bytes()).ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}
