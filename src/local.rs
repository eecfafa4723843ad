//! Local working tree as a revision-content provider
//!
//! The directory on disk is the only revision there is, so revisions are
//! accepted and ignored. Blob ids are relative paths.

use crate::source::{ContentError, EntryKind, Encoding, FileEntry, RevisionContent, TreeEntry, TreeListing};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories that are never part of the checked-in tree
const SKIPPED_DIRS: [&str; 2] = [".git", "node_modules"];

pub struct LocalTree {
    root: PathBuf,
}

impl LocalTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn read(&self, path: &str) -> Result<Option<FileEntry>, ContentError> {
        let full = self.root.join(path);
        if full.is_dir() {
            return Ok(Some(FileEntry::Directory));
        }
        if !full.is_file() {
            return Ok(None);
        }
        let bytes = std::fs::read(&full).map_err(|source| ContentError::Io {
            path: full.display().to_string(),
            source,
        })?;
        Ok(Some(FileEntry::File {
            encoding: Encoding::Utf8,
            size: bytes.len() as u64,
            content: String::from_utf8_lossy(&bytes).into_owned(),
            download_url: None,
        }))
    }
}

impl RevisionContent for LocalTree {
    fn resolve_tree(&self, _revision: &str) -> Result<String, ContentError> {
        if !self.root.is_dir() {
            return Err(ContentError::Io {
                path: self.root.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            });
        }
        Ok(String::new())
    }

    fn list_tree(&self, tree: &str) -> Result<TreeListing, ContentError> {
        let base = self.root.join(tree);
        let walker = WalkDir::new(&base)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                !(e.file_type().is_dir()
                    && e.file_name()
                        .to_str()
                        .is_some_and(|name| SKIPPED_DIRS.contains(&name)))
            });

        let mut entries = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let Some(path) = relative_path(&self.root, entry.path()) else {
                continue;
            };
            let kind = if entry.file_type().is_file() {
                EntryKind::Blob
            } else if entry.file_type().is_dir() {
                EntryKind::Tree
            } else {
                EntryKind::Other
            };
            entries.push(TreeEntry {
                id: path.clone(),
                path,
                kind,
            });
        }

        Ok(TreeListing {
            entries,
            truncated: false,
        })
    }

    fn file(&self, _revision: &str, path: &str) -> Result<Option<FileEntry>, ContentError> {
        self.read(path)
    }

    fn blob(&self, id: &str) -> Result<Option<FileEntry>, ContentError> {
        self.read(id)
    }

    fn download(&self, url: &str) -> Result<Vec<u8>, ContentError> {
        Err(ContentError::Transport {
            url: url.to_string(),
            message: "downloads are not available for a local tree".to_string(),
        })
    }
}

/// `/`-separated path relative to `root`
fn relative_path(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<&str> = rel
        .components()
        .map(|c| c.as_os_str().to_str())
        .collect::<Option<_>>()?;
    Some(parts.join("/"))
}
