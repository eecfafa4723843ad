//! Revision-content provider interface
//!
//! The dependency collector only needs a few capabilities from wherever the
//! repository lives: resolve a revision to a tree, list that tree
//! recursively, and read single files or blobs. GitHub and a local working
//! directory both implement [`RevisionContent`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContentError {
    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Revision '{revision}' could not be resolved")]
    UnknownRevision { revision: String },

    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

/// Kind of an entry in a recursive tree listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Blob,
    Tree,
    /// Submodule commits and anything else we do not read
    Other,
}

/// One entry of a recursive tree listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    /// Content identity (blob SHA on GitHub, the path itself locally)
    pub id: String,
    pub kind: EntryKind,
}

/// Full recursive listing of a tree
#[derive(Debug, Clone, Default)]
pub struct TreeListing {
    pub entries: Vec<TreeEntry>,
    /// The provider stopped listing before reaching the end of the tree
    pub truncated: bool,
}

/// How a file body was transported
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Encoding {
    Base64,
    Utf8,
    /// No inline body; the content has to be fetched separately
    None,
}

/// Result of looking up a single path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntry {
    File {
        encoding: Encoding,
        content: String,
        size: u64,
        /// Direct-download reference for bodies too large to inline
        download_url: Option<String>,
    },
    Directory,
}

/// Read access to the files of a repository at some revision
pub trait RevisionContent {
    /// Resolve a revision (commit SHA, branch, tag) to its root tree id
    fn resolve_tree(&self, revision: &str) -> Result<String, ContentError>;

    /// List every entry under a tree, recursively
    fn list_tree(&self, tree: &str) -> Result<TreeListing, ContentError>;

    /// Look up a path at a revision; `Ok(None)` when it does not exist
    fn file(&self, revision: &str, path: &str) -> Result<Option<FileEntry>, ContentError>;

    /// Look up a blob by content identity; `Ok(None)` when it does not exist
    fn blob(&self, id: &str) -> Result<Option<FileEntry>, ContentError>;

    /// Fetch the raw bytes behind a direct-download reference
    fn download(&self, url: &str) -> Result<Vec<u8>, ContentError>;
}
