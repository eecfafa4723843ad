//! Lockfile names, dialect tags and candidate discovery
//!
//! Lockfiles are recognized by basename only. The root fast path probes
//! [`ROOT_LOCKFILES`] in priority order; the full scan keeps every blob in a
//! tree listing whose basename is one of them, at any depth.

use crate::source::{EntryKind, TreeEntry};
use serde::Serialize;
use std::fmt;

/// Root-level lockfiles probed by the fast path, highest priority first
pub const ROOT_LOCKFILES: [&str; 3] = ["package-lock.json", "pnpm-lock.yaml", "yarn.lock"];

/// Lockfile family, inferred from the file name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LockfileFormat {
    Npm,
    Pnpm,
    Yarn,
}

impl LockfileFormat {
    /// Detect the format from a path's basename
    pub fn from_path(path: &str) -> Option<Self> {
        match basename(path) {
            "package-lock.json" => Some(LockfileFormat::Npm),
            "pnpm-lock.yaml" => Some(LockfileFormat::Pnpm),
            "yarn.lock" => Some(LockfileFormat::Yarn),
            _ => None,
        }
    }
}

impl fmt::Display for LockfileFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockfileFormat::Npm => write!(f, "npm"),
            LockfileFormat::Pnpm => write!(f, "pnpm"),
            LockfileFormat::Yarn => write!(f, "yarn"),
        }
    }
}

/// Concrete schema a lockfile was parsed with.
///
/// npm lockfiles share one file name across schema versions, so the npm
/// dialect is only known once the document has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LockDialect {
    NpmV1,
    #[serde(rename = "npm-v2plus")]
    NpmV2Plus,
    Pnpm,
    Yarn,
}

impl fmt::Display for LockDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockDialect::NpmV1 => write!(f, "npm-v1"),
            LockDialect::NpmV2Plus => write!(f, "npm-v2plus"),
            LockDialect::Pnpm => write!(f, "pnpm"),
            LockDialect::Yarn => write!(f, "yarn"),
        }
    }
}

/// A lockfile found in a repository snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockfileDescriptor {
    /// Path relative to the repository root
    pub path: String,
    pub format: LockfileFormat,
    /// Blob identity when known from a tree listing
    pub blob: Option<String>,
}

impl LockfileDescriptor {
    pub fn from_path(path: &str) -> Option<Self> {
        let format = LockfileFormat::from_path(path)?;
        Some(Self {
            path: path.to_string(),
            format,
            blob: None,
        })
    }
}

/// Root-level candidates for the fast path, in priority order
pub fn root_candidates() -> Vec<LockfileDescriptor> {
    ROOT_LOCKFILES
        .iter()
        .filter_map(|name| LockfileDescriptor::from_path(name))
        .collect()
}

/// Keep the lockfile blobs of a recursive tree listing, in listing order
pub fn scan_tree(entries: &[TreeEntry]) -> Vec<LockfileDescriptor> {
    entries
        .iter()
        .filter(|entry| entry.kind == EntryKind::Blob)
        .filter_map(|entry| {
            let mut descriptor = LockfileDescriptor::from_path(&entry.path)?;
            descriptor.blob = Some(entry.id.clone());
            Some(descriptor)
        })
        .collect()
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob(path: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            id: format!("sha-{}", path),
            kind: EntryKind::Blob,
        }
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            LockfileFormat::from_path("package-lock.json"),
            Some(LockfileFormat::Npm)
        );
        assert_eq!(
            LockfileFormat::from_path("apps/web/pnpm-lock.yaml"),
            Some(LockfileFormat::Pnpm)
        );
        assert_eq!(
            LockfileFormat::from_path("packages/ui/yarn.lock"),
            Some(LockfileFormat::Yarn)
        );
        assert_eq!(LockfileFormat::from_path("package.json"), None);
        assert_eq!(LockfileFormat::from_path("not-yarn.lock.bak"), None);
    }

    #[test]
    fn test_root_candidates_priority() {
        let paths: Vec<String> = root_candidates().into_iter().map(|d| d.path).collect();
        assert_eq!(paths, vec!["package-lock.json", "pnpm-lock.yaml", "yarn.lock"]);
    }

    #[test]
    fn test_scan_tree_keeps_listing_order_and_blob_ids() {
        let entries = vec![
            blob("README.md"),
            blob("packages/b/yarn.lock"),
            TreeEntry {
                path: "packages/a".to_string(),
                id: "tree-a".to_string(),
                kind: EntryKind::Tree,
            },
            blob("packages/a/package-lock.json"),
            blob("packages/a/package.json"),
        ];

        let found = scan_tree(&entries);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].path, "packages/b/yarn.lock");
        assert_eq!(found[0].format, LockfileFormat::Yarn);
        assert_eq!(found[1].path, "packages/a/package-lock.json");
        assert_eq!(found[1].blob.as_deref(), Some("sha-packages/a/package-lock.json"));
    }

    #[test]
    fn test_dialect_display() {
        assert_eq!(LockDialect::NpmV2Plus.to_string(), "npm-v2plus");
        assert_eq!(LockDialect::NpmV1.to_string(), "npm-v1");
        assert_eq!(
            serde_json::to_value(LockDialect::NpmV2Plus).unwrap(),
            "npm-v2plus"
        );
    }
}
