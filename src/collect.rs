//! Dependency collection across a repository snapshot
//!
//! Root lockfiles are probed first. Only when none of them yields a single
//! dependency is the whole tree listed and every nested lockfile parsed, in
//! listing order, until the dependency cap is reached.

use crate::blob;
use crate::deps::{DEFAULT_MAX_DEPENDENCIES, DependencySet};
use crate::lockfile::{self, LockDialect, LockfileDescriptor};
use crate::node;
use crate::source::RevisionContent;
use serde::Serialize;
use std::collections::HashSet;

/// Resource limits for one collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub max_dependencies: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_dependencies: DEFAULT_MAX_DEPENDENCIES,
        }
    }
}

/// Which discovery phase produced the dependencies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    RootFiles,
    FullScan,
}

/// A lockfile that parsed successfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedLockfile {
    pub path: String,
    pub dialect: LockDialect,
    /// Dependencies this file added to the set
    pub added: usize,
}

/// Everything discovery and parsing produced for one revision
#[derive(Debug, Clone)]
pub struct Collection {
    pub dependencies: DependencySet,
    pub lockfiles: Vec<ParsedLockfile>,
    pub phase: Option<Phase>,
    /// The dependency cap was reached and further input was dropped
    pub capped: bool,
}

impl Collection {
    fn new(limits: &Limits) -> Self {
        Self {
            dependencies: DependencySet::with_max(limits.max_dependencies),
            lockfiles: Vec::new(),
            phase: None,
            capped: false,
        }
    }

    /// No lockfile could be parsed into at least one dependency
    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }
}

/// Collect the dependency set of `revision`
///
/// Never fails: unreadable or malformed lockfiles are logged and skipped,
/// and a revision that cannot be resolved ends the full scan early. Callers
/// tell "nothing parsed" apart with [`Collection::is_empty`].
pub fn collect_dependencies(
    source: &dyn RevisionContent,
    revision: &str,
    limits: &Limits,
) -> Collection {
    let mut collection = Collection::new(limits);
    let mut probed = HashSet::new();

    for candidate in lockfile::root_candidates() {
        let Some(text) = blob::fetch_text(source, revision, &candidate.path) else {
            continue;
        };
        probed.insert(candidate.path.clone());
        parse_into(&mut collection, &candidate, &text);
        if !collection.dependencies.is_empty() {
            collection.phase = Some(Phase::RootFiles);
            collection.capped = collection.dependencies.is_full();
            tracing::info!(
                path = %candidate.path,
                dependencies = collection.dependencies.len(),
                "collected dependencies from root lockfile"
            );
            return collection;
        }
    }

    tracing::debug!(revision, "no dependencies in root lockfiles, scanning full tree");
    full_scan(source, revision, &probed, &mut collection);

    if !collection.dependencies.is_empty() {
        collection.phase = Some(Phase::FullScan);
    }
    tracing::info!(
        lockfiles = collection.lockfiles.len(),
        dependencies = collection.dependencies.len(),
        capped = collection.capped,
        "full tree scan finished"
    );
    collection
}

fn full_scan(
    source: &dyn RevisionContent,
    revision: &str,
    probed: &HashSet<String>,
    collection: &mut Collection,
) {
    let tree = match source.resolve_tree(revision) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!(revision, error = %e, "cannot resolve revision for full scan");
            return;
        }
    };
    let listing = match source.list_tree(&tree) {
        Ok(listing) => listing,
        Err(e) => {
            tracing::warn!(revision, tree = %tree, error = %e, "cannot list tree");
            return;
        }
    };
    if listing.truncated {
        tracing::warn!(
            entries = listing.entries.len(),
            "tree listing truncated, nested lockfiles past the cut are not checked"
        );
    }

    for candidate in lockfile::scan_tree(&listing.entries) {
        if collection.dependencies.is_full() {
            collection.capped = true;
            tracing::info!(
                max = collection.dependencies.max(),
                "dependency cap reached, skipping remaining lockfiles"
            );
            return;
        }
        // Root files already came back empty in the fast path
        if probed.contains(&candidate.path) {
            continue;
        }
        let text = match &candidate.blob {
            Some(id) => blob::fetch_blob_text(source, id, &candidate.path),
            None => blob::fetch_text(source, revision, &candidate.path),
        };
        if let Some(text) = text {
            parse_into(collection, &candidate, &text);
        }
    }

    if collection.dependencies.is_full() {
        collection.capped = true;
    }
}

fn parse_into(collection: &mut Collection, candidate: &LockfileDescriptor, text: &str) {
    match node::extract(candidate.format, text, &mut collection.dependencies) {
        Ok(extracted) => {
            tracing::debug!(
                path = %candidate.path,
                dialect = %extracted.dialect,
                added = extracted.added,
                "parsed lockfile"
            );
            if extracted.added > 0 {
                collection.lockfiles.push(ParsedLockfile {
                    path: candidate.path.clone(),
                    dialect: extracted.dialect,
                    added: extracted.added,
                });
            }
        }
        Err(e) => {
            tracing::warn!(path = %candidate.path, error = %e, "skipping unparsable lockfile");
        }
    }
}
