//! Dependency identifiers and the capped set lockfile parsers feed into
//!
//! A dependency is an opaque `name@version` string. Scoped names carry their
//! own `@` (`@types/node@20.1.0`), so the version is always whatever follows
//! the *last* `@`.

use serde::Serialize;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;

/// Default hard cap on the number of dependencies checked per run
pub const DEFAULT_MAX_DEPENDENCIES: usize = 5000;

/// A resolved `name@version` pair taken from a lockfile
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct DependencySpec(String);

impl DependencySpec {
    /// Build a spec from a package name and an exact version.
    ///
    /// Returns `None` when either half is empty, the name is a bare scope
    /// marker (`@scope` without `/name`), or the version carries an `@` of
    /// its own and could not be split back out.
    pub fn new(name: &str, version: &str) -> Option<Self> {
        let name = name.trim();
        let version = version.trim();
        if name.is_empty() || version.is_empty() || version.contains('@') {
            return None;
        }
        if name.starts_with('@') && !name.contains('/') {
            return None;
        }
        Some(Self(format!("{}@{}", name, version)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split into `(name, version)` at the last `@`.
    ///
    /// Returns `None` when there is no `@` after index 0 or the version half
    /// is empty.
    pub fn split(&self) -> Option<(&str, &str)> {
        split_spec(&self.0)
    }
}

impl Borrow<str> for DependencySpec {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
impl From<&str> for DependencySpec {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a raw `name@version` string at its last `@`
pub fn split_spec(raw: &str) -> Option<(&str, &str)> {
    let idx = raw.rfind('@')?;
    if idx == 0 {
        return None;
    }
    let (name, version) = (&raw[..idx], &raw[idx + 1..]);
    if version.is_empty() {
        return None;
    }
    Some((name, version))
}

/// What happened to a spec offered to a [`DependencySet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    Added,
    Duplicate,
    /// The set already holds its maximum; the entry was dropped
    Full,
}

/// Deduplicated, size-bounded set of dependency specs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySet {
    specs: BTreeSet<DependencySpec>,
    max: usize,
}

impl Default for DependencySet {
    fn default() -> Self {
        Self::with_max(DEFAULT_MAX_DEPENDENCIES)
    }
}

impl DependencySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max(max: usize) -> Self {
        Self {
            specs: BTreeSet::new(),
            max,
        }
    }

    pub fn insert(&mut self, spec: DependencySpec) -> Insert {
        if self.specs.contains(&spec) {
            return Insert::Duplicate;
        }
        if self.is_full() {
            return Insert::Full;
        }
        self.specs.insert(spec);
        Insert::Added
    }

    pub fn contains(&self, raw: &str) -> bool {
        self.specs.contains(raw)
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.specs.len() >= self.max
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencySpec> {
        self.specs.iter()
    }
}
