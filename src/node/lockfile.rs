//! Lockfile parsing for Node.js ecosystems
//!
//! Extracts every resolved `name@version` from:
//! - package-lock.json (JSON; lockfileVersion 1 `dependencies` tree, or
//!   lockfileVersion 2/3 `packages` map)
//! - pnpm-lock.yaml (line heuristic, not a YAML parse)
//! - yarn.lock (classic stanzas; berry `version: x` lines are accepted too)
//!
//! Extraction is best-effort: structure we do not recognize is skipped, and
//! only a JSON document that cannot be recovered at all is an error.
//!
//! Versions are taken as written. Local (`file:`, `link:`) and git-sourced
//! entries are collected too; the registry has no publish time for them, so
//! the freshness check reports them as unknown.

use crate::deps::{DependencySet, DependencySpec, Insert};
use crate::lockfile::{LockDialect, LockfileFormat};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LockfileError {
    #[error("Failed to parse {format} lockfile: {details}")]
    Parse {
        format: LockfileFormat,
        details: String,
    },
}

/// Outcome of a successful extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extracted {
    pub dialect: LockDialect,
    /// Specs newly inserted into the set (0 means "no data")
    pub added: usize,
}

/// Extract dependencies from a lockfile of the given format into `set`
pub fn extract(
    format: LockfileFormat,
    raw: &str,
    set: &mut DependencySet,
) -> Result<Extracted, LockfileError> {
    match format {
        LockfileFormat::Npm => extract_package_lock(raw, set),
        LockfileFormat::Pnpm => Ok(Extracted {
            dialect: LockDialect::Pnpm,
            added: extract_pnpm_lock(raw, set),
        }),
        LockfileFormat::Yarn => Ok(Extracted {
            dialect: LockDialect::Yarn,
            added: extract_yarn_lock(raw, set),
        }),
    }
}

// === package-lock.json Parsing ===

/// Structure for package-lock.json
///
/// lockfileVersion 2 and 3 carry a `packages` map keyed by install path;
/// lockfileVersion 1 only has the nested `dependencies` tree. Version 2
/// carries both, and `packages` wins.
#[derive(Deserialize)]
struct PackageLockfile {
    name: Option<String>,
    packages: Option<Map<String, Value>>,
    dependencies: Option<Map<String, Value>>,
}

/// Parse package-lock.json, picking the schema from the document itself
pub fn extract_package_lock(
    raw: &str,
    set: &mut DependencySet,
) -> Result<Extracted, LockfileError> {
    let lockfile: PackageLockfile =
        parse_json_lenient(raw).map_err(|e| LockfileError::Parse {
            format: LockfileFormat::Npm,
            details: e.to_string(),
        })?;

    let mut added = 0;
    if let Some(packages) = &lockfile.packages {
        collect_packages(packages, lockfile.name.as_deref(), set, &mut added);
        return Ok(Extracted {
            dialect: LockDialect::NpmV2Plus,
            added,
        });
    }

    if let Some(dependencies) = &lockfile.dependencies {
        collect_dependency_tree(dependencies, set, &mut added);
    }
    Ok(Extracted {
        dialect: LockDialect::NpmV1,
        added,
    })
}

/// Walk a lockfileVersion 1 `dependencies` tree at any depth
fn collect_dependency_tree(deps: &Map<String, Value>, set: &mut DependencySet, added: &mut usize) {
    for (name, node) in deps {
        if let Some(version) = node.get("version").and_then(Value::as_str) {
            insert_spec(set, name, version, added);
        }
        if let Some(nested) = node.get("dependencies").and_then(Value::as_object) {
            collect_dependency_tree(nested, set, added);
        }
    }
}

/// Collect lockfileVersion 2/3 `packages` entries
fn collect_packages(
    packages: &Map<String, Value>,
    root_name: Option<&str>,
    set: &mut DependencySet,
    added: &mut usize,
) {
    for (key, entry) in packages {
        // Link-only entries (workspace symlinks) have no version
        let Some(version) = entry.get("version").and_then(Value::as_str) else {
            continue;
        };
        let name = if key.is_empty() {
            match root_name {
                Some(name) => name,
                None => continue,
            }
        } else {
            package_name_from_install_path(key)
        };
        insert_spec(set, name, version, added);
    }
}

/// Package name for a `packages` key
///
/// Keys are like "node_modules/lodash" or "node_modules/@types/node"; only
/// the leading `node_modules/` is stripped. A nested install such as
/// "node_modules/a/node_modules/b" keeps the rest of its path as its name,
/// so every versioned entry stays a distinct spec.
fn package_name_from_install_path(key: &str) -> &str {
    key.strip_prefix("node_modules/").unwrap_or(key)
}

/// Parse JSON, retrying once on the text up to its last closing brace
///
/// Lockfiles occasionally arrive with trailing garbage after the document
/// (truncated transfers, concatenated output); cutting at the last `}`
/// recovers those. The original error is returned if the retry fails too.
fn parse_json_lenient<T: DeserializeOwned>(raw: &str) -> Result<T, serde_json::Error> {
    match serde_json::from_str(raw) {
        Ok(value) => Ok(value),
        Err(first) => {
            let Some(end) = raw.rfind('}') else {
                return Err(first);
            };
            match serde_json::from_str(&raw[..=end]) {
                Ok(value) => {
                    tracing::debug!(
                        dropped = raw.len() - end - 1,
                        "recovered JSON lockfile by truncating after last brace"
                    );
                    Ok(value)
                }
                Err(_) => Err(first),
            }
        }
    }
}

// === pnpm-lock.yaml Parsing ===

/// Parse pnpm-lock.yaml with a two-line pattern match
///
/// A line that is exactly two-space indented and ends in `:` is a key; if the
/// very next line contains `version:`, the pair contributes `key@version`:
///
/// ```text
///   lodash:
///     version: 4.17.21
/// ```
///
/// This is deliberately not a YAML parse. Entries whose `version:` is not on
/// the line right after the key (for example after a `specifier:` line) are
/// not seen.
pub fn extract_pnpm_lock(raw: &str, set: &mut DependencySet) -> usize {
    let lines: Vec<&str> = raw.lines().collect();
    let mut added = 0;

    for pair in lines.windows(2) {
        if set.is_full() {
            break;
        }
        let Some(key) = parse_pnpm_key_line(pair[0]) else {
            continue;
        };
        let Some(version) = parse_pnpm_version_line(pair[1]) else {
            continue;
        };
        insert_spec(set, key, version, &mut added);
    }

    added
}

/// Key of a two-space-indented `key:` line
fn parse_pnpm_key_line(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("  ")?;
    if rest.starts_with(char::is_whitespace) {
        return None;
    }
    let key = rest.trim_end().strip_suffix(':')?;
    let key = trim_quotes(key.trim());
    if key.is_empty() { None } else { Some(key) }
}

/// Value of a line containing `version:`, without a pnpm peer suffix
///
/// pnpm 6+ writes peer-resolved versions as `18.2.0(react@18.2.0)`; only the
/// part before the parenthesis is a published version.
fn parse_pnpm_version_line(line: &str) -> Option<&str> {
    let idx = line.find("version:")?;
    let value = trim_quotes(line[idx + "version:".len()..].trim());
    let value = value.split('(').next().unwrap_or(value).trim();
    if value.is_empty() { None } else { Some(value) }
}

// === yarn.lock Parsing ===

/// Parse yarn.lock
///
/// yarn.lock uses a custom format (not standard YAML). Entries are separated
/// by blank lines and look like:
/// ```text
/// packagename@^version-range, packagename@~other-range:
///   version "resolved-version"
///   resolved "https://..."
///   integrity sha512-...
/// ```
/// The package name comes from the first selector of the header. A stanza
/// whose selectors alias different packages is attributed to the first one.
pub fn extract_yarn_lock(raw: &str, set: &mut DependencySet) -> usize {
    let mut added = 0;

    for stanza in split_stanzas(raw) {
        if set.is_full() {
            break;
        }
        let Some(header) = stanza.iter().find(|line| is_yarn_header(line)) else {
            continue;
        };
        let Some(version) = stanza.iter().find_map(|line| extract_yarn_version(line)) else {
            continue;
        };
        let Some(first) = parse_yarn_lock_header(header).into_iter().next() else {
            continue;
        };
        let Some(name) = extract_package_name_from_yarn_spec(&first) else {
            continue;
        };
        insert_spec(set, &name, &version, &mut added);
    }

    added
}

/// Group lines into blank-line separated stanzas
fn split_stanzas(raw: &str) -> Vec<Vec<&str>> {
    let mut stanzas = Vec::new();
    let mut current = Vec::new();

    for line in raw.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                stanzas.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        stanzas.push(current);
    }

    stanzas
}

fn is_yarn_header(line: &str) -> bool {
    let line = line.trim_end();
    !line.starts_with(char::is_whitespace) && !line.starts_with('#') && line.ends_with(':')
}

/// Parse yarn.lock header line into package specifications
///
/// Header format: `pkg@^1.0.0, pkg@~2.0.0:` or `"@scope/pkg@^1.0.0":`
fn parse_yarn_lock_header(line: &str) -> Vec<String> {
    let line = line.trim_end();
    let line = line.strip_suffix(':').unwrap_or(line);

    line.split(',')
        .map(|s| trim_quotes(s.trim()).to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Extract package name from yarn spec like `lodash@^4.17.0` or `@types/node@^18.0.0`
///
/// Scoped names are rebuilt from the first two `@`-delimited segments;
/// unscoped names end at the last `@`.
fn extract_package_name_from_yarn_spec(spec: &str) -> Option<String> {
    if spec.starts_with('@') {
        let scoped = spec.split('@').nth(1)?;
        if !scoped.contains('/') {
            return None;
        }
        Some(format!("@{}", scoped))
    } else {
        let at_idx = spec.rfind('@')?;
        if at_idx == 0 {
            return None;
        }
        Some(spec[..at_idx].to_string())
    }
}

/// Extract version from yarn.lock version line
///
/// Format: `  version "1.2.3"` or `  version: "1.2.3"` (yarn berry)
fn extract_yarn_version(line: &str) -> Option<String> {
    let line = line.trim();
    let version_part = line
        .strip_prefix("version ")
        .or_else(|| line.strip_prefix("version: "))?;
    let version = trim_quotes(version_part.trim());
    if version.is_empty() {
        None
    } else {
        Some(version.to_string())
    }
}

// === Shared helpers ===

fn insert_spec(set: &mut DependencySet, name: &str, version: &str, added: &mut usize) {
    if let Some(spec) = DependencySpec::new(name, version)
        && set.insert(spec) == Insert::Added
    {
        *added += 1;
    }
}

fn trim_quotes(s: &str) -> &str {
    s.trim_matches(|c| c == '"' || c == '\'')
}
