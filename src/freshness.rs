//! Day-0 freshness check
//!
//! Looks up the publish instant of every collected dependency and flags the
//! ones published less than `window` before `now`. A dependency whose
//! publish time cannot be established is "unknown", never a violation.

use crate::deps::DependencySet;
use crate::node::RegistryError;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

/// Default trailing window in hours
pub const DEFAULT_WINDOW_HOURS: u64 = 24;

/// Default cap on reported violations
pub const DEFAULT_MAX_VIOLATIONS: usize = 50;

/// Version string -> publish-instant string, as served by the registry
pub type PublishTimes = HashMap<String, String>;

/// Source of package publish times
pub trait PackageRegistry {
    /// Publish times for every version of `package`.
    ///
    /// `Ok(None)` means the registry answered with a non-success status.
    fn publish_times(&self, package: &str) -> Result<Option<PublishTimes>, RegistryError>;
}

/// What counts as too fresh, and how much to report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    pub window: Duration,
    pub max_violations: usize,
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self {
            window: Duration::hours(DEFAULT_WINDOW_HOURS as i64),
            max_violations: DEFAULT_MAX_VIOLATIONS,
        }
    }
}

/// A dependency published inside the window
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub name: String,
    pub version: String,
    pub published_at: DateTime<Utc>,
}

impl Violation {
    /// Whole hours between publishing and `now`
    pub fn age_hours(&self, now: DateTime<Utc>) -> i64 {
        (now - self.published_at).num_hours()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FreshnessReport {
    pub violations: Vec<Violation>,
    /// Dependencies looked up
    pub checked: usize,
    /// Dependencies whose publish time could not be established
    pub unknown: usize,
    /// Checking stopped early at the violation cap
    pub truncated: bool,
}

/// Check every dependency in `set` against the policy
pub fn check(
    set: &DependencySet,
    policy: &FreshnessPolicy,
    now: DateTime<Utc>,
    registry: &dyn PackageRegistry,
) -> FreshnessReport {
    let mut report = FreshnessReport::default();
    let max_violations = policy.max_violations.max(1);

    for spec in set.iter() {
        if report.violations.len() >= max_violations {
            report.truncated = true;
            tracing::info!(max_violations, "violation cap reached, stopping early");
            break;
        }

        let Some((name, version)) = spec.split() else {
            tracing::debug!(spec = %spec, "skipping spec without name@version split");
            report.unknown += 1;
            continue;
        };
        report.checked += 1;

        let times = match registry.publish_times(name) {
            Ok(Some(times)) => times,
            Ok(None) => {
                report.unknown += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!(package = name, error = %e, "registry lookup failed");
                report.unknown += 1;
                continue;
            }
        };

        let Some(published_at) = times.get(version).and_then(|at| parse_instant(at)) else {
            tracing::debug!(package = name, version, "no publish time for version");
            report.unknown += 1;
            continue;
        };

        if now - published_at < policy.window {
            tracing::info!(package = name, version, %published_at, "day-0 dependency");
            report.violations.push(Violation {
                name: name.to_string(),
                version: version.to_string(),
                published_at,
            });
        }
    }

    report
}

fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|at| at.with_timezone(&Utc))
}
