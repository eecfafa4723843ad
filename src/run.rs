//! One check from start to finish
//!
//! `evaluate` is the pure pipeline (collect, check freshness, render).
//! `run_check` wraps it in the check-run lifecycle of a [`CheckSink`].

use crate::collect::{self, Limits};
use crate::freshness::{self, FreshnessPolicy, PackageRegistry};
use crate::output::CheckOutcome;
use crate::report::{self, CheckSink, CheckStatus, SinkError};
use crate::source::RevisionContent;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub const DEFAULT_CHECK_NAME: &str = "Day-0 dependency guard";

#[derive(Error, Debug)]
pub enum CheckError {
    #[error(transparent)]
    Sink(#[from] SinkError),
}

/// Everything that tunes a check
#[derive(Debug, Clone)]
pub struct Settings {
    pub limits: Limits,
    pub policy: FreshnessPolicy,
    pub check_name: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            policy: FreshnessPolicy::default(),
            check_name: DEFAULT_CHECK_NAME.to_string(),
        }
    }
}

/// The revision to check and where to comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    pub revision: String,
    pub pull_request: Option<u64>,
}

/// Collect, check and render one revision
pub fn evaluate(
    source: &dyn RevisionContent,
    registry: &dyn PackageRegistry,
    revision: &str,
    settings: &Settings,
    now: DateTime<Utc>,
) -> CheckOutcome {
    let collection = collect::collect_dependencies(source, revision, &settings.limits);

    // Nothing to look up when nothing was parsed
    let report = if collection.is_empty() {
        freshness::FreshnessReport::default()
    } else {
        freshness::check(&collection.dependencies, &settings.policy, now, registry)
    };

    let conclusion = report::conclude(&collection, &report);
    let rendered = report::render(conclusion, &collection, &report, &settings.policy, now);

    CheckOutcome {
        conclusion,
        title: rendered.title,
        summary: rendered.summary,
        dependencies: collection.dependencies.len(),
        lockfiles: collection.lockfiles,
        phase: collection.phase,
        violations: report.violations,
        checked: report.checked,
        unknown: report.unknown,
        truncated: report.truncated,
        capped: collection.capped,
        window_hours: settings.policy.window.num_hours(),
        comment: rendered.comment,
    }
}

/// Run a check under a check run: start it, evaluate, complete it, and
/// comment on the pull request when the conclusion calls for it.
///
/// Only failures to create or complete the check run are errors. A comment
/// that cannot be posted is logged.
pub fn run_check(
    source: &dyn RevisionContent,
    registry: &dyn PackageRegistry,
    sink: &dyn CheckSink,
    request: &CheckRequest,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Result<CheckOutcome, CheckError> {
    let id = sink.start(&settings.check_name, &request.revision)?;
    tracing::debug!(id, status = CheckStatus::InProgress.as_str(), "check run created");

    let outcome = evaluate(source, registry, &request.revision, settings, now);

    sink.complete(id, outcome.conclusion, &outcome.title, &outcome.summary)?;
    let status = CheckStatus::Completed(outcome.conclusion);
    tracing::info!(
        id,
        status = status.as_str(),
        conclusion = %outcome.conclusion,
        dependencies = outcome.dependencies,
        violations = outcome.violations.len(),
        "check run completed"
    );

    if let Some(pr) = request.pull_request
        && let Some(body) = &outcome.comment
        && let Err(e) = sink.comment(pr, body)
    {
        tracing::warn!(pr, error = %e, "failed to comment on pull request");
    }

    Ok(outcome)
}
