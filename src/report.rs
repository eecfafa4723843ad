//! Check-run conclusions and the Markdown posted back to the pull request

use crate::collect::Collection;
use crate::freshness::{FreshnessPolicy, FreshnessReport};
use crate::lockfile::ROOT_LOCKFILES;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Heading of every PR comment
const COMMENT_HEADING: &str = "### Day-0 dependency guard";

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to create check run '{name}': {message}")]
    Create { name: String, message: String },

    #[error("Failed to complete check run {id}: {message}")]
    Complete { id: u64, message: String },

    #[error("Failed to comment on pull request #{pr}: {message}")]
    Comment { pr: u64, message: String },
}

/// Terminal state of a check run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Neutral,
}

impl Conclusion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Conclusion::Success => "success",
            Conclusion::Failure => "failure",
            Conclusion::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of a check run: created in progress, completed once
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    InProgress,
    Completed(Conclusion),
}

impl CheckStatus {
    /// Status name as the check-runs API spells it
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::InProgress => "in_progress",
            CheckStatus::Completed(_) => "completed",
        }
    }
}

/// Where check runs and PR comments go
pub trait CheckSink {
    /// Create a check run in progress for `head_sha`, returning its id
    fn start(&self, name: &str, head_sha: &str) -> Result<u64, SinkError>;

    /// Complete a check run with its conclusion and output
    fn complete(
        &self,
        id: u64,
        conclusion: Conclusion,
        title: &str,
        summary: &str,
    ) -> Result<(), SinkError>;

    /// Post a comment on a pull request
    fn comment(&self, pr: u64, body: &str) -> Result<(), SinkError>;
}

/// Decide the conclusion: neutral when nothing was parsed, failure on any
/// violation, success otherwise
pub fn conclude(collection: &Collection, report: &FreshnessReport) -> Conclusion {
    if collection.is_empty() {
        Conclusion::Neutral
    } else if !report.violations.is_empty() {
        Conclusion::Failure
    } else {
        Conclusion::Success
    }
}

/// Rendered check-run output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub title: String,
    pub summary: String,
    /// PR comment body, only for failure and neutral
    pub comment: Option<String>,
}

pub fn render(
    conclusion: Conclusion,
    collection: &Collection,
    report: &FreshnessReport,
    policy: &FreshnessPolicy,
    now: DateTime<Utc>,
) -> Rendered {
    let window_hours = policy.window.num_hours();
    let (title, summary) = match conclusion {
        Conclusion::Neutral => (
            "No lockfile parsed".to_string(),
            neutral_summary(),
        ),
        Conclusion::Failure => (
            format!(
                "{} {} published in the last {} hours",
                report.violations.len(),
                plural(report.violations.len(), "dependency", "dependencies"),
                window_hours
            ),
            failure_summary(collection, report, policy, now),
        ),
        Conclusion::Success => (
            "No Day-0 dependencies".to_string(),
            success_summary(collection, report, window_hours),
        ),
    };

    let comment = match conclusion {
        Conclusion::Success => None,
        _ => Some(format!("{}\n\n**{}**\n\n{}", COMMENT_HEADING, title, summary)),
    };

    Rendered {
        title,
        summary,
        comment,
    }
}

fn neutral_summary() -> String {
    let supported: Vec<String> = ROOT_LOCKFILES.iter().map(|name| format!("`{}`", name)).collect();
    format!(
        "No lockfile parsed, so no dependency could be checked.\n\n\
         Commit one of the supported lockfiles at the repository root or in a \
         workspace package: {}.",
        supported.join(", ")
    )
}

fn failure_summary(
    collection: &Collection,
    report: &FreshnessReport,
    policy: &FreshnessPolicy,
    now: DateTime<Utc>,
) -> String {
    let mut out = format!(
        "These dependencies were published less than {} hours ago:\n\n\
         | Package | Version | Published | Age |\n\
         | --- | --- | --- | --- |\n",
        policy.window.num_hours()
    );
    for violation in &report.violations {
        out.push_str(&format!(
            "| `{}` | `{}` | {} | {}h |\n",
            violation.name,
            violation.version,
            violation
                .published_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
            violation.age_hours(now)
        ));
    }
    if report.truncated {
        out.push_str(&format!(
            "\nStopped after {} violations; more may exist.\n",
            policy.max_violations.max(1)
        ));
    }
    push_footnotes(&mut out, collection, report);
    out
}

fn success_summary(collection: &Collection, report: &FreshnessReport, window_hours: i64) -> String {
    let lockfiles = collection.lockfiles.len();
    let mut out = format!(
        "Checked {} {} from {} {}; none was published in the last {} hours.\n",
        collection.dependencies.len(),
        plural(collection.dependencies.len(), "dependency", "dependencies"),
        lockfiles,
        plural(lockfiles, "lockfile", "lockfiles"),
        window_hours
    );
    push_footnotes(&mut out, collection, report);
    out
}

fn push_footnotes(out: &mut String, collection: &Collection, report: &FreshnessReport) {
    if collection.capped {
        out.push_str(&format!(
            "\nDependency cap of {} reached; remaining lockfile entries were not checked.\n",
            collection.dependencies.max()
        ));
    }
    if report.unknown > 0 {
        out.push_str(&format!(
            "\n{} {} could not be dated on the registry and {} skipped.\n",
            report.unknown,
            plural(report.unknown, "dependency", "dependencies"),
            plural(report.unknown, "was", "were")
        ));
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 { one } else { many }
}
