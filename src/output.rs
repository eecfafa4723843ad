//! Output formatting for JSON and text modes
//!
//! [`CheckOutcome`] is the machine-readable result of one check. Text mode
//! prints the same Markdown summary that goes to the check run.

use crate::collect::{ParsedLockfile, Phase};
use crate::freshness::Violation;
use crate::report::{CheckSink, Conclusion, SinkError};
use serde::Serialize;

/// Result of checking one revision
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    pub conclusion: Conclusion,
    pub title: String,
    pub summary: String,
    /// Number of distinct dependencies collected
    pub dependencies: usize,
    pub lockfiles: Vec<ParsedLockfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<Phase>,
    pub violations: Vec<Violation>,
    pub checked: usize,
    pub unknown: usize,
    pub truncated: bool,
    pub capped: bool,
    pub window_hours: i64,
    /// PR comment body, when the conclusion warrants one
    #[serde(skip)]
    pub comment: Option<String>,
}

impl CheckOutcome {
    /// Whether the revision should be blocked
    pub fn is_failure(&self) -> bool {
        self.conclusion == Conclusion::Failure
    }
}

/// Print the outcome in text form
pub fn print_text(outcome: &CheckOutcome) {
    println!("{}: {}", outcome.conclusion, outcome.title);
    println!();
    println!("{}", outcome.summary.trim_end());
}

/// Print any serializable value as pretty JSON
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Error serializing JSON: {}", e);
            std::process::exit(1);
        }
    }
}

/// Check sink for local runs: check runs only exist in the log
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl CheckSink for ConsoleSink {
    fn start(&self, name: &str, head_sha: &str) -> Result<u64, SinkError> {
        tracing::info!(name, revision = head_sha, "check started");
        Ok(0)
    }

    fn complete(
        &self,
        _id: u64,
        conclusion: Conclusion,
        title: &str,
        _summary: &str,
    ) -> Result<(), SinkError> {
        tracing::info!(%conclusion, title, "check completed");
        Ok(())
    }

    fn comment(&self, pr: u64, body: &str) -> Result<(), SinkError> {
        tracing::debug!(pr, bytes = body.len(), "comment not posted in local mode");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lockfile::LockDialect;
    use chrono::{TimeZone, Utc};

    fn outcome() -> CheckOutcome {
        CheckOutcome {
            conclusion: Conclusion::Failure,
            title: "1 dependency published in the last 24 hours".to_string(),
            summary: "...".to_string(),
            dependencies: 3,
            lockfiles: vec![ParsedLockfile {
                path: "yarn.lock".to_string(),
                dialect: LockDialect::Yarn,
                added: 3,
            }],
            phase: Some(Phase::RootFiles),
            violations: vec![Violation {
                name: "left-pad".to_string(),
                version: "9.9.9".to_string(),
                published_at: Utc.with_ymd_and_hms(2026, 10, 16, 11, 0, 0).unwrap(),
            }],
            checked: 3,
            unknown: 0,
            truncated: false,
            capped: false,
            window_hours: 24,
            comment: Some("comment".to_string()),
        }
    }

    #[test]
    fn test_outcome_json_shape() {
        let value = serde_json::to_value(outcome()).unwrap();
        assert_eq!(value["conclusion"], "failure");
        assert_eq!(value["dependencies"], 3);
        assert_eq!(value["phase"], "root_files");
        assert_eq!(value["lockfiles"][0]["dialect"], "yarn");
        assert_eq!(value["violations"][0]["name"], "left-pad");
        assert_eq!(value["violations"][0]["published_at"], "2026-10-16T11:00:00Z");
        assert!(value.get("comment").is_none());
    }

    #[test]
    fn test_outcome_without_phase_omits_field() {
        let mut neutral = outcome();
        neutral.conclusion = Conclusion::Neutral;
        neutral.phase = None;
        let value = serde_json::to_value(&neutral).unwrap();
        assert!(value.get("phase").is_none());
        assert!(!neutral.is_failure());
    }

    #[test]
    fn test_console_sink_accepts_lifecycle() {
        let sink = ConsoleSink;
        let id = sink.start("Day-0 dependency guard", "abc123").unwrap();
        sink.complete(id, Conclusion::Success, "ok", "").unwrap();
        sink.comment(1, "body").unwrap();
    }
}
