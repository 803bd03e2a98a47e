// crates/server/src/tracker/mod.rs
//! Issue-tracker integration: work-item queries, triage metadata derived
//! from tags, and agent-driven re-triage.

pub mod ado;
pub mod demo;
pub mod token;

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

pub use ado::AdoTracker;
pub use demo::DemoTracker;
pub use token::{AzCliTokenSource, TokenSource};

/// Triage verdicts encoded as work-item tags by the triage workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageStatus {
    pub is_triaged: bool,
    pub needs_info: bool,
    pub high_roi: bool,
    /// "Ready", "Possible", "Human Required", or empty when untriaged.
    pub copilot_readiness: String,
}

/// One open bug as shown in the review queue.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriagedBug {
    pub id: u32,
    pub title: String,
    pub state: String,
    pub severity: String,
    pub priority: i64,
    pub assigned_to: String,
    /// Raw semicolon-separated tag list as stored on the work item.
    pub tags: String,
    pub created_date: DateTime<Utc>,
    pub changed_date: DateTime<Utc>,
    pub triage_status: TriageStatus,
    /// Deep link to the work item in the tracker UI.
    pub ado_url: String,
}

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tracker auth failed: {0}")]
    Auth(String),

    #[error("tracker is not configured")]
    NotConfigured,
}

/// Seam between the API layer and the issue tracker. The real client talks
/// to Azure DevOps; the demo implementation serves canned data.
#[async_trait]
pub trait Tracker: Send + Sync {
    /// All open bugs under the configured area path, most recently changed
    /// first.
    async fn triaged_bugs(&self) -> Result<Vec<TriagedBug>, TrackerError>;

    async fn bug(&self, id: u32) -> Result<Option<TriagedBug>, TrackerError>;

    /// Assign the bug to the Copilot identity, merge in the
    /// `copilot-ready` tag, and link the working branch.
    async fn assign_to_copilot(&self, id: u32) -> Result<(), TrackerError>;

    /// Kick off a fresh triage run for one bug (fire and forget).
    async fn retriage(&self, id: u32) -> Result<(), TrackerError>;

    /// Kick off a batch triage run over up to `max` bugs (fire and forget).
    async fn batch_triage(&self, max: usize) -> Result<(), TrackerError>;
}

/// Derive a [`TriageStatus`] from a semicolon-separated tag list.
/// Tag matching is case-insensitive and whitespace-tolerant.
pub fn parse_triage_tags(tags: &str) -> TriageStatus {
    let set: HashSet<String> = tags
        .split(';')
        .map(|t| t.trim().to_ascii_lowercase())
        .filter(|t| !t.is_empty())
        .collect();

    let copilot_readiness = if set.contains("copilot-ready") {
        "Ready"
    } else if set.contains("copilot-possible") {
        "Possible"
    } else if set.contains("human-required") {
        "Human Required"
    } else {
        ""
    }
    .to_string();

    TriageStatus {
        is_triaged: set.contains("triaged"),
        needs_info: set.contains("needs-info"),
        high_roi: set.contains("high-roi"),
        copilot_readiness,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn full_tag_set_parses() {
        let status = parse_triage_tags("triaged; copilot-ready; high-roi; ai-planner");
        assert_eq!(
            status,
            TriageStatus {
                is_triaged: true,
                needs_info: false,
                high_roi: true,
                copilot_readiness: "Ready".to_string(),
            }
        );
    }

    #[test]
    fn readiness_tiers_are_mutually_ranked() {
        assert_eq!(parse_triage_tags("copilot-possible").copilot_readiness, "Possible");
        assert_eq!(
            parse_triage_tags("human-required").copilot_readiness,
            "Human Required"
        );
        // ready wins over lower tiers when both are present
        assert_eq!(
            parse_triage_tags("copilot-possible; copilot-ready").copilot_readiness,
            "Ready"
        );
    }

    #[test]
    fn matching_is_case_insensitive_and_trimmed() {
        let status = parse_triage_tags("  TRIAGED ;Needs-Info;  high-ROI ");
        assert!(status.is_triaged);
        assert!(status.needs_info);
        assert!(status.high_roi);
    }

    #[test]
    fn empty_tags_parse_to_untriaged() {
        assert_eq!(parse_triage_tags(""), TriageStatus::default());
        assert_eq!(parse_triage_tags(" ; ; "), TriageStatus::default());
    }
}
