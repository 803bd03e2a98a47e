// crates/server/src/tracker/demo.rs
//! Canned tracker data for `--demo` runs: no network, no auth, a queue
//! that exercises every triage state the UI can render.

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::{parse_triage_tags, Tracker, TrackerError, TriagedBug};

pub struct DemoTracker {
    bugs: Vec<TriagedBug>,
}

impl DemoTracker {
    pub fn new() -> Self {
        Self { bugs: demo_bugs() }
    }
}

impl Default for DemoTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tracker for DemoTracker {
    async fn triaged_bugs(&self) -> Result<Vec<TriagedBug>, TrackerError> {
        Ok(self.bugs.clone())
    }

    async fn bug(&self, id: u32) -> Result<Option<TriagedBug>, TrackerError> {
        Ok(self.bugs.iter().find(|b| b.id == id).cloned())
    }

    async fn assign_to_copilot(&self, id: u32) -> Result<(), TrackerError> {
        tracing::info!(id, "demo: assign-to-copilot is a no-op");
        Ok(())
    }

    async fn retriage(&self, id: u32) -> Result<(), TrackerError> {
        tracing::info!(id, "demo: retriage is a no-op");
        Ok(())
    }

    async fn batch_triage(&self, max: usize) -> Result<(), TrackerError> {
        tracing::info!(max, "demo: batch triage is a no-op");
        Ok(())
    }
}

fn demo_bug(
    id: u32,
    title: &str,
    state: &str,
    severity: &str,
    priority: i64,
    assigned_to: &str,
    tags: &str,
    created_days_ago: i64,
    changed_hours_ago: i64,
) -> TriagedBug {
    let now = Utc::now();
    TriagedBug {
        id,
        title: title.to_string(),
        state: state.to_string(),
        severity: severity.to_string(),
        priority,
        assigned_to: assigned_to.to_string(),
        triage_status: parse_triage_tags(tags),
        tags: tags.to_string(),
        created_date: now - Duration::days(created_days_ago),
        changed_date: now - Duration::hours(changed_hours_ago),
        ado_url: format!("https://dev.azure.com/demo/DemoProject/_workitems/edit/{id}"),
    }
}

fn demo_bugs() -> Vec<TriagedBug> {
    vec![
        demo_bug(
            12001,
            "Export job drops rows when a filter is edited mid-run",
            "Active",
            "2 - High",
            1,
            "Jane Smith",
            "triaged; copilot-ready; high-roi; exports",
            12,
            24,
        ),
        demo_bug(
            12002,
            "Saved-view picker shows another tenant's view names",
            "Active",
            "1 - Critical",
            1,
            "",
            "triaged; human-required; high-roi; permissions",
            3,
            6,
        ),
        demo_bug(
            12003,
            "Date range widget off by one day across DST boundary",
            "Active",
            "3 - Medium",
            2,
            "Bob Jones",
            "triaged; copilot-possible; dates",
            20,
            120,
        ),
        demo_bug(
            12004,
            "Webhook retries hammer endpoint after a 410 response",
            "Active",
            "2 - High",
            2,
            "",
            "triaged; copilot-ready; webhooks",
            6,
            30,
        ),
        demo_bug(
            12005,
            "Attachment upload spinner never clears on slow networks",
            "Active",
            "3 - Medium",
            3,
            "",
            "triaged; copilot-possible; needs-info; uploads",
            15,
            168,
        ),
        demo_bug(
            12006,
            "Intermittent 500 from search service during reindex",
            "New",
            "2 - High",
            2,
            "",
            "",
            1,
            8,
        ),
    ]
}
