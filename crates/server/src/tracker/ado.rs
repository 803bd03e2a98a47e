// crates/server/src/tracker/ado.rs
//! Azure DevOps work-item client.
//!
//! Bugs are found with a WIQL query scoped to the configured area path,
//! then hydrated in batches of 200 (the work-item batch API cap). Triage
//! operations do not patch the tracker directly; they launch the agent CLI
//! with the corresponding slash command and let its workflow do the tagging.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tokio::process::Command;
use triage_console_core::find_repo_root;

use super::token::TokenSource;
use super::{parse_triage_tags, Tracker, TrackerError, TriagedBug};
use crate::settings::DashboardSettings;

/// Work-item fields fetched for the review queue.
const WORK_ITEM_FIELDS: &[&str] = &[
    "System.Id",
    "System.Title",
    "System.State",
    "Microsoft.VSTS.Common.Severity",
    "Microsoft.VSTS.Common.Priority",
    "System.AssignedTo",
    "System.Tags",
    "System.CreatedDate",
    "System.ChangedDate",
];

/// Batch API cap on ids per request.
const BATCH_CHUNK: usize = 200;

pub struct AdoTracker {
    http: reqwest::Client,
    settings: DashboardSettings,
    tokens: Arc<dyn TokenSource>,
    /// Working directory for agent CLI launches; the repository the
    /// dashboard runs from.
    repo_root: PathBuf,
}

impl AdoTracker {
    pub fn new(settings: DashboardSettings, tokens: Arc<dyn TokenSource>) -> Self {
        let repo_root = find_repo_root()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        Self {
            http: reqwest::Client::new(),
            settings,
            tokens,
            repo_root,
        }
    }

    fn api_url(&self, tail: &str) -> String {
        format!(
            "{}/{}/_apis/wit/{tail}",
            self.settings.ado_org, self.settings.ado_project
        )
    }

    async fn fetch_batch(&self, token: &str, ids: &[u32]) -> Result<Vec<TriagedBug>, TrackerError> {
        let mut bugs = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(BATCH_CHUNK) {
            let response: WorkItemBatchResponse = self
                .http
                .post(self.api_url("workitemsbatch?api-version=7.1"))
                .bearer_auth(token)
                .json(&json!({ "ids": chunk, "fields": WORK_ITEM_FIELDS }))
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;
            bugs.extend(response.value.into_iter().map(|w| self.map_work_item(w)));
        }
        Ok(bugs)
    }

    fn map_work_item(&self, item: WorkItemResponse) -> TriagedBug {
        let fields = &item.fields;
        let tags = string_field(fields, "System.Tags");
        TriagedBug {
            id: item.id,
            title: string_field(fields, "System.Title"),
            state: string_field(fields, "System.State"),
            severity: string_field(fields, "Microsoft.VSTS.Common.Severity"),
            priority: fields
                .get("Microsoft.VSTS.Common.Priority")
                .and_then(Value::as_i64)
                .unwrap_or_default(),
            assigned_to: assigned_to(fields),
            created_date: date_field(fields, "System.CreatedDate"),
            changed_date: date_field(fields, "System.ChangedDate"),
            triage_status: parse_triage_tags(&tags),
            ado_url: format!(
                "{}/{}/_workitems/edit/{}",
                self.settings.ado_org, self.settings.ado_project, item.id
            ),
            tags,
        }
    }

    /// Launch the agent CLI with a slash-command prompt, detached. Exit is
    /// awaited on a background task purely for logging.
    fn launch_agent(&self, prompt: &str) {
        tracing::info!(%prompt, work_dir = %self.repo_root.display(), "launching agent CLI");
        let spawned = Command::new("claude")
            .arg("-p")
            .arg(prompt)
            .current_dir(&self.repo_root)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn();

        match spawned {
            Ok(mut child) => {
                let prompt = prompt.to_string();
                tokio::spawn(async move {
                    match child.wait().await {
                        Ok(status) => tracing::info!(%status, %prompt, "agent run finished"),
                        Err(error) => tracing::error!(%error, %prompt, "failed waiting for agent run"),
                    }
                });
            }
            Err(error) => tracing::error!(%error, "failed to start agent CLI"),
        }
    }
}

#[async_trait]
impl Tracker for AdoTracker {
    async fn triaged_bugs(&self) -> Result<Vec<TriagedBug>, TrackerError> {
        if !self.settings.is_configured() {
            return Err(TrackerError::NotConfigured);
        }
        let token = self.tokens.token().await?;

        let iteration_clause = self
            .settings
            .iteration_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .map(|p| format!(" AND [System.IterationPath] UNDER '{p}'"))
            .unwrap_or_default();
        let wiql = format!(
            "SELECT [System.Id] FROM WorkItems \
             WHERE [System.WorkItemType] = 'Bug' \
             AND [System.AreaPath] UNDER '{}'{} \
             AND [System.State] <> 'Closed' \
             ORDER BY [System.ChangedDate] DESC",
            self.settings.area_path, iteration_clause
        );
        tracing::info!(area_path = %self.settings.area_path, "querying tracker for open bugs");
        tracing::debug!(query = %wiql, "wiql");

        let url = self.api_url(&format!(
            "wiql?api-version=7.1&$top={}",
            self.settings.max_bugs_default
        ));
        let response: WiqlResponse = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(&json!({ "query": wiql }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.work_items.is_empty() {
            tracing::warn!(area_path = %self.settings.area_path, "wiql returned no work items");
            return Ok(Vec::new());
        }
        tracing::info!(count = response.work_items.len(), "wiql returned work items");

        let ids: Vec<u32> = response.work_items.iter().map(|w| w.id).collect();
        self.fetch_batch(&token, &ids).await
    }

    async fn bug(&self, id: u32) -> Result<Option<TriagedBug>, TrackerError> {
        if !self.settings.is_configured() {
            return Err(TrackerError::NotConfigured);
        }
        let token = self.tokens.token().await?;
        let url = self.api_url(&format!(
            "workitems/{id}?fields={}&api-version=7.1",
            WORK_ITEM_FIELDS.join(",")
        ));
        let response = self.http.get(url).bearer_auth(&token).send().await?;
        if !response.status().is_success() {
            return Ok(None);
        }
        let item: WorkItemResponse = response.json().await?;
        Ok(Some(self.map_work_item(item)))
    }

    async fn assign_to_copilot(&self, id: u32) -> Result<(), TrackerError> {
        let token = self.tokens.token().await?;

        // Merge the readiness tag into whatever tags the bug already has.
        let current_tags = self
            .bug(id)
            .await?
            .map(|b| b.tags)
            .unwrap_or_default();
        let mut tag_set: BTreeSet<String> = current_tags
            .split(';')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();
        tag_set.insert("copilot-ready".to_string());
        let merged = tag_set.into_iter().collect::<Vec<_>>().join("; ");

        let patch = json!([
            { "op": "add", "path": "/fields/System.AssignedTo", "value": self.settings.copilot_user_id },
            { "op": "add", "path": "/fields/System.Tags", "value": merged },
            { "op": "add", "path": "/relations/-", "value": {
                "rel": "ArtifactLink",
                "url": format!(
                    "vstfs:///Git/Ref/{}/{}/{}",
                    self.settings.repo_project_guid, self.settings.repo_guid, self.settings.branch_ref
                ),
                "attributes": { "name": "Branch" },
            }},
        ]);

        self.http
            .patch(self.api_url(&format!("workitems/{id}?api-version=7.1")))
            .bearer_auth(&token)
            .header(reqwest::header::CONTENT_TYPE, "application/json-patch+json")
            .body(patch.to_string())
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn retriage(&self, id: u32) -> Result<(), TrackerError> {
        self.launch_agent(&format!("/triage-bug {id} --force"));
        Ok(())
    }

    async fn batch_triage(&self, max: usize) -> Result<(), TrackerError> {
        self.launch_agent(&format!("/triage-bugs --max={max}"));
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct WiqlResponse {
    #[serde(default, rename = "workItems")]
    work_items: Vec<WiqlWorkItemRef>,
}

#[derive(Debug, Deserialize)]
struct WiqlWorkItemRef {
    id: u32,
}

#[derive(Debug, Deserialize)]
struct WorkItemBatchResponse {
    #[serde(default)]
    value: Vec<WorkItemResponse>,
}

#[derive(Debug, Deserialize)]
struct WorkItemResponse {
    id: u32,
    #[serde(default)]
    fields: Map<String, Value>,
}

fn string_field(fields: &Map<String, Value>, key: &str) -> String {
    fields
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// `System.AssignedTo` is an identity object in newer API versions and a
/// display string in older ones.
fn assigned_to(fields: &Map<String, Value>) -> String {
    match fields.get("System.AssignedTo") {
        Some(Value::Object(identity)) => identity
            .get("displayName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Some(Value::String(name)) => name.clone(),
        _ => String::new(),
    }
}

fn date_field(fields: &Map<String, Value>, key: &str) -> DateTime<Utc> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
