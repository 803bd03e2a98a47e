// crates/server/src/settings.rs
//! Dashboard settings: one JSON document loaded at startup and writable
//! over the API. Saved changes apply on the next start; in particular the
//! resolved transcript store is process-lifetime state.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
    /// Organization base URL, e.g. `https://dev.azure.com/contoso`.
    pub ado_org: String,
    pub ado_project: String,
    /// Bugs are queried `UNDER` this area path.
    pub area_path: String,
    /// Optional extra `UNDER` clause for a single iteration.
    pub iteration_path: Option<String>,
    /// Identity that `assign-copilot` hands bugs to.
    pub copilot_user_id: String,
    pub repo_project_guid: String,
    pub repo_guid: String,
    /// Branch artifact-link ref, `GB`-prefixed.
    pub branch_ref: String,
    pub triage_pipeline_name: String,
    /// Cap on bugs fetched per tracker query.
    pub max_bugs_default: usize,
    /// Transcript store override; empty means auto-detect.
    pub claude_projects_path: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            ado_org: String::new(),
            ado_project: String::new(),
            area_path: String::new(),
            iteration_path: None,
            copilot_user_id: String::new(),
            repo_project_guid: String::new(),
            repo_guid: String::new(),
            branch_ref: "GBmain".to_string(),
            triage_pipeline_name: String::new(),
            max_bugs_default: 100,
            claude_projects_path: String::new(),
        }
    }
}

impl DashboardSettings {
    /// True when the minimum fields needed to reach the tracker are set.
    pub fn is_configured(&self) -> bool {
        !self.ado_org.trim().is_empty()
            && !self.ado_project.trim().is_empty()
            && !self.area_path.trim().is_empty()
    }

    /// Default settings file location under the user config directory.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("triage-console")
            .join("settings.json")
    }

    /// Load settings, falling back to defaults for a missing or malformed
    /// file. Never fails startup.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(text) => match serde_json::from_str(&text) {
                Ok(settings) => settings,
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "malformed settings file; using defaults");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
