// crates/core/src/catalog.rs
//! Session catalog: transcript listing with previews and triage filtering.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::parser::{truncate, PREVIEW_MAX};
use crate::store::{file_stem, is_transcript, SessionStore};
use crate::types::SessionSummary;

/// Substring (case-insensitive) marking a transcript as produced by the
/// triage workflow. Also matches the plural command form.
const TRIAGE_MARKER: &str = "triage-bug";

impl SessionStore {
    /// List transcript summaries, most recently modified first.
    ///
    /// Scans up to `3 * max` candidate files to absorb losses from the
    /// triage filter, stopping once `max` summaries qualify. A file that
    /// cannot be read is skipped with a warning; a missing store directory
    /// yields an empty list.
    pub async fn list_sessions(&self, max: usize, triage_only: bool) -> Vec<SessionSummary> {
        if max == 0 {
            return Vec::new();
        }

        let files = transcript_files_by_mtime(self.dir()).await;
        if files.is_empty() {
            if !self.dir().is_dir() {
                tracing::warn!(dir = %self.dir().display(), "transcript store directory not found");
            }
            return Vec::new();
        }

        let mut results = Vec::new();
        for (path, modified) in files.into_iter().take(max * 3) {
            match scan_session_file(&path).await {
                Ok(scan) => {
                    if triage_only && !scan.is_triage {
                        continue;
                    }
                    let Some(id) = file_stem(&path) else { continue };
                    results.push(SessionSummary {
                        id,
                        modified_at: DateTime::<Utc>::from(modified),
                        preview: scan.preview.unwrap_or_default(),
                    });
                    if results.len() >= max {
                        break;
                    }
                }
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "failed to scan session file");
                }
            }
        }
        results
    }
}

/// All `.jsonl` files in `dir` with their mtimes, newest first. Missing or
/// unreadable directories yield an empty list.
pub(crate) async fn transcript_files_by_mtime(dir: &Path) -> Vec<(PathBuf, SystemTime)> {
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return Vec::new();
    };
    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if !is_transcript(&path) {
            continue;
        }
        let Ok(meta) = entry.metadata().await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let Ok(modified) = meta.modified() else {
            continue;
        };
        files.push((path, modified));
    }
    files.sort_by(|a, b| b.1.cmp(&a.1));
    files
}

struct SessionScan {
    preview: Option<String>,
    is_triage: bool,
}

/// One sequential pass over a transcript, answering both catalog questions
/// at once: the first non-empty user turn, and whether any raw line carries
/// the triage marker. Stops early once both are known.
async fn scan_session_file(path: &Path) -> io::Result<SessionScan> {
    let file = fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut scan = SessionScan {
        preview: None,
        is_triage: false,
    };

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        if !scan.is_triage && line.to_ascii_lowercase().contains(TRIAGE_MARKER) {
            scan.is_triage = true;
        }
        if scan.preview.is_none() {
            if let Ok(root) = serde_json::from_str::<Value>(&line) {
                if root.get("type").and_then(Value::as_str) == Some("user") {
                    scan.preview = user_preview(&root);
                }
            }
        }
        if scan.preview.is_some() && scan.is_triage {
            break;
        }
    }

    Ok(scan)
}

/// First non-empty text of a user turn: the string content itself, or the
/// first non-empty `text` block. Truncated for display.
fn user_preview(root: &Value) -> Option<String> {
    let content = root.get("message")?.get("content")?;

    if let Some(text) = content.as_str() {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        return Some(truncate(text, PREVIEW_MAX));
    }

    for block in content.as_array()? {
        if block.get("type").and_then(Value::as_str) != Some("text") {
            continue;
        }
        let text = block
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .trim();
        if !text.is_empty() {
            return Some(truncate(text, PREVIEW_MAX));
        }
    }
    None
}
