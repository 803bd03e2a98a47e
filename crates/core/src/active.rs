// crates/core/src/active.rs
//! Liveness heuristic: which transcript, if any, is being written right now.

use std::time::{Duration, SystemTime};

use crate::catalog::transcript_files_by_mtime;
use crate::store::{file_stem, SessionStore};

/// How recently a transcript must have been modified to count as live.
/// There is no explicit session-start/end signal, so this is a heuristic:
/// a producer that pauses longer goes dark, and an unrelated touch of the
/// newest file reads as activity.
const ACTIVE_WINDOW: Duration = Duration::from_secs(5 * 60);

impl SessionStore {
    /// Id of the most recently modified transcript, when modified within
    /// the liveness window.
    pub async fn active_session_id(&self) -> Option<String> {
        let files = transcript_files_by_mtime(self.dir()).await;
        let (path, modified) = files.into_iter().next()?;

        let age = SystemTime::now()
            .duration_since(modified)
            .unwrap_or(Duration::ZERO);
        if age > ACTIVE_WINDOW {
            return None;
        }
        file_stem(&path)
    }
}
