// crates/core/src/store.rs
//! Transcript store location and the shared [`SessionStore`] handle.
//!
//! The store directory is resolved once at process startup and never
//! re-resolved; a configuration change takes effect on the next start.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Poll cadence for the tail streamer.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Handle to a resolved transcript directory.
///
/// Cheap to clone and shared read-only across request handlers; all state
/// that varies per operation (offsets, dedup sets) lives inside the
/// individual calls.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    poll_interval: Duration,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Override the tail poll cadence. Primarily for tests; production
    /// callers keep the default.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub(crate) fn session_path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.jsonl"))
    }
}

/// Resolve the transcript store directory.
///
/// Resolution order, first hit wins:
/// 1. `configured`, when non-empty and an existing directory.
/// 2. The store subdirectory derived from the enclosing repository root
///    (walk up to a `.git` marker, encode the path, look it up under the
///    fixed per-user transcript root).
/// 3. The transcript-root subdirectory with the most recently modified
///    `.jsonl` file.
/// 4. `configured` verbatim; downstream reads on a non-existent directory
///    degrade to "no sessions".
pub fn resolve_store_dir(configured: &str) -> PathBuf {
    if !configured.trim().is_empty() {
        let p = PathBuf::from(configured);
        if p.is_dir() {
            return p;
        }
    }

    let root = transcripts_root();

    if let (Some(root), Some(repo)) = (root.as_deref(), find_repo_root()) {
        let candidate = root.join(encode_project_dir(&repo));
        if candidate.is_dir() {
            tracing::info!(path = %candidate.display(), "resolved transcript store from repo root");
            return candidate;
        }
    }

    if let Some(root) = root.as_deref() {
        if let Some(best) = most_recently_active(root) {
            tracing::info!(path = %best.display(), "resolved transcript store from most recent activity");
            return best;
        }
    }

    tracing::warn!(configured, "could not resolve a transcript store; session reads will be empty");
    PathBuf::from(configured)
}

/// Fixed per-user transcript root: `~/.claude/projects`.
fn transcripts_root() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".claude").join("projects"))
}

/// Walk upward from the working directory until a `.git` directory marks
/// the repository root.
pub fn find_repo_root() -> Option<PathBuf> {
    let mut dir = std::env::current_dir().ok()?;
    loop {
        if dir.join(".git").is_dir() {
            return Some(dir);
        }
        if !dir.pop() {
            return None;
        }
    }
}

/// `/Users/foo/my-project` is stored under the transcript root as
/// `-Users-foo-my-project`: path separators and drive-letter colons all
/// collapse to `-`.
fn encode_project_dir(path: &Path) -> String {
    path.to_string_lossy()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '-',
            c => c,
        })
        .collect()
}

/// The transcript-root subdirectory whose newest `.jsonl` file is the most
/// recent across all subdirectories. `None` when no subdirectory holds any
/// transcript.
fn most_recently_active(root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        let Some(latest) = latest_transcript_mtime(&path) else {
            continue;
        };
        if best.as_ref().map_or(true, |(t, _)| latest > *t) {
            best = Some((latest, path));
        }
    }
    best.map(|(_, p)| p)
}

fn latest_transcript_mtime(dir: &Path) -> Option<SystemTime> {
    let entries = std::fs::read_dir(dir).ok()?;
    entries
        .flatten()
        .filter(|e| is_transcript(&e.path()))
        .filter_map(|e| e.metadata().ok()?.modified().ok())
        .max()
}

pub(crate) fn is_transcript(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "jsonl")
}

pub(crate) fn file_stem(path: &Path) -> Option<String> {
    path.file_stem().map(|s| s.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = resolve_store_dir(dir.path().to_str().unwrap());
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn invalid_configured_path_is_returned_verbatim_as_last_resort() {
        // The fallback scan may or may not find a real store on the host
        // running the tests; only assert the no-store shape when it doesn't.
        let resolved = resolve_store_dir("/definitely/not/a/real/store");
        if !resolved.is_dir() {
            assert_eq!(resolved, PathBuf::from("/definitely/not/a/real/store"));
        }
    }

    #[test]
    fn project_dir_encoding_collapses_separators() {
        assert_eq!(
            encode_project_dir(Path::new("/Users/foo/my-project")),
            "-Users-foo-my-project"
        );
        assert_eq!(
            encode_project_dir(Path::new("C:\\src\\repo")),
            "C--src-repo"
        );
    }

    #[test]
    fn most_recently_active_picks_newest_subdirectory() {
        let root = tempfile::tempdir().unwrap();
        let old = root.path().join("old-project");
        let new = root.path().join("new-project");
        let empty = root.path().join("no-transcripts");
        std::fs::create_dir_all(&old).unwrap();
        std::fs::create_dir_all(&new).unwrap();
        std::fs::create_dir_all(&empty).unwrap();

        std::fs::write(old.join("a.jsonl"), "{}\n").unwrap();
        std::fs::write(new.join("b.jsonl"), "{}\n").unwrap();
        set_mtime(&old.join("a.jsonl"), 600);
        set_mtime(&new.join("b.jsonl"), 10);

        assert_eq!(most_recently_active(root.path()), Some(new));
    }

    #[test]
    fn most_recently_active_ignores_roots_without_transcripts() {
        let root = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(root.path().join("only-logs")).unwrap();
        std::fs::write(root.path().join("only-logs").join("note.txt"), "x").unwrap();
        assert_eq!(most_recently_active(root.path()), None);
    }

    #[test]
    fn transcript_extension_filter() {
        assert!(is_transcript(Path::new("/s/abc.jsonl")));
        assert!(!is_transcript(Path::new("/s/abc.json")));
        assert!(!is_transcript(Path::new("/s/abc")));
    }
}

/// Backdate a file's mtime by `secs_ago` seconds (test fixture helper).
#[cfg(test)]
pub(crate) fn set_mtime(path: &Path, secs_ago: u64) {
    let file = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    let when = SystemTime::now() - Duration::from_secs(secs_ago);
    file.set_times(std::fs::FileTimes::new().set_modified(when))
        .unwrap();
}
