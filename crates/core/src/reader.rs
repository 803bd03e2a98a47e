// crates/core/src/reader.rs
//! Full-session reads: a whole transcript, plus any sub-agent transcripts,
//! merged into one timestamp-ordered message list.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::TranscriptError;
use crate::parser::parse_line;
use crate::store::{is_transcript, SessionStore};
use crate::types::SessionMessage;

impl SessionStore {
    /// Read a transcript end to end.
    ///
    /// A missing transcript is an empty session, not an error. Sub-agent
    /// transcripts under `<store>/<id>/subagents/` are appended in
    /// lexicographic filename order; one failing sub-transcript is logged
    /// and skipped without affecting its siblings. The combined list is
    /// stable-sorted by timestamp, so same-timestamp messages keep their
    /// input order.
    pub async fn read_session(&self, id: &str) -> Result<Vec<SessionMessage>, TranscriptError> {
        let path = self.session_path(id);
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut messages = parse_transcript_file(&path)
            .await
            .map_err(|e| TranscriptError::io(&path, e))?;

        let subagents_dir = self.dir().join(id).join("subagents");
        for sub_path in subagent_files(&subagents_dir).await {
            match parse_transcript_file(&sub_path).await {
                Ok(sub_messages) => messages.extend(sub_messages),
                Err(error) => {
                    tracing::warn!(path = %sub_path.display(), %error, "failed to parse subagent transcript");
                }
            }
        }

        messages.sort_by_key(|m| m.timestamp);
        Ok(messages)
    }
}

/// Parse every line of one transcript file. The file is opened read-only
/// (shared access: the producer may still be appending); blank lines are
/// skipped and malformed lines expand to nothing.
async fn parse_transcript_file(path: &Path) -> io::Result<Vec<SessionMessage>> {
    let file = fs::File::open(path).await?;
    let mut lines = BufReader::new(file).lines();
    let mut messages = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        messages.extend(parse_line(&line));
    }
    Ok(messages)
}

async fn subagent_files(dir: &Path) -> Vec<PathBuf> {
    let Ok(mut entries) = fs::read_dir(dir).await else {
        return Vec::new();
    };
    let mut files = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let path = entry.path();
        if is_transcript(&path) {
            files.push(path);
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MessageKind;
    use pretty_assertions::assert_eq;

    fn line(outer: &str, ts: &str, text: &str) -> String {
        format!(r#"{{"type":"{outer}","timestamp":"{ts}","message":{{"content":"{text}"}}}}"#)
    }

    #[tokio::test]
    async fn missing_transcript_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert!(store.read_session("ghost").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_in_timestamp_order() {
        let dir = tempfile::tempdir().unwrap();
        // Written out of order on purpose.
        let lines = [
            line("assistant", "2024-01-01T00:00:02Z", "second"),
            line("user", "2024-01-01T00:00:01Z", "first"),
            line("assistant", "2024-01-01T00:00:03Z", "third"),
        ];
        std::fs::write(dir.path().join("s1.jsonl"), lines.join("\n") + "\n").unwrap();

        let store = SessionStore::new(dir.path());
        let messages = store.read_session("s1").await.unwrap();

        let texts: Vec<_> = messages.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
        assert!(messages.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
    }

    #[tokio::test]
    async fn equal_timestamps_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let ts = "2024-01-01T00:00:00Z";
        let lines = [
            line("user", ts, "ask"),
            line("assistant", ts, "answer"),
        ];
        std::fs::write(dir.path().join("s2.jsonl"), lines.join("\n") + "\n").unwrap();

        let store = SessionStore::new(dir.path());
        let messages = store.read_session("s2").await.unwrap();
        assert_eq!(messages[0].kind, MessageKind::User);
        assert_eq!(messages[1].kind, MessageKind::Text);
    }

    #[tokio::test]
    async fn repeated_reads_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        let lines = [
            line("user", "2024-01-01T00:00:01Z", "q"),
            line("assistant", "2024-01-01T00:00:02Z", "a"),
        ];
        std::fs::write(dir.path().join("s3.jsonl"), lines.join("\n") + "\n").unwrap();

        let store = SessionStore::new(dir.path());
        let first = store.read_session("s3").await.unwrap();
        let second = store.read_session("s3").await.unwrap();

        let render = |msgs: &[SessionMessage]| {
            msgs.iter()
                .map(|m| serde_json::to_string(m).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(render(&first), render(&second));
    }

    #[tokio::test]
    async fn merges_subagent_transcripts_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("s4.jsonl"),
            line("user", "2024-01-01T00:00:01Z", "main start") + "\n"
                + &line("assistant", "2024-01-01T00:00:04Z", "main end")
                + "\n",
        )
        .unwrap();

        let sub_dir = dir.path().join("s4").join("subagents");
        std::fs::create_dir_all(&sub_dir).unwrap();
        std::fs::write(
            sub_dir.join("agent-a.jsonl"),
            line("assistant", "2024-01-01T00:00:02Z", "sub work") + "\n",
        )
        .unwrap();
        std::fs::write(sub_dir.join("agent-b.jsonl"), "{broken json\n").unwrap();
        std::fs::write(
            sub_dir.join("agent-c.jsonl"),
            line("assistant", "2024-01-01T00:00:03Z", "more sub work") + "\n",
        )
        .unwrap();

        let store = SessionStore::new(dir.path());
        let texts: Vec<String> = store
            .read_session("s4")
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["main start", "sub work", "more sub work", "main end"]);
    }

    #[tokio::test]
    async fn skips_non_message_lines() {
        let dir = tempfile::tempdir().unwrap();
        let lines = [
            r#"{"type":"summary","summary":"recap"}"#.to_string(),
            String::new(),
            line("user", "2024-01-01T00:00:01Z", "only this"),
        ];
        std::fs::write(dir.path().join("s5.jsonl"), lines.join("\n") + "\n").unwrap();

        let store = SessionStore::new(dir.path());
        let messages = store.read_session("s5").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "only this");
    }
}
