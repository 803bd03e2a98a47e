// crates/core/src/stream.rs
//! Live tail of a growing transcript.
//!
//! The producer process appends whole JSON lines to the transcript; this
//! module polls the file on a fixed cadence, resuming from the byte offset
//! just past the last fully read line. Reads stop at the last newline in
//! the new bytes, so a mid-write partial line is never parsed. Lines
//! already delivered within one streaming call are filtered by content
//! digest.

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::parser::parse_line;
use crate::store::SessionStore;
use crate::types::SessionMessage;

impl SessionStore {
    /// Stream messages appended to a transcript until `cancel` fires.
    ///
    /// Each call owns its own cursor and dedup set; concurrent streams over
    /// the same transcript tail independently, and a fresh call always
    /// starts from offset zero. A transcript that does not exist at call
    /// time yields an empty, immediately terminated stream. Cancellation
    /// takes effect within one poll interval, never mid-parse.
    pub fn stream_session(
        &self,
        id: &str,
        cancel: CancellationToken,
    ) -> impl Stream<Item = SessionMessage> + Send + 'static {
        let path = self.session_path(id);
        let poll = self.poll_interval();

        async_stream::stream! {
            if path.exists() {
                let mut cursor = TailCursor::new(path);
                loop {
                    if cancel.is_cancelled() {
                        break;
                    }
                    match cursor.poll_new_lines().await {
                        Ok(lines) => {
                            for line in lines {
                                for msg in parse_line(&line) {
                                    yield msg;
                                }
                            }
                        }
                        Err(error) => {
                            // Transient failure: retry next cycle from the
                            // same offset.
                            tracing::warn!(
                                path = %cursor.path.display(),
                                %error,
                                "read failure while tailing transcript; retrying"
                            );
                        }
                    }

                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(poll) => {}
                    }
                }
            }
        }
    }
}

/// Per-stream tail state: the resume offset plus digests of every line
/// already delivered in this call. The set grows for the call's lifetime,
/// which is bounded by one agent run.
struct TailCursor {
    path: PathBuf,
    offset: u64,
    seen: HashSet<[u8; 32]>,
}

impl TailCursor {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            offset: 0,
            seen: HashSet::new(),
        }
    }

    /// Read complete lines appended since the stored offset, dropping any
    /// line already delivered. The offset only advances on a successful
    /// read.
    async fn poll_new_lines(&mut self) -> io::Result<Vec<String>> {
        let path = self.path.clone();
        let offset = self.offset;
        let (lines, new_offset) =
            tokio::task::spawn_blocking(move || read_complete_lines(&path, offset))
                .await
                .map_err(io::Error::other)??;
        self.offset = new_offset;

        let mut fresh = Vec::new();
        for line in lines {
            if line.trim().is_empty() {
                continue;
            }
            let digest: [u8; 32] = Sha256::digest(line.as_bytes()).into();
            if self.seen.insert(digest) {
                fresh.push(line);
            }
        }
        Ok(fresh)
    }
}

/// Read from `offset` to the last newline, returning the completed lines
/// and the offset just past them. Bytes after the last newline are a
/// partial write and stay unread until a later poll. Runs sync I/O; call
/// from `spawn_blocking`.
fn read_complete_lines(path: &Path, offset: u64) -> io::Result<(Vec<String>, u64)> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();

    if offset > len {
        // The transcript shrank under the cursor (replaced with a shorter
        // file). Start over; the dedup set still suppresses re-delivery.
        tracing::warn!(path = %path.display(), offset, len, "transcript shrank; resetting cursor");
        return read_complete_lines(path, 0);
    }
    if offset == len {
        return Ok((Vec::new(), offset));
    }

    file.seek(SeekFrom::Start(offset))?;
    let mut buf = vec![0u8; (len - offset) as usize];
    file.read_exact(&mut buf)?;

    let Some(last_newline) = buf.iter().rposition(|&b| b == b'\n') else {
        // No complete line yet.
        return Ok((Vec::new(), offset));
    };

    let lines = buf[..=last_newline]
        .split(|&b| b == b'\n')
        .filter(|l| !l.is_empty())
        .map(|l| String::from_utf8_lossy(l).into_owned())
        .collect();
    Ok((lines, offset + last_newline as u64 + 1))
}
