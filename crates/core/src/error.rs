// crates/core/src/error.rs
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by transcript reads.
///
/// Deliberately small: a missing transcript, a missing store directory, and
/// a malformed line are all non-errors at this layer and degrade to empty
/// results. Only genuine I/O failures mid-read reach the caller.
#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("permission denied reading {path}")]
    PermissionDenied { path: PathBuf },

    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl TranscriptError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            _ => Self::Io { path, source },
        }
    }
}
