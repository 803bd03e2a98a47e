// crates/core/src/types.rs
//! Message and summary types produced by the transcript engine.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Classification of one emitted transcript event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    User,
    Thinking,
    Text,
    ToolCall,
    ToolResult,
}

/// One parsed transcript event.
///
/// Constructed during parsing and handed straight to the consumer; never
/// stored or mutated afterwards. `tool_name`/`tool_input` are only set for
/// `ToolCall` events.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessage {
    pub kind: MessageKind,
    pub timestamp: DateTime<Utc>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_input: Option<String>,
}

impl SessionMessage {
    pub(crate) fn new(kind: MessageKind, timestamp: DateTime<Utc>, text: String) -> Self {
        Self {
            kind,
            timestamp,
            text,
            tool_name: None,
            tool_input: None,
        }
    }
}

/// Catalog entry for one transcript file.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// Stable filename stem of the transcript.
    pub id: String,
    /// Last modification time of the transcript file.
    pub modified_at: DateTime<Utc>,
    /// First non-empty user turn, truncated for display. Empty when the
    /// transcript has no user text at all.
    pub preview: String,
}
