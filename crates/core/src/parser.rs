// crates/core/src/parser.rs
//! Transcript line parser.
//!
//! Each transcript line is one JSON object wrapping an API message:
//!
//! ```json
//! {"type":"assistant","timestamp":"2024-01-01T00:00:00Z","message":{"content":[...]}}
//! {"type":"user","message":{"content":"fix bug 42"}}
//! ```
//!
//! `content` is either a plain string or an ordered array of typed blocks
//! (`thinking`, `text`, `tool_use`, `tool_result`). A single line expands
//! into zero or more [`SessionMessage`]s; malformed JSON and outer types
//! other than `user`/`assistant` expand into none.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::types::{MessageKind, SessionMessage};

/// Truncation cap for JSON renderings of tool inputs.
pub const TOOL_INPUT_MAX: usize = 1000;
/// Truncation cap for tool result payloads.
pub const TOOL_RESULT_MAX: usize = 2000;
/// Truncation cap for catalog previews.
pub const PREVIEW_MAX: usize = 120;

/// Parse one raw transcript line into its message events.
pub fn parse_line(raw: &str) -> Vec<SessionMessage> {
    let root: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        // Malformed lines are skipped, not reported: the producer may be
        // mid-write and the surrounding scan must keep going.
        Err(_) => return Vec::new(),
    };

    let outer = root.get("type").and_then(Value::as_str).unwrap_or_default();
    if outer != "user" && outer != "assistant" {
        return Vec::new();
    }

    let timestamp = parse_timestamp(&root);
    let Some(content) = root.get("message").and_then(|m| m.get("content")) else {
        return Vec::new();
    };

    let mut messages = Vec::new();

    if let Some(text) = content.as_str() {
        // Top-level string content is a single message carrying the outer
        // type label for user turns, plain text otherwise.
        let kind = if outer == "user" {
            MessageKind::User
        } else {
            MessageKind::Text
        };
        messages.push(SessionMessage::new(kind, timestamp, text.to_string()));
        return messages;
    }

    let Some(blocks) = content.as_array() else {
        return messages;
    };

    for block in blocks {
        let block_type = block.get("type").and_then(Value::as_str).unwrap_or_default();
        match block_type {
            "thinking" => {
                let thinking = block
                    .get("thinking")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if !thinking.is_empty() {
                    messages.push(SessionMessage::new(
                        MessageKind::Thinking,
                        timestamp,
                        thinking.to_string(),
                    ));
                }
            }
            "text" => {
                let text = block.get("text").and_then(Value::as_str).unwrap_or_default();
                if !text.is_empty() {
                    let kind = if outer == "user" {
                        MessageKind::User
                    } else {
                        MessageKind::Text
                    };
                    messages.push(SessionMessage::new(kind, timestamp, text.to_string()));
                }
            }
            "tool_use" => {
                // Always emitted, with empty fields when name/input are absent.
                let mut msg =
                    SessionMessage::new(MessageKind::ToolCall, timestamp, String::new());
                msg.tool_name = Some(
                    block
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                );
                msg.tool_input = Some(match block.get("input") {
                    Some(input) => truncate(&render_json(input), TOOL_INPUT_MAX),
                    None => String::new(),
                });
                messages.push(msg);
            }
            "tool_result" => {
                let result = match block.get("content") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => render_json(other),
                    None => String::new(),
                };
                messages.push(SessionMessage::new(
                    MessageKind::ToolResult,
                    timestamp,
                    truncate(&result, TOOL_RESULT_MAX),
                ));
            }
            _ => {}
        }
    }

    messages
}

/// Parse the line's `timestamp` field as an ISO-8601 offset datetime,
/// falling back to the current wall-clock time when absent or unparseable.
fn parse_timestamp(root: &Value) -> DateTime<Utc> {
    root.get("timestamp")
        .and_then(Value::as_str)
        .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Compact JSON rendering used for tool inputs and structured tool results.
fn render_json(value: &Value) -> String {
    serde_json::to_string(value).unwrap_or_default()
}

/// Cap `text` at `max` characters, appending an ellipsis marker when
/// anything was cut. Counts characters, not bytes, so multi-byte input is
/// never split.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn utc(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn user_string_content_becomes_one_user_message() {
        let line = r#"{"type":"user","timestamp":"2024-01-01T00:00:00Z","message":{"content":"fix bug 42"}}"#;
        let messages = parse_line(line);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::User);
        assert_eq!(messages[0].text, "fix bug 42");
        assert_eq!(messages[0].timestamp, utc("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn assistant_string_content_becomes_plain_text() {
        let line = r#"{"type":"assistant","timestamp":"2024-01-01T00:00:00Z","message":{"content":"done"}}"#;
        let messages = parse_line(line);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::Text);
    }

    #[test]
    fn other_outer_types_produce_nothing() {
        for line in [
            r#"{"type":"summary","message":{"content":"s"}}"#,
            r#"{"type":"progress","message":{"content":"p"}}"#,
            r#"{"message":{"content":"no type at all"}}"#,
        ] {
            assert!(parse_line(line).is_empty(), "line: {line}");
        }
    }

    #[test]
    fn malformed_json_is_skipped_silently() {
        assert!(parse_line("{not json").is_empty());
        assert!(parse_line("").is_empty());
    }

    #[test]
    fn missing_message_or_content_produces_nothing() {
        assert!(parse_line(r#"{"type":"user"}"#).is_empty());
        assert!(parse_line(r#"{"type":"user","message":{}}"#).is_empty());
    }

    #[test]
    fn tool_use_block_always_emits_tool_call() {
        let line = r#"{"type":"assistant","timestamp":"2024-01-01T00:00:00Z","message":{"content":[{"type":"tool_use","name":"search","input":{"q":"x"}}]}}"#;
        let messages = parse_line(line);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::ToolCall);
        assert_eq!(messages[0].tool_name.as_deref(), Some("search"));
        assert_eq!(messages[0].tool_input.as_deref(), Some(r#"{"q":"x"}"#));
        assert_eq!(messages[0].text, "");
    }

    #[test]
    fn tool_use_without_name_or_input_emits_empty_fields() {
        let line =
            r#"{"type":"assistant","message":{"content":[{"type":"tool_use"}]}}"#;
        let messages = parse_line(line);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].tool_name.as_deref(), Some(""));
        assert_eq!(messages[0].tool_input.as_deref(), Some(""));
    }

    #[test]
    fn tool_input_json_is_truncated_at_limit() {
        let long = "x".repeat(2000);
        let line = format!(
            r#"{{"type":"assistant","message":{{"content":[{{"type":"tool_use","name":"write","input":{{"data":"{long}"}}}}]}}}}"#
        );
        let messages = parse_line(&line);
        let input = messages[0].tool_input.as_deref().unwrap();
        assert_eq!(input.chars().count(), TOOL_INPUT_MAX + 3);
        assert!(input.ends_with("..."));
    }

    #[test]
    fn tool_result_string_content_is_used_verbatim_then_truncated() {
        let exactly = "y".repeat(TOOL_RESULT_MAX);
        let line = format!(
            r#"{{"type":"user","message":{{"content":[{{"type":"tool_result","content":"{exactly}"}}]}}}}"#
        );
        let messages = parse_line(&line);
        assert_eq!(messages[0].kind, MessageKind::ToolResult);
        // Exactly at the cap: untouched, no marker.
        assert_eq!(messages[0].text, exactly);

        let over = "y".repeat(TOOL_RESULT_MAX + 1);
        let line = format!(
            r#"{{"type":"user","message":{{"content":[{{"type":"tool_result","content":"{over}"}}]}}}}"#
        );
        let messages = parse_line(&line);
        assert_eq!(messages[0].text.chars().count(), TOOL_RESULT_MAX + 3);
        assert!(messages[0].text.ends_with("..."));
    }

    #[test]
    fn tool_result_structured_content_is_rendered_as_json() {
        let line = r#"{"type":"user","message":{"content":[{"type":"tool_result","content":[{"type":"text","text":"ok"}]}]}}"#;
        let messages = parse_line(line);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].kind, MessageKind::ToolResult);
        assert_eq!(messages[0].text, r#"[{"type":"text","text":"ok"}]"#);
    }

    #[test]
    fn empty_thinking_and_text_blocks_are_dropped() {
        let line = r#"{"type":"assistant","message":{"content":[{"type":"thinking","thinking":""},{"type":"text","text":""},{"type":"text","text":"kept"}]}}"#;
        let messages = parse_line(line);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "kept");
    }

    #[test]
    fn mixed_blocks_expand_in_order() {
        let line = r#"{"type":"assistant","timestamp":"2024-01-01T00:00:00Z","message":{"content":[{"type":"thinking","thinking":"hmm"},{"type":"text","text":"answer"},{"type":"tool_use","name":"grep","input":{"p":"fn"}},{"type":"unknown_block","x":1}]}}"#;
        let kinds: Vec<_> = parse_line(line).into_iter().map(|m| m.kind).collect();
        assert_eq!(
            kinds,
            vec![MessageKind::Thinking, MessageKind::Text, MessageKind::ToolCall]
        );
    }

    #[test]
    fn text_block_under_user_line_keeps_user_kind() {
        let line = r#"{"type":"user","message":{"content":[{"type":"text","text":"please"}]}}"#;
        let messages = parse_line(line);
        assert_eq!(messages[0].kind, MessageKind::User);
    }

    #[test]
    fn missing_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let messages = parse_line(r#"{"type":"user","message":{"content":"hi"}}"#);
        let after = Utc::now();
        assert!(messages[0].timestamp >= before && messages[0].timestamp <= after);
    }

    #[test]
    fn unparseable_timestamp_falls_back_to_now() {
        let before = Utc::now();
        let messages =
            parse_line(r#"{"type":"user","timestamp":"yesterday-ish","message":{"content":"hi"}}"#);
        assert!(messages[0].timestamp >= before);
    }

    #[test]
    fn offset_timestamps_normalize_to_utc() {
        let messages = parse_line(
            r#"{"type":"user","timestamp":"2024-01-01T02:00:00+02:00","message":{"content":"hi"}}"#,
        );
        assert_eq!(
            messages[0].timestamp,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn truncate_is_char_safe() {
        let s = "ありがとうございます";
        let out = truncate(s, 4);
        assert_eq!(out, "ありがと...");
        assert_eq!(truncate("short", 120), "short");
    }
}
