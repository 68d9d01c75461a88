//! Inbound request payload and outbound event stream types.
//!
//! The network listener itself lives outside this crate; these types define
//! the contract it forwards. Responses are newline-delimited JSON events,
//! one object per line.

use serde::{Deserialize, Serialize};
use serde_json::json;

fn default_temperature() -> f64 {
    0.7
}

fn default_max_output_tokens() -> u32 {
    5000
}

/// One role-tagged conversation message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    /// LLM wire form.
    pub fn to_json(&self) -> serde_json::Value {
        json!({"role": self.role, "content": self.content})
    }
}

/// Inbound conversation request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
}

impl ChatRequest {
    /// Parse a request body. A malformed body is a transport failure: the
    /// caller reports [`error_body`] with a client-error status and no
    /// partial stream.
    pub fn from_json_str(body: &str) -> Result<Self, String> {
        serde_json::from_str(body).map_err(|e| e.to_string())
    }
}

/// The single structured error object returned for malformed input.
pub fn error_body(message: &str) -> serde_json::Value {
    json!({"error": message})
}

/// One event on the response stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text.
    Chunk(String),
    /// The current model turn finished streaming.
    Done,
    /// A tool-call lifecycle message (result, violation, or correction).
    ToolCall(String),
}

impl StreamEvent {
    /// Wire object for this event.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            StreamEvent::Chunk(content) => {
                json!({"role": "assistant", "content": content, "type": "chunk"})
            }
            StreamEvent::Done => {
                json!({"role": "assistant", "content": "", "type": "done"})
            }
            StreamEvent::ToolCall(content) => {
                json!({"role": "tool_call", "content": content})
            }
        }
    }

    /// One NDJSON line, newline included.
    pub fn to_ndjson_line(&self) -> String {
        format!("{}\n", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let req = ChatRequest::from_json_str(
            r#"{"messages": [{"role": "user", "content": "hi"}]}"#,
        )
        .unwrap();
        assert_eq!(req.messages.len(), 1);
        assert_eq!(req.temperature, 0.7);
        assert_eq!(req.max_output_tokens, 5000);
    }

    #[test]
    fn test_request_explicit_values() {
        let req = ChatRequest::from_json_str(
            r#"{"messages": [], "temperature": 0.2, "max_output_tokens": 64}"#,
        )
        .unwrap();
        assert_eq!(req.temperature, 0.2);
        assert_eq!(req.max_output_tokens, 64);
    }

    #[test]
    fn test_malformed_request_is_an_error() {
        let err = ChatRequest::from_json_str("{nope").unwrap_err();
        assert!(!err.is_empty());

        let body = error_body(&err);
        assert!(body["error"].as_str().is_some());
    }

    #[test]
    fn test_chunk_event_shape() {
        let line = StreamEvent::Chunk("hel".into()).to_ndjson_line();
        let parsed: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(parsed["role"], "assistant");
        assert_eq!(parsed["type"], "chunk");
        assert_eq!(parsed["content"], "hel");
        assert!(line.ends_with('\n'));
    }

    #[test]
    fn test_done_event_shape() {
        let parsed = StreamEvent::Done.to_json();
        assert_eq!(parsed["role"], "assistant");
        assert_eq!(parsed["type"], "done");
        assert_eq!(parsed["content"], "");
    }

    #[test]
    fn test_tool_call_event_shape() {
        let parsed = StreamEvent::ToolCall("Tool result: ```ok```".into()).to_json();
        assert_eq!(parsed["role"], "tool_call");
        assert!(parsed.get("type").is_none());
        assert_eq!(parsed["content"], "Tool result: ```ok```");
    }
}
