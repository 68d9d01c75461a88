//! Tool-call extraction from generated text.
//!
//! A turn may embed at most one tool-call block: the start marker, a fenced
//! code block holding a JSON object (`{"name": ..., "input": {...}}`), and
//! the end marker.
//!
//! Extraction deliberately uses a brace-depth scan rather than a JSON-aware
//! cursor: the first `{` after the start marker opens the payload, and the
//! scan walks forward until depth returns to zero. Nested objects and arrays
//! inside the payload are handled by the depth count; a payload truncated
//! mid-object fails with [`ProtocolError::UnbalancedBraces`] rather than
//! yielding a partial result. The end marker is usually absent from the turn
//! because it is the provider stop sequence.

use std::collections::HashMap;

use serde_json::Value;

use super::markers::TOOL_START_MARKER;
use crate::errors::ProtocolError;

/// A parsed tool-call request: `name` plus the raw `input` value.
///
/// `input` is kept verbatim from the payload. The model sometimes emits
/// `"input": ""` instead of `"input": {}` for parameterless tools; that
/// empty string is preserved here and mapped to "no parameters" by
/// [`ToolCallRequest::params`], matching what the dispatcher expects.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub name: String,
    pub input: Value,
}

impl ToolCallRequest {
    /// Resolve `input` to named parameters for dispatch.
    ///
    /// An absent input, a literal `""`, and `{}` all yield an empty map;
    /// an object yields its entries. Non-object, non-empty-string inputs
    /// are wrapped under a `"value"` key so the tool still sees them.
    pub fn params(&self) -> HashMap<String, Value> {
        match &self.input {
            Value::Null => HashMap::new(),
            Value::String(s) if s.is_empty() => HashMap::new(),
            Value::Object(map) => map.clone().into_iter().collect(),
            other => {
                let mut m = HashMap::new();
                m.insert("value".to_string(), other.clone());
                m
            }
        }
    }
}

/// Outcome of scanning one turn for tool calls.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallOutcome {
    /// No start marker present — the turn is a plain assistant message.
    NoCall,
    /// Exactly one well-formed tool-call block.
    OneCall(ToolCallRequest),
}

/// Extract at most one tool call from the full text of a turn.
///
/// More than one start marker fails fast with
/// [`ProtocolError::MultipleCalls`]; no extraction is attempted.
pub fn extract_tool_call(text: &str) -> Result<ToolCallOutcome, ProtocolError> {
    let occurrences = text.matches(TOOL_START_MARKER).count();
    if occurrences == 0 {
        return Ok(ToolCallOutcome::NoCall);
    }
    if occurrences > 1 {
        return Err(ProtocolError::MultipleCalls);
    }

    // Position just past the single start marker.
    let marker_pos = text
        .find(TOOL_START_MARKER)
        .expect("marker counted above") // occurrences == 1
        + TOOL_START_MARKER.len();

    let rel_start = text[marker_pos..]
        .find('{')
        .ok_or(ProtocolError::MissingJson)?;
    let json_start = marker_pos + rel_start;

    let json_end = find_balanced_end(&text[json_start..])
        .map(|len| json_start + len)
        .ok_or(ProtocolError::UnbalancedBraces)?;

    let block = &text[json_start..json_end];
    let data: Value =
        serde_json::from_str(block).map_err(|e| ProtocolError::InvalidJson(e.to_string()))?;

    let name = data
        .get("name")
        .and_then(|v| v.as_str())
        .ok_or(ProtocolError::MissingName)?
        .to_string();

    let input = data.get("input").cloned().unwrap_or(Value::Null);

    Ok(ToolCallOutcome::OneCall(ToolCallRequest { name, input }))
}

/// Byte length of the balanced `{...}` block at the start of `text`.
///
/// `text` must begin with `{`. Returns `None` when the input ends before
/// the depth returns to zero (truncated payload).
fn find_balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in text.char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}
