//! Domain error types for qwen-agent.
//!
//! Typed errors at module boundaries replace string-encoded errors and
//! enable structured error handling via pattern matching.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Protocol errors
// ---------------------------------------------------------------------------

/// Violations of the tool-call block format in generated text.
///
/// All variants are recoverable in-loop: the orchestrator feeds a corrective
/// message back to the model instead of failing the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("multiple tool calls found")]
    MultipleCalls,

    #[error("no JSON object found after the tool-call marker")]
    MissingJson,

    #[error("unbalanced braces in tool-call block")]
    UnbalancedBraces,

    #[error("invalid tool-call JSON: {0}")]
    InvalidJson(String),

    #[error("tool call is missing a 'name' field")]
    MissingName,
}

// ---------------------------------------------------------------------------
// Provider errors
// ---------------------------------------------------------------------------

/// Errors from LLM provider operations.
///
/// Embedded in `anyhow::Error` so the `LLMProvider` trait signature
/// (`-> anyhow::Result<StreamHandle>`) stays unchanged while callers
/// can downcast: `e.downcast_ref::<ProviderError>()`.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("LLM API returned status {status}: {message}")]
    ApiError { status: u16, message: String },
}

// ---------------------------------------------------------------------------
// Tool error classification
// ---------------------------------------------------------------------------

/// Categorised tool failure reasons.
///
/// Produced by [`classify_tool_error`] from the error string that tools
/// return via the `"Error: ..."` prefix convention. The structured event
/// logger uses the category as the `error_type` of error records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolErrorKind {
    #[error("Operation timed out after {0}s")]
    Timeout(u64),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

impl ToolErrorKind {
    /// Short machine-readable category name for log records.
    pub fn category(&self) -> &'static str {
        match self {
            ToolErrorKind::Timeout(_) => "timeout",
            ToolErrorKind::PermissionDenied(_) => "permission_denied",
            ToolErrorKind::NotFound(_) => "not_found",
            ToolErrorKind::InvalidArgs(_) => "invalid_args",
            ToolErrorKind::ToolNotFound(_) => "unknown_tool",
            ToolErrorKind::ExecutionFailed(_) => "execution_failed",
        }
    }
}

/// Classify a tool error string into a structured [`ToolErrorKind`].
///
/// Matches on known substrings in the error message. Falls back to
/// `ExecutionFailed` for unrecognised patterns.
pub fn classify_tool_error(error_msg: &str) -> ToolErrorKind {
    let lower = error_msg.to_lowercase();

    if lower.contains("unknown tool") || lower.contains("tool not found") {
        return ToolErrorKind::ToolNotFound(error_msg.to_string());
    }

    if lower.contains("timed out") || lower.contains("timeout") {
        let secs = extract_timeout_secs(&lower).unwrap_or(0);
        return ToolErrorKind::Timeout(secs);
    }

    if lower.contains("permission denied") {
        return ToolErrorKind::PermissionDenied(error_msg.to_string());
    }

    if lower.contains("no such file")
        || lower.contains("not found")
        || lower.contains("does not exist")
    {
        return ToolErrorKind::NotFound(error_msg.to_string());
    }

    if lower.contains("invalid")
        || lower.contains("required")
        || lower.contains("cannot be empty")
    {
        return ToolErrorKind::InvalidArgs(error_msg.to_string());
    }

    ToolErrorKind::ExecutionFailed(error_msg.to_string())
}

/// Try to extract a numeric timeout value from an error message.
fn extract_timeout_secs(msg: &str) -> Option<u64> {
    // Pattern: "timed out after 30 seconds" or "timeout after 30s"
    let patterns = ["after ", "timeout "];
    for pat in &patterns {
        if let Some(pos) = msg.find(pat) {
            let after = &msg[pos + pat.len()..];
            let num_str: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
            if let Ok(n) = num_str.parse::<u64>() {
                return Some(n);
            }
        }
    }
    None
}
