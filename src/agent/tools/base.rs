//! Base trait for agent tools.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::errors::{classify_tool_error, ToolErrorKind};

/// Structured outcome for a tool invocation.
#[derive(Debug, Clone)]
pub struct ToolExecutionResult {
    pub ok: bool,
    pub data: String,
    pub error: Option<String>,
    /// Structured error classification when the invocation failed.
    pub error_kind: Option<ToolErrorKind>,
}

impl ToolExecutionResult {
    pub fn success(data: String) -> Self {
        Self {
            ok: true,
            data,
            error: None,
            error_kind: None,
        }
    }

    pub fn failure(message: String) -> Self {
        let error_kind = Some(classify_tool_error(&message));
        Self {
            ok: false,
            data: format!("Error: {}", message),
            error: Some(message),
            error_kind,
        }
    }
}

/// Abstract base trait for agent tools.
///
/// Tools are capabilities the model can request against the host
/// environment: reading files, running SQL, fetching web pages, etc.
/// Implementations are stateless wrappers around one primitive each;
/// the orchestration loop owns all sequencing.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name used in tool-call requests.
    fn name(&self) -> &str;

    /// Description of what the tool does.
    fn description(&self) -> &str;

    /// JSON Schema for tool parameters.
    fn parameters(&self) -> serde_json::Value;

    /// Human-readable description of the return value, advertised in the
    /// system prompt alongside the parameter schema.
    fn returns(&self) -> &str;

    /// Execute the tool with given parameters.
    ///
    /// Returns the result as a string. Failures are reported with an
    /// `"Error: ..."` prefix rather than a Rust error so the text can be
    /// fed straight back to the model.
    async fn execute(&self, params: HashMap<String, serde_json::Value>) -> String;

    /// Execute and return a structured outcome.
    ///
    /// Tools can override this to report explicit success/failure semantics.
    /// The default implementation maps `Error:`-prefixed outputs to failures.
    async fn execute_with_result(
        &self,
        params: HashMap<String, serde_json::Value>,
    ) -> ToolExecutionResult {
        let out = self.execute(params).await;
        if let Some(err) = out.strip_prefix("Error:").map(|s| s.trim().to_string()) {
            ToolExecutionResult {
                ok: false,
                error_kind: Some(classify_tool_error(&err)),
                data: out,
                error: Some(err),
            }
        } else {
            ToolExecutionResult::success(out)
        }
    }

    /// Machine-readable capability record: name, description, parameter
    /// schema, and return description.
    fn to_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "name": self.name(),
            "description": self.description(),
            "parameters": self.parameters(),
            "returns": self.returns(),
        })
    }
}
