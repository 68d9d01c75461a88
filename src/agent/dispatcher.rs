//! Tool dispatch: registry lookup, invocation, failure isolation.

use std::time::{Duration, Instant};

use crate::agent::protocol::ToolCallRequest;
use crate::agent::tools::ToolRegistry;

/// Outcome of dispatching one tool call.
///
/// `output` is always populated: the tool's result on success, the wrapped
/// error text on failure. The orchestrator feeds it back to the model either
/// way.
#[derive(Debug, Clone)]
pub struct ToolCallResult {
    pub success: bool,
    pub output: String,
    pub error: Option<String>,
    pub duration: Duration,
}

/// Validate a parsed request against the registry and invoke the tool.
///
/// A literal empty-string `input` invokes the tool with zero parameters —
/// some models emit `""` instead of `{}` for parameterless tools and the
/// accommodation lives here, not in the tools. Unknown tools and tool
/// failures (panics included, caught underneath by the registry) come back
/// as failed results; nothing a tool does can escape this boundary and
/// terminate the loop.
pub async fn dispatch(registry: &ToolRegistry, request: &ToolCallRequest) -> ToolCallResult {
    let started = Instant::now();

    if !registry.has(&request.name) {
        let message = format!("Unknown tool: {}", request.name);
        return ToolCallResult {
            success: false,
            output: format!("Error: {}", message),
            error: Some(message),
            duration: started.elapsed(),
        };
    }

    let outcome = registry.execute(&request.name, request.params()).await;
    let duration = started.elapsed();

    if outcome.ok {
        ToolCallResult {
            success: true,
            output: outcome.data,
            error: None,
            duration,
        }
    } else {
        let wrapped = format!(
            "Error executing tool '{}': {}",
            request.name,
            outcome.error.as_deref().unwrap_or("unknown failure")
        );
        ToolCallResult {
            success: false,
            output: wrapped.clone(),
            error: Some(wrapped),
            duration,
        }
    }
}
