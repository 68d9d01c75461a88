//! The streaming tool-call loop.
//!
//! One loop instance drives one conversation: open a model stream, fan each
//! chunk out to the caller and the streaming log while accumulating the
//! turn, then parse the finished turn for a tool call. Exactly one call
//! dispatches and the loop re-enters generation with the result appended;
//! zero calls terminates; a malformed or multiple-call turn feeds a
//! corrective message back to the model and re-enters generation. Nothing a
//! tool or the parser does is fatal to the conversation — only a failure to
//! open the model stream ends the loop early.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::json;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::agent::dispatcher::dispatch;
use crate::agent::instructions::build_system_prompt;
use crate::agent::markers::TOOL_END_MARKER;
use crate::agent::protocol::{extract_tool_call, ToolCallOutcome};
use crate::agent::sanitize::strip_think_blocks;
use crate::agent::tools::ToolRegistry;
use crate::agent::wire::{ChatRequest, StreamEvent};
use crate::config::schema::Config;
use crate::errors::ProtocolError;
use crate::logging::{InferenceLogger, StreamLogger};
use crate::providers::{LLMProvider, StreamChunk};

/// Corrective message for a turn containing more than one tool call.
const MULTIPLE_CALLS_MSG: &str =
    "Tool Call Error: Multiple tool calls found. Please only use one tool at a time.";

/// Corrective message for a turn whose single tool-call block failed to parse.
const MALFORMED_CALL_MSG: &str = "Tool result: No valid tool call found. Please make sure tool \
     request is valid JSON, and escape necessary characters. Try again with better-formatted JSON";

/// Orchestrator for streaming tool-call conversations.
pub struct AgentLoop {
    provider: Arc<dyn LLMProvider>,
    registry: Arc<ToolRegistry>,
    stream_log: Arc<StreamLogger>,
    inference_log: Arc<InferenceLogger>,
    request_delay: Duration,
    max_rounds: Option<u32>,
}

impl AgentLoop {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        registry: Arc<ToolRegistry>,
        stream_log: Arc<StreamLogger>,
        inference_log: Arc<InferenceLogger>,
        config: &Config,
    ) -> Self {
        Self {
            provider,
            registry,
            stream_log,
            inference_log,
            request_delay: Duration::from_secs(config.provider.rate_limit_pause_secs),
            max_rounds: config.agent.max_rounds,
        }
    }

    /// Run one conversation to termination.
    ///
    /// Events are pushed onto `events` as they happen; the function returns
    /// once the loop reaches its terminal state. Session log artifacts are
    /// cleaned up and the completion record written on every exit path.
    pub async fn run(
        &self,
        session_id: &str,
        request: ChatRequest,
        events: &UnboundedSender<StreamEvent>,
    ) -> Result<()> {
        let inbound: Vec<serde_json::Value> =
            request.messages.iter().map(|m| m.to_json()).collect();

        self.inference_log
            .log_inference_start(
                session_id,
                self.provider.model_name(),
                &inbound,
                request.temperature,
                request.max_output_tokens,
            )
            .await;

        // Conversation state: system prompt first, then the inbound messages.
        // This loop is the sole mutator for the session's lifetime.
        let mut messages: Vec<serde_json::Value> = Vec::with_capacity(inbound.len() + 1);
        messages.push(json!({
            "role": "system",
            "content": build_system_prompt(&self.registry),
        }));
        messages.extend(inbound);

        let stop = vec![TOOL_END_MARKER.to_string()];
        let mut round: u32 = 0;
        let mut final_status = "completed";

        let outcome = loop {
            if let Some(max) = self.max_rounds {
                if round >= max {
                    warn!("session {}: round limit {} reached", session_id, max);
                    self.inference_log
                        .log_error(
                            session_id,
                            "round_limit",
                            &format!("conversation stopped after {} rounds", max),
                            None,
                        )
                        .await;
                    final_status = "round_limit";
                    break Ok(());
                }
            }

            // Fixed inter-request pause for upstream rate limits.
            if !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            let mut handle = match self
                .provider
                .chat_stream(
                    &messages,
                    request.max_output_tokens,
                    request.temperature,
                    &stop,
                )
                .await
            {
                Ok(h) => h,
                Err(e) => {
                    self.inference_log
                        .log_error(session_id, "provider_error", &e.to_string(), None)
                        .await;
                    final_status = "provider_error";
                    break Err(e);
                }
            };

            // Generating: every delta goes to the caller, the streaming log,
            // and the turn accumulator.
            let mut turn = String::new();
            let mut chunk_count: u64 = 0;
            while let Some(chunk) = handle.rx.recv().await {
                match chunk {
                    StreamChunk::TextDelta(delta) => {
                        chunk_count += 1;
                        let _ = events.send(StreamEvent::Chunk(delta.clone()));
                        self.stream_log.append(session_id, &delta).await;
                        turn.push_str(&delta);
                    }
                    StreamChunk::Done(response) => {
                        if let Some(total) = response.usage.get("total_tokens") {
                            self.inference_log.add_token_usage(session_id, *total).await;
                        }
                        break;
                    }
                }
            }

            round += 1;
            let _ = events.send(StreamEvent::Done);

            let cleaned = strip_think_blocks(&turn);
            self.inference_log
                .log_assistant_response(session_id, round, &turn, &cleaned, chunk_count)
                .await;

            // The turn becomes a permanent assistant message whether or not
            // it carries a tool call.
            messages.push(json!({"role": "assistant", "content": cleaned.clone()}));

            match extract_tool_call(&cleaned) {
                Err(ProtocolError::MultipleCalls) => {
                    debug!("session {}: multiple tool calls in one turn", session_id);
                    self.inference_log
                        .log_error(
                            session_id,
                            "protocol_violation",
                            ProtocolError::MultipleCalls.to_string().as_str(),
                            Some(json!({"round": round})),
                        )
                        .await;
                    messages.push(json!({"role": "user", "content": MULTIPLE_CALLS_MSG}));
                    let _ = events.send(StreamEvent::ToolCall(MULTIPLE_CALLS_MSG.to_string()));
                }
                Err(e) => {
                    debug!("session {}: malformed tool call: {}", session_id, e);
                    self.inference_log
                        .log_error(
                            session_id,
                            "protocol_violation",
                            &e.to_string(),
                            Some(json!({"round": round})),
                        )
                        .await;
                    messages.push(json!({"role": "user", "content": MALFORMED_CALL_MSG}));
                    let _ = events.send(StreamEvent::ToolCall(MALFORMED_CALL_MSG.to_string()));
                }
                Ok(ToolCallOutcome::NoCall) => {
                    // Terminated: the turn is the final assistant message.
                    break Ok(());
                }
                Ok(ToolCallOutcome::OneCall(call)) => {
                    debug!(
                        "session {}: executing tool {} (round {})",
                        session_id, call.name, round
                    );
                    let result = dispatch(&self.registry, &call).await;
                    self.inference_log
                        .log_tool_execution(
                            session_id,
                            &call.name,
                            &call.input,
                            &result.output,
                            result.duration.as_millis() as u64,
                            result.success,
                        )
                        .await;

                    // Success and caught failure take the same shape; the
                    // model adapts off the message body.
                    let message = format!("Tool result: ```{}```", result.output);
                    messages.push(json!({"role": "user", "content": message}));
                    let _ = events.send(StreamEvent::ToolCall(message));
                }
            }
        };

        // Terminal housekeeping on every exit path: the streaming artifact
        // is removed and the durable completion record written.
        self.stream_log.complete(session_id).await;
        self.inference_log
            .log_session_complete(session_id, final_status)
            .await;

        outcome
    }
}
