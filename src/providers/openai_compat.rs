//! OpenAI-compatible streaming provider.
//!
//! Talks to any endpoint implementing the OpenAI chat completions API
//! (DashScope, vLLM, LM Studio, OpenAI itself) with `stream: true` and a
//! stop-sequence array. Only the SSE path exists: the orchestration loop
//! always streams.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use tracing::{debug, warn};

use super::base::{LLMProvider, LLMResponse, StreamChunk, StreamHandle};
use crate::errors::ProviderError;

/// An LLM provider that talks to an OpenAI-compatible chat completions endpoint.
pub struct OpenAICompatProvider {
    api_key: String,
    api_base: String,
    model: String,
    client: Client,
}

impl OpenAICompatProvider {
    /// Create a new provider. `api_base` is used as given, minus any
    /// trailing slash.
    pub fn new(api_key: &str, api_base: &str, model: &str) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatProvider {
    async fn chat_stream(
        &self,
        messages: &[serde_json::Value],
        max_tokens: u32,
        temperature: f64,
        stop: &[String],
    ) -> Result<StreamHandle> {
        let url = format!("{}/chat/completions", self.api_base);

        let mut body = serde_json::json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": max_tokens,
            "temperature": temperature,
            "stream": true,
        });
        if !stop.is_empty() {
            body["stop"] = serde_json::json!(stop);
        }

        debug!(
            "chat_stream: base={} model={} messages={} stop={:?}",
            self.api_base,
            self.model,
            messages.len(),
            stop
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::HttpError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!(
                "LLM streaming API returned status {} (base={}): {}",
                status, self.api_base, error_text
            );
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: error_text,
            }
            .into());
        }

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

        // Parse the SSE stream on its own task so the caller can consume
        // deltas while the network read continues.
        let byte_stream = response.bytes_stream();
        tokio::spawn(async move {
            parse_sse_stream(byte_stream, tx).await;
        });

        Ok(StreamHandle { rx })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Consume an SSE byte stream and forward text deltas.
///
/// Provider anomalies are recoverable by design: fragments that are not
/// valid JSON, have no choices, or carry an empty delta are skipped rather
/// than surfaced as errors.
async fn parse_sse_stream(
    byte_stream: impl futures_util::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Unpin,
    tx: tokio::sync::mpsc::UnboundedSender<StreamChunk>,
) {
    let mut line_buffer = String::new();
    let mut full_content = String::new();
    let mut finish_reason = String::from("stop");
    let mut usage: HashMap<String, i64> = HashMap::new();

    let mut stream = Box::pin(byte_stream);

    while let Some(result) = stream.next().await {
        let bytes = match result {
            Ok(b) => b,
            Err(e) => {
                warn!("SSE stream error: {}", e);
                break;
            }
        };

        let text = String::from_utf8_lossy(&bytes);
        line_buffer.push_str(&text);

        // Process complete lines.
        while let Some(newline_pos) = line_buffer.find('\n') {
            let line = line_buffer[..newline_pos]
                .trim_end_matches('\r')
                .to_string();
            line_buffer = line_buffer[newline_pos + 1..].to_string();

            if line.is_empty() || !line.starts_with("data: ") {
                continue;
            }

            let data = &line[6..];

            if data == "[DONE]" {
                send_done(&tx, &full_content, &finish_reason, &usage);
                return;
            }

            let chunk: serde_json::Value = match serde_json::from_str(data) {
                Ok(v) => v,
                Err(e) => {
                    debug!("SSE parse error (skipping fragment): {}", e);
                    continue;
                }
            };

            if let Some(choice) = chunk
                .get("choices")
                .and_then(|c| c.as_array())
                .and_then(|arr| arr.first())
            {
                if let Some(fr) = choice.get("finish_reason").and_then(|v| v.as_str()) {
                    finish_reason = fr.to_string();
                }

                // Missing or empty delta content is a skippable anomaly.
                if let Some(content) = choice
                    .get("delta")
                    .and_then(|d| d.get("content"))
                    .and_then(|v| v.as_str())
                {
                    if !content.is_empty() {
                        full_content.push_str(content);
                        let _ = tx.send(StreamChunk::TextDelta(content.to_string()));
                    }
                }
            }

            // Usage arrives in the final fragment on some providers.
            if let Some(usage_obj) = chunk.get("usage").and_then(|v| v.as_object()) {
                for (key, value) in usage_obj {
                    if let Some(n) = value.as_i64() {
                        usage.insert(key.clone(), n);
                    }
                }
            }
        }
    }

    // Stream ended without a [DONE] marker (connection drop or a provider
    // that just closes the stream). Whatever accumulated still counts.
    send_done(&tx, &full_content, &finish_reason, &usage);
}

fn send_done(
    tx: &tokio::sync::mpsc::UnboundedSender<StreamChunk>,
    full_content: &str,
    finish_reason: &str,
    usage: &HashMap<String, i64>,
) {
    let content = if full_content.is_empty() {
        None
    } else {
        Some(full_content.to_string())
    };
    let _ = tx.send(StreamChunk::Done(LLMResponse {
        content,
        finish_reason: finish_reason.to_string(),
        usage: usage.clone(),
    }));
}
