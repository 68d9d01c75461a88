//! Base LLM provider interface.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;

/// Final accounting for one completed stream.
#[derive(Debug, Clone, Default)]
pub struct LLMResponse {
    /// The fully assembled response text, if any content arrived.
    pub content: Option<String>,
    pub finish_reason: String,
    /// Token usage as reported by the provider (`prompt_tokens`,
    /// `completion_tokens`, `total_tokens` when present).
    pub usage: HashMap<String, i64>,
}

/// A chunk from a streaming response.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    /// Incremental text content from the LLM.
    TextDelta(String),
    /// Stream complete — contains the fully assembled response.
    Done(LLMResponse),
}

/// Handle to a streaming LLM response.
pub struct StreamHandle {
    pub rx: tokio::sync::mpsc::UnboundedReceiver<StreamChunk>,
}

/// Abstract base trait for LLM providers.
///
/// Implementations handle the specifics of each provider's API while
/// maintaining a consistent interface. Tool use in this system rides the
/// text protocol (marker-delimited blocks), so there is no native
/// function-calling surface here — just messages in, text deltas out.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Open a streaming chat completion.
    ///
    /// # Arguments
    /// * `messages` - List of message objects with `role` and `content`.
    /// * `max_tokens` - Maximum tokens in the response.
    /// * `temperature` - Sampling temperature.
    /// * `stop` - Stop sequences; generation halts before emitting any of them.
    async fn chat_stream(
        &self,
        messages: &[serde_json::Value],
        max_tokens: u32,
        temperature: f64,
        stop: &[String],
    ) -> Result<StreamHandle>;

    /// Get the model this provider requests.
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A provider that replays a fixed list of deltas. Mirrors how the loop
    /// tests script conversations.
    struct ReplayProvider {
        deltas: Vec<String>,
    }

    #[async_trait]
    impl LLMProvider for ReplayProvider {
        async fn chat_stream(
            &self,
            _messages: &[serde_json::Value],
            _max_tokens: u32,
            _temperature: f64,
            _stop: &[String],
        ) -> Result<StreamHandle> {
            let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
            let mut full = String::new();
            for delta in &self.deltas {
                full.push_str(delta);
                let _ = tx.send(StreamChunk::TextDelta(delta.clone()));
            }
            let _ = tx.send(StreamChunk::Done(LLMResponse {
                content: Some(full),
                finish_reason: "stop".to_string(),
                usage: HashMap::new(),
            }));
            Ok(StreamHandle { rx })
        }

        fn model_name(&self) -> &str {
            "replay"
        }
    }

    #[tokio::test]
    async fn test_stream_handle_delivers_deltas_then_done() {
        let provider = ReplayProvider {
            deltas: vec!["Hello".into(), ", world".into()],
        };
        let mut handle = provider.chat_stream(&[], 100, 0.7, &[]).await.unwrap();

        let mut text = String::new();
        let mut done = None;
        while let Some(chunk) = handle.rx.recv().await {
            match chunk {
                StreamChunk::TextDelta(d) => text.push_str(&d),
                StreamChunk::Done(resp) => {
                    done = Some(resp);
                    break;
                }
            }
        }

        assert_eq!(text, "Hello, world");
        assert_eq!(done.unwrap().content.as_deref(), Some("Hello, world"));
    }
}
