//! LLM providers.

pub mod base;
pub mod openai_compat;

pub use base::{LLMProvider, LLMResponse, StreamChunk, StreamHandle};
pub use openai_compat::OpenAICompatProvider;
