//! The agent core: protocol parsing, dispatch, and the streaming loop.

pub mod agent_loop;
pub mod dispatcher;
pub mod instructions;
pub mod markers;
pub mod protocol;
pub mod sanitize;
pub mod tools;
pub mod wire;

pub use agent_loop::AgentLoop;
pub use dispatcher::{dispatch, ToolCallResult};
pub use protocol::{extract_tool_call, ToolCallOutcome, ToolCallRequest};
pub use wire::{ChatMessage, ChatRequest, StreamEvent};
