//! Wire-protocol marker strings bounding tool-call blocks in model output.
//!
//! These are bit-exact: the model is prompted with them verbatim and the
//! parser matches them verbatim. The end marker doubles as the provider
//! stop sequence, so a streamed turn normally arrives without it.

pub const TOOL_START_MARKER: &str = "[[qwen-tool-start]]";
pub const TOOL_END_MARKER: &str = "[[qwen-tool-end]]";

/// Prefix of the synthetic user message carrying a tool result back to the
/// model. Messages with this prefix are tool messages, not user input.
pub const TOOL_RESULT_PREFIX: &str = "Tool result:";
