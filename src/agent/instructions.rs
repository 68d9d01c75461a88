//! System prompt construction.
//!
//! The prompt advertises the tool catalogue (built from the registry's
//! machine-readable schemas) and the exact tool-call wire format. The format
//! section is load-bearing: the markers and the fenced code block are matched
//! bit-for-bit by the protocol parser.

use crate::agent::tools::ToolRegistry;

/// Render the full system prompt for a conversation.
pub fn build_system_prompt(registry: &ToolRegistry) -> String {
    format!(
        "You are Qwen-Max, an advanced AI model. You will assist the user with tasks, using tools available to you.\n\n\
         You have the following tools available:\n{}\n\n{}",
        render_tool_catalogue(registry),
        tool_format_instructions()
    )
}

/// Render the tool list: description, parameters with required/optional and
/// type, and the return description.
fn render_tool_catalogue(registry: &ToolRegistry) -> String {
    let mut out = String::new();

    for def in registry.definitions() {
        let name = def["name"].as_str().unwrap_or_default();
        let description = def["description"].as_str().unwrap_or_default();
        let returns = def["returns"].as_str().unwrap_or_default();

        out.push_str(&format!("-{}: {}\n", name, description));
        out.push_str("    Parameters:\n");

        let required: Vec<&str> = def["parameters"]["required"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default();

        let properties = def["parameters"]["properties"].as_object();
        match properties {
            Some(props) if !props.is_empty() => {
                for (param, schema) in props {
                    let required_str = if required.contains(&param.as_str()) {
                        "required"
                    } else {
                        "optional"
                    };
                    let param_type = schema["type"].as_str().unwrap_or("string");
                    let param_desc = schema["description"].as_str().unwrap_or_default();
                    out.push_str(&format!(
                        "    - {} ({}, {}): {}\n",
                        param, required_str, param_type, param_desc
                    ));
                }
            }
            _ => {
                out.push_str("    None. This tool does not need a parameter.\n");
            }
        }

        out.push_str(&format!("    Returns: {}\n\n", returns));
    }

    out
}

/// The tool-call format contract: markers, fenced JSON, one call per turn.
fn tool_format_instructions() -> String {
    r#"When you want to use a tool, make a tool call (no explanations) using this exact format:

[[qwen-tool-start]]
```
{
    "name": "tool_name",
    "input": {
        "param1": "value1",
        "param2": "value2"
    }
}
```
[[qwen-tool-end]]

Note that the triple backticks (```) are part of the format!

Example 1:
************************
User: What is your current working directory?
Assistant:
[[qwen-tool-start]]
```
{
    "name": "get_cwd",
    "input": ""
}
```
[[qwen-tool-end]]
**********************


Example 2:
************************
User: List the files in your current working directory.
Assistant:
[[qwen-tool-start]]
```
{
    "name": "list_directory",
    "input": {
        "path": "."
    }
}
```
[[qwen-tool-end]]
**********************

CONSTRAINT: ONLY ONE TOOL CALL IS ALLOWED PER MESSAGE

Immediately end your response after calling a tool and the final triple backticks.

NOTE: User messages that start with "Tool result:" are actually TOOL MESSAGES (automated, from tool execution) and do not come from the user.

After receiving the results of a tool call, do not parrot everything back to the user.
Instead, just briefly summarize the results in 1-2 sentences.
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::markers::{TOOL_END_MARKER, TOOL_START_MARKER};
    use crate::agent::tools::Tool;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct CatalogueTool;

    #[async_trait]
    impl Tool for CatalogueTool {
        fn name(&self) -> &str {
            "sample_tool"
        }
        fn description(&self) -> &str {
            "Does sample things"
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "target": {"type": "string", "description": "what to sample"},
                    "depth": {"type": "integer", "description": "how deep"}
                },
                "required": ["target"]
            })
        }
        fn returns(&self) -> &str {
            "String - the sample"
        }
        async fn execute(&self, _params: HashMap<String, serde_json::Value>) -> String {
            String::new()
        }
    }

    struct BareTool;

    #[async_trait]
    impl Tool for BareTool {
        fn name(&self) -> &str {
            "bare_tool"
        }
        fn description(&self) -> &str {
            "Takes nothing"
        }
        fn parameters(&self) -> serde_json::Value {
            serde_json::json!({"type": "object", "properties": {}})
        }
        fn returns(&self) -> &str {
            "String - a constant"
        }
        async fn execute(&self, _params: HashMap<String, serde_json::Value>) -> String {
            String::new()
        }
    }

    fn registry() -> ToolRegistry {
        let mut r = ToolRegistry::new();
        r.register(Box::new(CatalogueTool));
        r.register(Box::new(BareTool));
        r
    }

    #[test]
    fn test_prompt_contains_markers_verbatim() {
        let prompt = build_system_prompt(&registry());
        assert!(prompt.contains(TOOL_START_MARKER));
        assert!(prompt.contains(TOOL_END_MARKER));
        assert!(prompt.contains("ONLY ONE TOOL CALL"));
    }

    #[test]
    fn test_catalogue_lists_parameters_with_requiredness() {
        let prompt = build_system_prompt(&registry());
        assert!(prompt.contains("-sample_tool: Does sample things"));
        assert!(prompt.contains("- target (required, string): what to sample"));
        assert!(prompt.contains("- depth (optional, integer): how deep"));
        assert!(prompt.contains("Returns: String - the sample"));
    }

    #[test]
    fn test_catalogue_handles_parameterless_tools() {
        let prompt = build_system_prompt(&registry());
        assert!(prompt.contains("-bare_tool: Takes nothing"));
        assert!(prompt.contains("None. This tool does not need a parameter."));
    }

    #[test]
    fn test_prompt_mentions_tool_result_convention() {
        let prompt = build_system_prompt(&registry());
        assert!(prompt.contains("Tool result:"));
    }
}
