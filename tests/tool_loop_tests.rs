// End-to-end tests for the streaming tool-call loop: a scripted provider
// drives the real registry, parser, dispatcher, and loggers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;

use qwen_agent::agent::tools::build_registry;
use qwen_agent::agent::{AgentLoop, ChatMessage, ChatRequest, StreamEvent};
use qwen_agent::config::schema::{Config, LoggingConfig, StreamingLogConfig, ToolsConfig};
use qwen_agent::logging::{InferenceLogger, StreamLogger};
use qwen_agent::providers::{LLMProvider, LLMResponse, StreamChunk, StreamHandle};

/// Replays one scripted delta list per model invocation.
struct ScriptedProvider {
    turns: Mutex<Vec<Vec<String>>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    fn new(turns: Vec<Vec<&str>>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(
                turns
                    .into_iter()
                    .map(|t| t.into_iter().map(String::from).collect())
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn chat_stream(
        &self,
        _messages: &[serde_json::Value],
        _max_tokens: u32,
        _temperature: f64,
        stop: &[String],
    ) -> anyhow::Result<StreamHandle> {
        // The loop must always arm the end marker as the stop sequence.
        assert_eq!(stop, ["[[qwen-tool-end]]".to_string()]);
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut turns = self.turns.lock().unwrap();
        let deltas = if turns.is_empty() {
            Vec::new()
        } else {
            turns.remove(0)
        };

        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let mut full = String::new();
        for delta in deltas {
            full.push_str(&delta);
            let _ = tx.send(StreamChunk::TextDelta(delta));
        }
        let _ = tx.send(StreamChunk::Done(LLMResponse {
            content: Some(full),
            finish_reason: "stop".to_string(),
            usage: HashMap::new(),
        }));
        Ok(StreamHandle { rx })
    }

    fn model_name(&self) -> &str {
        "scripted-test-model"
    }
}

struct TestRig {
    agent_loop: AgentLoop,
    provider: Arc<ScriptedProvider>,
    dir: TempDir,
}

fn rig(turns: Vec<Vec<&str>>) -> TestRig {
    let dir = TempDir::new().unwrap();
    let provider = ScriptedProvider::new(turns);

    let config = Config::default();
    let logging = LoggingConfig {
        to_console: false,
        ..LoggingConfig::default()
    };
    let stream_log = StreamLogger::new(dir.path(), &StreamingLogConfig::default());
    let inference_log = InferenceLogger::new(dir.path(), &logging);

    let agent_loop = AgentLoop::new(
        Arc::clone(&provider) as Arc<dyn LLMProvider>,
        Arc::new(build_registry(&ToolsConfig::default())),
        stream_log,
        inference_log,
        &config,
    );

    TestRig {
        agent_loop,
        provider,
        dir,
    }
}

fn request(content: &str) -> ChatRequest {
    ChatRequest {
        messages: vec![ChatMessage::new("user", content)],
        temperature: 0.7,
        max_output_tokens: 500,
    }
}

async fn run(rig: &TestRig, session_id: &str, content: &str) -> Vec<StreamEvent> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    rig.agent_loop
        .run(session_id, request(content), &tx)
        .await
        .unwrap();
    drop(tx);

    let mut events = Vec::new();
    while let Some(e) = rx.recv().await {
        events.push(e);
    }
    events
}

#[tokio::test]
async fn get_cwd_scenario_round_trip() {
    // A canonical tool-call turn, minus the end marker the stop sequence consumes.
    let tool_turn =
        "Let me check.\n[[qwen-tool-start]]\n```\n{\"name\":\"get_cwd\",\"input\":\"\"}\n```\n";
    let r = rig(vec![vec!["Let me check.\n", &tool_turn["Let me check.\n".len()..]], vec!["All done."]]);

    let events = run(&r, "cwd-session", "What is your cwd?").await;

    // First turn streams as chunks, then done, then the tool result.
    assert!(matches!(&events[0], StreamEvent::Chunk(c) if c == "Let me check.\n"));
    let tool_event = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::ToolCall(msg) => Some(msg.clone()),
            _ => None,
        })
        .expect("a tool_call event must be emitted");
    assert!(tool_event.starts_with("Tool result: ```"));
    assert!(tool_event.contains("Current working directory:"));
    assert!(tool_event.ends_with("```"));

    // Two model invocations: the tool turn and the wrap-up.
    assert_eq!(r.provider.calls.load(Ordering::SeqCst), 2);
    assert_eq!(events.last(), Some(&StreamEvent::Done));
}

#[tokio::test]
async fn no_marker_turn_terminates_without_tool_events() {
    let r = rig(vec![vec!["Paris is the capital of France."]]);
    let events = run(&r, "plain-session", "Capital of France?").await;

    assert_eq!(r.provider.calls.load(Ordering::SeqCst), 1);
    assert!(events
        .iter()
        .all(|e| !matches!(e, StreamEvent::ToolCall(_))));
    assert_eq!(events.last(), Some(&StreamEvent::Done));
}

#[tokio::test]
async fn two_start_markers_trigger_violation_and_recovery() {
    let double =
        "[[qwen-tool-start]]\n```\n{\"name\":\"get_cwd\"}\n```\n[[qwen-tool-start]]\n```\n{\"name\":\"get_cwd\"}\n```\n";
    let r = rig(vec![vec![double], vec!["Only one next time."]]);

    let events = run(&r, "violation-session", "do two things").await;

    let violation = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::ToolCall(msg) => Some(msg.clone()),
            _ => None,
        })
        .expect("violation message expected");
    assert!(violation.contains("Multiple tool calls found"));
    // The model got a second chance and finished.
    assert_eq!(r.provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn truncated_tool_call_asks_for_better_json() {
    let truncated = "[[qwen-tool-start]]\n```\n{\"name\":\"get_cwd\",\"input\":{\"a\"";
    let r = rig(vec![vec![truncated], vec!["Recovered."]]);

    let events = run(&r, "truncated-session", "go").await;

    let correction = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::ToolCall(msg) => Some(msg.clone()),
            _ => None,
        })
        .expect("correction message expected");
    assert!(correction.contains("No valid tool call found"));
    assert_eq!(r.provider.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn nested_brace_payload_dispatches() {
    let dir = TempDir::new().unwrap();
    let target = dir.path().join("out.json");
    let turn = format!(
        "[[qwen-tool-start]]\n```\n{{\"name\":\"write_file\",\"input\":{{\"path\":{:?},\"content\":\"{{\\\"nested\\\":{{\\\"deep\\\":1}}}}\"}}}}\n```\n",
        target.to_str().unwrap()
    );
    let r = rig(vec![vec![turn.as_str()], vec!["Written."]]);

    let events = run(&r, "nested-session", "write it").await;

    let tool_event = events
        .iter()
        .find_map(|e| match e {
            StreamEvent::ToolCall(msg) => Some(msg.clone()),
            _ => None,
        })
        .unwrap();
    assert!(tool_event.contains("Successfully wrote"), "got: {}", tool_event);
    assert_eq!(
        std::fs::read_to_string(&target).unwrap(),
        "{\"nested\":{\"deep\":1}}"
    );
}

#[tokio::test]
async fn streaming_log_is_deleted_on_completion() {
    let r = rig(vec![vec!["chunk one ", "chunk two"]]);
    run(&r, "cleanup-session", "hello").await;

    let active = r.dir.path().join("streaming").join("active");
    let leftover: Vec<_> = std::fs::read_dir(&active)
        .map(|rd| rd.flatten().collect())
        .unwrap_or_default();
    assert!(
        leftover.is_empty(),
        "completed session must leave no streaming artifact"
    );
}

#[tokio::test]
async fn event_log_records_full_session() {
    let tool_turn =
        "[[qwen-tool-start]]\n```\n{\"name\":\"get_cwd\",\"input\":\"\"}\n```\n";
    let r = rig(vec![vec![tool_turn], vec!["Done."]]);
    run(&r, "audit-session", "cwd please").await;

    let inference_dir = r.dir.path().join("inference");
    let daily: Vec<_> = std::fs::read_dir(&inference_dir)
        .unwrap()
        .flatten()
        .collect();
    assert_eq!(daily.len(), 1);

    let records: Vec<serde_json::Value> = std::fs::read_to_string(daily[0].path())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    let kinds: Vec<&str> = records
        .iter()
        .map(|r| r["event_type"].as_str().unwrap())
        .collect();
    assert_eq!(
        kinds,
        vec![
            "inference_start",
            "assistant_response",
            "tool_execution",
            "assistant_response",
            "session_complete",
        ]
    );

    let tool_record = &records[2];
    assert_eq!(tool_record["tool_name"], "get_cwd");
    assert_eq!(tool_record["success"], true);

    let complete = &records[4];
    assert_eq!(complete["total_rounds"], 2);
    assert_eq!(complete["tools_used"][0], "get_cwd");
    assert_eq!(complete["final_status"], "completed");
}

#[tokio::test]
async fn concurrent_sessions_keep_streams_separate() {
    // Two loops over the same logger pair, interleaved by the runtime.
    let dir = TempDir::new().unwrap();
    let logging = LoggingConfig {
        to_console: false,
        ..LoggingConfig::default()
    };
    let stream_log = StreamLogger::new(dir.path(), &logging.streaming);
    let inference_log = InferenceLogger::new(dir.path(), &logging);
    let config = Config::default();

    let mk_loop = |turns: Vec<Vec<&str>>| {
        AgentLoop::new(
            ScriptedProvider::new(turns) as Arc<dyn LLMProvider>,
            Arc::new(build_registry(&ToolsConfig::default())),
            Arc::clone(&stream_log),
            Arc::clone(&inference_log),
            &config,
        )
    };

    let loop_a = mk_loop(vec![vec!["aaaa ", "aaaa"]]);
    let loop_b = mk_loop(vec![vec!["bbbb ", "bbbb"]]);

    let (tx_a, _rx_a) = tokio::sync::mpsc::unbounded_channel();
    let (tx_b, _rx_b) = tokio::sync::mpsc::unbounded_channel();

    let (ra, rb) = tokio::join!(
        loop_a.run("session-a", request("a"), &tx_a),
        loop_b.run("session-b", request("b"), &tx_b),
    );
    ra.unwrap();
    rb.unwrap();

    // Both sessions completed: no residual streaming files for either.
    let active = dir.path().join("streaming").join("active");
    let leftover: Vec<_> = std::fs::read_dir(&active)
        .map(|rd| rd.flatten().collect())
        .unwrap_or_default();
    assert!(leftover.is_empty());
}

#[tokio::test]
async fn ndjson_rendering_of_a_full_conversation() {
    let r = rig(vec![vec!["Hello ", "there."]]);
    let events = run(&r, "ndjson-session", "hi").await;

    let lines: Vec<String> = events.iter().map(|e| e.to_ndjson_line()).collect();
    assert_eq!(lines.len(), 3);

    let first: serde_json::Value = serde_json::from_str(lines[0].trim()).unwrap();
    assert_eq!(first["role"], "assistant");
    assert_eq!(first["type"], "chunk");
    assert_eq!(first["content"], "Hello ");

    let last: serde_json::Value = serde_json::from_str(lines[2].trim()).unwrap();
    assert_eq!(last["type"], "done");
}
