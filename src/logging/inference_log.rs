//! Structured event logging for inference sessions.
//!
//! One line-delimited JSON record per discrete event, written to a daily
//! file under `<dir>/inference/`. Errors are additionally mirrored into a
//! plain-text daily file under `<dir>/errors/`. Per-session aggregate
//! counters (rounds, tools used, token totals) live in memory for the
//! duration of the session and are summarised by the `session_complete`
//! record.
//!
//! This logger never returns an error: a failed write is reported on the
//! process diagnostic channel and otherwise ignored. Logging must never
//! abort inference.

use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::config::schema::LoggingConfig;

/// In-memory aggregates for one active session.
struct SessionStats {
    started: Instant,
    rounds: u32,
    tools_used: HashSet<String>,
    total_tokens: i64,
}

/// Structured event logger shared by all sessions.
pub struct InferenceLogger {
    enabled: bool,
    to_console: bool,
    to_file: bool,
    truncate_long: bool,
    max_length: usize,
    inference_dir: PathBuf,
    errors_dir: PathBuf,
    sessions: Mutex<HashMap<String, SessionStats>>,
}

impl InferenceLogger {
    /// Create a logger rooted at `base_dir` with the given settings.
    pub fn new(base_dir: &Path, config: &LoggingConfig) -> Arc<Self> {
        let inference_dir = base_dir.join("inference");
        let errors_dir = base_dir.join("errors");
        let mut enabled = config.enabled;

        if enabled {
            for dir in [&inference_dir, &errors_dir] {
                if let Err(e) = std::fs::create_dir_all(dir) {
                    warn!(
                        "Failed to create log dir {}: {}; event logging disabled",
                        dir.display(),
                        e
                    );
                    enabled = false;
                }
            }
        }

        Arc::new(Self {
            enabled,
            to_console: config.to_console,
            to_file: config.to_file,
            truncate_long: config.privacy.truncate_long_messages,
            max_length: config.privacy.max_message_length,
            inference_dir,
            errors_dir,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    // -----------------------------------------------------------------------
    // Event records
    // -----------------------------------------------------------------------

    /// Record the start of an inference session and begin tracking it.
    pub async fn log_inference_start(
        &self,
        session_id: &str,
        model: &str,
        messages: &[serde_json::Value],
        temperature: f64,
        max_output_tokens: u32,
    ) {
        if !self.enabled {
            return;
        }

        {
            let mut sessions = self.sessions.lock().await;
            sessions.insert(
                session_id.to_string(),
                SessionStats {
                    started: Instant::now(),
                    rounds: 0,
                    tools_used: HashSet::new(),
                    total_tokens: 0,
                },
            );
        }

        let logged_messages: Vec<serde_json::Value> = messages
            .iter()
            .map(|m| {
                let role = m.get("role").and_then(|v| v.as_str()).unwrap_or("user");
                let content = m.get("content").and_then(|v| v.as_str()).unwrap_or("");
                json!({"role": role, "content": self.truncate_if_needed(content)})
            })
            .collect();

        self.write_record(json!({
            "timestamp": Local::now().to_rfc3339(),
            "session_id": session_id,
            "event_type": "inference_start",
            "model": model,
            "payload": {
                "messages": logged_messages,
                "temperature": temperature,
                "max_output_tokens": max_output_tokens,
            },
        }));
    }

    /// Record one assistant turn, noting whether thinking-tag cleanup
    /// altered the text.
    pub async fn log_assistant_response(
        &self,
        session_id: &str,
        inference_round: u32,
        raw_response: &str,
        cleaned_response: &str,
        streaming_chunks: u64,
    ) {
        if !self.enabled {
            return;
        }

        {
            let mut sessions = self.sessions.lock().await;
            if let Some(stats) = sessions.get_mut(session_id) {
                stats.rounds = inference_round;
            }
        }

        self.write_record(json!({
            "timestamp": Local::now().to_rfc3339(),
            "session_id": session_id,
            "event_type": "assistant_response",
            "inference_round": inference_round,
            "thinking_tags_found": raw_response != cleaned_response,
            "response_length": cleaned_response.len(),
            "streaming_chunks": streaming_chunks,
            "raw_response": self.truncate_if_needed(raw_response),
            "cleaned_response": self.truncate_if_needed(cleaned_response),
        }));
    }

    /// Record one tool execution.
    pub async fn log_tool_execution(
        &self,
        session_id: &str,
        tool_name: &str,
        tool_input: &serde_json::Value,
        tool_result: &str,
        execution_time_ms: u64,
        success: bool,
    ) {
        if !self.enabled {
            return;
        }

        {
            let mut sessions = self.sessions.lock().await;
            if let Some(stats) = sessions.get_mut(session_id) {
                stats.tools_used.insert(tool_name.to_string());
            }
        }

        self.write_record(json!({
            "timestamp": Local::now().to_rfc3339(),
            "session_id": session_id,
            "event_type": "tool_execution",
            "tool_name": tool_name,
            "tool_input": tool_input,
            "tool_result": self.truncate_if_needed(tool_result),
            "execution_time_ms": execution_time_ms,
            "success": success,
        }));
    }

    /// Add provider-reported token usage to the session's running total.
    pub async fn add_token_usage(&self, session_id: &str, total_tokens: i64) {
        if !self.enabled {
            return;
        }
        let mut sessions = self.sessions.lock().await;
        if let Some(stats) = sessions.get_mut(session_id) {
            stats.total_tokens += total_tokens;
        }
    }

    /// Record session completion with aggregate statistics and stop
    /// tracking the session.
    pub async fn log_session_complete(&self, session_id: &str, final_status: &str) {
        if !self.enabled {
            return;
        }

        let stats = {
            let mut sessions = self.sessions.lock().await;
            sessions.remove(session_id)
        };
        let Some(stats) = stats else {
            return;
        };

        let mut tools: Vec<String> = stats.tools_used.into_iter().collect();
        tools.sort();

        self.write_record(json!({
            "timestamp": Local::now().to_rfc3339(),
            "session_id": session_id,
            "event_type": "session_complete",
            "total_rounds": stats.rounds,
            "tools_used": tools,
            "total_tokens": stats.total_tokens,
            "duration_seconds": (stats.started.elapsed().as_millis() as f64) / 1000.0,
            "final_status": final_status,
        }));
    }

    /// Record an error, duplicated into the plain-text error store.
    pub async fn log_error(
        &self,
        session_id: &str,
        error_type: &str,
        error_message: &str,
        context: Option<serde_json::Value>,
    ) {
        if !self.enabled {
            return;
        }

        let timestamp = Local::now().to_rfc3339();
        let mut record = json!({
            "timestamp": timestamp,
            "session_id": session_id,
            "event_type": "error",
            "error_type": error_type,
            "error_message": error_message,
        });
        if let Some(ctx) = context {
            record["context"] = ctx;
        }
        self.write_record(record);

        let line = format!(
            "[{}] {}: {} - {}\n",
            timestamp, session_id, error_type, error_message
        );
        let path = self.errors_dir.join(format!("{}.log", today()));
        if let Err(e) = append_line(&path, &line) {
            warn!("Failed to write error log: {}", e);
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn truncate_if_needed(&self, text: &str) -> String {
        if !self.truncate_long || text.len() <= self.max_length {
            return text.to_string();
        }
        let mut end = self.max_length;
        while !text.is_char_boundary(end) && end > 0 {
            end -= 1;
        }
        format!("{}...[truncated]", &text[..end])
    }

    /// Write one JSONL record. Failures are reported via tracing and
    /// swallowed.
    fn write_record(&self, record: serde_json::Value) {
        let line = match serde_json::to_string(&record) {
            Ok(l) => l,
            Err(e) => {
                warn!("Failed to serialize log record: {}", e);
                return;
            }
        };

        if self.to_console {
            info!(target: "inference", "{}", line);
        }

        if self.to_file {
            let path = self.inference_dir.join(format!("{}.jsonl", today()));
            if let Err(e) = append_line(&path, &format!("{}\n", line)) {
                warn!("Failed to write log file: {}", e);
            }
        }
    }
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::PrivacyConfig;
    use tempfile::TempDir;

    fn file_config() -> LoggingConfig {
        LoggingConfig {
            enabled: true,
            to_console: false,
            to_file: true,
            ..LoggingConfig::default()
        }
    }

    fn read_records(dir: &TempDir) -> Vec<serde_json::Value> {
        let path = dir.path().join("inference").join(format!("{}.jsonl", today()));
        std::fs::read_to_string(path)
            .unwrap_or_default()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_session_lifecycle_records() {
        let dir = TempDir::new().unwrap();
        let logger = InferenceLogger::new(dir.path(), &file_config());

        let messages = vec![json!({"role": "user", "content": "hi"})];
        logger
            .log_inference_start("s1", "qwen-max", &messages, 0.7, 5000)
            .await;
        logger
            .log_assistant_response("s1", 1, "raw", "raw", 3)
            .await;
        logger
            .log_tool_execution("s1", "get_cwd", &json!({}), "/work", 12, true)
            .await;
        logger.add_token_usage("s1", 42).await;
        logger.log_session_complete("s1", "completed").await;

        let records = read_records(&dir);
        assert_eq!(records.len(), 4);
        assert_eq!(records[0]["event_type"], "inference_start");
        assert_eq!(records[0]["model"], "qwen-max");
        assert_eq!(records[1]["event_type"], "assistant_response");
        assert_eq!(records[1]["thinking_tags_found"], false);
        assert_eq!(records[2]["event_type"], "tool_execution");
        assert_eq!(records[2]["success"], true);

        let complete = &records[3];
        assert_eq!(complete["event_type"], "session_complete");
        assert_eq!(complete["total_rounds"], 1);
        assert_eq!(complete["tools_used"][0], "get_cwd");
        assert_eq!(complete["total_tokens"], 42);
        assert_eq!(complete["final_status"], "completed");
    }

    #[tokio::test]
    async fn test_thinking_tags_flag_set_when_cleaned_differs() {
        let dir = TempDir::new().unwrap();
        let logger = InferenceLogger::new(dir.path(), &file_config());

        logger
            .log_inference_start("s1", "m", &[], 0.7, 100)
            .await;
        logger
            .log_assistant_response("s1", 1, "<think>x</think>answer", "answer", 2)
            .await;

        let records = read_records(&dir);
        assert_eq!(records[1]["thinking_tags_found"], true);
        assert_eq!(records[1]["response_length"], 6);
    }

    #[tokio::test]
    async fn test_privacy_truncation() {
        let dir = TempDir::new().unwrap();
        let mut config = file_config();
        config.privacy = PrivacyConfig {
            truncate_long_messages: true,
            max_message_length: 10,
        };
        let logger = InferenceLogger::new(dir.path(), &config);

        logger
            .log_inference_start("s1", "m", &[], 0.7, 100)
            .await;
        let long = "a".repeat(50);
        logger
            .log_assistant_response("s1", 1, &long, &long, 1)
            .await;

        let records = read_records(&dir);
        let body = records[1]["cleaned_response"].as_str().unwrap();
        assert_eq!(body, format!("{}...[truncated]", "a".repeat(10)));
        // The recorded length is the true length, not the truncated one.
        assert_eq!(records[1]["response_length"], 50);
    }

    #[tokio::test]
    async fn test_error_mirrored_to_plain_text_store() {
        let dir = TempDir::new().unwrap();
        let logger = InferenceLogger::new(dir.path(), &file_config());

        logger
            .log_error(
                "s1",
                "protocol_violation",
                "multiple tool calls found",
                Some(json!({"round": 2})),
            )
            .await;

        let records = read_records(&dir);
        assert_eq!(records[0]["event_type"], "error");
        assert_eq!(records[0]["context"]["round"], 2);

        let error_file = dir.path().join("errors").join(format!("{}.log", today()));
        let text = std::fs::read_to_string(error_file).unwrap();
        assert!(text.contains("protocol_violation"));
        assert!(text.contains("multiple tool calls found"));
    }

    #[tokio::test]
    async fn test_complete_for_unknown_session_is_silent() {
        let dir = TempDir::new().unwrap();
        let logger = InferenceLogger::new(dir.path(), &file_config());

        logger.log_session_complete("ghost", "completed").await;
        assert!(read_records(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_disabled_logger_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let config = LoggingConfig {
            enabled: false,
            ..file_config()
        };
        let logger = InferenceLogger::new(dir.path(), &config);

        logger.log_inference_start("s1", "m", &[], 0.7, 100).await;
        logger.log_error("s1", "x", "y", None).await;
        assert!(!dir.path().join("inference").exists() || read_records(&dir).is_empty());
    }
}
