//! Configuration schema for qwen-agent.
//!
//! All structs use `#[serde(rename_all = "camelCase")]` so that the JSON
//! config file can use camelCase keys while Rust code uses snake_case fields.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Provider config
// ---------------------------------------------------------------------------

/// Upstream model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// API key for the OpenAI-compatible endpoint.
    #[serde(default)]
    pub api_key: String,
    /// Base URL of the endpoint (e.g. `https://dashscope.aliyuncs.com/compatible-mode/v1`).
    #[serde(default)]
    pub base_url: String,
    /// Model name to request.
    #[serde(default)]
    pub model: String,
    /// Pause before each model stream is opened, for upstream rate limits.
    #[serde(default)]
    pub rate_limit_pause_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            model: String::new(),
            rate_limit_pause_secs: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Agent config
// ---------------------------------------------------------------------------

/// Defaults for the inference loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Cap on model invocations per conversation. `None` means unbounded,
    /// which matches the historical behavior of this server: the loop runs
    /// until the model stops calling tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rounds: Option<u32>,
}

fn default_temperature() -> f64 {
    0.7
}

fn default_max_tokens() -> u32 {
    5000
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            max_rounds: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tools config
// ---------------------------------------------------------------------------

/// Configuration passed into the tool registry at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsConfig {
    /// Brave Search API key. Falls back to the `BRAVE_API_KEY` environment
    /// variable when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brave_api_key: Option<String>,
}

// ---------------------------------------------------------------------------
// Logging config
// ---------------------------------------------------------------------------

/// Per-session streaming log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingLogConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_flush_interval_secs")]
    pub flush_interval_secs: u64,
    /// Active files older than this are deleted by stale cleanup.
    #[serde(default = "default_stale_max_age_hours")]
    pub stale_max_age_hours: u64,
}

fn default_flush_interval_secs() -> u64 {
    2
}

fn default_stale_max_age_hours() -> u64 {
    24
}

impl Default for StreamingLogConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            flush_interval_secs: default_flush_interval_secs(),
            stale_max_age_hours: default_stale_max_age_hours(),
        }
    }
}

/// Privacy controls for logged message bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyConfig {
    #[serde(default)]
    pub truncate_long_messages: bool,
    #[serde(default = "default_max_message_length")]
    pub max_message_length: usize,
}

fn default_max_message_length() -> usize {
    10_000
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            truncate_long_messages: false,
            max_message_length: default_max_message_length(),
        }
    }
}

/// Structured event + streaming log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Root directory for all log artifacts.
    #[serde(default = "default_log_directory")]
    pub directory: String,
    #[serde(default = "default_true")]
    pub to_console: bool,
    #[serde(default = "default_true")]
    pub to_file: bool,
    #[serde(default)]
    pub privacy: PrivacyConfig,
    #[serde(default)]
    pub streaming: StreamingLogConfig,
}

fn default_true() -> bool {
    true
}

fn default_log_directory() -> String {
    "logs".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: default_log_directory(),
            to_console: true,
            to_file: true,
            privacy: PrivacyConfig::default(),
            streaming: StreamingLogConfig::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Root config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub agent: AgentDefaults,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Check that the fields required to talk to a model are present.
    pub fn validate_provider(&self) -> Result<(), String> {
        if self.provider.api_key.is_empty() {
            return Err(
                "API key is required. Provide via --api-key or USE_API_KEY in the environment"
                    .to_string(),
            );
        }
        if self.provider.base_url.is_empty() {
            return Err(
                "Base URL is required. Provide via --base-url or USE_BASE_URL in the environment"
                    .to_string(),
            );
        }
        if self.provider.model.is_empty() {
            return Err(
                "Model name is required. Provide via --model or MODEL_NAME in the environment"
                    .to_string(),
            );
        }
        Ok(())
    }
}
