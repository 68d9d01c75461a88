//! Configuration loading utilities.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::config::schema::Config;

/// Get the default configuration file path (`~/.qwen-agent/config.json`).
pub fn get_config_path() -> PathBuf {
    let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".qwen-agent").join("config.json")
}

/// Load configuration from a file, or return a default [`Config`] if the file
/// does not exist or cannot be parsed.
///
/// If `config_path` is `None`, the default path (`~/.qwen-agent/config.json`)
/// is used. Environment overrides are applied after the file is read.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = match config_path {
        Some(p) => p.to_path_buf(),
        None => get_config_path(),
    };

    let mut config = Config::default();

    if path.exists() {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<Config>(&contents) {
                Ok(cfg) => config = cfg,
                Err(e) => {
                    warn!(
                        "Failed to parse config from {}: {}. Using default configuration.",
                        path.display(),
                        e
                    );
                }
            },
            Err(e) => {
                warn!(
                    "Failed to read config from {}: {}. Using default configuration.",
                    path.display(),
                    e
                );
            }
        }
    }

    apply_env_overrides(&mut config);
    config
}

/// Fill empty provider fields from the environment.
///
/// Variable names match the server's historical `.env` contract:
/// `USE_API_KEY`, `USE_BASE_URL`, `MODEL_NAME`, `RATE_LIMIT_PAUSE_SECS`.
/// Explicit config-file values win over the environment.
pub fn apply_env_overrides(config: &mut Config) {
    if config.provider.api_key.is_empty() {
        if let Ok(key) = std::env::var("USE_API_KEY") {
            config.provider.api_key = key;
        }
    }
    if config.provider.base_url.is_empty() {
        if let Ok(url) = std::env::var("USE_BASE_URL") {
            config.provider.base_url = url;
        }
    }
    if config.provider.model.is_empty() {
        if let Ok(model) = std::env::var("MODEL_NAME") {
            config.provider.model = model;
        }
    }
    if config.provider.rate_limit_pause_secs == 0 {
        if let Some(secs) = std::env::var("RATE_LIMIT_PAUSE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.provider.rate_limit_pause_secs = secs;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_nonexistent_returns_default() {
        let path = Path::new("/tmp/qwen_agent_test_does_not_exist_987654.json");
        let cfg = load_config(Some(path));
        assert_eq!(cfg.agent.max_tokens, 5000);
    }

    #[test]
    fn test_load_reads_file_values() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"provider": {"model": "qwen-max"}, "agent": {"maxTokens": 1234}}"#,
        )
        .unwrap();

        let cfg = load_config(Some(&path));
        assert_eq!(cfg.provider.model, "qwen-max");
        assert_eq!(cfg.agent.max_tokens, 1234);
    }

    #[test]
    fn test_load_bad_json_falls_back_to_default() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();

        let cfg = load_config(Some(&path));
        assert_eq!(cfg.agent.max_tokens, 5000);
    }

    #[test]
    fn test_env_overrides_only_fill_empty_fields() {
        let mut cfg = Config::default();
        cfg.provider.api_key = "from-file".to_string();

        // Whatever the process environment holds, an explicit value survives.
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.provider.api_key, "from-file");
    }
}
