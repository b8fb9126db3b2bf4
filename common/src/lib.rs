/*!
common/src/lib.rs

Shared configuration types and environment helpers for threadcast.

This file provides:
- Config data structures (deserialized from TOML)
- A loader that merges a default config file with an optional override
- Helpers for reading required values and boolean flags from the environment
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Text-generation endpoint configuration (OpenAI-compatible chat completions)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Full chat completions URL (e.g. "https://api.poe.com/v1/chat/completions")
    pub api_url: Option<String>,
    /// Name of the env var holding the API key
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

/// News enrichment configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewsConfig {
    /// Enrich every generation run, even without `--with-news`
    pub enabled: Option<bool>,
    /// RSS search endpoint; the query is passed as `q`
    pub feed_url: Option<String>,
    pub query: Option<String>,
    pub max_results: Option<usize>,
    /// Line printed above the bulleted headlines
    pub header: Option<String>,
    pub timeout_seconds: Option<u64>,
}

/// Generator pipeline paths
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneratorConfig {
    pub prompt_file: Option<String>,
    /// Directory receiving the timestamped raw artifacts
    pub output_dir: Option<String>,
}

/// Publisher pacing, retry and pagination settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PublisherConfig {
    /// Hard per-message character limit of the platform
    pub max_chars: Option<usize>,
    /// Characters reserved for the " (i/total)" marker
    pub suffix_reserve: Option<usize>,
    pub max_retries: Option<u32>,
    pub retry_backoff_seconds: Option<u64>,
    pub inter_post_delay_seconds: Option<u64>,
    /// Upper bound of the one-time random delay before the first post (0 disables it)
    pub max_jitter_seconds: Option<u64>,
    pub image_dir: Option<String>,
}

/// X API endpoint and the names of the env vars holding OAuth 1.0a credentials
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XConfig {
    pub api_base: Option<String>,
    pub consumer_key_env: Option<String>,
    pub consumer_secret_env: Option<String>,
    pub access_token_env: Option<String>,
    pub access_token_secret_env: Option<String>,
    /// Per-request deadline for X API calls
    pub timeout_seconds: Option<u64>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub generator: GeneratorConfig,
    #[serde(default)]
    pub publisher: PublisherConfig,
    #[serde(default)]
    pub x: XConfig,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    ///
    /// Example:
    ///   let cfg = Config::from_file("config.toml").await?;
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    /// Missing files are skipped; with neither present every section falls back to defaults.
    pub async fn load_with_defaults(default_path: Option<&Path>, override_path: Option<&Path>) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        for path in [default_path, override_path].into_iter().flatten() {
            if !path.exists() {
                continue;
            }
            let data = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            let val: toml::Value = toml::from_str(&data)
                .with_context(|| format!("Failed to parse configuration: {}", path.display()))?;
            merge_toml(&mut config_value, val);
        }

        let cfg: Config = config_value.try_into().context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

/// Recursively merge `b` into `a`; scalar and array values in `b` replace those in `a`.
pub fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Read a required environment variable. Unset and blank values are both errors.
pub fn require_env(name: &str) -> Result<String> {
    let value = std::env::var(name)
        .with_context(|| format!("environment variable '{}' is not set", name))?;
    if value.trim().is_empty() {
        anyhow::bail!("environment variable '{}' is empty", name);
    }
    Ok(value)
}

/// Interpret an environment variable as a boolean flag (`1`, `true`, `yes`, `on`).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_from_string() {
        let toml = r#"
            [llm]
            model = "gpt-4"
            api_key_env = "POE_API_KEY"

            [publisher]
            max_chars = 280
            inter_post_delay_seconds = 30
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.llm.model.as_deref(), Some("gpt-4"));
        assert_eq!(cfg.publisher.max_chars, Some(280));
        assert!(cfg.news.query.is_none());
        assert!(cfg.x.api_base.is_none());
    }

    #[tokio::test]
    async fn override_file_takes_precedence() {
        let dir = tempfile::tempdir().expect("tempdir");
        let default_path = dir.path().join("config.default.toml");
        let override_path = dir.path().join("config.toml");

        std::fs::write(
            &default_path,
            "[publisher]\nmax_retries = 3\nmax_jitter_seconds = 3600\n[news]\nquery = \"rust\"\n",
        )
        .expect("write default");
        std::fs::write(&override_path, "[publisher]\nmax_jitter_seconds = 0\n").expect("write override");

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load config");

        assert_eq!(cfg.publisher.max_retries, Some(3));
        assert_eq!(cfg.publisher.max_jitter_seconds, Some(0));
        assert_eq!(cfg.news.query.as_deref(), Some("rust"));
    }

    #[tokio::test]
    async fn missing_files_yield_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let absent = dir.path().join("nope.toml");

        let cfg = Config::load_with_defaults(Some(&absent), None).await.expect("load config");
        assert!(cfg.llm.api_url.is_none());
        assert!(cfg.publisher.image_dir.is_none());
    }

    #[test]
    fn require_env_rejects_missing_and_blank() {
        std::env::remove_var("COMMON_TEST_MISSING_VAR");
        assert!(require_env("COMMON_TEST_MISSING_VAR").is_err());

        std::env::set_var("COMMON_TEST_BLANK_VAR", "   ");
        let err = require_env("COMMON_TEST_BLANK_VAR").unwrap_err();
        assert!(err.to_string().contains("empty"));

        std::env::set_var("COMMON_TEST_PRESENT_VAR", "secret");
        assert_eq!(require_env("COMMON_TEST_PRESENT_VAR").unwrap(), "secret");
    }

    #[test]
    fn env_flag_values() {
        std::env::set_var("COMMON_TEST_FLAG_ON", "True");
        std::env::set_var("COMMON_TEST_FLAG_OFF", "0");
        std::env::remove_var("COMMON_TEST_FLAG_UNSET");

        assert!(env_flag("COMMON_TEST_FLAG_ON"));
        assert!(!env_flag("COMMON_TEST_FLAG_OFF"));
        assert!(!env_flag("COMMON_TEST_FLAG_UNSET"));
    }
}
