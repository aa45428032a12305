//! Configuration loading from TOML with environment variable resolution.
//!
//! Reads `config.toml` and deserializes into strongly-typed structs.
//! Secrets (API keys, Pushover credentials) are referenced by env-var name
//! in the config and resolved at runtime via `std::env::var`.

use anyhow::{Context, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fs;

/// Default minimum discount (currency units) for a deal to be notified.
pub const DEFAULT_DEAL_THRESHOLD: f64 = 50.0;

/// Default per-call estimator timeout.
pub const DEFAULT_ESTIMATOR_TIMEOUT_SECS: u64 = 60;

/// Top-level application configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub agent: AgentConfig,
    pub llm: LlmConfig,
    pub feeds: FeedsConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub alerts: AlertsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    pub name: String,
    pub scan_interval_secs: u64,
    #[serde(default = "default_threshold")]
    pub deal_threshold: f64,
    #[serde(default = "default_estimator_timeout")]
    pub estimator_timeout_secs: u64,
    #[serde(default = "default_memory_file")]
    pub memory_file: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// OpenAI-compatible base URL (OpenAI, OpenRouter, Groq, Ollama...).
    pub base_url: String,
    pub api_key_env: String,
    /// Model used by the retrieval-augmented frontier estimator.
    pub frontier_model: String,
    /// Dedicated pricing model used by the specialist estimator.
    pub specialist_model: String,
    /// Model that picks priced deals out of the raw feed entries.
    #[serde(default)]
    pub curator_model: Option<String>,
    /// Optional local model used to rewrite descriptions before retrieval.
    #[serde(default)]
    pub preprocess: Option<PreprocessConfig>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PreprocessConfig {
    pub base_url: String,
    pub model: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FeedsConfig {
    pub urls: Vec<String>,
    #[serde(default = "default_items_per_feed")]
    pub items_per_feed: usize,
    #[serde(default = "default_feed_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct KnowledgeConfig {
    pub catalog_path: String,
    #[serde(default = "default_neighbours")]
    pub neighbours: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            catalog_path: "products.json".to_string(),
            neighbours: default_neighbours(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AlertsConfig {
    pub pushover_user_env: Option<String>,
    pub pushover_token_env: Option<String>,
    /// Use the chat model to write the alert text.
    #[serde(default)]
    pub craft_messages: bool,
    #[serde(default)]
    pub copywriter_model: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub enabled: bool,
    pub port: u16,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 7860,
        }
    }
}

fn default_threshold() -> f64 {
    DEFAULT_DEAL_THRESHOLD
}

fn default_estimator_timeout() -> u64 {
    DEFAULT_ESTIMATOR_TIMEOUT_SECS
}

fn default_memory_file() -> String {
    "memory.json".to_string()
}

fn default_max_tokens() -> u32 {
    5
}

fn default_items_per_feed() -> usize {
    10
}

fn default_feed_timeout() -> u64 {
    15
}

fn default_neighbours() -> usize {
    5
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        Self::parse(&contents).with_context(|| format!("Failed to parse config file: {path}"))
    }

    /// Parse configuration from TOML text and sanity-check it.
    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;
        if !config.agent.deal_threshold.is_finite() {
            anyhow::bail!("agent.deal_threshold must be a finite number");
        }
        if config.agent.estimator_timeout_secs == 0 {
            anyhow::bail!("agent.estimator_timeout_secs must be greater than zero");
        }
        if config.agent.scan_interval_secs == 0 {
            anyhow::bail!("agent.scan_interval_secs must be greater than zero");
        }
        Ok(config)
    }

    /// Resolve an environment variable name to its value.
    /// Useful for loading secrets referenced in the config.
    pub fn resolve_env(env_name: &str) -> Result<String> {
        std::env::var(env_name)
            .with_context(|| format!("Environment variable not set: {env_name}"))
    }

    /// Resolve an optional env-var reference into a secret, if both the
    /// reference and the variable are present.
    pub fn resolve_secret(env_name: Option<&str>) -> Option<SecretString> {
        env_name
            .and_then(|name| Self::resolve_env(name).ok())
            .filter(|v| !v.is_empty())
            .map(SecretString::new)
    }
}
