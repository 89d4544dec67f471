//! Configuration loaded from the environment (and `.env` when present).

use anyhow::{Context, Result};
use std::env;

/// Settings for the model backend and the agents' tools.
#[derive(Debug, Clone)]
pub struct Config {
    /// Ollama model every agent runs on (e.g. "llama3.2")
    pub model: String,

    /// Ollama server URL
    pub ollama_host: String,

    /// Sampling temperature passed to every agent
    pub temperature: f32,

    /// Results returned per web search
    pub max_search_results: usize,

    /// Tool-calling rounds allowed for agents that search the web
    pub max_turns: usize,

    /// Log filter used when `RUST_LOG` is set
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "llama3.2".to_string(),
            ollama_host: "http://localhost:11434".to_string(),
            temperature: 0.3,
            max_search_results: 5,
            max_turns: 5,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration, starting from defaults and applying any
    /// environment overrides.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` uses the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(val) = lookup("OLLAMA_MODEL") {
            config.model = val;
        }

        if let Some(val) = lookup("OLLAMA_API_BASE_URL") {
            config.ollama_host = val;
        }

        if let Some(val) = lookup("TEMPERATURE") {
            config.temperature = val
                .parse()
                .context("TEMPERATURE must be a valid floating-point number (e.g., 0.3)")?;
        }

        if let Some(val) = lookup("MAX_SEARCH_RESULTS") {
            config.max_search_results = val
                .parse()
                .context("MAX_SEARCH_RESULTS must be a valid positive integer")?;
        }

        if let Some(val) = lookup("MAX_TURNS") {
            config.max_turns = val
                .parse()
                .context("MAX_TURNS must be a valid positive integer")?;
        }

        if let Some(val) = lookup("RUST_LOG") {
            config.log_level = val;
        }

        Ok(config)
    }

    /// Reject values the backend cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            anyhow::bail!(
                "Temperature must be between 0.0 and 2.0, got: {}",
                self.temperature
            );
        }

        if self.max_search_results == 0 {
            anyhow::bail!("MAX_SEARCH_RESULTS must be at least 1");
        }

        if self.max_turns == 0 {
            anyhow::bail!("MAX_TURNS must be at least 1");
        }

        if self.model.trim().is_empty() {
            anyhow::bail!("OLLAMA_MODEL cannot be empty");
        }

        if !self.ollama_host.starts_with("http://") && !self.ollama_host.starts_with("https://") {
            anyhow::bail!(
                "OLLAMA_API_BASE_URL must be an http(s) URL, got: {}",
                self.ollama_host
            );
        }

        Ok(())
    }
}
