//! Configuration settings for tally.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub synthesis: SynthesisConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from default locations or use defaults.
    pub fn load() -> Result<Self> {
        let config_paths = [
            PathBuf::from("tally.toml"),
            PathBuf::from("config.toml"),
            dirs::config_dir()
                .map(|p| p.join("tally/config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if path.exists() {
                tracing::info!("Loading config from: {}", path.display());
                return Self::from_file(path);
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Config::default())
    }

    fn validate(&self) -> Result<()> {
        if self.synthesis.base_url.is_empty() {
            return Err(ConfigError::MissingField("synthesis.base_url".to_string()).into());
        }
        if self.synthesis.model.is_empty() {
            return Err(ConfigError::MissingField("synthesis.model".to_string()).into());
        }
        if self.database.path.is_empty() {
            return Err(ConfigError::MissingField("database.path".to_string()).into());
        }
        Ok(())
    }

    /// Expand the analytics database path.
    pub fn database_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.database.path).as_ref())
    }
}

/// Analytics database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite analytics database.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/tally/analytics.db".to_string(),
        }
    }
}

/// Synthesis gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisConfig {
    /// OpenAI-compatible API base URL.
    pub base_url: String,
    /// Model used for statement synthesis.
    pub model: String,
    /// API key; falls back to the `LLM_API_KEY` environment variable.
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "llama-3.3-70b-versatile".to_string(),
            api_key: None,
            temperature: 0.0,
            max_tokens: 500,
            timeout_secs: 30,
        }
    }
}
