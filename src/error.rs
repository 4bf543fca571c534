//! Error types for tally.

use thiserror::Error;

/// Main error type for tally operations.
#[derive(Error, Debug)]
pub enum TallyError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors from the SQL synthesis gateway.
#[derive(Error, Debug)]
pub enum SynthesisError {
    #[error("API key not provided and LLM_API_KEY env var not set")]
    MissingApiKey,

    #[error("Request failed: {0}")]
    Request(String),

    #[error("Request timed out")]
    Timeout,

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Errors from the analytics store.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to open database: {0}")]
    Open(String),

    #[error("Query error: {0}")]
    Query(String),

    #[error("Load error: {0}")]
    Load(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tally operations.
pub type Result<T> = std::result::Result<T, TallyError>;
