//! Error types for the ablation-bench core library.
//!
//! Uses `thiserror` for public API error types with structured variants
//! covering LM calls, configuration, datasets, and the external agent runner.

use std::path::PathBuf;

/// Top-level error type for the ablation-bench core library.
#[derive(Debug, thiserror::Error)]
pub enum BenchError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    #[error("Agent runner error: {0}")]
    Agent(#[from] AgentError),

    #[error("Prompt error: {message}")]
    Prompt { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from LM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },
}

/// Errors from the configuration system. All of these abort a run before any task starts.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },

    #[error("Unknown {kind} '{name}'. Available: {available}")]
    UnknownName {
        kind: &'static str,
        name: String,
        available: String,
    },
}

/// Errors from loading or interpreting dataset records.
#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("Dataset file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Malformed record at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    #[error("Duplicate task id: {id}")]
    DuplicateTask { id: String },

    #[error("Task {id} is missing field '{field}'")]
    MissingField { id: String, field: &'static str },

    #[error("Task {id} has an invalid '{field}' value: {message}")]
    InvalidField {
        id: String,
        field: &'static str,
        message: String,
    },
}

/// Errors from invoking the external agent runner and reading its output.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Failed to spawn agent runner '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("Agent runner timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Agent runner exited with status {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("Agent output unreadable: {message}")]
    Output { message: String },

    #[error("Patch could not be applied: {message}")]
    Patch { message: String },
}

/// A type alias for results using the top-level `BenchError`.
pub type Result<T> = std::result::Result<T, BenchError>;
