//! Error types for judges, planners, and the evaluation engine.

use ablation_core::error::{AgentError, BenchError, ConfigError, DatasetError, LlmError};
use std::path::PathBuf;

/// Errors raised while evaluating a run. Task-level variants are recorded on the
/// task's evaluation row instead of aborting the run.
#[derive(Debug, thiserror::Error)]
pub enum JudgeError {
    #[error(transparent)]
    Core(#[from] BenchError),

    #[error("Plan for task {task_id} not found at {path}")]
    MissingPlan { task_id: String, path: PathBuf },

    #[error("Malformed plan for task {task_id}: {message}")]
    MalformedPlan { task_id: String, message: String },

    #[error("Unusable judge response for task {task_id}: {message}")]
    Response { task_id: String, message: String },

    #[error("No judge produced predictions for task {task_id}")]
    NoVotes { task_id: String },

    #[error("Task {task_id} did not complete: {message}")]
    Join { task_id: String, message: String },
}

impl From<ConfigError> for JudgeError {
    fn from(e: ConfigError) -> Self {
        JudgeError::Core(e.into())
    }
}

impl From<DatasetError> for JudgeError {
    fn from(e: DatasetError) -> Self {
        JudgeError::Core(e.into())
    }
}

impl From<LlmError> for JudgeError {
    fn from(e: LlmError) -> Self {
        JudgeError::Core(e.into())
    }
}

impl From<AgentError> for JudgeError {
    fn from(e: AgentError) -> Self {
        JudgeError::Core(e.into())
    }
}

impl From<std::io::Error> for JudgeError {
    fn from(e: std::io::Error) -> Self {
        JudgeError::Core(e.into())
    }
}

impl From<serde_json::Error> for JudgeError {
    fn from(e: serde_json::Error) -> Self {
        JudgeError::Core(e.into())
    }
}

impl JudgeError {
    /// Whether this error invalidates the whole run rather than a single task.
    pub fn is_fatal(&self) -> bool {
        matches!(self, JudgeError::Core(BenchError::Config(_)))
    }
}

pub type Result<T> = std::result::Result<T, JudgeError>;
