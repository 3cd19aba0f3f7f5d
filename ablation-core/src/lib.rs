//! # ablation-bench core
//!
//! Core library for ablation-bench.
//! Provides the data model, dataset loader, layered configuration, LM interface
//! (brain + providers), response cache, prompt rendering, and the external agent
//! runner used by judges and planners.

pub mod brain;
pub mod cache;
pub mod config;
pub mod dataset;
pub mod error;
pub mod patch;
pub mod prompt;
pub mod providers;
pub mod runner;
pub mod types;

// Re-export commonly used types at the crate root.
pub use brain::{
    ChatMessage, CompletionRequest, CompletionResponse, LlmProvider, MockLlmProvider, Role,
    TokenUsage,
};
pub use cache::{CachedResponse, FileResponseCache, InMemoryResponseCache, ResponseCache};
pub use config::{BenchConfig, ConfigOverrides, load_config};
pub use dataset::{Dataset, Task};
pub use error::{AgentError, BenchError, ConfigError, DatasetError, LlmError, Result};
pub use types::{
    AblationAction, AblationSuggestion, DatasetName, DatasetSplit, EvalMode, EvaluationResult,
    MissingItem, PlanNames, PredictedItem, ReasoningEffort, SideAssignment, SingleResult,
    TaskEvaluation,
};
