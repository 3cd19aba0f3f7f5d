//! Configuration system for judges and planners.
//!
//! Uses `figment` for layered configuration: defaults -> YAML file -> environment -> CLI args.
//! Environment variables use the `ABLATIONS_` prefix with `__` for nesting
//! (e.g. `ABLATIONS_MODEL__TEMPERATURE=0.2`).

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Yaml},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::types::ReasoningEffort;

/// Language model selection and sampling parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model identifier, optionally provider-prefixed (e.g. "openai/gpt-4o").
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            temperature: 0.0,
            top_p: default_top_p(),
            reasoning_effort: None,
            max_tokens: None,
        }
    }
}

fn default_top_p() -> f32 {
    1.0
}

/// Endpoint and pricing for the OpenAI-compatible chat API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    pub base_url: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Cost per 1M input tokens (USD). Falls back to the built-in pricing table when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_cost_per_million: Option<f64>,
    /// Cost per 1M output tokens (USD).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_cost_per_million: Option<f64>,
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            input_cost_per_million: None,
            output_cost_per_million: None,
            timeout_secs: 600,
        }
    }
}

/// Retry policy for transient LM failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            initial_backoff_ms: 4_000,
            max_backoff_ms: 60_000,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// System and user prompt templates (handlebars).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default)]
    pub system: String,
    #[serde(default)]
    pub user: String,
}

/// How to invoke the external agent runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub program: String,
    /// Arguments; `{instances}` and `{output_dir}` are substituted before spawning.
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_runner_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

fn default_runner_timeout() -> u64 {
    3600
}

/// Complete judge/planner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchConfig {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub llm: LlmSettings,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub prompts: PromptConfig,
    pub parallelism: usize,
    pub output_dir: PathBuf,
    /// Output directories of the judges a majority judge votes over.
    #[serde(default)]
    pub judge_output_dirs: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runner: Option<RunnerConfig>,
    /// Seed for order shuffling and side assignment; entropy-seeded when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Target plan length for planners.
    pub num_ablations: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            llm: LlmSettings::default(),
            retry: RetryConfig::default(),
            prompts: PromptConfig::default(),
            parallelism: 1,
            output_dir: default_output_dir(),
            judge_output_dirs: Vec::new(),
            runner: None,
            seed: None,
            num_ablations: 5,
        }
    }
}

/// `runs/<YYYYmmdd_HHMMSS>` relative to the working directory.
pub fn default_output_dir() -> PathBuf {
    PathBuf::from("runs").join(chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
}

impl BenchConfig {
    /// Check value ranges. Called by [`load_config`]; configuration errors abort before any task runs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "model.name".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.model.temperature) {
            return Err(ConfigError::Invalid {
                message: format!(
                    "model.temperature must be within [0, 1], got {}",
                    self.model.temperature
                ),
            });
        }
        if !(0.0..=1.0).contains(&self.model.top_p) {
            return Err(ConfigError::Invalid {
                message: format!("model.top_p must be within [0, 1], got {}", self.model.top_p),
            });
        }
        if self.parallelism == 0 {
            return Err(ConfigError::Invalid {
                message: "parallelism must be at least 1".into(),
            });
        }
        if self.num_ablations == 0 {
            return Err(ConfigError::Invalid {
                message: "num_ablations must be at least 1".into(),
            });
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(ConfigError::Invalid {
                message: "retry.backoff_multiplier must be at least 1.0".into(),
            });
        }
        Ok(())
    }

    /// Both prompt templates must be present for LM-backed judges and planners.
    pub fn require_prompts(&self) -> Result<(), ConfigError> {
        if self.prompts.system.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "prompts.system".into(),
            });
        }
        if self.prompts.user.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "prompts.user".into(),
            });
        }
        Ok(())
    }

    pub fn require_runner(&self) -> Result<&RunnerConfig, ConfigError> {
        self.runner.as_ref().ok_or_else(|| ConfigError::MissingField {
            field: "runner".into(),
        })
    }
}

/// Values supplied on the command line. Unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model_name: Option<String>,
    pub reasoning_effort: Option<ReasoningEffort>,
    pub parallelism: Option<usize>,
    pub output_dir: Option<PathBuf>,
    pub num_ablations: Option<usize>,
    pub seed: Option<u64>,
}

impl ConfigOverrides {
    /// Sparse nested document holding only the fields that were set.
    fn to_value(&self) -> serde_json::Value {
        let mut root = serde_json::Map::new();
        let mut model = serde_json::Map::new();
        if let Some(name) = &self.model_name {
            model.insert("name".into(), name.clone().into());
        }
        if let Some(effort) = self.reasoning_effort {
            model.insert("reasoning_effort".into(), effort.to_string().into());
        }
        if !model.is_empty() {
            root.insert("model".into(), model.into());
        }
        if let Some(parallelism) = self.parallelism {
            root.insert("parallelism".into(), parallelism.into());
        }
        if let Some(dir) = &self.output_dir {
            root.insert("output_dir".into(), dir.display().to_string().into());
        }
        if let Some(n) = self.num_ablations {
            root.insert("num_ablations".into(), n.into());
        }
        if let Some(seed) = self.seed {
            root.insert("seed".into(), seed.into());
        }
        serde_json::Value::Object(root)
    }
}

/// Load configuration with layered merging:
/// 1. Built-in defaults
/// 2. YAML document at `path`
/// 3. Environment variables (`ABLATIONS_` prefix, `__` nesting)
/// 4. Command-line overrides
pub fn load_config(path: &Path, overrides: &ConfigOverrides) -> Result<BenchConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let figment = Figment::from(Serialized::defaults(BenchConfig::default()))
        .merge(Yaml::file(path))
        .merge(Env::prefixed("ABLATIONS_").split("__"))
        .merge(Serialized::defaults(overrides.to_value()));

    let config: BenchConfig = figment.extract().map_err(|e| ConfigError::ParseError {
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}
