//! External agent runner adapter.
//!
//! Judges and planners backed by an autonomous agent hand it a YAML instances file,
//! run it as a subprocess, and read back `preds.json` plus per-instance trajectory
//! files from the output directory:
//!
//! ```text
//! <output_dir>/preds.json            {"<id>": {"model_patch": "..."}}
//! <output_dir>/<id>/<id>.traj        {"info": {"model_stats": {"instance_cost": 0.12}}}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::RunnerConfig;
use crate::error::{AgentError, Result};

/// Maximum number of stderr bytes kept in a failure report.
const STDERR_TAIL_BYTES: usize = 4096;

/// One problem handed to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInstance {
    pub id: String,
    pub problem_statement: String,
    #[serde(default)]
    pub extra_fields: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Host directories mounted read-only into the agent's sandbox.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<PathBuf>,
}

/// The agent's final answer for one instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentPrediction {
    #[serde(default)]
    pub model_patch: Option<String>,
}

/// Write the instances file the runner consumes.
pub fn write_instances(path: &Path, instances: &[AgentInstance]) -> Result<()> {
    let body = serde_yaml::to_string(instances).map_err(|e| AgentError::Output {
        message: format!("Failed to serialize instances: {}", e),
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, body)?;
    Ok(())
}

/// Read `<output_dir>/preds.json`.
pub fn load_predictions(output_dir: &Path) -> Result<HashMap<String, AgentPrediction>> {
    let path = output_dir.join("preds.json");
    let content = std::fs::read_to_string(&path).map_err(|e| AgentError::Output {
        message: format!("Cannot read {}: {}", path.display(), e),
    })?;
    serde_json::from_str(&content).map_err(|e| {
        AgentError::Output {
            message: format!("Malformed {}: {}", path.display(), e),
        }
        .into()
    })
}

/// Cost the agent spent on one instance; 0.0 when no trajectory was recorded.
pub fn instance_cost(output_dir: &Path, id: &str) -> f64 {
    let path = output_dir.join(id).join(format!("{id}.traj"));
    let Ok(content) = std::fs::read_to_string(&path) else {
        return 0.0;
    };
    let cost = serde_json::from_str::<serde_json::Value>(&content)
        .ok()
        .and_then(|traj| traj.pointer("/info/model_stats/instance_cost")?.as_f64());
    if cost.is_none() {
        debug!(task_id = %id, path = %path.display(), "Trajectory has no instance cost");
    }
    cost.unwrap_or(0.0)
}

/// Invokes the configured agent program.
#[derive(Debug, Clone)]
pub struct AgentRunner {
    config: RunnerConfig,
}

impl AgentRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Arguments with `{instances}` and `{output_dir}` substituted.
    pub fn render_args(&self, instances_path: &Path, output_dir: &Path) -> Vec<String> {
        let instances = instances_path.display().to_string();
        let output = output_dir.display().to_string();
        self.config
            .args
            .iter()
            .map(|arg| {
                arg.replace("{instances}", &instances)
                    .replace("{output_dir}", &output)
            })
            .collect()
    }

    /// Run the agent over every instance and wait for it to exit.
    pub async fn run(&self, instances_path: &Path, output_dir: &Path) -> Result<()> {
        let args = self.render_args(instances_path, output_dir);
        let timeout = Duration::from_secs(self.config.timeout_secs);

        info!(
            program = %self.config.program,
            instances = %instances_path.display(),
            output_dir = %output_dir.display(),
            timeout_secs = self.config.timeout_secs,
            "Starting agent runner"
        );

        let result = tokio::time::timeout(timeout, async {
            Command::new(&self.config.program)
                .args(&args)
                .envs(&self.config.env)
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output()
                .await
        })
        .await;

        let output = match result {
            Err(_) => {
                return Err(AgentError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                }
                .into());
            }
            Ok(Err(e)) => {
                return Err(AgentError::Spawn {
                    program: self.config.program.clone(),
                    message: e.to_string(),
                }
                .into());
            }
            Ok(Ok(output)) => output,
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AgentError::Failed {
                status: output.status.to_string(),
                stderr: tail(&stderr, STDERR_TAIL_BYTES).to_string(),
            }
            .into());
        }

        debug!(
            stdout_bytes = output.stdout.len(),
            "Agent runner finished successfully"
        );
        Ok(())
    }
}

fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}
