//! Planner backed by an external autonomous agent.

use ablation_core::config::BenchConfig;
use ablation_core::dataset::{Dataset, Task};
use ablation_core::patch::{apply_patch, is_unified_diff};
use ablation_core::runner::{
    AgentInstance, AgentPrediction, AgentRunner, instance_cost, load_predictions, write_instances,
};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{Instrument, Span, info, info_span, warn};

use super::{PlanEntry, PlanSummary, PlannerKind, write_plan, write_summary};
use crate::error::Result;
pub use crate::judge::external_agent::INSTANCES_FILE;

/// Drop repeated lines, keeping first occurrences.
pub fn dedup_lines(text: &str) -> String {
    let mut seen = HashSet::new();
    text.lines()
        .filter(|line| seen.insert(*line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Clone)]
pub struct ExternalAgentPlanner {
    config: Arc<BenchConfig>,
    runner: Arc<AgentRunner>,
    span: Span,
}

impl ExternalAgentPlanner {
    pub fn new(config: BenchConfig) -> Result<Self> {
        let runner = AgentRunner::new(config.require_runner()?.clone());
        let span = info_span!("planner", planner = "external_agent", model = %config.model.name);
        Ok(Self {
            config: Arc::new(config),
            runner: Arc::new(runner),
            span,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    fn instance_for(&self, task: &Task) -> AgentInstance {
        let mut extra_fields = BTreeMap::new();
        extra_fields.insert("paper_title".to_string(), json!(task.paper_title));
        extra_fields.insert("num_ablations".to_string(), json!(self.config.num_ablations));
        AgentInstance {
            id: task.id.clone(),
            problem_statement: task.paper_abstract.clone(),
            extra_fields,
            image: task.docker_image.clone(),
            mounts: Vec::new(),
        }
    }

    pub async fn plan(&self, dataset: &Dataset) -> Result<PlanSummary> {
        let output_dir = self.output_dir();
        std::fs::create_dir_all(output_dir)?;

        let instances: Vec<AgentInstance> =
            dataset.tasks.iter().map(|t| self.instance_for(t)).collect();
        let instances_path = output_dir.join(INSTANCES_FILE);
        write_instances(&instances_path, &instances)?;
        info!(
            parent: &self.span,
            instances = instances.len(),
            path = %instances_path.display(),
            "Running agent"
        );
        if let Err(e) = self
            .runner
            .run(&instances_path, output_dir)
            .instrument(self.span.clone())
            .await
        {
            warn!(parent: &self.span, error = %e, "Agent run failed; collecting whatever it produced");
        }

        let preds = load_predictions(output_dir).unwrap_or_else(|e| {
            warn!(parent: &self.span, error = %e, "No agent predictions available");
            HashMap::new()
        });

        let mut summary = PlanSummary::new();
        for task in &dataset.tasks {
            let _enter = info_span!(parent: &self.span, "task", task_id = %task.id).entered();
            let predictions = match preds.get(&task.id) {
                Some(prediction) => self.decode(&task.id, prediction),
                None => {
                    warn!(task_id = %task.id, "Agent produced no plan");
                    String::new()
                }
            };
            write_plan(output_dir, &task.id, &predictions)?;
            let cost = instance_cost(output_dir, &task.id);
            summary.insert(task.id.clone(), PlanEntry { predictions, cost });
        }

        write_summary(PlannerKind::ExternalAgent, output_dir, &summary)?;
        Ok(summary)
    }

    /// The plan text of an agent answer; an unappliable patch yields an empty plan.
    fn decode(&self, task_id: &str, prediction: &AgentPrediction) -> String {
        let raw = prediction.model_patch.as_deref().unwrap_or_default();
        if !is_unified_diff(raw) {
            return raw.to_string();
        }
        match apply_patch(raw) {
            Ok(text) => dedup_lines(&text),
            Err(e) => {
                warn!(task_id = %task_id, error = %e, "Could not apply agent patch");
                String::new()
            }
        }
    }
}
