//! Judge backed by an external autonomous agent.
//!
//! All tasks are written to one instances file and handed to the runner in a single
//! subprocess invocation; the agent's answers are then scored task by task.

use ablation_core::config::BenchConfig;
use ablation_core::dataset::{Dataset, Task};
use ablation_core::patch::resolve_model_patch;
use ablation_core::runner::{
    AgentInstance, AgentPrediction, AgentRunner, instance_cost, load_predictions, write_instances,
};
use ablation_core::types::{
    EvalMode, EvaluationResult, MissingItem, PredictedItem, SideAssignment, TaskEvaluation,
};
use rand::seq::SliceRandom;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Instrument, Span, info, info_span, warn};

use super::{
    JudgeKind, REVIEW_SEPARATOR, blocking_record, collect_records, dedup_objects,
    default_paper_predictions, default_review_predictions, detect_sides, finish, labeled_record,
    parse_side_lines, plan_lines, present_sides, read_plan_names, read_plan_text, restore_sides,
    score_paper_task, score_review_task, task_rng, write_predictions,
};
use crate::error::{JudgeError, Result};
use crate::pool::run_bounded;
use crate::reconcile::{conservative_labels, truncate_top_k};

/// File name of the instances file written into the output directory.
pub const INSTANCES_FILE: &str = "agent_instances.yaml";

#[derive(Clone)]
pub struct ExternalAgentJudge {
    config: Arc<BenchConfig>,
    runner: Arc<AgentRunner>,
    span: Span,
}

impl ExternalAgentJudge {
    pub fn new(config: BenchConfig) -> Result<Self> {
        let runner = AgentRunner::new(config.require_runner()?.clone());
        let span = info_span!("judge", judge = "external_agent", model = %config.model.name);
        Ok(Self {
            config: Arc::new(config),
            runner: Arc::new(runner),
            span,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub async fn evaluate(
        &self,
        predictions_path: &Path,
        dataset: &Dataset,
        top_k: Option<usize>,
    ) -> Result<EvaluationResult> {
        let output_dir = self.output_dir();
        std::fs::create_dir_all(output_dir)?;
        let mode = dataset.mode();

        let instances: Vec<AgentInstance> = dataset
            .tasks
            .iter()
            .filter_map(|task| match self.instance_for(task, predictions_path, mode) {
                Ok(instance) => Some(instance),
                Err(e) => {
                    warn!(
                        parent: &self.span,
                        task_id = %task.id,
                        error = %e,
                        "Skipping task for the agent"
                    );
                    None
                }
            })
            .collect();

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
            warn!(parent: &self.span, error = %e, "Agent run failed; scoring whatever it produced");
        }

        let preds = load_predictions(output_dir).unwrap_or_else(|e| {
            warn!(parent: &self.span, error = %e, "No agent predictions available");
            HashMap::new()
        });
        let preds = Arc::new(preds);
        let predictions_path: Arc<PathBuf> = Arc::new(predictions_path.to_path_buf());

        let results = run_bounded(dataset.tasks.clone(), self.config.parallelism, |task| {
            let judge = self.clone();
            let preds = preds.clone();
            let predictions_path = predictions_path.clone();
            let span = info_span!(parent: &self.span, "task", task_id = %task.id);
            blocking_record(task.id.clone(), span, move || {
                let prediction = preds.get(&task.id);
                match mode {
                    EvalMode::PaperMatching => {
                        judge.paper_task(&task, prediction, &predictions_path, top_k)
                    }
                    EvalMode::ReviewMatching => {
                        judge.review_task(&task, prediction, &predictions_path, top_k)
                    }
                }
            })
        })
        .await;

        let records = collect_records(&dataset.tasks, results);
        finish(JudgeKind::ExternalAgent, output_dir, mode, &records)
    }

    fn instance_for(
        &self,
        task: &Task,
        predictions_path: &Path,
        mode: EvalMode,
    ) -> Result<AgentInstance> {
        let plan_text = read_plan_text(predictions_path, &task.id)?;
        let mut rng = task_rng(self.config.seed, &task.id);
        let mut extra_fields = BTreeMap::new();
        extra_fields.insert("paper_title".to_string(), json!(task.paper_title));
        extra_fields.insert("abstract".to_string(), json!(task.paper_abstract));

        let (problem_statement, mounts) = match mode {
            EvalMode::PaperMatching => {
                let paper_ablations = task.paper_ablations()?;
                let sides = present_sides(&paper_ablations, &plan_lines(&plan_text), &mut rng);
                extra_fields.insert("side_A".to_string(), Value::String(sides.side_a));
                extra_fields.insert("side_B".to_string(), Value::String(sides.side_b));
                (task.ablations_in_paper.clone().unwrap_or_default(), Vec::new())
            }
            EvalMode::ReviewMatching => {
                let mut lines = plan_lines(&plan_text);
                lines.shuffle(&mut rng);
                let mut reviews = task.reviews()?;
                reviews.shuffle(&mut rng);
                extra_fields.insert(
                    "official_reviews".to_string(),
                    Value::String(reviews.join(REVIEW_SEPARATOR)),
                );
                (lines.join("\n"), task.paper_path.iter().cloned().collect())
            }
        };

        Ok(AgentInstance {
            id: task.id.clone(),
            problem_statement,
            extra_fields,
            image: task.docker_image.clone(),
            mounts,
        })
    }

    /// Resolve the agent's answer to side-keyed JSON objects, deduplicated.
    fn answer_items(
        &self,
        task_id: &str,
        prediction: &AgentPrediction,
    ) -> Result<Vec<serde_json::Map<String, Value>>> {
        let text = resolve_model_patch(prediction.model_patch.as_deref().unwrap_or_default())?;
        let lines = plan_lines(&text);
        Ok(dedup_objects(parse_side_lines(task_id, &lines)?))
    }

    fn paper_task(
        &self,
        task: &Task,
        prediction: Option<&AgentPrediction>,
        predictions_path: &Path,
        top_k: Option<usize>,
    ) -> Result<TaskEvaluation> {
        let paper = task.paper_ablation_names()?;
        let mut plan = read_plan_names(predictions_path, &task.id)?;
        let cost = instance_cost(self.output_dir(), &task.id);

        let Some(prediction) = prediction else {
            warn!(task_id = %task.id, "Agent produced no answer; labeling conservatively");
            truncate_top_k(&mut plan, top_k);
            let labels = conservative_labels(paper.len(), plan.len());
            let k = plan.len().min(paper.len());
            return Ok(labeled_record(&task.id, labels, Some(k), cost));
        };

        let predictions: Vec<PredictedItem> = match self.resolve_paper(task, prediction, &paper) {
            Ok(predictions) => predictions,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Unusable agent answer; using defaults");
                default_paper_predictions(&paper)
            }
        };
        write_predictions(self.output_dir(), &task.id, &predictions)?;
        Ok(score_paper_task(&task.id, &predictions, &paper, plan, top_k, cost))
    }

    fn resolve_paper(
        &self,
        task: &Task,
        prediction: &AgentPrediction,
        paper: &[String],
    ) -> Result<Vec<PredictedItem>> {
        let items = self.answer_items(&task.id, prediction)?;
        let assignment = if items.iter().any(|i| i.contains_key("name_in_paper")) {
            SideAssignment::PaperFirst
        } else {
            detect_sides(&items, paper).ok_or_else(|| JudgeError::Response {
                task_id: task.id.clone(),
                message: "cannot tell which side holds the paper ablations".into(),
            })?
        };
        Ok(restore_sides(&items, assignment))
    }

    fn review_task(
        &self,
        task: &Task,
        prediction: Option<&AgentPrediction>,
        predictions_path: &Path,
        top_k: Option<usize>,
    ) -> Result<TaskEvaluation> {
        let num_ablations = task.num_ablations()?;
        let cost = instance_cost(self.output_dir(), &task.id);

        let resolved = match prediction {
            Some(prediction) => self.answer_items(&task.id, prediction).and_then(|items| {
                items
                    .into_iter()
                    .map(|item| {
                        serde_json::from_value::<MissingItem>(Value::Object(item)).map_err(|e| {
                            JudgeError::Response {
                                task_id: task.id.clone(),
                                message: e.to_string(),
                            }
                        })
                    })
                    .collect::<Result<Vec<_>>>()
            }),
            None => Err(JudgeError::Response {
                task_id: task.id.clone(),
                message: "agent produced no answer".into(),
            }),
        };
        let predictions = match resolved {
            Ok(predictions) => predictions,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Unusable agent answer; using defaults");
                default_review_predictions(&read_plan_names(predictions_path, &task.id)?)
            }
        };
        write_predictions(self.output_dir(), &task.id, &predictions)?;
        Ok(score_review_task(
            &task.id,
            predictions,
            num_ablations,
            top_k,
            cost,
        ))
    }
}
