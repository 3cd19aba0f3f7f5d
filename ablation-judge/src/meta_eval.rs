//! Meta-evaluation: score a judge's item-level decisions against human labels.
//!
//! Each instance id has the form `<judge_run>/<task_id>`. The judge's predictions are
//! read from `<judge_evaluations_path>/<judge_run>/<task_id>.jsonl` and its cost from
//! `<judge_evaluations_path>/<judge_run>/evaluations.json`.

use ablation_core::dataset::{parse_jsonl, read_jsonl};
use ablation_core::types::{DatasetName, EvalMode, EvaluationResult, TaskEvaluation};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::{Span, info, info_span, warn};

use crate::aggregate::summarize;
use crate::error::Result;
use crate::judge::is_truthy;
use crate::metrics::score;
use crate::reconcile::LabelPair;

/// One human-labeled judge output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JudgeLabelInstance {
    pub id: String,
    /// Human-labeled rows, one JSON object per line.
    #[serde(deserialize_with = "label_rows")]
    pub labels: Vec<Value>,
}

/// Accept the rows either as JSONL text or as an inline array.
fn label_rows<'de, D>(deserializer: D) -> std::result::Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => parse_jsonl(&text).map_err(serde::de::Error::custom),
        Value::Array(rows) => Ok(rows),
        Value::Null => Ok(Vec::new()),
        other => Err(serde::de::Error::custom(format!(
            "labels must be JSONL text or an array, got {other}"
        ))),
    }
}

/// Field whose truthiness is the label, and the field rows are joined on.
fn fields(mode: EvalMode) -> (&'static str, &'static str) {
    match mode {
        EvalMode::PaperMatching => ("name_in_plan", "name_in_paper"),
        EvalMode::ReviewMatching => ("appears_in_review", "name_in_plan"),
    }
}

/// Left-join ground-truth rows with prediction rows on `join_field`. Rows with no
/// matching prediction are predicted false; a key predicted twice yields two rows.
pub fn join_labels(
    ground_truth: &[Value],
    predictions: &[Value],
    mode: EvalMode,
) -> LabelPair {
    let (predicted_field, join_field) = fields(mode);
    let label = |row: &Value| row.get(predicted_field).is_some_and(is_truthy);
    let key = |row: &Value| row.get(join_field).cloned().unwrap_or(Value::Null);

    let mut true_labels = Vec::new();
    let mut pred_labels = Vec::new();
    for gt in ground_truth {
        let gt_key = key(gt);
        let matches: Vec<bool> = predictions
            .iter()
            .filter(|p| key(*p) == gt_key)
            .map(|p| label(p))
            .collect();
        if matches.is_empty() {
            true_labels.push(label(gt));
            pred_labels.push(false);
        } else {
            for pred in matches {
                true_labels.push(label(gt));
                pred_labels.push(pred);
            }
        }
    }
    LabelPair::new(true_labels, pred_labels)
}

/// Evaluates a judge's saved outputs against a human-labeled judge-eval dataset.
pub struct JudgeEvaluator {
    dataset: DatasetName,
    judge_evaluations_path: PathBuf,
    span: Span,
}

impl JudgeEvaluator {
    pub fn new(dataset: DatasetName, judge_evaluations_path: impl Into<PathBuf>) -> Self {
        let judge_evaluations_path = judge_evaluations_path.into();
        let span = info_span!(
            "eval_judge",
            dataset = %dataset.judge_eval_slug(),
            path = %judge_evaluations_path.display()
        );
        Self {
            dataset,
            judge_evaluations_path,
            span,
        }
    }

    /// `<data_dir>/<judge-eval dataset>/test.jsonl`
    pub fn dataset_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(self.dataset.judge_eval_slug()).join("test.jsonl")
    }

    pub fn load_instances(&self, data_dir: &Path) -> Result<Vec<JudgeLabelInstance>> {
        let path = self.dataset_path(data_dir);
        let instances: Vec<JudgeLabelInstance> = read_jsonl(&path)?;
        info!(
            parent: &self.span,
            instances = instances.len(),
            path = %path.display(),
            "Loaded judge-eval dataset"
        );
        Ok(instances)
    }

    /// The judge's rows for one instance, or `None` when it wrote no file.
    pub fn load_predictions(&self, instance_id: &str) -> Result<Option<Vec<Value>>> {
        let path = self.judge_evaluations_path.join(format!("{instance_id}.jsonl"));
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        Ok(Some(parse_jsonl(&content)?))
    }

    /// Cost the judge recorded for the instance's task; 0.0 when unavailable.
    pub fn instance_cost(&self, instance_id: &str) -> f64 {
        let _enter = self.span.enter();
        let Some((judge_run, task_id)) = instance_id.split_once('/') else {
            warn!(instance_id = %instance_id, "Instance id has no judge run prefix; cost is zero");
            return 0.0;
        };
        let path = self.judge_evaluations_path.join(judge_run).join("evaluations.json");
        let rows = match std::fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<Vec<Value>>(&content).ok())
        {
            Some(rows) => rows,
            None => {
                warn!(path = %path.display(), "Cost evaluations file missing or unreadable");
                return 0.0;
            }
        };
        rows.iter()
            .find(|row| row.get("id").and_then(Value::as_str) == Some(task_id))
            .and_then(|row| row.get("cost").and_then(Value::as_f64))
            .unwrap_or_else(|| {
                warn!(task_id = %task_id, path = %path.display(), "No cost recorded for task");
                0.0
            })
    }

    pub fn evaluate_instance(&self, instance: &JudgeLabelInstance) -> Result<TaskEvaluation> {
        let mode = self.dataset.mode();
        let cost = self.instance_cost(&instance.id);
        let Some(predictions) = self.load_predictions(&instance.id)? else {
            return Ok(TaskEvaluation {
                id: instance.id.clone(),
                cost,
                ..Default::default()
            });
        };

        let labels = join_labels(&instance.labels, &predictions, mode);
        let scores = score(&labels, None);
        Ok(TaskEvaluation {
            id: instance.id.clone(),
            true_labels: labels.true_labels,
            pred_labels: labels.pred_labels,
            precision: scores.precision,
            recall: scores.recall,
            f1_score: scores.f1_score,
            ndcg_score: None,
            cost,
            error: None,
        })
    }

    pub fn run(&self, data_dir: &Path) -> Result<EvaluationResult> {
        let instances = self.load_instances(data_dir)?;
        let records = instances
            .iter()
            .map(|instance| self.evaluate_instance(instance))
            .collect::<Result<Vec<_>>>()?;
        // Judge meta-evaluation never reports NDCG
        let result = summarize(&records, EvalMode::ReviewMatching);
        info!(parent: &self.span, %result, "Judge evaluation finished");
        Ok(result)
    }
}
