//! Judges: score generated ablation plans against ground truth.
//!
//! A judge is one of a closed set of variants selected by [`JudgeKind`]:
//! - `simple_lm`: one LM call per task
//! - `external_agent`: an autonomous agent run over all tasks at once
//! - `majority`: consensus over the saved outputs of other judges
//!
//! Every judge writes `<output_dir>/<task_id>.jsonl` (its parsed predictions),
//! `<output_dir>/evaluations.json` (one [`TaskEvaluation`] per task) and
//! `<output_dir>/result.json` (the aggregate [`EvaluationResult`]).

pub mod external_agent;
pub mod majority;
pub mod simple_lm;

pub use external_agent::ExternalAgentJudge;
pub use majority::MajorityJudge;
pub use simple_lm::SimpleLmJudge;

use ablation_core::config::BenchConfig;
use ablation_core::dataset::{Dataset, Task};
use ablation_core::error::ConfigError;
use ablation_core::providers::create_provider;
use ablation_core::types::{
    EvalMode, EvaluationResult, MissingItem, PlanNames, PredictedItem, SideAssignment,
    TaskEvaluation,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tokio::task::JoinError;
use tracing::{Span, info, warn};

use crate::aggregate::summarize;
use crate::error::{JudgeError, Result};
use crate::metrics::score;
use crate::reconcile::{LabelPair, reconcile, reconcile_review, truncate_top_k};

/// Separator placed between reviews when several are shown to a judge.
pub const REVIEW_SEPARATOR: &str = "\n</official_review>\n\n\n<official_review>\n";

/// Judge variants, parsed from the `--judge` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JudgeKind {
    SimpleLm,
    ExternalAgent,
    Majority,
}

impl JudgeKind {
    pub const ALL: [JudgeKind; 3] = [
        JudgeKind::SimpleLm,
        JudgeKind::ExternalAgent,
        JudgeKind::Majority,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JudgeKind::SimpleLm => "simple_lm",
            JudgeKind::ExternalAgent => "external_agent",
            JudgeKind::Majority => "majority",
        }
    }
}

impl fmt::Display for JudgeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JudgeKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "simple_lm" | "simple-lm" => Ok(JudgeKind::SimpleLm),
            "external_agent" | "external-agent" | "sweagent" => Ok(JudgeKind::ExternalAgent),
            "majority" | "majority_judge" => Ok(JudgeKind::Majority),
            _ => Err(ConfigError::UnknownName {
                kind: "judge",
                name: s.to_string(),
                available: JudgeKind::ALL.map(JudgeKind::as_str).join(", "),
            }),
        }
    }
}

/// A configured judge.
pub enum Judge {
    SimpleLm(SimpleLmJudge),
    ExternalAgent(ExternalAgentJudge),
    Majority(MajorityJudge),
}

impl Judge {
    /// Build the judge for `kind`. Configuration problems are reported here, before any task runs.
    pub fn from_config(kind: JudgeKind, config: BenchConfig) -> Result<Self> {
        match kind {
            JudgeKind::SimpleLm => {
                config.require_prompts()?;
                let provider = create_provider(&config)?;
                Ok(Judge::SimpleLm(SimpleLmJudge::new(config, provider)?))
            }
            JudgeKind::ExternalAgent => Ok(Judge::ExternalAgent(ExternalAgentJudge::new(config)?)),
            JudgeKind::Majority => Ok(Judge::Majority(MajorityJudge::new(config)?)),
        }
    }

    pub fn kind(&self) -> JudgeKind {
        match self {
            Judge::SimpleLm(_) => JudgeKind::SimpleLm,
            Judge::ExternalAgent(_) => JudgeKind::ExternalAgent,
            Judge::Majority(_) => JudgeKind::Majority,
        }
    }

    pub fn output_dir(&self) -> &Path {
        match self {
            Judge::SimpleLm(j) => j.output_dir(),
            Judge::ExternalAgent(j) => j.output_dir(),
            Judge::Majority(j) => j.output_dir(),
        }
    }

    /// Evaluate the plans under `predictions_path` (one `<task_id>.jsonl` per task).
    pub async fn evaluate(
        &self,
        predictions_path: &Path,
        dataset: &Dataset,
        top_k: Option<usize>,
    ) -> Result<EvaluationResult> {
        match self {
            Judge::SimpleLm(j) => j.evaluate(predictions_path, dataset, top_k).await,
            Judge::ExternalAgent(j) => j.evaluate(predictions_path, dataset, top_k).await,
            Judge::Majority(j) => j.evaluate(predictions_path, dataset, top_k).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Plan files
// ---------------------------------------------------------------------------

pub(crate) fn plan_path(predictions_path: &Path, task_id: &str) -> PathBuf {
    predictions_path.join(format!("{task_id}.jsonl"))
}

/// Raw text of a task's generated plan.
pub(crate) fn read_plan_text(predictions_path: &Path, task_id: &str) -> Result<String> {
    let path = plan_path(predictions_path, task_id);
    std::fs::read_to_string(&path).map_err(|_| JudgeError::MissingPlan {
        task_id: task_id.to_string(),
        path,
    })
}

/// [`read_plan_text`] for async task bodies.
pub(crate) async fn load_plan_text(predictions_path: &Path, task_id: &str) -> Result<String> {
    let path = plan_path(predictions_path, task_id);
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|_| JudgeError::MissingPlan {
            task_id: task_id.to_string(),
            path,
        })
}

/// Non-blank lines of a plan, in order.
pub(crate) fn plan_lines(plan_text: &str) -> Vec<String> {
    plan_text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ablation names of a plan, in plan order. Non-string names are stringified.
pub(crate) fn plan_names(task_id: &str, plan_text: &str) -> Result<Vec<String>> {
    plan_lines(plan_text)
        .iter()
        .enumerate()
        .map(|(idx, line)| {
            let value: Value =
                serde_json::from_str(line).map_err(|e| JudgeError::MalformedPlan {
                    task_id: task_id.to_string(),
                    message: format!("line {}: {}", idx + 1, e),
                })?;
            match value.get("name") {
                Some(Value::String(s)) => Ok(s.clone()),
                Some(Value::Null) | None => Err(JudgeError::MalformedPlan {
                    task_id: task_id.to_string(),
                    message: format!("line {} has no name", idx + 1),
                }),
                Some(other) => Ok(other.to_string()),
            }
        })
        .collect()
}

pub(crate) fn read_plan_names(predictions_path: &Path, task_id: &str) -> Result<Vec<String>> {
    plan_names(task_id, &read_plan_text(predictions_path, task_id)?)
}

// ---------------------------------------------------------------------------
// Output files
// ---------------------------------------------------------------------------

fn predictions_body<T: Serialize>(items: &[T]) -> Result<String> {
    let mut body = String::new();
    for item in items {
        body.push_str(&serde_json::to_string(item)?);
        body.push('\n');
    }
    Ok(body)
}

/// Write one JSON object per line to `<output_dir>/<task_id>.jsonl`.
pub(crate) fn write_predictions<T: Serialize>(
    output_dir: &Path,
    task_id: &str,
    items: &[T],
) -> Result<()> {
    std::fs::write(
        output_dir.join(format!("{task_id}.jsonl")),
        predictions_body(items)?,
    )?;
    Ok(())
}

/// [`write_predictions`] for async task bodies.
pub(crate) async fn store_predictions<T: Serialize>(
    output_dir: &Path,
    task_id: &str,
    items: &[T],
) -> Result<()> {
    let body = predictions_body(items)?;
    tokio::fs::write(output_dir.join(format!("{task_id}.jsonl")), body).await?;
    Ok(())
}

/// Aggregate the per-task rows and persist `evaluations.json` and `result.json`.
pub(crate) fn finish(
    judge: JudgeKind,
    output_dir: &Path,
    mode: EvalMode,
    records: &[TaskEvaluation],
) -> Result<EvaluationResult> {
    let result = summarize(records, mode);
    std::fs::write(
        output_dir.join("evaluations.json"),
        serde_json::to_string_pretty(records)?,
    )?;
    std::fs::write(
        output_dir.join("result.json"),
        serde_json::to_string_pretty(&result)?,
    )?;
    info!(
        judge = %judge,
        tasks = result.num_tasks,
        failed = result.num_failed,
        output_dir = %output_dir.display(),
        "Evaluation finished"
    );
    Ok(result)
}

/// Collapse a task outcome into its evaluation row; errors become zero-score rows.
pub(crate) fn into_record(task_id: &str, outcome: Result<TaskEvaluation>) -> TaskEvaluation {
    match outcome {
        Ok(record) => record,
        Err(e) => {
            warn!(task_id = %task_id, error = %e, "Task failed; recording zero scores");
            TaskEvaluation::failed(task_id, 0.0, e.to_string())
        }
    }
}

/// Run a synchronous, file-bound task body on the blocking pool inside `span`.
pub(crate) async fn blocking_record<F>(task_id: String, span: Span, body: F) -> TaskEvaluation
where
    F: FnOnce() -> Result<TaskEvaluation> + Send + 'static,
{
    let outcome = tokio::task::spawn_blocking(move || span.in_scope(body))
        .await
        .unwrap_or_else(|e| {
            Err(JudgeError::Join {
                task_id: task_id.clone(),
                message: e.to_string(),
            })
        });
    into_record(&task_id, outcome)
}

/// Collect pool results in dataset order; a task that panicked becomes a zero-score row.
pub(crate) fn collect_records(
    tasks: &[Task],
    results: Vec<std::result::Result<TaskEvaluation, JoinError>>,
) -> Vec<TaskEvaluation> {
    tasks
        .iter()
        .zip(results)
        .map(|(task, result)| {
            result.unwrap_or_else(|e| {
                into_record(
                    &task.id,
                    Err(JudgeError::Join {
                        task_id: task.id.clone(),
                        message: e.to_string(),
                    }),
                )
            })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Score a label pair into an evaluation row.
pub(crate) fn labeled_record(
    task_id: &str,
    labels: LabelPair,
    ndcg_k: Option<usize>,
    cost: f64,
) -> TaskEvaluation {
    let scores = score(&labels, ndcg_k);
    TaskEvaluation {
        id: task_id.to_string(),
        true_labels: labels.true_labels,
        pred_labels: labels.pred_labels,
        precision: scores.precision,
        recall: scores.recall,
        f1_score: scores.f1_score,
        ndcg_score: scores.ndcg_score,
        cost,
        error: None,
    }
}

/// Score paper-matching predictions. `top_k` truncates the generated plan.
pub(crate) fn score_paper_task(
    task_id: &str,
    predictions: &[PredictedItem],
    paper: &[String],
    mut plan: Vec<String>,
    top_k: Option<usize>,
    cost: f64,
) -> TaskEvaluation {
    truncate_top_k(&mut plan, top_k);
    let labels = reconcile(predictions, paper, &plan);
    let k = plan.len().min(paper.len());
    labeled_record(task_id, labels, Some(k), cost)
}

/// Score review-matching predictions. `top_k` truncates the prediction list.
pub(crate) fn score_review_task(
    task_id: &str,
    mut predictions: Vec<MissingItem>,
    num_ablations: usize,
    top_k: Option<usize>,
    cost: f64,
) -> TaskEvaluation {
    truncate_top_k(&mut predictions, top_k);
    let labels = reconcile_review(&predictions, num_ablations);
    labeled_record(task_id, labels, None, cost)
}

// ---------------------------------------------------------------------------
// Side randomization
// ---------------------------------------------------------------------------

/// Per-task RNG. With a seed, every task gets its own reproducible stream.
pub(crate) fn task_rng(seed: Option<u64>, task_id: &str) -> StdRng {
    match seed {
        Some(seed) => {
            let digest = Sha256::digest(task_id.as_bytes());
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&digest[..8]);
            StdRng::seed_from_u64(seed ^ u64::from_le_bytes(bytes))
        }
        None => StdRng::from_entropy(),
    }
}

/// Paper ablations and plan lines shuffled and assigned to sides A/B.
#[derive(Debug, Clone)]
pub(crate) struct PresentedSides {
    pub assignment: SideAssignment,
    pub side_a: String,
    pub side_b: String,
}

pub(crate) fn present_sides(
    paper_ablations: &[Value],
    plan_lines: &[String],
    rng: &mut StdRng,
) -> PresentedSides {
    let mut paper: Vec<String> = paper_ablations.iter().map(Value::to_string).collect();
    let mut plan = plan_lines.to_vec();
    paper.shuffle(rng);
    plan.shuffle(rng);
    let (paper, plan) = (paper.join("\n"), plan.join("\n"));

    let assignment = if rng.gen_bool(0.5) {
        SideAssignment::PaperFirst
    } else {
        SideAssignment::PlanFirst
    };
    let (side_a, side_b) = match assignment {
        SideAssignment::PaperFirst => (paper, plan),
        SideAssignment::PlanFirst => (plan, paper),
    };
    PresentedSides {
        assignment,
        side_a,
        side_b,
    }
}

/// Parse side-keyed response lines into JSON objects.
pub(crate) fn parse_side_lines(task_id: &str, lines: &[String]) -> Result<Vec<Map<String, Value>>> {
    lines
        .iter()
        .map(|line| {
            serde_json::from_str::<Map<String, Value>>(line).map_err(|e| JudgeError::Response {
                task_id: task_id.to_string(),
                message: format!("{e}: {line}"),
            })
        })
        .collect()
}

/// Drop repeated objects, keeping first occurrences.
pub(crate) fn dedup_objects(items: Vec<Map<String, Value>>) -> Vec<Map<String, Value>> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(Value::Object(item.clone()).to_string()))
        .collect()
}

fn value_names(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::Null) | None => Vec::new(),
        Some(other) => vec![other.to_string()],
    }
}

/// Decide which side the judge used for the paper ablations by checking which
/// side's names all belong to the paper.
pub(crate) fn detect_sides(
    items: &[Map<String, Value>],
    paper_names: &[String],
) -> Option<SideAssignment> {
    let paper: HashSet<&str> = paper_names.iter().map(String::as_str).collect();
    let side_is_paper = |key: &str| {
        items
            .iter()
            .flat_map(|item| value_names(item.get(key)))
            .all(|name| paper.contains(name.as_str()))
    };
    if side_is_paper("name_in_A") {
        Some(SideAssignment::PaperFirst)
    } else if side_is_paper("name_in_B") {
        Some(SideAssignment::PlanFirst)
    } else {
        None
    }
}

/// Map side-keyed objects back to paper/plan predictions.
///
/// Objects already keyed by `name_in_paper` are taken as-is. A list of paper names
/// yields one prediction per name; objects without a paper name are dropped.
pub(crate) fn restore_sides(
    items: &[Map<String, Value>],
    assignment: SideAssignment,
) -> Vec<PredictedItem> {
    let (paper_key, plan_key) = match assignment {
        _ if items.iter().any(|i| i.contains_key("name_in_paper")) => {
            ("name_in_paper", "name_in_plan")
        }
        other => other.keys(),
    };

    let mut predictions = Vec::new();
    for item in items {
        let plan = match item.get(plan_key) {
            None | Some(Value::Null) => None,
            Some(Value::Array(_)) => Some(PlanNames::Many(value_names(item.get(plan_key)))),
            Some(Value::String(s)) => Some(PlanNames::One(s.clone())),
            Some(other) => Some(PlanNames::One(other.to_string())),
        };
        for paper_name in value_names(item.get(paper_key)) {
            predictions.push(PredictedItem::new(paper_name, plan.clone()));
        }
    }
    predictions
}

/// JSON truthiness: null, false, zero and empty values are false.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Every paper ablation unmatched; used when a judge's answer cannot be interpreted.
pub(crate) fn default_paper_predictions(paper_names: &[String]) -> Vec<PredictedItem> {
    paper_names.iter().map(PredictedItem::unmatched).collect()
}

/// Every plan item marked absent from the reviews.
pub(crate) fn default_review_predictions(plan_names: &[String]) -> Vec<MissingItem> {
    plan_names
        .iter()
        .map(|name| MissingItem::new(name.clone(), false))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().unwrap().clone()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_judge_kind_parsing() {
        assert_eq!("simple_lm".parse::<JudgeKind>().unwrap(), JudgeKind::SimpleLm);
        assert_eq!("sweagent".parse::<JudgeKind>().unwrap(), JudgeKind::ExternalAgent);
        assert_eq!("majority_judge".parse::<JudgeKind>().unwrap(), JudgeKind::Majority);
        let err = "oracle".parse::<JudgeKind>().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown judge 'oracle'. Available: simple_lm, external_agent, majority"
        );
    }

    #[test]
    fn test_plan_names() {
        let text = "{\"name\": \"a\", \"action\": \"REMOVE\"}\n\n{\"name\": 7}\n";
        assert_eq!(plan_names("t", text).unwrap(), names(&["a", "7"]));
        assert!(matches!(
            plan_names("t", "{\"action\": \"ADD\"}"),
            Err(JudgeError::MalformedPlan { .. })
        ));
        assert!(matches!(
            plan_names("t", "nope"),
            Err(JudgeError::MalformedPlan { .. })
        ));
    }

    #[test]
    fn test_task_rng_is_reproducible_per_task() {
        let a: u64 = task_rng(Some(7), "t1").r#gen();
        let b: u64 = task_rng(Some(7), "t1").r#gen();
        let c: u64 = task_rng(Some(7), "t2").r#gen();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_present_sides_keeps_all_items() {
        let paper = vec![json!({"name": "dropout"}), json!({"name": "bn"})];
        let plan = names(&["{\"name\": \"x\"}"]);
        let mut rng = task_rng(Some(1), "t");
        let sides = present_sides(&paper, &plan, &mut rng);
        let (paper_side, plan_side) = match sides.assignment {
            SideAssignment::PaperFirst => (&sides.side_a, &sides.side_b),
            SideAssignment::PlanFirst => (&sides.side_b, &sides.side_a),
        };
        assert_eq!(paper_side.lines().count(), 2);
        assert!(paper_side.contains("dropout"));
        assert_eq!(plan_side, "{\"name\": \"x\"}");
    }

    #[test]
    fn test_detect_and_restore_plan_first() {
        let items = vec![
            obj(json!({"name_in_A": "no-dropout", "name_in_B": "dropout"})),
            obj(json!({"name_in_A": null, "name_in_B": "bn"})),
        ];
        let paper = names(&["dropout", "bn"]);
        assert_eq!(detect_sides(&items, &paper), Some(SideAssignment::PlanFirst));

        let preds = restore_sides(&items, SideAssignment::PlanFirst);
        assert_eq!(
            preds,
            vec![
                PredictedItem::new("dropout", Some(PlanNames::from("no-dropout"))),
                PredictedItem::unmatched("bn"),
            ]
        );
    }

    #[test]
    fn test_detect_sides_fails_when_neither_side_is_paper() {
        let items = vec![obj(json!({"name_in_A": "x", "name_in_B": "y"}))];
        assert_eq!(detect_sides(&items, &names(&["dropout"])), None);
    }

    #[test]
    fn test_restore_explodes_list_paper_names() {
        let items = vec![obj(json!({"name_in_A": ["a", "b"], "name_in_B": ["p1", "p2"]}))];
        let preds = restore_sides(&items, SideAssignment::PaperFirst);
        assert_eq!(preds.len(), 2);
        assert_eq!(preds[1].name_in_paper, "b");
        assert_eq!(
            preds[1].name_in_plan,
            Some(PlanNames::Many(names(&["p1", "p2"])))
        );
    }

    #[test]
    fn test_restore_accepts_plain_keys() {
        let items = vec![obj(json!({"name_in_paper": "a", "name_in_plan": "p"}))];
        let preds = restore_sides(&items, SideAssignment::PlanFirst);
        assert_eq!(preds, vec![PredictedItem::new("a", Some(PlanNames::from("p")))]);
    }

    #[test]
    fn test_truthiness() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!("")));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!([])));
        assert!(is_truthy(&json!("a")));
        assert!(is_truthy(&json!(["a"])));
        assert!(is_truthy(&json!(true)));
    }

    #[test]
    fn test_dedup_objects() {
        let items = vec![
            obj(json!({"name_in_plan": "a", "appears_in_review": true})),
            obj(json!({"name_in_plan": "a", "appears_in_review": true})),
            obj(json!({"name_in_plan": "b", "appears_in_review": false})),
        ];
        assert_eq!(dedup_objects(items).len(), 2);
    }

    #[test]
    fn test_score_paper_task_applies_top_k_to_plan() {
        let preds = vec![PredictedItem::new("dropout", Some(PlanNames::from("p1")))];
        let record = score_paper_task(
            "t",
            &preds,
            &names(&["dropout", "bn"]),
            names(&["p1", "p2", "p3"]),
            Some(1),
            0.5,
        );
        assert_eq!(record.true_labels, vec![true, true]);
        assert_eq!(record.pred_labels, vec![true, false]);
        assert!((record.ndcg_score.unwrap() - 1.0).abs() < 1e-9);
        assert_eq!(record.cost, 0.5);
    }

    #[test]
    fn test_into_record_on_error() {
        let record = into_record(
            "t9",
            Err(JudgeError::NoVotes {
                task_id: "t9".into(),
            }),
        );
        assert!(record.is_failed());
        assert_eq!(record.id, "t9");
    }

    #[tokio::test]
    async fn test_blocking_record_runs_body_and_contains_panics() {
        let ok = blocking_record("t1".into(), Span::none(), || {
            Ok(TaskEvaluation::failed("t1", 0.3, "scored elsewhere"))
        })
        .await;
        assert_eq!(ok.cost, 0.3);

        let panicked = blocking_record("t2".into(), Span::none(), || -> Result<TaskEvaluation> {
            panic!("boom")
        })
        .await;
        assert!(panicked.is_failed());
        assert_eq!(panicked.id, "t2");
        assert!(panicked.error.as_deref().unwrap().contains("t2"));
    }

    #[tokio::test]
    async fn test_async_plan_and_prediction_io() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = load_plan_text(dir.path(), "absent").await.unwrap_err();
        assert!(matches!(err, JudgeError::MissingPlan { .. }));

        let items = [MissingItem {
            name_in_plan: "lr".into(),
            appears_in_review: true,
        }];
        store_predictions(dir.path(), "r1", &items).await.unwrap();
        assert_eq!(
            load_plan_text(dir.path(), "r1").await.unwrap(),
            "{\"name_in_plan\":\"lr\",\"appears_in_review\":true}\n"
        );
    }
}
