//! Consensus judge over the saved outputs of other judges.
//!
//! Reads `<dir>/<task_id>.jsonl` from every configured judge output directory and
//! takes a strict-majority vote per item. Anything short of a strict majority falls
//! back to "no match" (paper mode) or "not in review" (review mode).

use ablation_core::config::BenchConfig;
use ablation_core::dataset::{Dataset, Task};
use ablation_core::error::ConfigError;
use ablation_core::types::{
    EvalMode, EvaluationResult, MissingItem, PlanNames, PredictedItem, TaskEvaluation,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Span, debug, info, info_span, warn};

use super::{
    JudgeKind, blocking_record, collect_records, finish, is_truthy, read_plan_names,
    score_paper_task, score_review_task, write_predictions,
};
use crate::error::{JudgeError, Result};
use crate::pool::run_bounded;
use crate::reconcile::truncate_top_k;

/// One judge's `name_in_plan` answer, as a hashable vote.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlanVote {
    Absent,
    One(String),
    Many(BTreeSet<String>),
}

impl PlanVote {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => PlanVote::Absent,
            Some(Value::String(s)) => PlanVote::One(s.clone()),
            Some(Value::Array(items)) => {
                let set: BTreeSet<String> = items.iter().map(value_to_name).collect();
                // A one-element list names the same plan item as the bare string
                if set.len() == 1 {
                    PlanVote::One(set.into_iter().next().unwrap_or_default())
                } else {
                    PlanVote::Many(set)
                }
            }
            Some(other) => PlanVote::One(other.to_string()),
        }
    }

    fn into_plan_names(self) -> Option<PlanNames> {
        match self {
            PlanVote::Absent => None,
            PlanVote::One(name) => Some(PlanNames::One(name)),
            PlanVote::Many(names) => Some(PlanNames::Many(names.into_iter().collect())),
        }
    }
}

fn value_to_name(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Group keys in first-seen order.
fn group_votes<V>(pairs: impl IntoIterator<Item = (String, V)>) -> Vec<(String, Vec<V>)> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<V>)> = Vec::new();
    for (key, vote) in pairs {
        match index.get(&key) {
            Some(&i) => groups[i].1.push(vote),
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, vec![vote]));
            }
        }
    }
    groups
}

/// Most frequent vote; ties go to the vote seen first.
fn most_common(votes: &[PlanVote]) -> Option<(&PlanVote, usize)> {
    let mut counts: Vec<(&PlanVote, usize)> = Vec::new();
    for vote in votes {
        match counts.iter_mut().find(|(v, _)| *v == vote) {
            Some((_, count)) => *count += 1,
            None => counts.push((vote, 1)),
        }
    }
    counts
        .into_iter()
        .fold(None, |best, (vote, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((vote, count)),
        })
}

/// Paper-mode consensus: one prediction per paper ablation any judge mentioned.
pub fn majority_paper(all_predictions: &[Vec<Value>]) -> Vec<PredictedItem> {
    let pairs = all_predictions.iter().flatten().filter_map(|pred| {
        let name = pred.get("name_in_paper").filter(|v| is_truthy(v))?;
        Some((
            value_to_name(name),
            PlanVote::from_value(pred.get("name_in_plan")),
        ))
    });

    group_votes(pairs)
        .into_iter()
        .map(|(name_in_paper, votes)| {
            let winner = most_common(&votes)
                .filter(|(_, count)| *count > votes.len() / 2)
                .map(|(vote, _)| vote.clone())
                .unwrap_or(PlanVote::Absent);
            PredictedItem::new(name_in_paper, winner.into_plan_names())
        })
        .collect()
}

/// Review-mode consensus: one item per plan ablation any judge mentioned.
pub fn majority_review(all_predictions: &[Vec<Value>]) -> Vec<MissingItem> {
    let pairs = all_predictions.iter().flatten().filter_map(|pred| {
        let name = pred.get("name_in_plan").filter(|v| is_truthy(v))?;
        let vote = pred.get("appears_in_review").is_some_and(is_truthy);
        Some((value_to_name(name), vote))
    });

    group_votes(pairs)
        .into_iter()
        .map(|(name_in_plan, votes)| {
            let yes = votes.iter().filter(|v| **v).count();
            MissingItem::new(name_in_plan, yes > votes.len() / 2)
        })
        .collect()
}

/// Per-task costs recorded by one judge run.
type CostLedger = HashMap<String, f64>;

fn load_ledger(judge_dir: &Path) -> Option<CostLedger> {
    let path = judge_dir.join("evaluations.json");
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(_) => {
            warn!(path = %path.display(), "Evaluations file not found; its costs count as zero");
            return None;
        }
    };
    match serde_json::from_str::<Vec<Value>>(&content) {
        Ok(rows) => Some(
            rows.iter()
                .filter_map(|row| {
                    let id = row.get("id")?.as_str()?.to_string();
                    let cost = row.get("cost").and_then(Value::as_f64).unwrap_or(0.0);
                    Some((id, cost))
                })
                .collect(),
        ),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed evaluations file; its costs count as zero");
            None
        }
    }
}

/// Consensus judge.
#[derive(Clone)]
pub struct MajorityJudge {
    config: Arc<BenchConfig>,
    span: Span,
}

impl MajorityJudge {
    pub fn new(config: BenchConfig) -> Result<Self> {
        if config.judge_output_dirs.is_empty() {
            return Err(ConfigError::MissingField {
                field: "judge_output_dirs".into(),
            }
            .into());
        }
        let span = info_span!(
            "judge",
            judge = "majority",
            judges = config.judge_output_dirs.len()
        );
        Ok(Self {
            config: Arc::new(config),
            span,
        })
    }

    pub fn output_dir(&self) -> &Path {
        &self.config.output_dir
    }

    pub fn judge_output_dirs(&self) -> &[PathBuf] {
        &self.config.judge_output_dirs
    }

    pub async fn evaluate(
        &self,
        predictions_path: &Path,
        dataset: &Dataset,
        top_k: Option<usize>,
    ) -> Result<EvaluationResult> {
        std::fs::create_dir_all(self.output_dir())?;
        let mode = dataset.mode();
        info!(parent: &self.span, tasks = dataset.len(), ?mode, "Starting consensus evaluation");

        let ledgers: Arc<Vec<Option<CostLedger>>> = Arc::new(
            self.judge_output_dirs()
                .iter()
                .map(|dir| load_ledger(dir))
                .collect(),
        );
        let predictions_path: Arc<PathBuf> = Arc::new(predictions_path.to_path_buf());

        let results = run_bounded(dataset.tasks.clone(), self.config.parallelism, |task| {
            let judge = self.clone();
            let ledgers = ledgers.clone();
            let predictions_path = predictions_path.clone();
            let span = info_span!(parent: &self.span, "task", task_id = %task.id);
            blocking_record(task.id.clone(), span, move || {
                judge.task(&task, mode, &ledgers, &predictions_path, top_k)
            })
        })
        .await;

        let records = collect_records(&dataset.tasks, results);
        finish(JudgeKind::Majority, self.output_dir(), mode, &records)
    }

    /// Every judge's predictions for one task. Unreadable files are skipped.
    pub fn load_votes(&self, task_id: &str) -> Vec<Vec<Value>> {
        let mut all = Vec::new();
        for dir in self.judge_output_dirs() {
            let path = dir.join(format!("{task_id}.jsonl"));
            let Ok(content) = std::fs::read_to_string(&path) else {
                warn!(path = %path.display(), "Prediction file not found");
                continue;
            };
            match ablation_core::dataset::parse_jsonl::<Value>(&content) {
                Ok(predictions) => {
                    debug!(path = %path.display(), count = predictions.len(), "Loaded predictions");
                    all.push(predictions);
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable predictions"),
            }
        }
        all
    }

    fn task_cost(&self, task_id: &str, ledgers: &[Option<CostLedger>]) -> f64 {
        self.judge_output_dirs()
            .iter()
            .zip(ledgers)
            .filter_map(|(dir, ledger)| {
                let cost = ledger.as_ref()?.get(task_id).copied();
                if cost.is_none() {
                    warn!(task_id = %task_id, dir = %dir.display(), "No cost recorded for task");
                }
                cost
            })
            .sum()
    }

    fn task(
        &self,
        task: &Task,
        mode: EvalMode,
        ledgers: &[Option<CostLedger>],
        predictions_path: &Path,
        top_k: Option<usize>,
    ) -> Result<TaskEvaluation> {
        let votes = self.load_votes(&task.id);
        if votes.is_empty() {
            return Err(JudgeError::NoVotes {
                task_id: task.id.clone(),
            });
        }
        let cost = self.task_cost(&task.id, ledgers);

        match mode {
            EvalMode::PaperMatching => {
                let consensus = majority_paper(&votes);
                write_predictions(self.output_dir(), &task.id, &consensus)?;
                let paper = task.paper_ablation_names()?;
                let plan = read_plan_names(predictions_path, &task.id)?;
                Ok(score_paper_task(&task.id, &consensus, &paper, plan, top_k, cost))
            }
            EvalMode::ReviewMatching => {
                let mut consensus = majority_review(&votes);
                truncate_top_k(&mut consensus, top_k);
                write_predictions(self.output_dir(), &task.id, &consensus)?;
                Ok(score_review_task(
                    &task.id,
                    consensus,
                    task.num_ablations()?,
                    None,
                    cost,
                ))
            }
        }
    }
}
