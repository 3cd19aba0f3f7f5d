//! Core data model shared by judges, planners, and the CLI.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How generated plans are matched against ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvalMode {
    /// Plan ablations are matched against ablations described in the paper.
    PaperMatching,
    /// Plan ablations are checked for overlap with peer-review requests.
    ReviewMatching,
}

/// Benchmark datasets. The dataset determines the evaluation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DatasetName {
    ResearcherAssist,
    ReviewerAssist,
}

impl DatasetName {
    pub fn mode(self) -> EvalMode {
        match self {
            DatasetName::ResearcherAssist => EvalMode::PaperMatching,
            DatasetName::ReviewerAssist => EvalMode::ReviewMatching,
        }
    }

    /// Directory name of the benchmark split files.
    pub fn slug(self) -> &'static str {
        match self {
            DatasetName::ResearcherAssist => "researcher-ablation-bench",
            DatasetName::ReviewerAssist => "reviewer-ablation-bench",
        }
    }

    /// Directory name of the human-labelled judge evaluation set.
    pub fn judge_eval_slug(self) -> &'static str {
        match self {
            DatasetName::ResearcherAssist => "researcher-ablation-judge-eval",
            DatasetName::ReviewerAssist => "reviewer-ablation-judge-eval",
        }
    }
}

impl fmt::Display for DatasetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for DatasetName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Accept hub-style names ("org/researcher-ablation-bench") as well as short forms.
        let name = s.rsplit('/').next().unwrap_or(s).to_lowercase();
        match name.as_str() {
            "researcher" | "researcher-assist" | "researcherassist" | "researcher-ablation-bench"
            | "researcher-ablation-judge-eval" => Ok(DatasetName::ResearcherAssist),
            "reviewer" | "reviewer-assist" | "reviewerassist" | "reviewer-ablation-bench"
            | "reviewer-ablation-judge-eval" => Ok(DatasetName::ReviewerAssist),
            _ => Err(ConfigError::UnknownName {
                kind: "dataset",
                name: s.to_string(),
                available: "researcher, reviewer".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetSplit {
    #[default]
    Dev,
    Test,
}

impl fmt::Display for DatasetSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSplit::Dev => f.write_str("dev"),
            DatasetSplit::Test => f.write_str("test"),
        }
    }
}

impl FromStr for DatasetSplit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(DatasetSplit::Dev),
            "test" => Ok(DatasetSplit::Test),
            _ => Err(ConfigError::UnknownName {
                kind: "split",
                name: s.to_string(),
                available: "dev, test".to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

impl fmt::Display for ReasoningEffort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReasoningEffort::Low => f.write_str("low"),
            ReasoningEffort::Medium => f.write_str("medium"),
            ReasoningEffort::High => f.write_str("high"),
        }
    }
}

impl FromStr for ReasoningEffort {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(ReasoningEffort::Low),
            "medium" => Ok(ReasoningEffort::Medium),
            "high" => Ok(ReasoningEffort::High),
            _ => Err(ConfigError::UnknownName {
                kind: "reasoning effort",
                name: s.to_string(),
                available: "low, medium, high".to_string(),
            }),
        }
    }
}

/// A plan-side name: either one name or several plan items mapped to one paper ablation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanNames {
    One(String),
    Many(Vec<String>),
}

impl PlanNames {
    /// All names, with a scalar normalized to a singleton.
    pub fn names(&self) -> Vec<&str> {
        match self {
            PlanNames::One(name) => vec![name.as_str()],
            PlanNames::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for PlanNames {
    fn from(name: &str) -> Self {
        PlanNames::One(name.to_string())
    }
}

/// A judge's verdict for one paper ablation (paper-matching mode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictedItem {
    pub name_in_paper: String,
    #[serde(default)]
    pub name_in_plan: Option<PlanNames>,
}

impl PredictedItem {
    pub fn new(name_in_paper: impl Into<String>, name_in_plan: Option<PlanNames>) -> Self {
        Self {
            name_in_paper: name_in_paper.into(),
            name_in_plan,
        }
    }

    /// Paper ablation with no plan counterpart.
    pub fn unmatched(name_in_paper: impl Into<String>) -> Self {
        Self::new(name_in_paper, None)
    }

    /// Whether the judge asserted any plan counterpart.
    pub fn label(&self) -> bool {
        self.name_in_plan.is_some()
    }
}

/// A judge's verdict for one plan ablation (review-matching mode).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissingItem {
    pub name_in_plan: String,
    #[serde(default)]
    pub appears_in_review: bool,
}

impl MissingItem {
    pub fn new(name_in_plan: impl Into<String>, appears_in_review: bool) -> Self {
        Self {
            name_in_plan: name_in_plan.into(),
            appears_in_review,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AblationAction {
    Replace,
    Remove,
    Add,
}

/// One line of a generated ablation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AblationSuggestion {
    pub name: String,
    pub ablated_part: String,
    pub action: AblationAction,
    #[serde(default)]
    pub replacement: Option<serde_json::Value>,
    #[serde(default)]
    pub metrics: Vec<String>,
}

/// Which ground-truth list was shown as side "A" when presenting a task to a judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SideAssignment {
    /// Side A holds the paper ablations, side B the generated plan.
    PaperFirst,
    /// Side A holds the generated plan, side B the paper ablations.
    PlanFirst,
}

impl SideAssignment {
    /// JSON keys the judge uses for (paper, plan) names under this assignment.
    pub fn keys(self) -> (&'static str, &'static str) {
        match self {
            SideAssignment::PaperFirst => ("name_in_A", "name_in_B"),
            SideAssignment::PlanFirst => ("name_in_B", "name_in_A"),
        }
    }
}

/// A metric's mean and cross-task standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SingleResult {
    pub result: f64,
    #[serde(default)]
    pub std_dev: f64,
}

impl SingleResult {
    pub fn new(result: f64, std_dev: f64) -> Self {
        Self { result, std_dev }
    }
}

impl fmt::Display for SingleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} ± {:.2}", self.result, self.std_dev)
    }
}

/// Aggregate outcome of one evaluation run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub precision: SingleResult,
    pub recall: SingleResult,
    pub f1_score: SingleResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndcg_score: Option<SingleResult>,
    #[serde(default)]
    pub cost: f64,
    /// Number of tasks every mean is taken over, failed tasks included.
    #[serde(default)]
    pub num_tasks: usize,
    /// Tasks that degraded to a zero-score record.
    #[serde(default)]
    pub num_failed: usize,
}

impl fmt::Display for EvaluationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Precision: {}, Recall: {}, F1: {}, ",
            self.precision, self.recall, self.f1_score
        )?;
        if let Some(ndcg) = &self.ndcg_score {
            write!(f, "NDCG: {}, ", ndcg)?;
        }
        write!(
            f,
            "Cost: {:.2}, Tasks: {} ({} failed)",
            self.cost, self.num_tasks, self.num_failed
        )
    }
}

/// One row of `evaluations.json`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TaskEvaluation {
    pub id: String,
    #[serde(default)]
    pub true_labels: Vec<bool>,
    #[serde(default)]
    pub pred_labels: Vec<bool>,
    #[serde(default)]
    pub precision: f64,
    #[serde(default)]
    pub recall: f64,
    #[serde(default)]
    pub f1_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndcg_score: Option<f64>,
    #[serde(default)]
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskEvaluation {
    /// Zero-score record for a task that could not be evaluated.
    pub fn failed(id: impl Into<String>, cost: f64, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            cost,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_predicted_item_accepts_scalar_list_and_null() {
        let scalar: PredictedItem =
            serde_json::from_str(r#"{"name_in_paper": "dropout", "name_in_plan": "no-dropout"}"#)
                .unwrap();
        assert_eq!(scalar.name_in_plan, Some(PlanNames::One("no-dropout".into())));
        assert!(scalar.label());

        let list: PredictedItem = serde_json::from_str(
            r#"{"name_in_paper": "dropout", "name_in_plan": ["a", "b"]}"#,
        )
        .unwrap();
        assert_eq!(list.name_in_plan.unwrap().names(), vec!["a", "b"]);

        let null: PredictedItem =
            serde_json::from_str(r#"{"name_in_paper": "dropout", "name_in_plan": null}"#).unwrap();
        assert!(!null.label());

        let absent: PredictedItem = serde_json::from_str(r#"{"name_in_paper": "dropout"}"#).unwrap();
        assert!(!absent.label());
    }

    #[test]
    fn test_predicted_item_serializes_null_plan() {
        let item = PredictedItem::unmatched("batchnorm");
        assert_eq!(
            serde_json::to_string(&item).unwrap(),
            r#"{"name_in_paper":"batchnorm","name_in_plan":null}"#
        );
    }

    #[test]
    fn test_missing_item_defaults_to_not_in_review() {
        let item: MissingItem = serde_json::from_str(r#"{"name_in_plan": "lr-schedule"}"#).unwrap();
        assert!(!item.appears_in_review);
    }

    #[test]
    fn test_ablation_suggestion_parses_uppercase_action() {
        let line = r#"{"name": "no-attn", "ablated_part": "attention", "action": "REMOVE", "metrics": ["BLEU"]}"#;
        let suggestion: AblationSuggestion = serde_json::from_str(line).unwrap();
        assert_eq!(suggestion.action, AblationAction::Remove);
        assert!(suggestion.replacement.is_none());
    }

    #[test]
    fn test_dataset_name_parsing() {
        assert_eq!(
            "ai-coscientist/researcher-ablation-bench".parse::<DatasetName>().unwrap(),
            DatasetName::ResearcherAssist
        );
        assert_eq!("reviewer".parse::<DatasetName>().unwrap(), DatasetName::ReviewerAssist);
        assert!("papers".parse::<DatasetName>().is_err());
        assert_eq!(DatasetName::ReviewerAssist.mode(), EvalMode::ReviewMatching);
    }

    #[test]
    fn test_side_assignment_keys() {
        assert_eq!(SideAssignment::PaperFirst.keys(), ("name_in_A", "name_in_B"));
        assert_eq!(SideAssignment::PlanFirst.keys(), ("name_in_B", "name_in_A"));
    }

    #[test]
    fn test_evaluation_result_display() {
        let result = EvaluationResult {
            precision: SingleResult::new(0.5, 0.1),
            recall: SingleResult::new(0.25, 0.0),
            f1_score: SingleResult::new(0.333, 0.05),
            ndcg_score: None,
            cost: 1.234,
            num_tasks: 4,
            num_failed: 1,
        };
        assert_eq!(
            result.to_string(),
            "Precision: 0.50 ± 0.10, Recall: 0.25 ± 0.00, F1: 0.33 ± 0.05, Cost: 1.23, Tasks: 4 (1 failed)"
        );
    }

    #[test]
    fn test_failed_task_evaluation() {
        let record = TaskEvaluation::failed("t1", 0.2, "missing plan");
        assert!(record.is_failed());
        assert_eq!(record.precision, 0.0);
        assert!(record.true_labels.is_empty());
    }
}
