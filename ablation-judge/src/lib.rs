//! # ablation-judge
//!
//! Scoring engine for ablation-bench: label reconciliation, ranking metrics,
//! cross-task aggregation, the judge variants, majority-vote consensus,
//! judge meta-evaluation, and the plan generators.

pub mod aggregate;
pub mod error;
pub mod judge;
mod llm;
pub mod meta_eval;
pub mod metrics;
pub mod planner;
pub mod pool;
pub mod reconcile;

pub use aggregate::{mean_std, summarize};
pub use error::{JudgeError, Result};
pub use judge::{ExternalAgentJudge, Judge, JudgeKind, MajorityJudge, SimpleLmJudge};
pub use meta_eval::{JudgeEvaluator, JudgeLabelInstance};
pub use metrics::{Scores, f1, ndcg, precision, recall, score};
pub use planner::{
    ExternalAgentPlanner, PlanEntry, PlanSummary, Planner, PlannerKind, SimpleLmPlanner,
};
pub use reconcile::{LabelPair, conservative_labels, reconcile, reconcile_review};
