//! Cross-task aggregation into an [`EvaluationResult`].

use ablation_core::types::{EvalMode, EvaluationResult, SingleResult, TaskEvaluation};

/// Mean and sample standard deviation (n-1 denominator). Both are 0.0 for an empty
/// slice; the deviation is 0.0 for fewer than two values.
pub fn mean_std(values: &[f64]) -> SingleResult {
    if values.is_empty() {
        return SingleResult::default();
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let std_dev = if values.len() < 2 {
        0.0
    } else {
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
        var.sqrt()
    };
    SingleResult::new(mean, std_dev)
}

/// Aggregate per-task rows. Failed rows count as zeros and stay in the denominator.
/// NDCG is reported only in paper-matching mode.
pub fn summarize(records: &[TaskEvaluation], mode: EvalMode) -> EvaluationResult {
    let column = |f: fn(&TaskEvaluation) -> f64| records.iter().map(f).collect::<Vec<_>>();

    let ndcg_score = match mode {
        EvalMode::PaperMatching => Some(mean_std(&column(|r| r.ndcg_score.unwrap_or(0.0)))),
        EvalMode::ReviewMatching => None,
    };

    EvaluationResult {
        precision: mean_std(&column(|r| r.precision)),
        recall: mean_std(&column(|r| r.recall)),
        f1_score: mean_std(&column(|r| r.f1_score)),
        ndcg_score,
        cost: mean_std(&column(|r| r.cost)).result,
        num_tasks: records.len(),
        num_failed: records.iter().filter(|r| r.is_failed()).count(),
    }
}
