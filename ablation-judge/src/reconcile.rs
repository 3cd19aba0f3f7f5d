//! Label reconciliation.
//!
//! Turns a judge's loosely-keyed predictions into two parallel boolean sequences
//! (ground truth and prediction) that the ranking metrics consume. Matching is exact,
//! case-sensitive string equality.

use ablation_core::types::{MissingItem, PredictedItem};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Parallel ground-truth and predicted labels for one task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPair {
    pub true_labels: Vec<bool>,
    pub pred_labels: Vec<bool>,
}

impl LabelPair {
    pub fn new(true_labels: Vec<bool>, pred_labels: Vec<bool>) -> Self {
        debug_assert_eq!(true_labels.len(), pred_labels.len());
        Self {
            true_labels,
            pred_labels,
        }
    }

    pub fn len(&self) -> usize {
        self.true_labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.true_labels.is_empty()
    }
}

/// Paper-matching reconciliation.
///
/// Each paper ablation is a positive; it is predicted iff some prediction for it names
/// plan items that all exist in `plan`. Plan items no prediction mentions are appended
/// as false positives, once per distinct name.
pub fn reconcile(predictions: &[PredictedItem], paper: &[String], plan: &[String]) -> LabelPair {
    let plan_set: HashSet<&str> = plan.iter().map(String::as_str).collect();

    let mut true_labels = vec![true; paper.len()];
    let mut pred_labels: Vec<bool> = paper
        .iter()
        .map(|paper_name| {
            predictions.iter().any(|p| {
                p.name_in_paper == *paper_name
                    && p.name_in_plan.as_ref().is_some_and(|names| {
                        let names = names.names();
                        !names.is_empty() && names.iter().all(|n| plan_set.contains(n))
                    })
            })
        })
        .collect();

    let covered: HashSet<&str> = predictions
        .iter()
        .filter_map(|p| p.name_in_plan.as_ref())
        .flat_map(|names| names.names())
        .collect();

    let mut seen = HashSet::new();
    let additional = plan
        .iter()
        .filter(|name| !covered.contains(name.as_str()) && seen.insert(name.as_str()))
        .count();

    true_labels.extend(std::iter::repeat_n(false, additional));
    pred_labels.extend(std::iter::repeat_n(true, additional));
    LabelPair::new(true_labels, pred_labels)
}

/// Review-matching reconciliation against the number of ablations reviewers asked for.
pub fn reconcile_review(predictions: &[MissingItem], num_ablations: usize) -> LabelPair {
    let flagged = predictions.iter().filter(|p| p.appears_in_review).count();
    let overlap = flagged.min(num_ablations);
    let non_overlap = num_ablations - overlap;
    let non_existing = predictions.len() - flagged;

    let mut true_labels = vec![true; num_ablations];
    true_labels.extend(std::iter::repeat_n(false, non_existing));

    let mut pred_labels = vec![true; overlap];
    pred_labels.extend(std::iter::repeat_n(false, non_overlap));
    pred_labels.extend(std::iter::repeat_n(true, non_existing));

    LabelPair::new(true_labels, pred_labels)
}

/// Labels for a task the judge produced nothing for: every paper ablation missed,
/// every plan item a false positive.
pub fn conservative_labels(num_paper: usize, num_plan: usize) -> LabelPair {
    let mut true_labels = vec![true; num_paper];
    true_labels.extend(std::iter::repeat_n(false, num_plan));
    let mut pred_labels = vec![false; num_paper];
    pred_labels.extend(std::iter::repeat_n(true, num_plan));
    LabelPair::new(true_labels, pred_labels)
}

/// Keep the first `top_k` items. `None` and `Some(0)` keep everything.
pub fn truncate_top_k<T>(items: &mut Vec<T>, top_k: Option<usize>) {
    if let Some(k) = top_k.filter(|k| *k > 0) {
        items.truncate(k);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ablation_core::types::PlanNames;
    use pretty_assertions::assert_eq;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_dropout_batchnorm_example() {
        let preds = vec![
            PredictedItem::new("dropout", Some(PlanNames::from("no-dropout"))),
            PredictedItem::unmatched("batchnorm"),
        ];
        let pair = reconcile(
            &preds,
            &names(&["dropout", "batchnorm"]),
            &names(&["no-dropout", "lr-sweep"]),
        );
        assert_eq!(pair.true_labels, vec![true, true, false]);
        assert_eq!(pair.pred_labels, vec![true, false, true]);
    }

    #[test]
    fn test_list_names_must_all_exist_in_plan() {
        let preds = vec![PredictedItem::new(
            "dropout",
            Some(PlanNames::Many(names(&["a", "ghost"]))),
        )];
        let pair = reconcile(&preds, &names(&["dropout"]), &names(&["a"]));
        // "a" is covered by the list, so no extra plan items
        assert_eq!(pair.true_labels, vec![true]);
        assert_eq!(pair.pred_labels, vec![false]);
    }

    #[test]
    fn test_list_names_subset_matches() {
        let preds = vec![PredictedItem::new(
            "dropout",
            Some(PlanNames::Many(names(&["a", "b"]))),
        )];
        let pair = reconcile(&preds, &names(&["dropout"]), &names(&["a", "b", "c"]));
        assert_eq!(pair.true_labels, vec![true, false]);
        assert_eq!(pair.pred_labels, vec![true, true]);
    }

    #[test]
    fn test_empty_list_is_not_a_match() {
        let preds = vec![PredictedItem::new("dropout", Some(PlanNames::Many(vec![])))];
        let pair = reconcile(&preds, &names(&["dropout"]), &[]);
        assert_eq!(pair.pred_labels, vec![false]);
    }

    #[test]
    fn test_matching_is_case_sensitive() {
        let preds = vec![PredictedItem::new("Dropout", Some(PlanNames::from("x")))];
        let pair = reconcile(&preds, &names(&["dropout"]), &names(&["x"]));
        assert_eq!(pair.pred_labels, vec![false]);
    }

    #[test]
    fn test_empty_predictions() {
        let pair = reconcile(&[], &names(&["a", "b"]), &names(&["x", "x", "y"]));
        assert_eq!(pair.true_labels, vec![true, true, false, false]);
        assert_eq!(pair.pred_labels, vec![false, false, true, true]);
    }

    #[test]
    fn test_review_example() {
        let preds = vec![
            MissingItem::new("a", true),
            MissingItem::new("b", true),
            MissingItem::new("c", false),
        ];
        let pair = reconcile_review(&preds, 2);
        assert_eq!(pair.true_labels, vec![true, true, false]);
        assert_eq!(pair.pred_labels, vec![true, true, true]);
    }

    #[test]
    fn test_review_overlap_capped_at_ground_truth() {
        let preds = vec![
            MissingItem::new("a", true),
            MissingItem::new("b", true),
            MissingItem::new("c", true),
        ];
        let pair = reconcile_review(&preds, 1);
        assert_eq!(pair.true_labels, vec![true]);
        assert_eq!(pair.pred_labels, vec![true]);
    }

    #[test]
    fn test_review_empty_predictions() {
        let pair = reconcile_review(&[], 3);
        assert_eq!(pair.true_labels, vec![true, true, true]);
        assert_eq!(pair.pred_labels, vec![false, false, false]);
    }

    #[test]
    fn test_conservative_labels() {
        let pair = conservative_labels(2, 1);
        assert_eq!(pair.true_labels, vec![true, true, false]);
        assert_eq!(pair.pred_labels, vec![false, false, true]);
    }

    #[test]
    fn test_truncate_top_k() {
        let mut v = vec![1, 2, 3];
        truncate_top_k(&mut v, Some(0));
        assert_eq!(v.len(), 3);
        truncate_top_k(&mut v, None);
        assert_eq!(v.len(), 3);
        truncate_top_k(&mut v, Some(2));
        assert_eq!(v, vec![1, 2]);
        truncate_top_k(&mut v, Some(10));
        assert_eq!(v, vec![1, 2]);
    }
}
