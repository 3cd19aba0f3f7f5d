//! Ranking metrics over boolean label sequences.
//!
//! All metrics return 0.0 instead of being undefined when a denominator is zero.

use crate::reconcile::LabelPair;
use serde::{Deserialize, Serialize};

fn confusion(true_labels: &[bool], pred_labels: &[bool]) -> (usize, usize, usize) {
    let mut tp = 0;
    let mut fp = 0;
    let mut fn_ = 0;
    for (&t, &p) in true_labels.iter().zip(pred_labels) {
        match (t, p) {
            (true, true) => tp += 1,
            (false, true) => fp += 1,
            (true, false) => fn_ += 1,
            (false, false) => {}
        }
    }
    (tp, fp, fn_)
}

pub fn precision(true_labels: &[bool], pred_labels: &[bool]) -> f64 {
    let (tp, fp, _) = confusion(true_labels, pred_labels);
    if tp + fp == 0 {
        0.0
    } else {
        tp as f64 / (tp + fp) as f64
    }
}

pub fn recall(true_labels: &[bool], pred_labels: &[bool]) -> f64 {
    let (tp, _, fn_) = confusion(true_labels, pred_labels);
    if tp + fn_ == 0 {
        0.0
    } else {
        tp as f64 / (tp + fn_) as f64
    }
}

pub fn f1(true_labels: &[bool], pred_labels: &[bool]) -> f64 {
    let p = precision(true_labels, pred_labels);
    let r = recall(true_labels, pred_labels);
    if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) }
}

fn dcg(labels: &[bool]) -> f64 {
    labels
        .iter()
        .enumerate()
        .filter(|(_, l)| **l)
        .map(|(i, _)| 1.0 / ((i + 2) as f64).log2())
        .sum()
}

/// Normalized discounted cumulative gain over the first `k` positions.
///
/// Position order is taken as given; callers must not reorder labels beforehand.
pub fn ndcg(true_labels: &[bool], pred_labels: &[bool], k: usize) -> f64 {
    let t = &true_labels[..k.min(true_labels.len())];
    let p = &pred_labels[..k.min(pred_labels.len())];
    let idcg = dcg(t);
    if idcg == 0.0 { 0.0 } else { dcg(p) / idcg }
}

/// Per-task scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ndcg_score: Option<f64>,
}

/// Score a label pair; NDCG is computed only when a cutoff is given.
pub fn score(labels: &LabelPair, ndcg_k: Option<usize>) -> Scores {
    Scores {
        precision: precision(&labels.true_labels, &labels.pred_labels),
        recall: recall(&labels.true_labels, &labels.pred_labels),
        f1_score: f1(&labels.true_labels, &labels.pred_labels),
        ndcg_score: ndcg_k.map(|k| ndcg(&labels.true_labels, &labels.pred_labels, k)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_dropout_batchnorm_scores() {
        let t = [true, true, false];
        let p = [true, false, true];
        assert!(approx(precision(&t, &p), 0.5));
        assert!(approx(recall(&t, &p), 0.5));
        assert!(approx(f1(&t, &p), 0.5));
    }

    #[test]
    fn test_review_scores() {
        let t = [true, true, false];
        let p = [true, true, true];
        assert!(approx(precision(&t, &p), 2.0 / 3.0));
        assert!(approx(recall(&t, &p), 1.0));
        assert!(approx(f1(&t, &p), 0.8));
    }

    #[test]
    fn test_zero_division() {
        assert_eq!(precision(&[true, true], &[false, false]), 0.0);
        assert_eq!(recall(&[false], &[true]), 0.0);
        assert_eq!(f1(&[false], &[false]), 0.0);
        assert_eq!(precision(&[], &[]), 0.0);
    }

    #[test]
    fn test_ndcg() {
        assert!(approx(ndcg(&[true, true], &[true, true], 2), 1.0));
        assert_eq!(ndcg(&[false, false], &[true, true], 2), 0.0);
        // Only the first position counts at k=1
        assert!(approx(ndcg(&[true, false], &[true, false], 1), 1.0));
        assert_eq!(ndcg(&[true, true], &[false, true], 1), 0.0);
        let expected = (1.0 / 3f64.log2()) / (1.0 + 1.0 / 3f64.log2());
        assert!(approx(ndcg(&[true, true], &[false, true], 2), expected));
        assert_eq!(ndcg(&[true], &[true], 0), 0.0);
    }

    #[test]
    fn test_score_with_and_without_ndcg() {
        let pair = LabelPair::new(vec![true, true, false], vec![true, false, true]);
        let s = score(&pair, Some(2));
        assert!(approx(s.f1_score, 0.5));
        assert!(s.ndcg_score.is_some());
        assert!(score(&pair, None).ndcg_score.is_none());
    }
}
