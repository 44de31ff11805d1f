//! Classification metrics used to compare candidate models.

use crate::error::{PipelineError, Result};
use crate::types::prediction::label_for;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scores of one model on a held-out split
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelScores {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub roc_auc: f64,
}

impl ModelScores {
    /// Score positive-class probabilities against 0/1 labels
    pub fn evaluate(y_true: &[f64], probabilities: &[f64]) -> Result<Self> {
        if y_true.len() != probabilities.len() {
            return Err(PipelineError::validation(format!(
                "label count {} does not match prediction count {}",
                y_true.len(),
                probabilities.len()
            )));
        }

        let y_pred: Vec<f64> = probabilities
            .iter()
            .map(|&p| f64::from(label_for(p)))
            .collect();
        let counts = ConfusionCounts::from_labels(y_true, &y_pred);

        Ok(Self {
            accuracy: counts.accuracy(),
            precision: counts.precision(),
            recall: counts.recall(),
            f1: counts.f1(),
            roc_auc: roc_auc(y_true, probabilities)?,
        })
    }
}

impl fmt::Display for ModelScores {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "accuracy={:.4} precision={:.4} recall={:.4} f1={:.4} roc_auc={:.4}",
            self.accuracy, self.precision, self.recall, self.f1, self.roc_auc
        )
    }
}

/// Binary confusion matrix
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    pub true_positive: u64,
    pub false_positive: u64,
    pub true_negative: u64,
    pub false_negative: u64,
}

impl ConfusionCounts {
    pub fn from_labels(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mut counts = Self::default();
        for (&truth, &pred) in y_true.iter().zip(y_pred) {
            match (truth > 0.5, pred > 0.5) {
                (true, true) => counts.true_positive += 1,
                (false, true) => counts.false_positive += 1,
                (false, false) => counts.true_negative += 1,
                (true, false) => counts.false_negative += 1,
            }
        }
        counts
    }

    fn total(&self) -> u64 {
        self.true_positive + self.false_positive + self.true_negative + self.false_negative
    }

    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positive + self.true_negative, self.total())
    }

    /// Zero when nothing was predicted positive
    pub fn precision(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_positive)
    }

    /// Zero when there are no positive labels
    pub fn recall(&self) -> f64 {
        ratio(self.true_positive, self.true_positive + self.false_negative)
    }

    pub fn f1(&self) -> f64 {
        ratio(
            2 * self.true_positive,
            2 * self.true_positive + self.false_positive + self.false_negative,
        )
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Area under the ROC curve via the rank-sum statistic.
///
/// Tied scores receive their average rank. Fails when `y_true` holds a
/// single class, since the curve is undefined.
pub fn roc_auc(y_true: &[f64], scores: &[f64]) -> Result<f64> {
    let positives = y_true.iter().filter(|&&y| y > 0.5).count();
    let negatives = y_true.len() - positives;
    if positives == 0 || negatives == 0 {
        return Err(PipelineError::numeric(
            "roc_auc",
            "only one class present in y_true",
        ));
    }

    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[a].total_cmp(&scores[b]));

    let mut positive_rank_sum = 0.0;
    let mut start = 0;
    while start < order.len() {
        let mut end = start;
        while end + 1 < order.len() && scores[order[end + 1]] == scores[order[start]] {
            end += 1;
        }
        // ranks are 1-based
        let average_rank = (start + end) as f64 / 2.0 + 1.0;
        for &index in &order[start..=end] {
            if y_true[index] > 0.5 {
                positive_rank_sum += average_rank;
            }
        }
        start = end + 1;
    }

    let p = positives as f64;
    let n = negatives as f64;
    Ok((positive_rank_sum - p * (p + 1.0) / 2.0) / (p * n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roc_auc_perfect_and_inverted() {
        let y = [0.0, 0.0, 1.0, 1.0];
        assert_eq!(roc_auc(&y, &[0.1, 0.2, 0.8, 0.9]).unwrap(), 1.0);
        assert_eq!(roc_auc(&y, &[0.9, 0.8, 0.2, 0.1]).unwrap(), 0.0);
    }

    #[test]
    fn test_roc_auc_known_value() {
        // Classic example: 0.75
        let y = [0.0, 0.0, 1.0, 1.0];
        let scores = [0.1, 0.4, 0.35, 0.8];
        assert!((roc_auc(&y, &scores).unwrap() - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_ties_use_average_rank() {
        let y = [0.0, 1.0, 0.0, 1.0];
        let scores = [0.5, 0.5, 0.5, 0.5];
        assert!((roc_auc(&y, &scores).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_roc_auc_single_class() {
        let err = roc_auc(&[1.0, 1.0], &[0.2, 0.9]).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Numeric);
    }

    #[test]
    fn test_confusion_metrics() {
        let y_true = [1.0, 1.0, 0.0, 0.0, 1.0];
        let y_pred = [1.0, 0.0, 1.0, 0.0, 1.0];
        let counts = ConfusionCounts::from_labels(&y_true, &y_pred);

        assert_eq!(counts.true_positive, 2);
        assert_eq!(counts.false_negative, 1);
        assert_eq!(counts.false_positive, 1);
        assert_eq!(counts.true_negative, 1);
        assert!((counts.accuracy() - 0.6).abs() < 1e-12);
        assert!((counts.precision() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.recall() - 2.0 / 3.0).abs() < 1e-12);
        assert!((counts.f1() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_f1_without_positive_predictions() {
        let counts = ConfusionCounts::from_labels(&[1.0, 0.0], &[0.0, 0.0]);
        assert_eq!(counts.precision(), 0.0);
        assert_eq!(counts.f1(), 0.0);
    }

    #[test]
    fn test_evaluate() {
        let y = [0.0, 0.0, 1.0, 1.0];
        let scores = ModelScores::evaluate(&y, &[0.1, 0.6, 0.7, 0.9]).unwrap();
        assert_eq!(scores.accuracy, 0.75);
        assert_eq!(scores.recall, 1.0);
        assert_eq!(scores.roc_auc, 1.0);

        assert!(ModelScores::evaluate(&y, &[0.1]).is_err());
    }
}
