//! Gradient-boosted trees on the logistic loss (XGBoost-style second-order splits)

use super::tree::{DecisionTree, NodeStats, SplitCriterion, TreeBuilder};
use super::{class_counts, sigmoid, Classifier};
use crate::config::XgboostConfig;
use crate::error::{PipelineError, Result};
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Smallest hessian kept per row, so fully confident rows still count
const MIN_HESSIAN: f64 = 1e-16;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    pub trees: Vec<DecisionTree>,
    /// Margin before any tree contributes (logit of 0.5)
    pub base_margin: f64,
    /// Weight applied to positive rows during fitting
    pub scale_pos_weight: f64,
    pub n_features: usize,
}

/// Newton split gain; stats are `[gradient sum, hessian sum]`
struct NewtonCriterion {
    gradients: Vec<f64>,
    hessians: Vec<f64>,
    reg_lambda: f64,
    min_child_weight: f64,
    learning_rate: f64,
}

impl NewtonCriterion {
    fn score(&self, stats: NodeStats) -> f64 {
        stats[0] * stats[0] / (stats[1] + self.reg_lambda)
    }
}

impl SplitCriterion for NewtonCriterion {
    fn sample_stats(&self, row: usize) -> NodeStats {
        [self.gradients[row], self.hessians[row]]
    }

    fn can_split(&self, stats: NodeStats, n_samples: usize) -> bool {
        n_samples >= 2 && stats[1] >= 2.0 * self.min_child_weight
    }

    fn split_gain(&self, parent: NodeStats, left: NodeStats, right: NodeStats) -> Option<f64> {
        if left[1] < self.min_child_weight || right[1] < self.min_child_weight {
            return None;
        }
        let gain = 0.5 * (self.score(left) + self.score(right) - self.score(parent));
        (gain > 1e-12).then_some(gain)
    }

    fn leaf_value(&self, stats: NodeStats) -> f64 {
        -stats[0] / (stats[1] + self.reg_lambda) * self.learning_rate
    }
}

impl GradientBoostedTrees {
    pub fn fit(config: &XgboostConfig, x: ArrayView2<f64>, y: &[f64]) -> Result<Self> {
        let (positives, negatives) = class_counts(y)?;
        if positives == 0 {
            return Err(PipelineError::numeric(
                "scale_pos_weight",
                "training labels contain no positive rows",
            ));
        }
        let scale_pos_weight = negatives as f64 / positives as f64;

        let n = x.nrows();
        let base_margin = 0.0;
        let mut margins = vec![base_margin; n];
        let mut trees = Vec::with_capacity(config.n_estimators);

        for _ in 0..config.n_estimators {
            let mut gradients = Vec::with_capacity(n);
            let mut hessians = Vec::with_capacity(n);
            for (&margin, &label) in margins.iter().zip(y) {
                let p = sigmoid(margin);
                let weight = if label > 0.5 { scale_pos_weight } else { 1.0 };
                gradients.push((p - label) * weight);
                hessians.push((p * (1.0 - p)).max(MIN_HESSIAN) * weight);
            }

            let criterion = NewtonCriterion {
                gradients,
                hessians,
                reg_lambda: config.reg_lambda,
                min_child_weight: config.min_child_weight,
                learning_rate: config.learning_rate,
            };
            let builder = TreeBuilder {
                x,
                criterion: &criterion,
                max_depth: Some(config.max_depth),
                max_features: None,
            };
            let tree = builder.build((0..n).collect(), None);

            for (i, margin) in margins.iter_mut().enumerate() {
                *margin += tree.evaluate(x.row(i));
            }
            trees.push(tree);
        }

        debug!(
            trees = trees.len(),
            scale_pos_weight,
            "Gradient-boosted trees fitted"
        );

        Ok(Self {
            trees,
            base_margin,
            scale_pos_weight,
            n_features: x.ncols(),
        })
    }

    /// Raw additive score before the logistic link
    pub fn margin(&self, row: ArrayView1<f64>) -> f64 {
        self.base_margin + self.trees.iter().map(|t| t.evaluate(row)).sum::<f64>()
    }
}

impl Classifier for GradientBoostedTrees {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64 {
        sigmoid(self.margin(row))
    }
}
