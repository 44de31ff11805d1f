//! Random forest of Gini trees with bootstrap sampling

use super::tree::{DecisionTree, NodeStats, SplitCriterion, TreeBuilder};
use super::{class_counts, Classifier};
use crate::config::RandomForestConfig;
use crate::error::{PipelineError, Result};
use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub trees: Vec<DecisionTree>,
    pub n_features: usize,
}

/// Weighted Gini impurity; stats are `[negative weight, positive weight]`
struct GiniCriterion<'a> {
    y: &'a [f64],
    weights: Vec<f64>,
    min_samples_split: usize,
}

fn gini(stats: NodeStats) -> f64 {
    let total = stats[0] + stats[1];
    if total <= 0.0 {
        return 0.0;
    }
    let p0 = stats[0] / total;
    let p1 = stats[1] / total;
    1.0 - p0 * p0 - p1 * p1
}

impl SplitCriterion for GiniCriterion<'_> {
    fn sample_stats(&self, row: usize) -> NodeStats {
        let w = self.weights[row];
        if self.y[row] > 0.5 {
            [0.0, w]
        } else {
            [w, 0.0]
        }
    }

    fn can_split(&self, stats: NodeStats, n_samples: usize) -> bool {
        n_samples >= self.min_samples_split && stats[0] > 0.0 && stats[1] > 0.0
    }

    fn split_gain(&self, parent: NodeStats, left: NodeStats, right: NodeStats) -> Option<f64> {
        let w_left = left[0] + left[1];
        let w_right = right[0] + right[1];
        if w_left <= 0.0 || w_right <= 0.0 {
            return None;
        }
        let w_parent = parent[0] + parent[1];
        let gain = w_parent * gini(parent) - w_left * gini(left) - w_right * gini(right);
        (gain > 1e-12).then_some(gain)
    }

    fn leaf_value(&self, stats: NodeStats) -> f64 {
        let total = stats[0] + stats[1];
        if total > 0.0 {
            stats[1] / total
        } else {
            0.0
        }
    }
}

impl RandomForest {
    pub fn fit(
        config: &RandomForestConfig,
        seed: u64,
        x: ArrayView2<f64>,
        y: &[f64],
    ) -> Result<Self> {
        if config.n_estimators == 0 {
            return Err(PipelineError::validation(
                "random forest needs at least one tree",
            ));
        }

        let n = x.nrows();
        let n_features = x.ncols();
        let (positives, negatives) = class_counts(y)?;

        // weight = n / (2 * class count), from the full training labels
        let class_weight = if config.class_balanced {
            [
                n as f64 / (2.0 * negatives as f64),
                n as f64 / (2.0 * positives as f64),
            ]
        } else {
            [1.0, 1.0]
        };

        let max_features = ((n_features as f64).sqrt() as usize).max(1);
        let mut rng = StdRng::seed_from_u64(seed);
        let mut trees = Vec::with_capacity(config.n_estimators);

        for _ in 0..config.n_estimators {
            let mut counts = vec![0u32; n];
            for _ in 0..n {
                counts[rng.gen_range(0..n)] += 1;
            }

            let samples: Vec<usize> = (0..n).filter(|&i| counts[i] > 0).collect();
            let weights = counts
                .iter()
                .zip(y)
                .map(|(&c, &label)| f64::from(c) * class_weight[usize::from(label > 0.5)])
                .collect();

            let criterion = GiniCriterion {
                y,
                weights,
                min_samples_split: config.min_samples_split.max(2),
            };
            let builder = TreeBuilder {
                x,
                criterion: &criterion,
                max_depth: config.max_depth,
                max_features: Some(max_features),
            };
            trees.push(builder.build(samples, Some(&mut rng)));
        }

        debug!(
            trees = trees.len(),
            max_features,
            class_weight = ?class_weight,
            "Random forest fitted"
        );

        Ok(Self { trees, n_features })
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.evaluate(row)).sum();
        total / self.trees.len() as f64
    }
}
