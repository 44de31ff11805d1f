//! Binary decision trees shared by the forest and the boosted ensemble.
//!
//! Trees are stored as a flat node arena with the root at index 0; children
//! always sit after their parent. Split search is exact: every midpoint
//! between distinct neighbouring values of a candidate feature is scored by
//! a [`SplitCriterion`]. Columns constant within a node are skipped and
//! two-valued columns (one-hot indicators) are scored without sorting.

use ndarray::{ArrayView1, ArrayView2};
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

/// Per-node accumulated statistics, interpreted by the criterion
pub type NodeStats = [f64; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<Node>,
}

impl DecisionTree {
    /// Leaf value reached by `row`; `<= threshold` goes left
    pub fn evaluate(&self, row: ArrayView1<f64>) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Check the arena shape before the tree is evaluated: a root exists,
    /// every split references an in-range feature and two later nodes, and
    /// leaf values are finite.
    pub fn validate(&self, n_features: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("tree has no nodes".to_string());
        }
        let len = self.nodes.len();
        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(format!("leaf {} has non-finite value", index));
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        return Err(format!(
                            "split {} uses feature {} of {}",
                            index, feature, n_features
                        ));
                    }
                    if threshold.is_nan() {
                        return Err(format!("split {} has a NaN threshold", index));
                    }
                    for child in [*left, *right] {
                        if child <= index || child >= len {
                            return Err(format!(
                                "split {} points to node {} in a tree of {}",
                                index, child, len
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }
}

/// Scores candidate splits and turns node statistics into leaf values
pub trait SplitCriterion {
    /// Contribution of one training row to its node's statistics
    fn sample_stats(&self, row: usize) -> NodeStats;

    /// Whether a node is worth splitting at all
    fn can_split(&self, stats: NodeStats, n_samples: usize) -> bool;

    /// Gain of a split, or `None` when the split is not admissible
    fn split_gain(&self, parent: NodeStats, left: NodeStats, right: NodeStats) -> Option<f64>;

    fn leaf_value(&self, stats: NodeStats) -> f64;
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Grows one tree over a feature matrix
pub struct TreeBuilder<'x, 'c, C: SplitCriterion> {
    pub x: ArrayView2<'x, f64>,
    pub criterion: &'c C,
    /// Unlimited when `None`
    pub max_depth: Option<usize>,
    /// Features drawn per node; all features when `None`
    pub max_features: Option<usize>,
}

impl<'x, 'c, C: SplitCriterion> TreeBuilder<'x, 'c, C> {
    /// Grow a tree on the given training rows.
    ///
    /// `rng` is only consulted when `max_features` limits the candidates.
    pub fn build(&self, samples: Vec<usize>, mut rng: Option<&mut StdRng>) -> DecisionTree {
        let mut nodes = vec![Node::Leaf { value: 0.0 }];
        let mut pending = vec![(0usize, samples, 0usize)];

        while let Some((node_id, samples, depth)) = pending.pop() {
            let stats = self.accumulate(&samples);
            let depth_allows = self.max_depth.map_or(true, |max| depth < max);

            let split = if depth_allows && self.criterion.can_split(stats, samples.len()) {
                self.best_split(&samples, stats, rng.as_deref_mut())
            } else {
                None
            };

            match split {
                Some(split) => {
                    let (left, right): (Vec<usize>, Vec<usize>) = samples
                        .iter()
                        .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);

                    let left_id = nodes.len();
                    let right_id = left_id + 1;
                    nodes.push(Node::Leaf { value: 0.0 });
                    nodes.push(Node::Leaf { value: 0.0 });
                    nodes[node_id] = Node::Split {
                        feature: split.feature,
                        threshold: split.threshold,
                        left: left_id,
                        right: right_id,
                    };

                    pending.push((right_id, right, depth + 1));
                    pending.push((left_id, left, depth + 1));
                }
                None => {
                    nodes[node_id] = Node::Leaf {
                        value: self.criterion.leaf_value(stats),
                    };
                }
            }
        }

        DecisionTree { nodes }
    }

    fn accumulate(&self, samples: &[usize]) -> NodeStats {
        samples.iter().fold([0.0, 0.0], |acc, &i| {
            let s = self.criterion.sample_stats(i);
            [acc[0] + s[0], acc[1] + s[1]]
        })
    }

    fn candidate_features(&self, rng: Option<&mut StdRng>) -> Vec<usize> {
        let n_features = self.x.ncols();
        match (self.max_features, rng) {
            (Some(k), Some(rng)) if k < n_features => {
                rand::seq::index::sample(rng, n_features, k).into_vec()
            }
            _ => (0..n_features).collect(),
        }
    }

    fn best_split(
        &self,
        samples: &[usize],
        parent: NodeStats,
        rng: Option<&mut StdRng>,
    ) -> Option<Split> {
        if samples.len() < 2 {
            return None;
        }
        let mut best: Option<Split> = None;
        let mut sorted: Vec<(f64, usize)> = Vec::with_capacity(samples.len());

        for feature in self.candidate_features(rng) {
            let column = self.x.column(feature);
            match distinct_values(column, samples) {
                Distinct::One => continue,
                Distinct::Two { low, high } => {
                    let left = samples
                        .iter()
                        .filter(|&&i| column[i] == low)
                        .fold([0.0, 0.0], |acc, &i| {
                            let s = self.criterion.sample_stats(i);
                            [acc[0] + s[0], acc[1] + s[1]]
                        });
                    self.consider(&mut best, feature, parent, left, low, high);
                }
                Distinct::Many => {
                    sorted.clear();
                    sorted.extend(samples.iter().map(|&i| (column[i], i)));
                    sorted.sort_unstable_by(|a, b| a.0.total_cmp(&b.0));

                    let mut left = [0.0, 0.0];
                    for k in 0..sorted.len() - 1 {
                        let s = self.criterion.sample_stats(sorted[k].1);
                        left = [left[0] + s[0], left[1] + s[1]];

                        let current = sorted[k].0;
                        let next = sorted[k + 1].0;
                        if current != next {
                            self.consider(&mut best, feature, parent, left, current, next);
                        }
                    }
                }
            }
        }

        best
    }

    /// Score the split between `current` and `next` and keep it if it beats `best`
    fn consider(
        &self,
        best: &mut Option<Split>,
        feature: usize,
        parent: NodeStats,
        left: NodeStats,
        current: f64,
        next: f64,
    ) {
        let right = [parent[0] - left[0], parent[1] - left[1]];
        let Some(gain) = self.criterion.split_gain(parent, left, right) else {
            return;
        };

        if best.map_or(true, |b| gain > b.gain) {
            let mut threshold = current + (next - current) / 2.0;
            if threshold >= next {
                threshold = current;
            }
            *best = Some(Split {
                feature,
                threshold,
                gain,
            });
        }
    }
}

enum Distinct {
    One,
    Two { low: f64, high: f64 },
    Many,
}

/// How many distinct values `column` takes over `samples`, stopping at three
fn distinct_values(column: ArrayView1<f64>, samples: &[usize]) -> Distinct {
    let first = column[samples[0]];
    let mut second: Option<f64> = None;
    for &i in &samples[1..] {
        let value = column[i];
        if value == first {
            continue;
        }
        match second {
            None => second = Some(value),
            Some(other) if other == value => {}
            Some(_) => return Distinct::Many,
        }
    }
    match second {
        None => Distinct::One,
        Some(other) => Distinct::Two {
            low: first.min(other),
            high: first.max(other),
        },
    }
}
