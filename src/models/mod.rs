//! Binary classifiers: linfa-fitted logistic regression and native tree ensembles

pub mod boosting;
pub mod forest;
pub mod logistic;
pub mod tree;

pub use boosting::GradientBoostedTrees;
pub use forest::RandomForest;
pub use logistic::LogisticRegression;

use crate::config::TrainingConfig;
use crate::error::{PipelineError, Result};
use crate::types::prediction::label_for;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Candidate model families, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    #[serde(rename = "Logistic Regression")]
    LogisticRegression,
    #[serde(rename = "Random Forest")]
    RandomForest,
    #[serde(rename = "XGBoost")]
    Xgboost,
}

impl ModelKind {
    pub const CANDIDATES: [ModelKind; 3] = [
        ModelKind::LogisticRegression,
        ModelKind::RandomForest,
        ModelKind::Xgboost,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ModelKind::LogisticRegression => "Logistic Regression",
            ModelKind::RandomForest => "Random Forest",
            ModelKind::Xgboost => "XGBoost",
        }
    }

    /// Fit a fresh model of this kind
    pub fn fit(
        &self,
        config: &TrainingConfig,
        x: ArrayView2<f64>,
        y: &[f64],
    ) -> Result<TrainedModel> {
        check_training_data(x, y)?;
        let model = match self {
            ModelKind::LogisticRegression => TrainedModel::LogisticRegression(
                LogisticRegression::fit(&config.logistic_regression, x, y)?,
            ),
            ModelKind::RandomForest => TrainedModel::RandomForest(RandomForest::fit(
                &config.random_forest,
                config.random_state,
                x,
                y,
            )?),
            ModelKind::Xgboost => {
                TrainedModel::Xgboost(GradientBoostedTrees::fit(&config.xgboost, x, y)?)
            }
        };
        Ok(model)
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A fitted binary classifier producing positive-class probabilities
pub trait Classifier: Send + Sync {
    /// Number of input columns the model was fitted on
    fn n_features(&self) -> usize;

    /// Positive-class probability of one row
    fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64;

    /// Positive-class probability of every row
    fn predict_proba(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features() {
            return Err(PipelineError::validation(format!(
                "expected {} feature columns, got {}",
                self.n_features(),
                x.ncols()
            )));
        }
        Ok(x.rows().into_iter().map(|row| self.predict_proba_row(row)).collect())
    }

    /// Class labels at the 0.5 threshold
    fn predict(&self, x: ArrayView2<f64>) -> Result<Vec<u8>> {
        Ok(self.predict_proba(x)?.iter().map(|&p| label_for(p)).collect())
    }
}

/// The persisted serving model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "parameters")]
pub enum TrainedModel {
    #[serde(rename = "Logistic Regression")]
    LogisticRegression(LogisticRegression),
    #[serde(rename = "Random Forest")]
    RandomForest(RandomForest),
    #[serde(rename = "XGBoost")]
    Xgboost(GradientBoostedTrees),
}

impl TrainedModel {
    pub fn kind(&self) -> ModelKind {
        match self {
            TrainedModel::LogisticRegression(_) => ModelKind::LogisticRegression,
            TrainedModel::RandomForest(_) => ModelKind::RandomForest,
            TrainedModel::Xgboost(_) => ModelKind::Xgboost,
        }
    }

    /// Structural check of decoded parameters, so a damaged artifact is
    /// rejected on load rather than failing during evaluation
    pub fn validate(&self) -> std::result::Result<(), String> {
        match self {
            TrainedModel::LogisticRegression(m) => {
                if m.coefficients.is_empty() {
                    return Err("logistic regression has no coefficients".to_string());
                }
                if !m.intercept.is_finite() || m.coefficients.iter().any(|w| !w.is_finite()) {
                    return Err("logistic regression has non-finite parameters".to_string());
                }
            }
            TrainedModel::RandomForest(m) => {
                if m.trees.is_empty() {
                    return Err("random forest has no trees".to_string());
                }
                check_trees(&m.trees, m.n_features)?;
            }
            TrainedModel::Xgboost(m) => {
                if !m.base_margin.is_finite() {
                    return Err("boosted ensemble has a non-finite base margin".to_string());
                }
                check_trees(&m.trees, m.n_features)?;
            }
        }
        Ok(())
    }

    fn inner(&self) -> &dyn Classifier {
        match self {
            TrainedModel::LogisticRegression(m) => m,
            TrainedModel::RandomForest(m) => m,
            TrainedModel::Xgboost(m) => m,
        }
    }
}

impl Classifier for TrainedModel {
    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64 {
        self.inner().predict_proba_row(row)
    }
}

fn check_trees(trees: &[tree::DecisionTree], n_features: usize) -> std::result::Result<(), String> {
    if n_features == 0 {
        return Err("ensemble declares zero input features".to_string());
    }
    for (index, tree) in trees.iter().enumerate() {
        tree.validate(n_features)
            .map_err(|e| format!("tree {}: {}", index, e))?;
    }
    Ok(())
}

/// Logistic function, stable for large magnitudes
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Count of positive and negative labels; rejects anything but 0/1
pub fn class_counts(y: &[f64]) -> Result<(usize, usize)> {
    let mut positives = 0;
    for (i, &label) in y.iter().enumerate() {
        if label == 1.0 {
            positives += 1;
        } else if label != 0.0 {
            return Err(PipelineError::validation(format!(
                "label at row {} must be 0 or 1, got {}",
                i, label
            )));
        }
    }
    Ok((positives, y.len() - positives))
}

fn check_training_data(x: ArrayView2<f64>, y: &[f64]) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(PipelineError::validation(format!(
            "feature rows {} do not match label count {}",
            x.nrows(),
            y.len()
        )));
    }
    if x.ncols() == 0 {
        return Err(PipelineError::validation("training matrix has no feature columns"));
    }
    let (positives, negatives) = class_counts(y)?;
    if positives == 0 || negatives == 0 {
        return Err(PipelineError::validation(
            "training labels must contain both classes",
        ));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod fixtures {
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Two noisy clusters; the label follows the sign of `x0 + 0.5 * x1`
    pub fn separable(n: usize, seed: u64) -> (Array2<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x = Array2::zeros((n, 3));
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let a: f64 = rng.gen_range(-2.0..2.0);
            let b: f64 = rng.gen_range(-2.0..2.0);
            let noise: f64 = rng.gen_range(-1.0..1.0);
            x[[i, 0]] = a;
            x[[i, 1]] = b;
            x[[i, 2]] = noise;
            y.push(if a + 0.5 * b > 0.0 { 1.0 } else { 0.0 });
        }
        (x, y)
    }

    /// Two informative columns whose label is the XOR of their signs, plus a
    /// noise column; no linear boundary separates the classes
    pub fn xor(n: usize, seed: u64) -> (Array2<f64>, Vec<f64>) {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x = Array2::zeros((n, 3));
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let a: f64 = rng.gen_range(-1.0..1.0);
            let b: f64 = rng.gen_range(-1.0..1.0);
            x[[i, 0]] = a;
            x[[i, 1]] = b;
            x[[i, 2]] = rng.gen_range(-1.0..1.0);
            y.push(if (a > 0.0) != (b > 0.0) { 1.0 } else { 0.0 });
        }
        (x, y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(800.0) <= 1.0);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_class_counts() {
        assert_eq!(class_counts(&[0.0, 1.0, 1.0]).unwrap(), (2, 1));
        assert!(class_counts(&[0.0, 2.0]).is_err());
    }

    #[test]
    fn test_fit_rejects_single_class() {
        let (x, _) = fixtures::separable(20, 1);
        let y = vec![0.0; 20];
        let err = ModelKind::LogisticRegression
            .fit(&TrainingConfig::default(), x.view(), &y)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Validation(_)));
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in ModelKind::CANDIDATES {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.name()));
        }
    }

    #[test]
    fn test_validate_rejects_damaged_parameters() {
        use super::tree::{DecisionTree, Node};

        let dangling = TrainedModel::RandomForest(RandomForest {
            trees: vec![DecisionTree {
                nodes: vec![Node::Split {
                    feature: 0,
                    threshold: 0.5,
                    left: 7,
                    right: 8,
                }],
            }],
            n_features: 3,
        });
        assert!(dangling.validate().is_err());

        let empty_forest = TrainedModel::RandomForest(RandomForest {
            trees: vec![],
            n_features: 3,
        });
        assert!(empty_forest.validate().is_err());

        let nan = TrainedModel::LogisticRegression(LogisticRegression::from_parameters(
            vec![f64::NAN, 1.0],
            0.0,
        ));
        assert!(nan.validate().is_err());

        let (x, y) = fixtures::separable(60, 2);
        for kind in ModelKind::CANDIDATES {
            let fitted = kind.fit(&TrainingConfig::default(), x.view(), &y).unwrap();
            assert!(fitted.validate().is_ok(), "{} failed validation", kind);
        }
    }

    #[test]
    fn test_width_mismatch_is_validation_error() {
        let model = TrainedModel::LogisticRegression(LogisticRegression::from_parameters(
            vec![1.0, 2.0],
            0.0,
        ));
        let x = ndarray::Array2::<f64>::zeros((1, 3));
        assert!(matches!(
            model.predict_proba(x.view()),
            Err(PipelineError::Validation(_))
        ));
    }
}
