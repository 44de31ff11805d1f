//! L2-regularized logistic regression.
//!
//! Fitting is delegated to `linfa-logistic` (L-BFGS). The fitted weights are
//! copied into a plain struct so the serving artifact stays independent of
//! the solver's types.

use super::{sigmoid, Classifier};
use crate::config::LogisticRegressionConfig;
use crate::error::{PipelineError, Result};
use linfa::prelude::*;
use linfa::Dataset;
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coefficients: Vec<f64>,
    /// Unpenalized bias term
    pub intercept: f64,
}

impl LogisticRegression {
    pub fn from_parameters(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self {
            coefficients,
            intercept,
        }
    }

    /// Minimize the summed log-loss plus `||w||² / (2·C)`
    pub fn fit(config: &LogisticRegressionConfig, x: ArrayView2<f64>, y: &[f64]) -> Result<Self> {
        if config.c <= 0.0 || !config.c.is_finite() {
            return Err(PipelineError::validation(
                "logistic regression C must be positive",
            ));
        }

        let targets: Array1<usize> = y.iter().map(|&label| usize::from(label == 1.0)).collect();
        let dataset = Dataset::new(x.to_owned(), targets);

        let fitted = linfa_logistic::LogisticRegression::default()
            .alpha(1.0 / config.c)
            .gradient_tolerance(config.tol)
            .max_iterations(config.max_iter as u64)
            .with_intercept(true)
            .fit(&dataset)
            .map_err(|e| PipelineError::numeric("logistic regression", e.to_string()))?;

        // linfa picks its own positive label; orient the weights towards class 1
        let probabilities = fitted.predict_probabilities(dataset.records());
        let labels: Array1<usize> = fitted.predict(dataset.records());
        let towards_one = probabilities
            .iter()
            .zip(labels.iter())
            .find(|(p, _)| **p != 0.5)
            .map_or(true, |(p, &label)| (*p > 0.5) == (label == 1));
        let sign = if towards_one { 1.0 } else { -1.0 };

        let coefficients: Vec<f64> = fitted.params().iter().map(|w| sign * w).collect();
        let intercept = sign * fitted.intercept();
        if !intercept.is_finite() || coefficients.iter().any(|w| !w.is_finite()) {
            return Err(PipelineError::numeric(
                "logistic regression",
                "solver produced non-finite weights",
            ));
        }

        debug!(
            alpha = 1.0 / config.c,
            n_features = coefficients.len(),
            "Logistic regression fitted"
        );

        Ok(Self {
            coefficients,
            intercept,
        })
    }
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba_row(&self, row: ArrayView1<f64>) -> f64 {
        let z = row
            .iter()
            .zip(&self.coefficients)
            .map(|(x, w)| x * w)
            .sum::<f64>()
            + self.intercept;
        sigmoid(z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::roc_auc;
    use crate::models::fixtures::separable;

    #[test]
    fn test_fit_separates_clusters() {
        let (x, y) = separable(200, 7);
        let model = LogisticRegression::fit(&LogisticRegressionConfig::default(), x.view(), &y)
            .unwrap();

        assert!(model.coefficients[0] > 0.0);
        assert!(model.coefficients[1] > 0.0);
        assert!(model.coefficients[0] > model.coefficients[1]);
        assert!(model.coefficients[2].abs() < model.coefficients[1]);

        let proba = model.predict_proba(x.view()).unwrap();
        assert!(roc_auc(&y, proba.as_slice().unwrap()).unwrap() > 0.97);
    }

    #[test]
    fn test_orientation_follows_class_one() {
        // flipping the labels flips the sign of the learned weights
        let (x, y) = separable(120, 5);
        let flipped: Vec<f64> = y.iter().map(|l| 1.0 - l).collect();
        let config = LogisticRegressionConfig::default();

        let model = LogisticRegression::fit(&config, x.view(), &y).unwrap();
        let reversed = LogisticRegression::fit(&config, x.view(), &flipped).unwrap();

        assert!(model.coefficients[0] > 0.0);
        assert!(reversed.coefficients[0] < 0.0);
        let proba = reversed.predict_proba(x.view()).unwrap();
        assert!(roc_auc(&flipped, proba.as_slice().unwrap()).unwrap() > 0.97);
    }

    #[test]
    fn test_fixed_parameters() {
        let model = LogisticRegression::from_parameters(vec![0.0, 0.0], 0.0);
        let x = ndarray::array![[3.0, -1.0]];
        assert_eq!(model.predict_proba(x.view()).unwrap()[0], 0.5);
    }

    #[test]
    fn test_regularization_shrinks_weights() {
        let (x, y) = separable(150, 3);
        let loose = LogisticRegression::fit(&LogisticRegressionConfig::default(), x.view(), &y)
            .unwrap();
        let tight = LogisticRegression::fit(
            &LogisticRegressionConfig {
                c: 0.01,
                ..LogisticRegressionConfig::default()
            },
            x.view(),
            &y,
        )
        .unwrap();

        let norm = |m: &LogisticRegression| m.coefficients.iter().map(|w| w * w).sum::<f64>();
        assert!(norm(&tight) < norm(&loose));
    }

    #[test]
    fn test_rejects_non_positive_c() {
        let (x, y) = separable(20, 1);
        let config = LogisticRegressionConfig {
            c: 0.0,
            ..LogisticRegressionConfig::default()
        };
        assert!(matches!(
            LogisticRegression::fit(&config, x.view(), &y),
            Err(PipelineError::Validation(_))
        ));
    }
}
