//! Candidate model evaluation, selection by ROC-AUC, and persistence of the winner

use crate::artifacts::save_object;
use crate::config::{ArtifactsConfig, TrainingConfig};
use crate::error::{PipelineError, Result};
use crate::metrics::ModelScores;
use crate::models::{Classifier, ModelKind, TrainedModel};
use ndarray::{s, Array2, ArrayView2};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Held-out scores of every candidate, in evaluation order
pub type ModelReport = Vec<(ModelKind, ModelScores)>;

/// Result of a training run
#[derive(Debug, Clone, Serialize)]
pub struct TrainingOutcome {
    pub best_model: ModelKind,
    pub report: ModelReport,
    pub model_path: PathBuf,
}

impl TrainingOutcome {
    pub fn best_scores(&self) -> Option<&ModelScores> {
        self.report
            .iter()
            .find(|(kind, _)| *kind == self.best_model)
            .map(|(_, scores)| scores)
    }
}

pub struct ModelTrainer<'a> {
    config: &'a TrainingConfig,
    artifacts: &'a ArtifactsConfig,
}

impl<'a> ModelTrainer<'a> {
    pub fn new(config: &'a TrainingConfig, artifacts: &'a ArtifactsConfig) -> Self {
        Self { config, artifacts }
    }

    /// Fit and score every candidate, refit the best one and persist it.
    ///
    /// Both matrices carry the 0/1 label as their last column.
    pub fn run(&self, train: &Array2<f64>, test: &Array2<f64>) -> Result<TrainingOutcome> {
        let (x_train, y_train) = split_label(train)?;
        let (x_test, y_test) = split_label(test)?;
        if x_train.ncols() != x_test.ncols() {
            return Err(PipelineError::validation(format!(
                "train has {} feature columns but test has {}",
                x_train.ncols(),
                x_test.ncols()
            )));
        }

        let report = self.evaluate_models(x_train, &y_train, x_test, &y_test)?;
        let best_model = select_best(&report).ok_or_else(|| {
            PipelineError::validation("no candidate models were evaluated")
        })?;

        let model = best_model.fit(self.config, x_train, &y_train)?;
        let model_path = self.artifacts.model_path();
        save_object(&model_path, &model)?;

        let outcome = TrainingOutcome {
            best_model,
            report,
            model_path,
        };
        info!(
            best_model = %best_model,
            roc_auc = outcome.best_scores().map_or(f64::NAN, |s| s.roc_auc),
            path = %outcome.model_path.display(),
            "Best model saved"
        );

        Ok(outcome)
    }

    /// Fit each candidate on train and score it on test
    pub fn evaluate_models(
        &self,
        x_train: ArrayView2<f64>,
        y_train: &[f64],
        x_test: ArrayView2<f64>,
        y_test: &[f64],
    ) -> Result<ModelReport> {
        let mut report = Vec::with_capacity(ModelKind::CANDIDATES.len());

        for kind in ModelKind::CANDIDATES {
            info!(model = %kind, "Training candidate");
            let model: TrainedModel = kind.fit(self.config, x_train, y_train)?;
            let probabilities = model.predict_proba(x_test)?.to_vec();
            let scores = ModelScores::evaluate(y_test, &probabilities)?;

            info!(model = %kind, %scores, "Candidate evaluated");
            report.push((kind, scores));
        }

        Ok(report)
    }
}

/// Highest ROC-AUC; the earliest candidate wins exact ties
pub fn select_best(report: &[(ModelKind, ModelScores)]) -> Option<ModelKind> {
    let mut best: Option<(ModelKind, f64)> = None;
    for (kind, scores) in report {
        if scores.roc_auc.is_nan() {
            warn!(model = %kind, "ROC-AUC is NaN, skipping candidate");
            continue;
        }
        if best.map_or(true, |(_, auc)| scores.roc_auc > auc) {
            best = Some((*kind, scores.roc_auc));
        }
    }
    best.map(|(kind, _)| kind)
}

/// Split a labelled matrix into features and its last (label) column
pub fn split_label(matrix: &Array2<f64>) -> Result<(ArrayView2<'_, f64>, Vec<f64>)> {
    let width = matrix.ncols();
    if width < 2 {
        return Err(PipelineError::validation(
            "labelled matrix needs at least one feature column and a label column",
        ));
    }
    let features = matrix.slice(s![.., ..width - 1]);
    let labels = matrix.column(width - 1).to_vec();
    Ok((features, labels))
}
