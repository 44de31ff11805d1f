//! Single-record inference over persisted artifacts

use crate::artifacts::load_object;
use crate::config::ArtifactsConfig;
use crate::error::{PipelineError, Result};
use crate::models::{Classifier, TrainedModel};
use crate::preprocessor::Preprocessor;
use crate::types::prediction::PredictionResult;
use crate::types::record::RawRecord;
use tracing::{debug, info};

/// Loaded preprocessor and model, ready to score records.
///
/// Holds only immutable state and can be shared across threads.
#[derive(Debug, Clone)]
pub struct PredictionPipeline {
    preprocessor: Preprocessor,
    model: TrainedModel,
}

impl PredictionPipeline {
    /// Load both artifacts from the configured directory
    pub fn load(artifacts: &ArtifactsConfig) -> Result<Self> {
        let preprocessor: Preprocessor = load_object(artifacts.preprocessor_path())?;
        let model: TrainedModel = load_object(artifacts.model_path())?;
        let pipeline = Self::from_parts(preprocessor, model)?;

        info!(
            model = %pipeline.model.kind(),
            statistics = ?pipeline.preprocessor.engineer().mode(),
            features = pipeline.model.n_features(),
            "Prediction pipeline loaded"
        );
        Ok(pipeline)
    }

    /// Combine an already fitted preprocessor and model
    pub fn from_parts(preprocessor: Preprocessor, model: TrainedModel) -> Result<Self> {
        if preprocessor.output_width() != model.n_features() {
            return Err(PipelineError::validation(format!(
                "preprocessor emits {} columns but the model expects {}",
                preprocessor.output_width(),
                model.n_features()
            )));
        }
        Ok(Self {
            preprocessor,
            model,
        })
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &TrainedModel {
        &self.model
    }

    /// Score one record as a batch of one
    pub fn predict(&self, record: &RawRecord) -> Result<PredictionResult> {
        let mut results = self.predict_batch(std::slice::from_ref(record))?;
        results
            .pop()
            .ok_or_else(|| PipelineError::validation("no prediction produced"))
    }

    /// Score several records as one batch
    pub fn predict_batch(&self, records: &[RawRecord]) -> Result<Vec<PredictionResult>> {
        let features = self.preprocessor.transform_raw(records)?;
        let probabilities = self.model.predict_proba(features.view())?;

        let results: Vec<PredictionResult> = probabilities
            .iter()
            .map(|&p| PredictionResult::from_probability(p))
            .collect();

        debug!(
            rows = results.len(),
            positives = results.iter().filter(|r| r.prediction == 1).count(),
            "Batch scored"
        );
        Ok(results)
    }
}
