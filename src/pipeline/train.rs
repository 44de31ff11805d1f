//! Full training run: ingestion, transformation and model selection

use crate::config::AppConfig;
use crate::error::Result;
use crate::ingestion::DataIngestion;
use crate::trainer::{ModelTrainer, TrainingOutcome};
use crate::transformation::DataTransformation;
use std::time::Instant;
use tracing::{info, info_span};

pub struct TrainingPipeline<'a> {
    config: &'a AppConfig,
}

impl<'a> TrainingPipeline<'a> {
    pub fn new(config: &'a AppConfig) -> Self {
        Self { config }
    }

    pub fn run(&self) -> Result<TrainingOutcome> {
        let started = Instant::now();
        let config = self.config;

        let split = {
            let _span = info_span!("ingestion").entered();
            DataIngestion::new(&config.ingestion, &config.artifacts).run()?
        };

        let transformed = {
            let _span = info_span!("transformation").entered();
            DataTransformation::new(config.features.statistics, &config.artifacts)
                .run(&split.train_path, &split.test_path)?
        };

        let outcome = {
            let _span = info_span!("model_training").entered();
            ModelTrainer::new(&config.training, &config.artifacts)
                .run(&transformed.train, &transformed.test)?
        };

        info!(
            best_model = %outcome.best_model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Training pipeline completed"
        );
        Ok(outcome)
    }
}
