//! Predictive Maintenance Pipeline Library
//!
//! Machine-failure prediction on AI4I-style sensor data: dataset ingestion,
//! domain feature engineering, preprocessing, selection among three candidate
//! classifiers, and single-record inference from persisted
//! artifacts.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod feature_extractor;
pub mod ingestion;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod pipeline;
pub mod preprocessor;
pub mod trainer;
pub mod transformation;
pub mod types;

pub use config::AppConfig;
pub use error::{PipelineError, Result};
pub use feature_extractor::FeatureEngineer;
pub use pipeline::{PredictionPipeline, TrainingPipeline};
pub use preprocessor::Preprocessor;
pub use types::{PredictionResult, RawRecord};
