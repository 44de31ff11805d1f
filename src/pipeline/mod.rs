//! End-to-end workflows built from the individual stages

pub mod predict;
pub mod train;

pub use predict::PredictionPipeline;
pub use train::TrainingPipeline;
