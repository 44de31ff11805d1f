//! Type definitions for the maintenance pipeline

pub mod prediction;
pub mod record;

pub use prediction::PredictionResult;
pub use record::{EngineeredRecord, RawRecord};
