//! Prediction response returned to callers

use serde::{Deserialize, Serialize};

/// Probability above which a record is labelled as failing
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Outcome of scoring a single record
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// 1 when the machine is predicted to fail
    pub prediction: u8,

    /// Positive-class probability, rounded to two decimals
    pub failure_probability: f64,
}

impl PredictionResult {
    /// Build a result from a raw model probability
    pub fn from_probability(probability: f64) -> Self {
        Self {
            prediction: label_for(probability),
            failure_probability: round2(probability),
        }
    }
}

/// Class label for a positive-class probability
pub fn label_for(probability: f64) -> u8 {
    u8::from(probability > DECISION_THRESHOLD)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_probability() {
        let result = PredictionResult::from_probability(0.7341);
        assert_eq!(result.prediction, 1);
        assert_eq!(result.failure_probability, 0.73);

        let result = PredictionResult::from_probability(0.126);
        assert_eq!(result.prediction, 0);
        assert_eq!(result.failure_probability, 0.13);
    }

    #[test]
    fn test_threshold_is_exclusive() {
        assert_eq!(label_for(0.5), 0);
        assert_eq!(label_for(0.5000001), 1);
    }

    #[test]
    fn test_prediction_serialization() {
        let result = PredictionResult::from_probability(0.73);
        let json = serde_json::to_string(&result).unwrap();
        assert_eq!(json, r#"{"prediction":1,"failure_probability":0.73}"#);
    }
}
