//! Column-wise preprocessing: standardized numerics followed by one-hot categoricals.

use crate::config::StatisticsMode;
use crate::error::{PipelineError, Result};
use crate::feature_extractor::FeatureEngineer;
use crate::types::record::{columns, EngineeredRecord, RawRecord};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

/// Zero-mean, unit-variance scaling of one numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: f64,
    /// Population standard deviation; 1.0 for constant columns
    pub scale: f64,
}

impl StandardScaler {
    fn fit(values: impl Iterator<Item = f64> + Clone) -> Self {
        let n = values.clone().count() as f64;
        let mean = values.clone().sum::<f64>() / n;
        let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let scale = if variance > 0.0 { variance.sqrt() } else { 1.0 };
        Self { mean, scale }
    }

    #[inline]
    fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// One-hot vocabulary of a categorical column.
///
/// Categories are kept sorted; the first one is the dropped reference level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    pub categories: Vec<String>,
}

impl OneHotEncoder {
    fn fit<'a>(values: impl Iterator<Item = &'a str>) -> Self {
        let categories: BTreeSet<&str> = values.collect();
        Self {
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    /// Number of indicator columns emitted
    pub fn width(&self) -> usize {
        self.categories.len().saturating_sub(1)
    }

    /// Indicator index for `value`; `None` for the reference level or unseen values
    fn position(&self, value: &str) -> Option<usize> {
        match self.categories.binary_search_by(|c| c.as_str().cmp(value)) {
            Ok(0) | Err(_) => None,
            Ok(index) => Some(index - 1),
        }
    }
}

/// Fitted preprocessing state shared by training and serving.
///
/// Only [`Preprocessor::fit`] produces a value of this type, so a transform
/// can never run against unfitted statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    engineer: FeatureEngineer,
    numeric: Vec<StandardScaler>,
    categorical: Vec<OneHotEncoder>,
}

impl Preprocessor {
    /// Fit feature statistics, scalers and vocabularies on training rows
    pub fn fit(mode: StatisticsMode, training: &[RawRecord]) -> Result<Self> {
        if training.is_empty() {
            return Err(PipelineError::validation(
                "cannot fit preprocessor on an empty training set",
            ));
        }

        let engineer = FeatureEngineer::fit(mode, training)?;
        let rows = engineer.engineer(training)?;

        let numeric = (0..columns::NUMERIC_FEATURES.len())
            .map(|col| StandardScaler::fit(rows.iter().map(move |r| r.numeric_features()[col])))
            .collect();

        let categorical = (0..columns::CATEGORICAL.len())
            .map(|col| OneHotEncoder::fit(rows.iter().map(|r| r.categorical_features()[col])))
            .collect();

        let preprocessor = Self {
            engineer,
            numeric,
            categorical,
        };

        info!(
            rows = training.len(),
            mode = ?mode,
            output_width = preprocessor.output_width(),
            "Preprocessor fitted"
        );

        Ok(preprocessor)
    }

    /// Feature engineering configured at fit time
    pub fn engineer(&self) -> &FeatureEngineer {
        &self.engineer
    }

    pub fn scalers(&self) -> &[StandardScaler] {
        &self.numeric
    }

    pub fn encoders(&self) -> &[OneHotEncoder] {
        &self.categorical
    }

    /// Number of matrix columns produced by [`Preprocessor::transform`]
    pub fn output_width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(OneHotEncoder::width).sum::<usize>()
    }

    /// Output column names, numerics first
    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = columns::NUMERIC_FEATURES
            .iter()
            .map(|c| c.to_string())
            .collect();
        for (column, encoder) in columns::CATEGORICAL.iter().zip(&self.categorical) {
            for category in encoder.categories.iter().skip(1) {
                names.push(format!("{}_{}", column, category));
            }
        }
        names
    }

    /// Scale and encode already engineered rows into a dense matrix
    pub fn transform(&self, rows: &[EngineeredRecord]) -> Array2<f64> {
        let mut matrix = Array2::<f64>::zeros((rows.len(), self.output_width()));

        for (i, row) in rows.iter().enumerate() {
            let numeric = row.numeric_features();
            for (j, scaler) in self.numeric.iter().enumerate() {
                matrix[[i, j]] = scaler.apply(numeric[j]);
            }

            let mut offset = self.numeric.len();
            for (encoder, value) in self.categorical.iter().zip(row.categorical_features()) {
                if let Some(position) = encoder.position(value) {
                    matrix[[i, offset + position]] = 1.0;
                }
                offset += encoder.width();
            }
        }

        matrix
    }

    /// Check the decoded state against the fixed column layout
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.numeric.len() != columns::NUMERIC_FEATURES.len() {
            return Err(format!(
                "expected {} scalers, found {}",
                columns::NUMERIC_FEATURES.len(),
                self.numeric.len()
            ));
        }
        if self.categorical.len() != columns::CATEGORICAL.len() {
            return Err(format!(
                "expected {} encoders, found {}",
                columns::CATEGORICAL.len(),
                self.categorical.len()
            ));
        }
        for (column, scaler) in columns::NUMERIC_FEATURES.iter().zip(&self.numeric) {
            if !scaler.mean.is_finite() || !scaler.scale.is_finite() || scaler.scale <= 0.0 {
                return Err(format!("invalid scaler for {}", column));
            }
        }
        for (column, encoder) in columns::CATEGORICAL.iter().zip(&self.categorical) {
            if encoder.categories.windows(2).any(|w| w[0] >= w[1]) {
                return Err(format!("categories of {} are not sorted and unique", column));
            }
        }
        Ok(())
    }

    /// Engineer and transform raw rows as one batch
    pub fn transform_raw(&self, records: &[RawRecord]) -> Result<Array2<f64>> {
        let rows = self.engineer.engineer(records)?;
        Ok(self.transform(&rows))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::sample_record;

    fn training_rows() -> Vec<RawRecord> {
        let mut rows = Vec::new();
        for (i, (kind, torque)) in [("L", 35.0), ("M", 42.0), ("H", 51.0), ("L", 60.0), ("M", 28.0)]
            .into_iter()
            .enumerate()
        {
            let mut record = sample_record(torque, 20.0 * i as f64);
            record.product_id = format!("{}{}", kind, 1000 + i);
            record.product_type = kind.to_string();
            record.rotational_speed = 1400.0 + 50.0 * i as f64;
            record.air_temperature = 298.0 + i as f64 * 0.3;
            rows.push(record);
        }
        rows
    }

    #[test]
    fn test_fit_rows_are_standardized() {
        let rows = training_rows();
        let preprocessor = Preprocessor::fit(StatisticsMode::Frozen, &rows).unwrap();
        let matrix = preprocessor.transform_raw(&rows).unwrap();

        let n = rows.len() as f64;
        for (j, scaler) in preprocessor.scalers().iter().enumerate() {
            let column = matrix.column(j);
            let mean = column.sum() / n;
            assert!(mean.abs() < 1e-9, "column {} mean {}", j, mean);

            let variance = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            if scaler.scale == 1.0 {
                // constant column
                assert!(variance < 1e-9, "column {} variance {}", j, variance);
            } else {
                assert!((variance - 1.0).abs() < 1e-9, "column {} variance {}", j, variance);
            }
        }
    }

    #[test]
    fn test_output_layout() {
        let rows = training_rows();
        let preprocessor = Preprocessor::fit(StatisticsMode::Frozen, &rows).unwrap();

        // Product IDs: 5 categories -> 4 columns; Type: H, L, M -> 2 columns
        assert_eq!(preprocessor.output_width(), 12 + 4 + 2);
        let names = preprocessor.feature_names();
        assert_eq!(names.len(), preprocessor.output_width());
        assert_eq!(names[0], columns::AIR_TEMPERATURE);
        assert_eq!(names[11], columns::MECHANICAL_STRESS_INDEX);
        assert_eq!(names[16], "Type_L");
        assert_eq!(names[17], "Type_M");

        let matrix = preprocessor.transform_raw(&rows).unwrap();
        // Row 0 is type L, row 2 is the dropped reference H
        assert_eq!(matrix[[0, 16]], 1.0);
        assert_eq!(matrix[[0, 17]], 0.0);
        assert_eq!(matrix[[2, 16]], 0.0);
        assert_eq!(matrix[[2, 17]], 0.0);
    }

    #[test]
    fn test_unseen_category_maps_to_zeros() {
        let rows = training_rows();
        let preprocessor = Preprocessor::fit(StatisticsMode::Frozen, &rows).unwrap();

        let mut unseen = sample_record(45.0, 60.0);
        unseen.product_id = "X99999".to_string();
        unseen.product_type = "Z".to_string();

        let matrix = preprocessor.transform_raw(&[unseen]).unwrap();
        assert_eq!(matrix.nrows(), 1);
        assert!(matrix.row(0).iter().skip(12).all(|v| *v == 0.0));
    }

    #[test]
    fn test_constant_column_scale() {
        let scaler = StandardScaler::fit([3.0, 3.0, 3.0].into_iter());
        assert_eq!(scaler.mean, 3.0);
        assert_eq!(scaler.scale, 1.0);
        assert_eq!(scaler.apply(3.0), 0.0);
    }

    #[test]
    fn test_encoder_positions() {
        let encoder = OneHotEncoder::fit(["M", "L", "H", "L"].into_iter());
        assert_eq!(encoder.categories, vec!["H", "L", "M"]);
        assert_eq!(encoder.width(), 2);
        assert_eq!(encoder.position("H"), None);
        assert_eq!(encoder.position("L"), Some(0));
        assert_eq!(encoder.position("M"), Some(1));
        assert_eq!(encoder.position("Q"), None);
    }

    #[test]
    fn test_validate_fitted_and_tampered() {
        let preprocessor = Preprocessor::fit(StatisticsMode::Frozen, &training_rows()).unwrap();
        assert!(preprocessor.validate().is_ok());

        let mut extra = preprocessor.clone();
        extra.numeric.push(StandardScaler {
            mean: 0.0,
            scale: 1.0,
        });
        assert!(extra.validate().is_err());

        let mut unsorted = preprocessor.clone();
        unsorted.categorical[1].categories.reverse();
        assert!(unsorted.validate().is_err());

        let mut zero_scale = preprocessor;
        zero_scale.numeric[0].scale = 0.0;
        assert!(zero_scale.validate().is_err());
    }

    #[test]
    fn test_empty_training_set() {
        assert!(matches!(
            Preprocessor::fit(StatisticsMode::Frozen, &[]),
            Err(PipelineError::Validation(_))
        ));
    }
}
