//! Turns the train/test CSV splits into model-ready matrices.
//!
//! Only the seven raw input columns and the label are read. Failure-mode
//! columns (`TWF`, `HDF`, ...) and identifiers such as `UDI` never reach
//! the feature matrix.

use crate::artifacts::save_object;
use crate::config::{ArtifactsConfig, StatisticsMode};
use crate::error::{PipelineError, Result};
use crate::preprocessor::Preprocessor;
use crate::types::record::{columns, RawRecord};
use csv::StringRecord;
use ndarray::{s, Array1, Array2};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Transformed splits; the label is the last column of each matrix
#[derive(Debug, Clone)]
pub struct TransformationOutput {
    pub train: Array2<f64>,
    pub test: Array2<f64>,
    pub preprocessor_path: PathBuf,
}

pub struct DataTransformation<'a> {
    statistics: StatisticsMode,
    artifacts: &'a ArtifactsConfig,
}

impl<'a> DataTransformation<'a> {
    pub fn new(statistics: StatisticsMode, artifacts: &'a ArtifactsConfig) -> Self {
        Self {
            statistics,
            artifacts,
        }
    }

    /// Fit the preprocessor on the train split, transform both splits and
    /// persist the preprocessor.
    pub fn run(&self, train_path: &Path, test_path: &Path) -> Result<TransformationOutput> {
        info!(
            train_path = %train_path.display(),
            test_path = %test_path.display(),
            "Starting data transformation"
        );

        let (train_records, train_labels) = read_labelled(train_path)?;
        let (test_records, test_labels) = read_labelled(test_path)?;

        let preprocessor = Preprocessor::fit(self.statistics, &train_records)?;
        let train = with_label(preprocessor.transform_raw(&train_records)?, train_labels);
        let test = with_label(preprocessor.transform_raw(&test_records)?, test_labels);

        let preprocessor_path = self.artifacts.preprocessor_path();
        save_object(&preprocessor_path, &preprocessor)?;

        info!(
            train_shape = ?train.dim(),
            test_shape = ?test.dim(),
            "Data transformation completed"
        );

        Ok(TransformationOutput {
            train,
            test,
            preprocessor_path,
        })
    }
}

/// Read raw records and their `Machine failure` labels from a CSV file
pub fn read_labelled(path: &Path) -> Result<(Vec<RawRecord>, Vec<f64>)> {
    let mut reader = csv::Reader::from_path(path)?;
    let layout = ColumnLayout::from_header(reader.headers()?, path)?;

    let mut records = Vec::new();
    let mut labels = Vec::new();
    for (index, row) in reader.records().enumerate() {
        let row = row?;
        // header is line 1
        let line = index + 2;
        records.push(layout.record(&row, line)?);
        labels.push(layout.label(&row, line)?);
    }

    if records.is_empty() {
        return Err(PipelineError::validation(format!(
            "{} contains no data rows",
            path.display()
        )));
    }

    debug!(path = %path.display(), rows = records.len(), "Labelled rows read");
    Ok((records, labels))
}

/// Positions of the columns we read, resolved from the header by name
struct ColumnLayout {
    product_id: usize,
    product_type: usize,
    numeric: [usize; 5],
    target: usize,
}

impl ColumnLayout {
    fn from_header(header: &StringRecord, path: &Path) -> Result<Self> {
        let find = |name: &str| {
            header.iter().position(|h| h == name).ok_or_else(|| {
                PipelineError::validation(format!(
                    "{} is missing required column '{}'",
                    path.display(),
                    name
                ))
            })
        };

        let mut numeric = [0; 5];
        for (slot, name) in numeric.iter_mut().zip(columns::RAW_NUMERIC) {
            *slot = find(name)?;
        }

        Ok(Self {
            product_id: find(columns::PRODUCT_ID)?,
            product_type: find(columns::TYPE)?,
            numeric,
            target: find(columns::TARGET)?,
        })
    }

    fn field<'r>(row: &'r StringRecord, index: usize, name: &str, line: usize) -> Result<&'r str> {
        row.get(index).map(str::trim).ok_or_else(|| {
            PipelineError::validation(format!("line {}: missing value for '{}'", line, name))
        })
    }

    fn number(row: &StringRecord, index: usize, name: &str, line: usize) -> Result<f64> {
        let text = Self::field(row, index, name, line)?;
        text.parse::<f64>().map_err(|_| {
            PipelineError::validation(format!(
                "line {}: '{}' is not a number for '{}'",
                line, text, name
            ))
        })
    }

    fn record(&self, row: &StringRecord, line: usize) -> Result<RawRecord> {
        let mut values = [0.0; 5];
        for ((value, &index), name) in values
            .iter_mut()
            .zip(&self.numeric)
            .zip(columns::RAW_NUMERIC)
        {
            *value = Self::number(row, index, name, line)?;
        }
        let [air_temperature, process_temperature, rotational_speed, torque, tool_wear] = values;

        let record = RawRecord {
            product_id: Self::field(row, self.product_id, columns::PRODUCT_ID, line)?.to_string(),
            product_type: Self::field(row, self.product_type, columns::TYPE, line)?.to_string(),
            air_temperature,
            process_temperature,
            rotational_speed,
            torque,
            tool_wear,
        };
        record
            .validate()
            .map_err(|e| PipelineError::validation(format!("line {}: {}", line, e)))?;
        Ok(record)
    }

    fn label(&self, row: &StringRecord, line: usize) -> Result<f64> {
        let label = Self::number(row, self.target, columns::TARGET, line)?;
        if label != 0.0 && label != 1.0 {
            return Err(PipelineError::validation(format!(
                "line {}: '{}' must be 0 or 1, got {}",
                line,
                columns::TARGET,
                label
            )));
        }
        Ok(label)
    }
}

fn with_label(features: Array2<f64>, labels: Vec<f64>) -> Array2<f64> {
    let (rows, width) = features.dim();
    let mut matrix = Array2::<f64>::zeros((rows, width + 1));
    matrix.slice_mut(s![.., ..width]).assign(&features);
    matrix.column_mut(width).assign(&Array1::from(labels));
    matrix
}
