//! Dataset ingestion: copy the source CSV and split it into train/test files

use crate::config::{ArtifactsConfig, IngestionConfig};
use crate::error::{PipelineError, Result};
use crate::types::record::columns;
use csv::StringRecord;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Locations written by [`DataIngestion::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOutput {
    pub raw_path: PathBuf,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
}

pub struct DataIngestion<'a> {
    config: &'a IngestionConfig,
    artifacts: &'a ArtifactsConfig,
}

impl<'a> DataIngestion<'a> {
    pub fn new(config: &'a IngestionConfig, artifacts: &'a ArtifactsConfig) -> Self {
        Self { config, artifacts }
    }

    /// Read the source dataset and write the raw copy plus both splits
    pub fn run(&self) -> Result<IngestionOutput> {
        let source = &self.config.source;
        info!(source = %source.display(), "Starting data ingestion");

        let (header, rows) = read_table(source)?;
        require_columns(&header, source)?;

        let (train_idx, test_idx) =
            split_indices(rows.len(), self.config.test_size, self.config.random_state)?;

        let output = IngestionOutput {
            raw_path: self.artifacts.raw_path(),
            train_path: self.artifacts.train_path(),
            test_path: self.artifacts.test_path(),
        };

        write_table(&output.raw_path, &header, rows.iter())?;
        write_table(&output.train_path, &header, train_idx.iter().map(|&i| &rows[i]))?;
        write_table(&output.test_path, &header, test_idx.iter().map(|&i| &rows[i]))?;

        info!(
            rows = rows.len(),
            train_rows = train_idx.len(),
            test_rows = test_idx.len(),
            train_path = %output.train_path.display(),
            test_path = %output.test_path.display(),
            "Data ingestion completed"
        );

        Ok(output)
    }
}

fn read_table(path: &Path) -> Result<(StringRecord, Vec<StringRecord>)> {
    let mut reader = csv::Reader::from_path(path)?;
    let header = reader.headers()?.clone();
    let rows = reader.records().collect::<std::result::Result<Vec<_>, _>>()?;
    Ok((header, rows))
}

fn require_columns(header: &StringRecord, path: &Path) -> Result<()> {
    let required = columns::CATEGORICAL
        .iter()
        .chain(columns::RAW_NUMERIC.iter())
        .chain(std::iter::once(&columns::TARGET));

    for column in required {
        if !header.iter().any(|h| h == *column) {
            return Err(PipelineError::validation(format!(
                "{} is missing required column '{}'",
                path.display(),
                column
            )));
        }
    }
    Ok(())
}

/// Shuffle `0..n` with a seeded RNG and cut off `ceil(n * test_size)` test rows
pub fn split_indices(n: usize, test_size: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::validation(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }

    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::validation(format!(
            "cannot split {} rows with test_size {}",
            n, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));

    let train = indices.split_off(n_test);
    Ok((train, indices))
}

fn write_table<'r>(
    path: &Path,
    header: &StringRecord,
    rows: impl Iterator<Item = &'r StringRecord>,
) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(header)?;
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}
