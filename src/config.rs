//! Configuration management for the maintenance pipeline

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// How batch-dependent features obtain their statistics
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StatisticsMode {
    /// Statistics captured from the training batch and reused afterwards
    #[default]
    Frozen,
    /// Statistics recomputed over whatever batch is being processed
    PerBatch,
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub artifacts: ArtifactsConfig,
    pub ingestion: IngestionConfig,
    pub features: FeaturesConfig,
    pub training: TrainingConfig,
    pub logging: LoggingConfig,
}

/// Locations of every file the pipeline reads or writes
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    /// Directory holding splits, preprocessor and model
    pub dir: PathBuf,
    pub preprocessor_file: String,
    pub model_file: String,
    pub raw_file: String,
    pub train_file: String,
    pub test_file: String,
}

impl ArtifactsConfig {
    pub fn preprocessor_path(&self) -> PathBuf {
        self.dir.join(&self.preprocessor_file)
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(&self.model_file)
    }

    pub fn raw_path(&self) -> PathBuf {
        self.dir.join(&self.raw_file)
    }

    pub fn train_path(&self) -> PathBuf {
        self.dir.join(&self.train_file)
    }

    pub fn test_path(&self) -> PathBuf {
        self.dir.join(&self.test_file)
    }
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
            preprocessor_file: "preprocessor.json".to_string(),
            model_file: "model.json".to_string(),
            raw_file: "raw.csv".to_string(),
            train_file: "train.csv".to_string(),
            test_file: "test.csv".to_string(),
        }
    }
}

/// Source dataset and split settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestionConfig {
    /// CSV with the full labelled dataset
    pub source: PathBuf,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    pub random_state: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("data/ai4i2020.csv"),
            test_size: 0.2,
            random_state: 42,
        }
    }
}

/// Feature engineering settings
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct FeaturesConfig {
    pub statistics: StatisticsMode,
}

/// Hyperparameters for the candidate classifiers
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub random_state: u64,
    pub logistic_regression: LogisticRegressionConfig,
    pub random_forest: RandomForestConfig,
    pub xgboost: XgboostConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            random_state: 42,
            logistic_regression: LogisticRegressionConfig::default(),
            random_forest: RandomForestConfig::default(),
            xgboost: XgboostConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogisticRegressionConfig {
    pub max_iter: usize,
    /// Inverse L2 regularization strength
    pub c: f64,
    /// Gradient-norm tolerance of the L-BFGS solver
    pub tol: f64,
}

impl Default for LogisticRegressionConfig {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            c: 1.0,
            tol: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RandomForestConfig {
    pub n_estimators: usize,
    /// Unlimited when absent
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    /// Weight classes inversely to their frequency
    pub class_balanced: bool,
}

impl Default for RandomForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: None,
            min_samples_split: 2,
            class_balanced: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct XgboostConfig {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 penalty on leaf weights
    pub reg_lambda: f64,
    pub min_child_weight: f64,
}

impl Default for XgboostConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            reg_lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
    /// Directory for timestamped log files; no file sink when absent
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            dir: Some(PathBuf::from("logs")),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file, if present
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path, overlaid with `PDM__*` variables
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(Environment::with_prefix("PDM").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}
