//! Predictive Maintenance Pipeline - Main Entry Point
//!
//! `ingest` splits the source dataset, `train` runs the full training
//! pipeline, and `predict` scores one machine reading against the persisted
//! artifacts.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use predictive_maintenance::{
    config::AppConfig,
    error::{PipelineError, GENERIC_USER_MESSAGE},
    ingestion::DataIngestion,
    logging::Logging,
    pipeline::{PredictionPipeline, TrainingPipeline},
    types::{PredictionResult, RawRecord},
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "predictive-maintenance")]
#[command(about = "Machine failure prediction pipeline", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "config/config.toml")]
    config: PathBuf,

    /// Override the artifacts directory from the configuration
    #[arg(long)]
    artifacts_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split the source dataset into train and test files
    Ingest {
        /// Source CSV (defaults to the configured path)
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Ingest, transform, train all candidates and save the best model
    Train {
        /// Source CSV (defaults to the configured path)
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// Predict machine failure for one reading
    Predict(PredictArgs),
}

#[derive(Args)]
struct PredictArgs {
    /// Reading as a JSON object with the seven input fields
    #[arg(long, conflicts_with_all = ["product_id", "product_type", "air_temperature",
        "process_temperature", "rotational_speed", "torque", "tool_wear"])]
    json: Option<String>,

    #[arg(long)]
    product_id: Option<String>,

    /// Product quality variant (L, M, H)
    #[arg(long = "type")]
    product_type: Option<String>,

    /// Air temperature [K]
    #[arg(long)]
    air_temperature: Option<f64>,

    /// Process temperature [K]
    #[arg(long)]
    process_temperature: Option<f64>,

    /// Rotational speed [rpm]
    #[arg(long)]
    rotational_speed: Option<f64>,

    /// Torque [Nm]
    #[arg(long, allow_hyphen_values = true)]
    torque: Option<f64>,

    /// Tool wear [min]
    #[arg(long)]
    tool_wear: Option<f64>,
}

impl PredictArgs {
    fn into_record(self) -> predictive_maintenance::Result<RawRecord> {
        if let Some(body) = self.json {
            return RawRecord::from_json(&body);
        }

        fn required<T>(value: Option<T>, flag: &str) -> predictive_maintenance::Result<T> {
            value.ok_or_else(|| PipelineError::validation(format!("--{} is required", flag)))
        }

        let record = RawRecord {
            product_id: required(self.product_id, "product-id")?,
            product_type: required(self.product_type, "type")?,
            air_temperature: required(self.air_temperature, "air-temperature")?,
            process_temperature: required(self.process_temperature, "process-temperature")?,
            rotational_speed: required(self.rotational_speed, "rotational-speed")?,
            torque: required(self.torque, "torque")?,
            tool_wear: required(self.tool_wear, "tool-wear")?,
        };
        record.validate()?;
        Ok(record)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_from_path(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    if let Some(dir) = cli.artifacts_dir {
        config.artifacts.dir = dir;
    }

    let logging = Logging::init(&config.logging, "predictive_maintenance")?;
    if let Some(file) = logging.log_file() {
        info!(log_file = %file.display(), "Logging to file");
    }

    match cli.command {
        Commands::Ingest { source } => {
            if let Some(source) = source {
                config.ingestion.source = source;
            }
            let output = DataIngestion::new(&config.ingestion, &config.artifacts)
                .run()
                .context("Data ingestion failed")?;
            println!("train: {}", output.train_path.display());
            println!("test:  {}", output.test_path.display());
        }
        Commands::Train { source } => {
            if let Some(source) = source {
                config.ingestion.source = source;
            }
            let outcome = TrainingPipeline::new(&config)
                .run()
                .context("Training pipeline failed")?;

            for (kind, scores) in &outcome.report {
                println!("{:<20} {}", kind.name(), scores);
            }
            println!("best model: {}", outcome.best_model);
        }
        Commands::Predict(args) => match predict(&config, args) {
            Ok(result) => println!("{}", serde_json::to_string(&result)?),
            Err(e) => {
                error!(error = %e, kind = ?e.kind(), "Prediction failed");
                println!("{}", GENERIC_USER_MESSAGE);
                return Ok(ExitCode::FAILURE);
            }
        },
    }

    Ok(ExitCode::SUCCESS)
}

fn predict(config: &AppConfig, args: PredictArgs) -> predictive_maintenance::Result<PredictionResult> {
    let record = args.into_record()?;
    let pipeline = PredictionPipeline::load(&config.artifacts)?;
    let result = pipeline.predict(&record)?;

    info!(
        product_id = %record.product_id,
        prediction = result.prediction,
        failure_probability = result.failure_probability,
        "Prediction served"
    );
    Ok(result)
}
