//! The `predict` command's stdout contract: one JSON result on success, only
//! the generic message on failure, with logs kept off stdout.

use predictive_maintenance::artifacts::save_object;
use predictive_maintenance::config::{ArtifactsConfig, StatisticsMode};
use predictive_maintenance::error::GENERIC_USER_MESSAGE;
use predictive_maintenance::models::{LogisticRegression, TrainedModel};
use predictive_maintenance::{PredictionResult, Preprocessor, RawRecord};
use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const READING: &str = r#"{"Product ID":"M14860","Type":"M","Air temperature [K]":298.1,"Process temperature [K]":308.6,"Rotational speed [rpm]":1551,"Torque [Nm]":42.8,"Tool wear [min]":0}"#;

/// Config with console and file logging at info level, so any log leak shows up
fn write_config(root: &Path) -> std::path::PathBuf {
    let path = root.join("config.toml");
    let text = format!(
        "[logging]\nlevel = \"info\"\nformat = \"pretty\"\ndir = '{}'\n",
        root.join("logs").display()
    );
    fs::write(&path, text).unwrap();
    path
}

fn run_predict(root: &Path, artifacts: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_predictive-maintenance"))
        .env_remove("RUST_LOG")
        .arg("--config")
        .arg(write_config(root))
        .arg("--artifacts-dir")
        .arg(artifacts)
        .arg("predict")
        .args(args)
        .output()
        .unwrap()
}

fn record(product_type: &str, torque: f64) -> RawRecord {
    RawRecord {
        product_id: format!("{}1000{}", product_type, torque as u32 % 7),
        product_type: product_type.to_string(),
        air_temperature: 298.0 + torque / 100.0,
        process_temperature: 309.0,
        rotational_speed: 1500.0 + torque,
        torque,
        tool_wear: torque * 2.0,
    }
}

/// Neutral model over a fitted preprocessor; every reading scores 0.5
fn save_artifacts(artifacts: &ArtifactsConfig) {
    let training: Vec<RawRecord> = [("L", 30.0), ("M", 42.0), ("H", 55.0), ("L", 61.0)]
        .iter()
        .map(|&(kind, torque)| record(kind, torque))
        .collect();
    let preprocessor = Preprocessor::fit(StatisticsMode::Frozen, &training).unwrap();
    let model = TrainedModel::LogisticRegression(LogisticRegression::from_parameters(
        vec![0.0; preprocessor.output_width()],
        0.0,
    ));
    save_object(artifacts.preprocessor_path(), &preprocessor).unwrap();
    save_object(artifacts.model_path(), &model).unwrap();
}

#[test]
fn failed_prediction_prints_only_generic_message() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = dir.path().join("missing-artifacts");

    let output = run_predict(dir.path(), &artifacts, &["--json", "{}"]);
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(!output.status.success());
    assert_eq!(stdout.trim(), GENERIC_USER_MESSAGE);
    assert!(!stdout.contains("Validation"));
    assert!(!stdout.contains("Prediction failed"));
}

#[test]
fn missing_artifacts_print_only_generic_message() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = dir.path().join("missing-artifacts");

    let output = run_predict(dir.path(), &artifacts, &["--json", READING]);
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(!output.status.success());
    assert_eq!(stdout.trim(), GENERIC_USER_MESSAGE);
    assert!(!stdout.contains("file not found"));
}

#[test]
fn successful_prediction_stdout_is_one_json_result() {
    let dir = tempfile::tempdir().unwrap();
    let artifacts = ArtifactsConfig {
        dir: dir.path().join("artifacts"),
        ..ArtifactsConfig::default()
    };
    save_artifacts(&artifacts);

    let output = run_predict(dir.path(), &artifacts.dir, &["--json", READING]);
    let stdout = String::from_utf8(output.stdout).unwrap();

    assert!(output.status.success());
    assert_eq!(stdout.lines().count(), 1);
    let result: PredictionResult = serde_json::from_str(stdout.trim()).unwrap();
    assert_eq!(result.failure_probability, 0.5);
    assert_eq!(result.prediction, 0);

    // the log lines went to stderr instead
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Prediction served"));
}
