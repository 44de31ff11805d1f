//! Versioned persistence for fitted pipeline objects.
//!
//! Every artifact is a JSON envelope:
//!
//! ```json
//! {"format_version": 1, "kind": "model", "artifact_id": "...", "created_at": "...", "payload": {...}}
//! ```
//!
//! Loading checks `format_version` and `kind` before decoding the payload,
//! then checks the decoded payload's structure.

use crate::error::{PipelineError, Result};
use crate::models::TrainedModel;
use crate::preprocessor::Preprocessor;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

/// Envelope layout written by this build
pub const FORMAT_VERSION: u32 = 1;

/// An object that can be persisted as an artifact
pub trait Artifact: Serialize + DeserializeOwned {
    /// Tag stored in the envelope and checked on load
    const KIND: &'static str;

    /// Structural check run after decoding
    fn validate(&self) -> std::result::Result<(), String> {
        Ok(())
    }
}

impl Artifact for Preprocessor {
    const KIND: &'static str = "preprocessor";

    fn validate(&self) -> std::result::Result<(), String> {
        Preprocessor::validate(self)
    }
}

impl Artifact for TrainedModel {
    const KIND: &'static str = "model";

    fn validate(&self) -> std::result::Result<(), String> {
        TrainedModel::validate(self)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    format_version: u32,
    kind: &'a str,
    artifact_id: Uuid,
    created_at: DateTime<Utc>,
    payload: &'a T,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    format_version: u32,
    kind: String,
}

#[derive(Deserialize)]
struct Envelope<T> {
    artifact_id: Uuid,
    created_at: DateTime<Utc>,
    payload: T,
}

/// Serialize `object` to `path`, creating parent directories
pub fn save_object<T: Artifact>(path: impl AsRef<Path>, object: &T) -> Result<()> {
    let path = path.as_ref();
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|e| PipelineError::artifact(dir, e.to_string()))?;
    }

    let artifact_id = Uuid::new_v4();
    let envelope = EnvelopeRef {
        format_version: FORMAT_VERSION,
        kind: T::KIND,
        artifact_id,
        created_at: Utc::now(),
        payload: object,
    };
    let bytes = serde_json::to_vec(&envelope)?;

    // write-then-rename so readers never see a partial file
    let staging = path.with_extension("tmp");
    fs::write(&staging, bytes).map_err(|e| PipelineError::artifact(&staging, e.to_string()))?;
    fs::rename(&staging, path).map_err(|e| PipelineError::artifact(path, e.to_string()))?;

    info!(
        kind = T::KIND,
        artifact_id = %artifact_id,
        path = %path.display(),
        "Artifact saved"
    );
    Ok(())
}

/// Read an artifact written by [`save_object`]
pub fn load_object<T: Artifact>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        IoErrorKind::NotFound => PipelineError::artifact(path, "file not found"),
        _ => PipelineError::artifact(path, e.to_string()),
    })?;

    let header: EnvelopeHeader = serde_json::from_str(&text)
        .map_err(|e| PipelineError::artifact(path, format!("corrupt artifact: {}", e)))?;
    if header.format_version != FORMAT_VERSION {
        return Err(PipelineError::artifact(
            path,
            format!(
                "unsupported format version {} (expected {})",
                header.format_version, FORMAT_VERSION
            ),
        ));
    }
    if header.kind != T::KIND {
        return Err(PipelineError::artifact(
            path,
            format!("expected a {} artifact, found {}", T::KIND, header.kind),
        ));
    }

    let envelope: Envelope<T> = serde_json::from_str(&text)
        .map_err(|e| PipelineError::artifact(path, format!("corrupt {} payload: {}", T::KIND, e)))?;
    Artifact::validate(&envelope.payload)
        .map_err(|e| PipelineError::artifact(path, format!("invalid {} payload: {}", T::KIND, e)))?;

    info!(
        kind = T::KIND,
        artifact_id = %envelope.artifact_id,
        created_at = %envelope.created_at,
        path = %path.display(),
        "Artifact loaded"
    );
    Ok(envelope.payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::LogisticRegression;

    fn model() -> TrainedModel {
        TrainedModel::LogisticRegression(LogisticRegression::from_parameters(
            vec![0.1, -2.5, 1.0 / 3.0],
            0.7,
        ))
    }

    #[test]
    fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("model.json");

        save_object(&path, &model()).unwrap();
        let loaded: TrainedModel = load_object(&path).unwrap();
        assert_eq!(loaded, model());
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_object::<TrainedModel>(dir.path().join("model.json")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Artifact);
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, b"\x80\x04\x95 not json").unwrap();
        let err = load_object::<TrainedModel>(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Artifact);
    }

    #[test]
    fn test_wrong_kind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save_object(&path, &model()).unwrap();

        let err = load_object::<Preprocessor>(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Artifact);
        assert!(err.to_string().contains("expected a preprocessor artifact"));
    }

    #[test]
    fn test_dangling_tree_reference_is_artifact_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let envelope = serde_json::json!({
            "format_version": FORMAT_VERSION,
            "kind": "model",
            "artifact_id": Uuid::new_v4(),
            "created_at": Utc::now(),
            "payload": {
                "kind": "Random Forest",
                "parameters": {
                    "trees": [{"nodes": [
                        {"type": "split", "feature": 0, "threshold": 0.5, "left": 7, "right": 8}
                    ]}],
                    "n_features": 3
                }
            }
        });
        fs::write(&path, serde_json::to_vec(&envelope).unwrap()).unwrap();

        let err = load_object::<TrainedModel>(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Artifact);
        assert!(err.to_string().contains("invalid model payload"));
    }

    #[test]
    fn test_unsupported_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        save_object(&path, &model()).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let mut value: serde_json::Value = serde_json::from_str(&text).unwrap();
        value["format_version"] = serde_json::json!(99);
        fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();

        let err = load_object::<TrainedModel>(&path).unwrap_err();
        assert!(err.to_string().contains("unsupported format version 99"));
    }
}
