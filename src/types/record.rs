//! Machine sensor records as read from the AI4I dataset

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Dataset column names
pub mod columns {
    pub const PRODUCT_ID: &str = "Product ID";
    pub const TYPE: &str = "Type";
    pub const AIR_TEMPERATURE: &str = "Air temperature [K]";
    pub const PROCESS_TEMPERATURE: &str = "Process temperature [K]";
    pub const ROTATIONAL_SPEED: &str = "Rotational speed [rpm]";
    pub const TORQUE: &str = "Torque [Nm]";
    pub const TOOL_WEAR: &str = "Tool wear [min]";

    pub const TEMP_DIFF: &str = "Temp_diff";
    pub const OVERHEAT_RISK: &str = "Overheat_Risk";
    pub const POWER: &str = "Power";
    pub const HIGH_LOAD: &str = "High_Load";
    pub const TOOL_WEAR_RATIO: &str = "Tool_Wear_Ratio";
    pub const TOOL_EXPIRY_RISK: &str = "Tool_Expiry_Risk";
    pub const MECHANICAL_STRESS_INDEX: &str = "Mechanical_Stress_Index";

    /// Label column
    pub const TARGET: &str = "Machine failure";

    /// Failure-mode columns derived from the label; never used as features
    pub const LEAKAGE: [&str; 5] = ["TWF", "HDF", "PWF", "OSF", "RNF"];

    pub const CATEGORICAL: [&str; 2] = [PRODUCT_ID, TYPE];

    pub const RAW_NUMERIC: [&str; 5] = [
        AIR_TEMPERATURE,
        PROCESS_TEMPERATURE,
        ROTATIONAL_SPEED,
        TORQUE,
        TOOL_WEAR,
    ];

    /// Numeric model inputs, in matrix column order
    pub const NUMERIC_FEATURES: [&str; 12] = [
        AIR_TEMPERATURE,
        PROCESS_TEMPERATURE,
        ROTATIONAL_SPEED,
        TORQUE,
        TOOL_WEAR,
        TEMP_DIFF,
        OVERHEAT_RISK,
        POWER,
        HIGH_LOAD,
        TOOL_WEAR_RATIO,
        TOOL_EXPIRY_RISK,
        MECHANICAL_STRESS_INDEX,
    ];
}

/// A single machine reading before feature engineering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawRecord {
    /// Product serial, e.g. `M14860`
    #[serde(rename = "Product ID")]
    pub product_id: String,

    /// Product quality variant (L, M, H)
    #[serde(rename = "Type")]
    pub product_type: String,

    #[serde(rename = "Air temperature [K]")]
    pub air_temperature: f64,

    #[serde(rename = "Process temperature [K]")]
    pub process_temperature: f64,

    #[serde(rename = "Rotational speed [rpm]")]
    pub rotational_speed: f64,

    #[serde(rename = "Torque [Nm]")]
    pub torque: f64,

    #[serde(rename = "Tool wear [min]")]
    pub tool_wear: f64,
}

impl RawRecord {
    /// Parse a prediction request body
    pub fn from_json(body: &str) -> Result<Self> {
        let record: RawRecord = serde_json::from_str(body)
            .map_err(|e| PipelineError::validation(format!("invalid record: {}", e)))?;
        record.validate()?;
        Ok(record)
    }

    /// Numeric fields in [`columns::RAW_NUMERIC`] order
    pub fn numeric_values(&self) -> [f64; 5] {
        [
            self.air_temperature,
            self.process_temperature,
            self.rotational_speed,
            self.torque,
            self.tool_wear,
        ]
    }

    /// Check that every numeric field holds a finite value
    pub fn validate(&self) -> Result<()> {
        for (name, value) in columns::RAW_NUMERIC.iter().zip(self.numeric_values()) {
            if !value.is_finite() {
                return Err(PipelineError::validation(format!(
                    "{} must be a finite number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// A raw reading augmented with the derived maintenance features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeredRecord {
    pub raw: RawRecord,
    pub temp_diff: f64,
    pub overheat_risk: u8,
    pub power: f64,
    pub high_load: u8,
    pub tool_wear_ratio: f64,
    pub tool_expiry_risk: u8,
    pub mechanical_stress_index: f64,
}

impl EngineeredRecord {
    /// Values in [`columns::NUMERIC_FEATURES`] order
    pub fn numeric_features(&self) -> [f64; 12] {
        let raw = &self.raw;
        [
            raw.air_temperature,
            raw.process_temperature,
            raw.rotational_speed,
            raw.torque,
            raw.tool_wear,
            self.temp_diff,
            f64::from(self.overheat_risk),
            self.power,
            f64::from(self.high_load),
            self.tool_wear_ratio,
            f64::from(self.tool_expiry_risk),
            self.mechanical_stress_index,
        ]
    }

    /// Values in [`columns::CATEGORICAL`] order
    pub fn categorical_features(&self) -> [&str; 2] {
        [&self.raw.product_id, &self.raw.product_type]
    }
}

#[cfg(test)]
pub(crate) fn sample_record(torque: f64, tool_wear: f64) -> RawRecord {
    RawRecord {
        product_id: "M14860".to_string(),
        product_type: "M".to_string(),
        air_temperature: 298.1,
        process_temperature: 308.6,
        rotational_speed: 1551.0,
        torque,
        tool_wear,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_from_dataset_keys() {
        let body = r#"{
            "Product ID": "L47181",
            "Type": "L",
            "Air temperature [K]": 298.2,
            "Process temperature [K]": 308.7,
            "Rotational speed [rpm]": 1408,
            "Torque [Nm]": 46.3,
            "Tool wear [min]": 3
        }"#;

        let record = RawRecord::from_json(body).unwrap();
        assert_eq!(record.product_id, "L47181");
        assert_eq!(record.product_type, "L");
        assert_eq!(record.rotational_speed, 1408.0);
        assert_eq!(record.tool_wear, 3.0);
    }

    #[test]
    fn test_missing_field_is_validation_error() {
        let body = r#"{"Product ID": "L47181", "Type": "L", "Air temperature [K]": 298.2}"#;
        let err = RawRecord::from_json(body).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Validation);
        assert!(err.to_string().contains("Process temperature [K]"));
    }

    #[test]
    fn test_non_numeric_field_is_validation_error() {
        let body = r#"{
            "Product ID": "L47181", "Type": "L",
            "Air temperature [K]": "warm",
            "Process temperature [K]": 308.7,
            "Rotational speed [rpm]": 1408,
            "Torque [Nm]": 46.3,
            "Tool wear [min]": 3
        }"#;
        assert!(matches!(
            RawRecord::from_json(body),
            Err(PipelineError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let mut record = sample_record(40.0, 10.0);
        record.torque = f64::NAN;
        let err = record.validate().unwrap_err();
        assert!(err.to_string().contains(columns::TORQUE));
    }

    #[test]
    fn test_engineered_feature_order() {
        let record = EngineeredRecord {
            raw: sample_record(40.0, 120.0),
            temp_diff: 10.5,
            overheat_risk: 0,
            power: 62040.0,
            high_load: 1,
            tool_wear_ratio: 0.5,
            tool_expiry_risk: 0,
            mechanical_stress_index: 0.7,
        };

        let values = record.numeric_features();
        assert_eq!(values.len(), columns::NUMERIC_FEATURES.len());
        assert_eq!(values[3], 40.0);
        assert_eq!(values[5], 10.5);
        assert_eq!(values[8], 1.0);
        assert_eq!(values[11], 0.7);
        assert_eq!(record.categorical_features(), ["M14860", "M"]);
    }
}
