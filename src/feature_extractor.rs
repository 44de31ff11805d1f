//! Domain feature engineering for machine readings.
//!
//! The same transformation runs at training and inference time. Two of the
//! derived columns (`High_Load`, `Mechanical_Stress_Index`) depend on
//! statistics of a batch; [`StatisticsMode`] decides whether those come from
//! the batch being processed or from statistics frozen at training time.

use crate::config::StatisticsMode;
use crate::error::{PipelineError, Result};
use crate::types::record::{EngineeredRecord, RawRecord};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Temperature gap (K) above which a machine is considered at overheat risk
pub const OVERHEAT_THRESHOLD: f64 = 20.0;

/// Tool wear (min) at which a tool is considered fully used
pub const TOOL_LIFETIME_MIN: f64 = 240.0;

/// Wear ratio above which a tool is flagged as close to expiry
pub const TOOL_EXPIRY_RATIO: f64 = 0.8;

/// Torque quantile separating normal and high load
pub const HIGH_LOAD_QUANTILE: f64 = 0.75;

const STRESS_TORQUE_WEIGHT: f64 = 0.4;
const STRESS_TEMP_WEIGHT: f64 = 0.3;
const STRESS_WEAR_WEIGHT: f64 = 0.3;

/// Batch statistics consumed by the load and stress features
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStatistics {
    pub torque_q75: f64,
    pub torque_max: f64,
    pub temp_diff_max: f64,
}

impl FeatureStatistics {
    /// Compute statistics over a batch of raw readings
    pub fn from_batch(records: &[RawRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(PipelineError::validation(
                "cannot compute feature statistics of an empty batch",
            ));
        }

        let torques: Vec<f64> = records.iter().map(|r| r.torque).collect();
        let temp_diff_max = records
            .iter()
            .map(temp_diff)
            .fold(f64::NEG_INFINITY, f64::max);

        let torque_q75 = quantile(&torques, HIGH_LOAD_QUANTILE)
            .ok_or_else(|| PipelineError::validation("torque quantile of an empty batch"))?;
        let stats = Self {
            torque_q75,
            torque_max: torques.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            temp_diff_max,
        };
        stats.check_divisors()?;
        Ok(stats)
    }

    fn check_divisors(&self) -> Result<()> {
        if self.torque_max == 0.0 {
            return Err(PipelineError::numeric(
                "mechanical stress index",
                "maximum torque of the batch is zero",
            ));
        }
        if self.temp_diff_max == 0.0 {
            return Err(PipelineError::numeric(
                "mechanical stress index",
                "maximum temperature difference of the batch is zero",
            ));
        }
        Ok(())
    }
}

/// Turns raw readings into engineered records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEngineer {
    mode: StatisticsMode,
    /// Present once fitted in frozen mode
    frozen: Option<FeatureStatistics>,
}

impl FeatureEngineer {
    /// Engineer that always recomputes statistics over its input batch
    pub fn per_batch() -> Self {
        Self {
            mode: StatisticsMode::PerBatch,
            frozen: None,
        }
    }

    /// Engineer that reuses the given statistics for every batch
    pub fn frozen(stats: FeatureStatistics) -> Self {
        Self {
            mode: StatisticsMode::Frozen,
            frozen: Some(stats),
        }
    }

    /// Build an engineer for `mode`, capturing statistics from `training` when frozen
    pub fn fit(mode: StatisticsMode, training: &[RawRecord]) -> Result<Self> {
        match mode {
            StatisticsMode::PerBatch => Ok(Self::per_batch()),
            StatisticsMode::Frozen => Ok(Self::frozen(FeatureStatistics::from_batch(training)?)),
        }
    }

    pub fn mode(&self) -> StatisticsMode {
        self.mode
    }

    /// Statistics captured at fit time, if any
    pub fn frozen_statistics(&self) -> Option<&FeatureStatistics> {
        self.frozen.as_ref()
    }

    /// Engineer every record of `records` as one batch
    pub fn engineer(&self, records: &[RawRecord]) -> Result<Vec<EngineeredRecord>> {
        if records.is_empty() {
            return Err(PipelineError::validation("cannot engineer an empty batch"));
        }
        for record in records {
            record.validate()?;
        }

        let stats = match (self.mode, self.frozen) {
            (StatisticsMode::Frozen, Some(stats)) => stats,
            (StatisticsMode::Frozen, None) => {
                return Err(PipelineError::validation(
                    "frozen feature statistics are missing",
                ))
            }
            (StatisticsMode::PerBatch, _) => FeatureStatistics::from_batch(records)?,
        };

        debug!(
            rows = records.len(),
            mode = ?self.mode,
            torque_q75 = stats.torque_q75,
            torque_max = stats.torque_max,
            temp_diff_max = stats.temp_diff_max,
            "Engineering features"
        );

        Ok(records
            .iter()
            .map(|record| engineer_record(record, &stats))
            .collect())
    }
}

fn temp_diff(record: &RawRecord) -> f64 {
    record.process_temperature - record.air_temperature
}

fn flag(condition: bool) -> u8 {
    u8::from(condition)
}

fn engineer_record(record: &RawRecord, stats: &FeatureStatistics) -> EngineeredRecord {
    let temp_diff = temp_diff(record);
    let overheat_risk = flag(temp_diff > OVERHEAT_THRESHOLD);
    let power = record.torque * record.rotational_speed;
    let high_load = flag(record.torque > stats.torque_q75);
    let tool_wear_ratio = record.tool_wear / TOOL_LIFETIME_MIN;
    let tool_expiry_risk = flag(tool_wear_ratio > TOOL_EXPIRY_RATIO);
    let mechanical_stress_index = (record.torque / stats.torque_max) * STRESS_TORQUE_WEIGHT
        + (temp_diff / stats.temp_diff_max) * STRESS_TEMP_WEIGHT
        + tool_wear_ratio * STRESS_WEAR_WEIGHT;

    EngineeredRecord {
        raw: record.clone(),
        temp_diff,
        overheat_risk,
        power,
        high_load,
        tool_wear_ratio,
        tool_expiry_risk,
        mechanical_stress_index,
    }
}

/// Quantile with linear interpolation between order statistics.
///
/// `None` for an empty slice or a `q` outside `[0, 1]`.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=1.0).contains(&q) {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * fraction)
}
