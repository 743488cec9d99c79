use crate::constants;
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fs;

/// Runtime configuration for the pipeline. Every threshold and storage path
/// the stages use comes from here; defaults match the production dataset
/// layout so a config file is only needed for overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Object-store bucket all stages read from and write to.
    pub bucket: String,
    /// Target row count for the sampling stage.
    pub sample_size: usize,
    /// Seed for the sampler's RNG; fixed so repeated runs are reproducible.
    pub sample_seed: u64,
    /// Columns whose missing fraction exceeds this are dropped before imputation.
    pub missing_threshold: f64,
    /// Multiplier applied to the IQR when computing anomaly bounds.
    pub iqr_multiplier: f64,
    pub paths: StagePaths,
}

/// Per-stage object keys, slash-separated paths within the bucket.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StagePaths {
    pub raw_transactions: String,
    pub raw_fraud_labels: String,
    pub raw_cards: String,
    pub raw_users: String,
    pub raw_mcc_codes: String,
    pub sampled_transactions: String,
    pub sampled_fraud_labels: String,
    pub merged: String,
    pub cleaned: String,
    pub annotated: String,
    pub fraud_by_day: String,
    pub fraud_by_region: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            bucket: constants::DEFAULT_BUCKET.to_string(),
            sample_size: constants::DEFAULT_SAMPLE_SIZE,
            sample_seed: constants::DEFAULT_SAMPLE_SEED,
            missing_threshold: constants::DEFAULT_MISSING_THRESHOLD,
            iqr_multiplier: constants::DEFAULT_IQR_MULTIPLIER,
            paths: StagePaths::default(),
        }
    }
}

impl Default for StagePaths {
    fn default() -> Self {
        Self {
            raw_transactions: format!("{}transactions_data.csv", constants::RAW_PREFIX),
            raw_fraud_labels: format!("{}train_fraud_labels.json", constants::RAW_PREFIX),
            raw_cards: format!("{}cards_data.csv", constants::RAW_PREFIX),
            raw_users: format!("{}users_data.csv", constants::RAW_PREFIX),
            raw_mcc_codes: format!("{}mcc_codes.json", constants::RAW_PREFIX),
            sampled_transactions: format!("{}transactions_data.csv", constants::SAMPLED_PREFIX),
            sampled_fraud_labels: format!("{}train_fraud_labels.json", constants::SAMPLED_PREFIX),
            merged: format!("{}merged_dataset_final.csv", constants::PROCESSED_PREFIX),
            cleaned: format!("{}cleaned_dataset_final.csv", constants::PROCESSED_PREFIX),
            annotated: format!("{}annotated_dataset_final.csv", constants::PROCESSED_PREFIX),
            fraud_by_day: format!("{}fraud_by_day.csv", constants::AGGREGATES_PREFIX),
            fraud_by_region: format!("{}fraud_by_region.csv", constants::AGGREGATES_PREFIX),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// any omitted option.
    pub fn load(config_path: &str) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path, e
            ))
        })?;

        let config: PipelineConfig = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds outside their documented ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.missing_threshold) {
            return Err(PipelineError::Config(format!(
                "missing_threshold must be within [0, 1], got {}",
                self.missing_threshold
            )));
        }
        if self.iqr_multiplier <= 0.0 {
            return Err(PipelineError::Config(format!(
                "iqr_multiplier must be positive, got {}",
                self.iqr_multiplier
            )));
        }
        if self.sample_size == 0 {
            return Err(PipelineError::Config(
                "sample_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
