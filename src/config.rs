//! Configuration management for the retail predictor

use crate::types::outcome::PredictionContext;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Default configuration file location
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub nats: NatsConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub preprocessing: PreprocessingConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// NATS connection configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming prediction requests
    pub request_subject: String,
    /// Queue group shared by all service instances
    pub queue_group: String,
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: "nats://localhost:4222".to_string(),
            request_subject: "retail.predict".to_string(),
            queue_group: "retail-predictor".to_string(),
        }
    }
}

/// Model artifact configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Directory containing the ONNX model files
    pub models_dir: String,
    /// High-spend classifier file name
    pub high_spend_file: String,
    /// Churn classifier file name
    pub churn_file: String,
    /// Number of threads for ONNX inference per model (default: 1)
    pub onnx_threads: usize,
    /// Positive-class cutoff for models exporting only probabilities
    pub decision_threshold: f64,
}

impl ModelsConfig {
    /// Local path of the artifact for a context
    pub fn artifact_path(&self, context: PredictionContext) -> PathBuf {
        let file = match context {
            PredictionContext::HighSpend => &self.high_spend_file,
            PredictionContext::Churn => &self.churn_file,
        };
        Path::new(&self.models_dir).join(file)
    }
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            models_dir: "models".to_string(),
            high_spend_file: "random_forest_high_spend.onnx".to_string(),
            churn_file: "xgboost_churn.onnx".to_string(),
            onnx_threads: 1,
            decision_threshold: 0.5,
        }
    }
}

/// Inference-time feature transforms
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PreprocessingConfig {
    /// Clip churn Recency/Frequency/Monetary to the training ranges.
    /// Enable only for models that were exported expecting clipped input.
    #[serde(default)]
    pub clip_churn_inputs: bool,
}

/// Request handling configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Maximum number of requests processed concurrently
    pub workers: usize,
    /// Seconds between metrics summaries in server mode
    pub metrics_interval_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            metrics_interval_secs: 30,
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
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file
    pub fn load() -> Result<Self> {
        Self::load_from_path(DEFAULT_CONFIG_PATH)
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load `path` if given, else the default file if it exists, else
    /// built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::load(),
            None => Ok(Self::default()),
        }
    }
}
