//! Retail Predictor Library
//!
//! Encodes retail inputs into the feature rows two pre-trained classifiers
//! expect, and serves their high-spend and churn predictions.

pub mod cli;
pub mod config;
pub mod consumer;
pub mod encoding;
pub mod error;
pub mod feature_extractor;
pub mod metrics;
pub mod models;
pub mod producer;
pub mod service;
pub mod types;

pub use config::AppConfig;
pub use error::{PredictError, PredictResult};
pub use feature_extractor::{FeatureExtractor, FeatureRecord, FeatureValue};
pub use models::{Classifier, ModelRegistry};
pub use service::PredictionService;
pub use types::{ChurnInput, HighSpendInput, Label, PredictionContext, PredictionRequest, Reply};
