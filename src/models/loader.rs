//! ONNX model loader

use crate::config::ModelsConfig;
use crate::error::{PredictError, PredictResult};
use crate::feature_extractor::{CHURN_FEATURES, HIGH_SPEND_FEATURES};
use crate::models::inference::Classifier;
use crate::types::outcome::PredictionContext;
use ort::session::{builder::GraphOptimizationLevel, Session};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// Loaded ONNX classifier with its column metadata
pub struct OnnxClassifier {
    /// Model name
    pub(crate) name: String,
    /// ONNX Runtime session, serialized per model
    pub(crate) session: Mutex<Session>,
    /// Input name for the model
    pub(crate) input_name: String,
    /// Output carrying the predicted class, if the export has one
    pub(crate) label_output: Option<String>,
    /// Output carrying class probabilities, if the export has one
    pub(crate) probability_output: Option<String>,
    /// Training column order
    pub(crate) feature_names: Vec<String>,
    /// Positive-class cutoff used when only probabilities are exported
    pub(crate) decision_threshold: f64,
}

/// Sidecar file describing the training columns of a model.
///
/// Stored next to the artifact as `<file stem>.features.json`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FeatureManifest {
    pub feature_names: Vec<String>,
}

impl FeatureManifest {
    /// Canonical training columns of a context
    pub fn canonical(context: PredictionContext) -> Self {
        let names: &[&str] = match context {
            PredictionContext::HighSpend => &HIGH_SPEND_FEATURES,
            PredictionContext::Churn => &CHURN_FEATURES,
        };
        Self {
            feature_names: names.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Sidecar path for a model artifact
    pub fn path_for(model_path: &Path) -> PathBuf {
        model_path.with_extension("features.json")
    }

    /// Read the manifest next to `model_path`, falling back to the
    /// canonical columns when there is none.
    pub fn load_or_canonical(model_path: &Path, context: PredictionContext) -> PredictResult<Self> {
        let path = Self::path_for(model_path);
        if !path.exists() {
            warn!(
                context = %context,
                manifest = %path.display(),
                "Feature manifest not found, using canonical column order"
            );
            return Ok(Self::canonical(context));
        }

        let unavailable = |reason: String| PredictError::ModelUnavailable {
            path: path.display().to_string(),
            reason,
        };
        let raw = std::fs::read_to_string(&path).map_err(|e| unavailable(e.to_string()))?;
        let manifest: FeatureManifest =
            serde_json::from_str(&raw).map_err(|e| unavailable(e.to_string()))?;

        if manifest.feature_names.is_empty() {
            return Err(unavailable("manifest lists no feature names".to_string()));
        }
        Ok(manifest)
    }
}

/// Fail with `ModelUnavailable` unless the artifact exists.
pub fn ensure_artifact(path: &Path) -> PredictResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PredictError::ModelUnavailable {
            path: path.display().to_string(),
            reason: "file not found".to_string(),
        })
    }
}

/// Where a context's model handle comes from
pub trait ModelSource: Send + Sync {
    fn load(&self, context: PredictionContext) -> PredictResult<Arc<dyn Classifier>>;
}

/// Loader for ONNX models
pub struct ModelLoader {
    /// Number of threads for ONNX inference
    onnx_threads: usize,
    decision_threshold: f64,
}

impl ModelLoader {
    /// Create a new model loader with specified number of threads
    pub fn with_threads(onnx_threads: usize) -> PredictResult<Self> {
        // Initialize ONNX Runtime
        ort::init().commit()?;
        info!(onnx_threads = onnx_threads, "ONNX Runtime initialized");
        Ok(Self {
            onnx_threads,
            decision_threshold: 0.5,
        })
    }

    pub fn with_decision_threshold(mut self, threshold: f64) -> Self {
        self.decision_threshold = threshold;
        self
    }

    /// Load a single ONNX classifier and its feature manifest.
    pub fn load_model<P: AsRef<Path>>(
        &self,
        path: P,
        context: PredictionContext,
    ) -> PredictResult<OnnxClassifier> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| context.to_string());

        ensure_artifact(path)?;
        let manifest = FeatureManifest::load_or_canonical(path, context)?;

        info!(model = %name, path = %path.display(), threads = self.onnx_threads, "Loading ONNX model");

        let session = self
            .build_session(path)
            .map_err(|reason| PredictError::ModelUnavailable {
                path: path.display().to_string(),
                reason,
            })?;

        let input_name = session
            .inputs
            .first()
            .map(|i| i.name.clone())
            .unwrap_or_else(|| "float_input".to_string());

        let label_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("label"))
            .map(|o| o.name.clone());

        let probability_output = session
            .outputs
            .iter()
            .find(|o| o.name.contains("prob"))
            .map(|o| o.name.clone());

        info!(
            model = %name,
            input = %input_name,
            label_output = ?label_output,
            probability_output = ?probability_output,
            columns = manifest.feature_names.len(),
            "Model loaded successfully"
        );

        Ok(OnnxClassifier {
            name,
            session: Mutex::new(session),
            input_name,
            label_output,
            probability_output,
            feature_names: manifest.feature_names,
            decision_threshold: self.decision_threshold,
        })
    }

    fn build_session(&self, path: &Path) -> Result<Session, String> {
        Session::builder()
            .map_err(|e| e.to_string())?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| e.to_string())?
            .with_intra_threads(self.onnx_threads)
            .map_err(|e| e.to_string())?
            .commit_from_file(path)
            .map_err(|e| e.to_string())
    }
}

/// Model source reading the artifacts named in `ModelsConfig`.
pub struct OnnxModelSource {
    loader: ModelLoader,
    config: ModelsConfig,
}

impl OnnxModelSource {
    pub fn new(config: &ModelsConfig) -> PredictResult<Self> {
        let loader = ModelLoader::with_threads(config.onnx_threads)?
            .with_decision_threshold(config.decision_threshold);
        Ok(Self {
            loader,
            config: config.clone(),
        })
    }
}

impl ModelSource for OnnxModelSource {
    fn load(&self, context: PredictionContext) -> PredictResult<Arc<dyn Classifier>> {
        let path = self.config.artifact_path(context);
        let model = self.loader.load_model(&path, context)?;
        Ok(Arc::new(model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_artifact_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let err = ensure_artifact(&dir.path().join("random_forest_high_spend.onnx")).unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, PredictError::ModelUnavailable { ref reason, .. } if reason == "file not found"));
    }

    #[test]
    fn test_manifest_path() {
        let path = FeatureManifest::path_for(Path::new("models/xgboost_churn.onnx"));
        assert_eq!(path, PathBuf::from("models/xgboost_churn.features.json"));
    }

    #[test]
    fn test_manifest_from_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("random_forest_high_spend.onnx");
        std::fs::write(
            FeatureManifest::path_for(&model_path),
            r#"{"feature_names": ["Basket_Size", "Avg_Item_Price", "DayOfWeek", "Hour"]}"#,
        )
        .unwrap();

        let manifest =
            FeatureManifest::load_or_canonical(&model_path, PredictionContext::HighSpend).unwrap();
        assert_eq!(manifest.feature_names.len(), 4);
        assert_eq!(manifest.feature_names[3], "Hour");
    }

    #[test]
    fn test_manifest_falls_back_to_canonical() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("xgboost_churn.onnx");

        let manifest =
            FeatureManifest::load_or_canonical(&model_path, PredictionContext::Churn).unwrap();
        assert_eq!(manifest, FeatureManifest::canonical(PredictionContext::Churn));
        assert_eq!(manifest.feature_names[0], "Recency");
    }

    #[test]
    fn test_corrupt_manifest_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("xgboost_churn.onnx");
        std::fs::write(FeatureManifest::path_for(&model_path), "not json").unwrap();

        let err = FeatureManifest::load_or_canonical(&model_path, PredictionContext::Churn)
            .unwrap_err();
        assert!(err.is_fatal());

        std::fs::write(FeatureManifest::path_for(&model_path), r#"{"feature_names": []}"#).unwrap();
        assert!(FeatureManifest::load_or_canonical(&model_path, PredictionContext::Churn).is_err());
    }
}
