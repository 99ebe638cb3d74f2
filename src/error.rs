//! Error types for encoding, feature building and inference

use thiserror::Error;

/// Errors that can occur while turning a request into a prediction
#[derive(Error, Debug)]
pub enum PredictError {
    /// Label outside the closed set declared for its field
    #[error("Unknown category for {field}: {label:?}")]
    UnknownCategory { field: &'static str, label: String },

    /// Field name that is not one of the categorical fields
    #[error("Unknown categorical field: {0}")]
    UnknownField(String),

    /// Request value outside its field domain
    #[error("Invalid input: {field} - {message}")]
    InvalidInput { field: &'static str, message: String },

    /// Model artifact or its feature manifest could not be loaded
    #[error("Model artifact unavailable at {path}: {reason}")]
    ModelUnavailable { path: String, reason: String },

    /// ONNX Runtime failure while running a session
    #[error("Inference error: {0}")]
    Inference(#[from] ort::Error),

    /// Model ran but produced output we cannot read a label from
    #[error("Malformed model output: {0}")]
    MalformedOutput(String),

    /// Model produced a class other than 0 or 1
    #[error("Unexpected label from model: {0}")]
    UnexpectedLabel(i64),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for prediction operations
pub type PredictResult<T> = Result<T, PredictError>;

impl PredictError {
    /// Errors that require a human to fix the deployment before any
    /// prediction can succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PredictError::ModelUnavailable { .. })
    }

    /// Errors caused by the caller's input rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            PredictError::UnknownCategory { .. }
                | PredictError::UnknownField(_)
                | PredictError::InvalidInput { .. }
        )
    }

    /// Short machine-readable kind, used in error replies
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::UnknownCategory { .. } => "unknown_category",
            PredictError::UnknownField(_) => "unknown_field",
            PredictError::InvalidInput { .. } => "invalid_input",
            PredictError::ModelUnavailable { .. } => "model_unavailable",
            PredictError::Inference(_) => "inference",
            PredictError::MalformedOutput(_) => "malformed_output",
            PredictError::UnexpectedLabel(_) => "unexpected_label",
            PredictError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let unknown = PredictError::UnknownCategory {
            field: "City",
            label: "Paris".to_string(),
        };
        assert!(unknown.is_client_error());
        assert!(!unknown.is_fatal());
        assert_eq!(unknown.kind(), "unknown_category");
        assert_eq!(unknown.to_string(), "Unknown category for City: \"Paris\"");

        let missing = PredictError::ModelUnavailable {
            path: "models/xgboost_churn.onnx".to_string(),
            reason: "file not found".to_string(),
        };
        assert!(missing.is_fatal());
        assert!(!missing.is_client_error());
    }
}
