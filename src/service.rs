//! Request handling: validate, build features, predict, map the outcome

use crate::consumer;
use crate::error::{PredictError, PredictResult};
use crate::feature_extractor::{FeatureExtractor, FeatureRecord};
use crate::metrics::PredictionMetrics;
use crate::models::inference;
use crate::models::registry::ModelRegistry;
use crate::types::outcome::{PredictionContext, PredictionResponse, Reply};
use crate::types::request::{ChurnInput, HighSpendInput, PredictionRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Turns prediction requests into replies.
///
/// Stateless per request; the only shared state is the model registry and
/// the metrics collector.
pub struct PredictionService {
    registry: Arc<ModelRegistry>,
    extractor: FeatureExtractor,
    metrics: Arc<PredictionMetrics>,
}

impl PredictionService {
    pub fn new(registry: Arc<ModelRegistry>, extractor: FeatureExtractor) -> Self {
        Self {
            registry,
            extractor,
            metrics: Arc::new(PredictionMetrics::new()),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<PredictionMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &Arc<PredictionMetrics> {
        &self.metrics
    }

    pub fn predict_high_spend(&self, input: &HighSpendInput) -> PredictResult<PredictionResponse> {
        self.handle(&PredictionRequest::HighSpend(input.clone()))
    }

    pub fn predict_churn(&self, input: &ChurnInput) -> PredictResult<PredictionResponse> {
        self.handle(&PredictionRequest::Churn(input.clone()))
    }

    /// Answer a raw request payload.
    ///
    /// Inference runs on the blocking pool since ONNX sessions are
    /// synchronous.
    pub async fn reply_to(self: Arc<Self>, payload: &[u8]) -> Reply {
        let request = match consumer::decode_request(payload) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Failed to deserialize prediction request");
                return Reply::malformed_request(e.to_string());
            }
        };

        match tokio::task::spawn_blocking(move || self.handle(&request)).await {
            Ok(result) => Reply::from_result(result),
            Err(e) => {
                error!(error = %e, "Prediction task failed");
                Reply::from_result(Err(PredictError::Internal(e.to_string())))
            }
        }
    }

    /// Run one request end to end and record its metrics.
    pub fn handle(&self, request: &PredictionRequest) -> PredictResult<PredictionResponse> {
        let start_time = Instant::now();
        let context = context_of(request);

        let result = self.run(request, context);
        let elapsed = start_time.elapsed();

        match &result {
            Ok(response) => {
                self.metrics.record_prediction(context, response.label, elapsed);
                info!(
                    context = %context,
                    request_id = %response.request_id,
                    label = response.label.as_u8(),
                    outcome = %response.outcome,
                    processing_time_us = elapsed.as_micros(),
                    "Prediction served"
                );
            }
            Err(e) => {
                self.metrics.record_failure(e.kind());
            }
        }

        result
    }

    fn run(
        &self,
        request: &PredictionRequest,
        context: PredictionContext,
    ) -> PredictResult<PredictionResponse> {
        request.validate()?;
        let record = self.build(request)?;

        let model = self.registry.get(context)?;
        let prediction = inference::predict(model.as_ref(), &record)?;

        if !prediction.filled_columns.is_empty() {
            self.metrics
                .record_filled_columns(prediction.filled_columns.len());
        }

        Ok(PredictionResponse::new(context, prediction.label))
    }

    /// Feature record for a request, without touching any model
    pub fn build(&self, request: &PredictionRequest) -> PredictResult<FeatureRecord> {
        let record = match request {
            PredictionRequest::HighSpend(input) => self.extractor.high_spend(input)?,
            PredictionRequest::Churn(input) => self.extractor.churn(input)?,
        };
        debug!(context = %context_of(request), features = ?record, "Feature record built");
        Ok(record)
    }
}

fn context_of(request: &PredictionRequest) -> PredictionContext {
    match request {
        PredictionRequest::HighSpend(_) => PredictionContext::HighSpend,
        PredictionRequest::Churn(_) => PredictionContext::Churn,
    }
}
