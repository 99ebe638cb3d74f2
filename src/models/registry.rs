//! Process-lifetime model handles

use crate::error::{PredictError, PredictResult};
use crate::models::inference::Classifier;
use crate::models::loader::ModelSource;
use crate::types::outcome::PredictionContext;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::info;

/// Holds one classifier per context.
///
/// Each handle is loaded at most once, under `init_lock`, and is never
/// replaced or evicted. Reads after initialization take no lock. A failed
/// load leaves the slot empty and is returned to the caller.
pub struct ModelRegistry {
    source: Box<dyn ModelSource>,
    high_spend: OnceLock<Arc<dyn Classifier>>,
    churn: OnceLock<Arc<dyn Classifier>>,
    init_lock: Mutex<()>,
}

impl ModelRegistry {
    pub fn new(source: impl ModelSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            high_spend: OnceLock::new(),
            churn: OnceLock::new(),
            init_lock: Mutex::new(()),
        }
    }

    fn slot(&self, context: PredictionContext) -> &OnceLock<Arc<dyn Classifier>> {
        match context {
            PredictionContext::HighSpend => &self.high_spend,
            PredictionContext::Churn => &self.churn,
        }
    }

    /// Model handle for `context`, loading it on first use.
    pub fn get(&self, context: PredictionContext) -> PredictResult<Arc<dyn Classifier>> {
        let slot = self.slot(context);
        if let Some(model) = slot.get() {
            return Ok(Arc::clone(model));
        }

        let _guard = self
            .init_lock
            .lock()
            .map_err(|e| PredictError::Internal(format!("Model init lock poisoned: {}", e)))?;

        // Another caller may have finished loading while we waited
        if let Some(model) = slot.get() {
            return Ok(Arc::clone(model));
        }

        let model = self.source.load(context)?;
        info!(
            context = %context,
            model = %model.name(),
            columns = model.feature_names().len(),
            "Model handle initialized"
        );
        let _ = slot.set(Arc::clone(&model));
        Ok(model)
    }

    /// Load both models now. Used at server startup so a missing artifact
    /// aborts the process before any request is accepted.
    pub fn preload(&self) -> PredictResult<()> {
        for context in PredictionContext::ALL {
            self.get(context)?;
        }
        Ok(())
    }

    pub fn is_loaded(&self, context: PredictionContext) -> bool {
        self.slot(context).get().is_some()
    }
}
