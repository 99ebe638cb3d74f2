//! Inference adapter: column alignment and single-row prediction

use crate::error::{PredictError, PredictResult};
use crate::feature_extractor::FeatureRecord;
use crate::models::loader::OnnxClassifier;
use crate::types::outcome::Label;
use ort::memory::Allocator;
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use tracing::{debug, warn};

/// Value used for any column a model expects but the record lacks.
///
/// Zero-filling keeps the row the width the model was trained with. A
/// structurally required column that is missing therefore degrades the
/// prediction rather than failing it.
pub const MISSING_FEATURE_FILL: f32 = 0.0;

/// A trained binary classifier over a single row of named columns.
///
/// Handles are immutable after loading and shared across callers.
pub trait Classifier: Send + Sync {
    /// Model name used in logs and metrics
    fn name(&self) -> &str;

    /// Ordered column names the model was trained with
    fn feature_names(&self) -> &[String];

    /// Predict the label of one row laid out as `feature_names()`
    fn predict_row(&self, row: &[f32]) -> PredictResult<Label>;
}

/// A feature record laid out in a model's column order
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRow {
    /// One value per expected column, in model order
    pub values: Vec<f32>,
    /// Expected columns the record did not provide (set to `MISSING_FEATURE_FILL`)
    pub filled: Vec<String>,
    /// Record columns the model does not use
    pub dropped: Vec<String>,
}

/// Reindex a record to `columns`.
///
/// Missing columns become `MISSING_FEATURE_FILL`, extra record columns are
/// dropped. Never fails.
pub fn align_to_columns(record: &FeatureRecord, columns: &[String]) -> AlignedRow {
    let mut values = Vec::with_capacity(columns.len());
    let mut filled = Vec::new();

    for column in columns {
        match record.get(column) {
            Some(value) => values.push(value.as_f32()),
            None => {
                values.push(MISSING_FEATURE_FILL);
                filled.push(column.clone());
            }
        }
    }

    let dropped = record
        .names()
        .into_iter()
        .filter(|name| !columns.iter().any(|column| column.as_str() == *name))
        .map(str::to_string)
        .collect();

    AlignedRow {
        values,
        filled,
        dropped,
    }
}

/// Result of one prediction
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: Label,
    /// Columns zero-filled during alignment. Logged and counted, never
    /// returned to the requester.
    pub filled_columns: Vec<String>,
}

/// Align a record to the model and predict its label.
///
/// Exactly one row in, one label out. No retries.
pub fn predict(model: &dyn Classifier, record: &FeatureRecord) -> PredictResult<Prediction> {
    let row = align_to_columns(record, model.feature_names());

    if !row.filled.is_empty() {
        warn!(
            model = %model.name(),
            filled = ?row.filled,
            "Record is missing model columns, filled with 0"
        );
    }
    if !row.dropped.is_empty() {
        debug!(model = %model.name(), dropped = ?row.dropped, "Dropped columns unknown to model");
    }

    let label = model.predict_row(&row.values)?;

    debug!(model = %model.name(), label = label.as_u8(), "Prediction complete");

    Ok(Prediction {
        label,
        filled_columns: row.filled,
    })
}

impl Classifier for OnnxClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    fn predict_row(&self, row: &[f32]) -> PredictResult<Label> {
        use ort::value::Tensor;

        // Input tensor shape [1, num_features]
        let shape = vec![1_i64, row.len() as i64];
        let input_tensor = Tensor::from_array((shape, row.to_vec()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| PredictError::Internal(format!("Session lock poisoned: {}", e)))?;

        let outputs = session.run(ort::inputs![self.input_name.as_str() => input_tensor])?;

        if let Some(label_output) = &self.label_output {
            if let Some(output) = outputs.get(label_output.as_str()) {
                if let Ok((_, data)) = output.try_extract_tensor::<i64>() {
                    return label_from_tensor(data).map_err(|e| with_model_name(&self.name, e));
                }
            }
        }

        // No usable label output: threshold the positive class probability
        let output_name = self.probability_output.as_deref().ok_or_else(|| {
            PredictError::MalformedOutput(format!("{}: no label or probability output", self.name))
        })?;
        let output = outputs.get(output_name).ok_or_else(|| {
            PredictError::MalformedOutput(format!("{}: output {} missing", self.name, output_name))
        })?;

        let probability = positive_probability(output, &self.name)?;
        debug!(model = %self.name, probability = probability, "Thresholding probability");

        Ok(label_from_probability(probability, self.decision_threshold))
    }
}

/// Label of a single-row `label` output.
pub fn label_from_tensor(data: &[i64]) -> PredictResult<Label> {
    let raw = data
        .first()
        .copied()
        .ok_or_else(|| PredictError::MalformedOutput("empty label tensor".to_string()))?;
    Label::try_from(raw)
}

/// Positive at or above `threshold`.
pub fn label_from_probability(probability: f64, threshold: f64) -> Label {
    if probability >= threshold {
        Label::Positive
    } else {
        Label::Negative
    }
}

/// Positive class probability of a single-row `[batch, classes]` tensor.
///
/// Two or more classes read column 1. A single column is taken as the
/// positive class probability itself.
pub fn probability_from_tensor(dims: &[i64], data: &[f32]) -> PredictResult<f64> {
    let classes = dims.last().copied().unwrap_or(0);
    match (classes, data) {
        (n, [_, positive, ..]) if n >= 2 => Ok(*positive as f64),
        (1, [single, ..]) => Ok(*single as f64),
        _ => Err(PredictError::MalformedOutput(format!(
            "unexpected probability shape {:?}",
            dims
        ))),
    }
}

/// Positive class probability from a `class id -> probability` map.
///
/// Falls back to `1 - p(0)` when class 1 is absent.
pub fn probability_from_class_map(pairs: &[(i64, f32)]) -> PredictResult<f64> {
    if let Some((_, prob)) = pairs.iter().find(|(class_id, _)| *class_id == 1) {
        return Ok(*prob as f64);
    }
    if let Some((_, prob)) = pairs.iter().find(|(class_id, _)| *class_id == 0) {
        return Ok(1.0 - *prob as f64);
    }
    Err(PredictError::MalformedOutput(
        "no class probability in map".to_string(),
    ))
}

fn with_model_name(model_name: &str, err: PredictError) -> PredictError {
    match err {
        PredictError::MalformedOutput(message) => {
            PredictError::MalformedOutput(format!("{}: {}", model_name, message))
        }
        other => other,
    }
}

/// Extract the positive class probability from a tensor output
/// (`[batch, classes]`) or a seq(map(int64, float)) output (zipmap exports).
fn positive_probability(output: &ort::value::DynValue, model_name: &str) -> PredictResult<f64> {
    if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
        let dims: Vec<i64> = shape.iter().copied().collect();
        return probability_from_tensor(&dims, data).map_err(|e| with_model_name(model_name, e));
    }

    let dtype = output.dtype();
    if DynSequenceValueType::can_downcast(&dtype) {
        return probability_from_sequence_map(output, model_name);
    }

    Err(PredictError::MalformedOutput(format!(
        "{}: unsupported probability output type",
        model_name
    )))
}

fn probability_from_sequence_map(
    output: &ort::value::DynValue,
    model_name: &str,
) -> PredictResult<f64> {
    let allocator = Allocator::default();

    let sequence = output
        .downcast_ref::<DynSequenceValueType>()
        .map_err(|e| PredictError::MalformedOutput(format!("{}: {}", model_name, e)))?;

    let maps = sequence.try_extract_sequence::<DynMapValueType>(&allocator)?;
    let map_value = maps.first().ok_or_else(|| {
        PredictError::MalformedOutput(format!("{}: empty probability sequence", model_name))
    })?;

    let kv_pairs = map_value.try_extract_key_values::<i64, f32>()?;
    probability_from_class_map(&kv_pairs).map_err(|e| with_model_name(model_name, e))
}
