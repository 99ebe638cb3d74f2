//! Prediction outcomes and reply envelopes

use crate::error::{PredictError, PredictResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the two models a prediction belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionContext {
    HighSpend,
    Churn,
}

impl PredictionContext {
    pub const ALL: [PredictionContext; 2] = [PredictionContext::HighSpend, PredictionContext::Churn];

    pub fn as_str(self) -> &'static str {
        match self {
            PredictionContext::HighSpend => "high_spend",
            PredictionContext::Churn => "churn",
        }
    }

    /// Human-readable outcome for a label
    pub fn outcome(self, label: Label) -> &'static str {
        match (self, label) {
            (PredictionContext::HighSpend, Label::Positive) => "High Spender",
            (PredictionContext::HighSpend, Label::Negative) => "Normal Spender",
            (PredictionContext::Churn, Label::Positive) => "Likely to Churn",
            (PredictionContext::Churn, Label::Negative) => "Likely to Stay",
        }
    }
}

impl fmt::Display for PredictionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binary classifier output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    pub fn as_u8(self) -> u8 {
        match self {
            Label::Negative => 0,
            Label::Positive => 1,
        }
    }
}

impl TryFrom<i64> for Label {
    type Error = PredictError;

    fn try_from(value: i64) -> PredictResult<Self> {
        match value {
            0 => Ok(Label::Negative),
            1 => Ok(Label::Positive),
            other => Err(PredictError::UnexpectedLabel(other)),
        }
    }
}

impl Serialize for Label {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_u8())
    }
}

impl<'de> Deserialize<'de> for Label {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = i64::deserialize(deserializer)?;
        Label::try_from(raw).map_err(serde::de::Error::custom)
    }
}

/// Successful prediction reply
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Unique reply identifier
    pub request_id: String,

    pub context: PredictionContext,

    /// Raw model label (0 or 1)
    pub label: Label,

    /// Human-readable outcome, e.g. "Likely to Stay"
    pub outcome: String,

    pub timestamp: DateTime<Utc>,
}

impl PredictionResponse {
    pub fn new(context: PredictionContext, label: Label) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            context,
            label,
            outcome: context.outcome(label).to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Envelope published on the reply subject
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply {
    Ok(PredictionResponse),
    Error { kind: String, message: String },
}

impl Reply {
    pub fn from_result(result: PredictResult<PredictionResponse>) -> Self {
        match result {
            Ok(response) => Reply::Ok(response),
            Err(e) => Reply::Error {
                kind: e.kind().to_string(),
                message: e.to_string(),
            },
        }
    }

    /// Reply for a payload that could not be parsed as a request
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Reply::Error {
            kind: "malformed_request".to_string(),
            message: message.into(),
        }
    }
}
