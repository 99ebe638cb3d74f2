//! Prediction request data structures

use crate::error::{PredictError, PredictResult};
use serde::{Deserialize, Serialize};

/// Inputs of the high-spend model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighSpendInput {
    /// Number of items purchased (>= 1)
    pub basket_size: i64,

    /// Average item price (>= 1)
    pub avg_item_price: f64,

    /// Day abbreviation, "Mon" through "Sun"
    pub day: String,

    /// Hour of the transaction (0-23)
    pub hour: i64,
}

impl HighSpendInput {
    pub fn new(basket_size: i64, avg_item_price: f64, day: &str, hour: i64) -> Self {
        Self {
            basket_size,
            avg_item_price,
            day: day.to_string(),
            hour,
        }
    }

    /// Check numeric fields against their domains.
    ///
    /// The day label is checked later by the encoder.
    pub fn validate(&self) -> PredictResult<()> {
        if self.basket_size < 1 {
            return Err(invalid("Basket_Size", format!("must be >= 1, got {}", self.basket_size)));
        }
        check_finite_at_least("Avg_Item_Price", self.avg_item_price, 1.0)?;
        if !(0..=23).contains(&self.hour) {
            return Err(invalid("Hour", format!("must be within 0-23, got {}", self.hour)));
        }
        Ok(())
    }
}

/// Inputs of the churn model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnInput {
    /// Days since last purchase
    pub recency: f64,

    /// Number of purchases
    pub frequency: i64,

    /// Total spend
    pub monetary: f64,

    pub customer_category: String,
    pub city: String,
    pub store_type: String,
    pub payment_method: String,
}

impl ChurnInput {
    pub fn validate(&self) -> PredictResult<()> {
        check_finite_at_least("Recency", self.recency, 0.0)?;
        if self.frequency < 0 {
            return Err(invalid("Frequency", format!("must be >= 0, got {}", self.frequency)));
        }
        check_finite_at_least("Monetary", self.monetary, 0.0)?;
        Ok(())
    }
}

/// A single prediction request, tagged by the model it targets.
///
/// Wire form: `{"context": "high_spend", "basket_size": 3, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "context", rename_all = "snake_case")]
pub enum PredictionRequest {
    HighSpend(HighSpendInput),
    Churn(ChurnInput),
}

impl PredictionRequest {
    pub fn validate(&self) -> PredictResult<()> {
        match self {
            PredictionRequest::HighSpend(input) => input.validate(),
            PredictionRequest::Churn(input) => input.validate(),
        }
    }
}

fn check_finite_at_least(field: &'static str, value: f64, min: f64) -> PredictResult<()> {
    if !value.is_finite() {
        return Err(invalid(field, format!("must be a finite number, got {}", value)));
    }
    if value < min {
        return Err(invalid(field, format!("must be >= {}, got {}", min, value)));
    }
    Ok(())
}

fn invalid(field: &'static str, message: String) -> PredictError {
    PredictError::InvalidInput { field, message }
}
