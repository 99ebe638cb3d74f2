//! Feature extraction for the high-spend and churn models.
//!
//! Builds single-row named feature records whose column names match the
//! names the models were trained with. Column order is resolved later by the
//! inference adapter against each model's own column list.

use crate::encoding::{self, CategoricalField};
use crate::error::PredictResult;
use crate::types::request::{ChurnInput, HighSpendInput};

/// Training column order of the high-spend model
pub const HIGH_SPEND_FEATURES: [&str; 5] =
    ["Basket_Size", "Avg_Item_Price", "DayOfWeek", "Hour", "Basket_Value"];

/// Training column order of the churn model
pub const CHURN_FEATURES: [&str; 7] = [
    "Recency",
    "Frequency",
    "Monetary",
    "Customer_Category",
    "City",
    "Store_Type",
    "Payment_Method",
];

/// Ranges the churn training pipeline clipped its RFM columns to.
pub const RECENCY_RANGE: (f64, f64) = (50.0, 700.0);
pub const FREQUENCY_RANGE: (i64, i64) = (0, 20);
pub const MONETARY_RANGE: (f64, f64) = (50.0, 550.0);

/// A single feature value, keeping the integer/float distinction of the
/// training frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureValue {
    Int(i64),
    Float(f64),
}

impl FeatureValue {
    /// Value as fed to the ONNX input tensor
    pub fn as_f32(self) -> f32 {
        match self {
            FeatureValue::Int(v) => v as f32,
            FeatureValue::Float(v) => v as f32,
        }
    }
}

/// One named row of features, built per request and consumed once.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureRecord {
    fields: Vec<(&'static str, FeatureValue)>,
}

impl FeatureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing an earlier value of the same name.
    pub fn insert(&mut self, name: &'static str, value: FeatureValue) {
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn with(mut self, name: &'static str, value: FeatureValue) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<FeatureValue> {
        self.fields
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, value)| *value)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|(name, _)| *name).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FeatureValue)> + '_ {
        self.fields.iter().copied()
    }
}

/// Feature extractor that turns request inputs into model feature records.
///
/// Categorical labels are encoded here, before the model boundary; the
/// models only ever see integer codes.
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    /// Clip Recency/Frequency/Monetary to the training ranges before
    /// inference. Only for models whose exported graph expects it.
    clip_churn_inputs: bool,
}

impl FeatureExtractor {
    /// Create a new feature extractor without inference-time clipping.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_churn_clipping(clip_churn_inputs: bool) -> Self {
        Self { clip_churn_inputs }
    }

    pub fn clips_churn_inputs(&self) -> bool {
        self.clip_churn_inputs
    }

    /// Build the high-spend record.
    ///
    /// Basket_Value is the exact product of basket size and average price.
    pub fn high_spend(&self, input: &HighSpendInput) -> PredictResult<FeatureRecord> {
        let day_of_week = encoding::day_of_week(&input.day)?;
        let basket_value = input.basket_size as f64 * input.avg_item_price;

        Ok(FeatureRecord::new()
            .with("Basket_Size", FeatureValue::Int(input.basket_size))
            .with("Avg_Item_Price", FeatureValue::Float(input.avg_item_price))
            .with("DayOfWeek", FeatureValue::Int(day_of_week))
            .with("Hour", FeatureValue::Int(input.hour))
            .with("Basket_Value", FeatureValue::Float(basket_value)))
    }

    /// Build the churn record, encoding the four categorical labels.
    pub fn churn(&self, input: &ChurnInput) -> PredictResult<FeatureRecord> {
        let (recency, frequency, monetary) = if self.clip_churn_inputs {
            (
                input.recency.clamp(RECENCY_RANGE.0, RECENCY_RANGE.1),
                input.frequency.clamp(FREQUENCY_RANGE.0, FREQUENCY_RANGE.1),
                input.monetary.clamp(MONETARY_RANGE.0, MONETARY_RANGE.1),
            )
        } else {
            (input.recency, input.frequency, input.monetary)
        };

        let mut record = FeatureRecord::new()
            .with("Recency", FeatureValue::Float(recency))
            .with("Frequency", FeatureValue::Int(frequency))
            .with("Monetary", FeatureValue::Float(monetary));

        let labels = [
            (CategoricalField::CustomerCategory, &input.customer_category),
            (CategoricalField::City, &input.city),
            (CategoricalField::StoreType, &input.store_type),
            (CategoricalField::PaymentMethod, &input.payment_method),
        ];
        for (field, label) in labels {
            let code = encoding::encode(field, label)?;
            record.insert(field.column_name(), FeatureValue::Int(code));
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredictError;
    use proptest::prelude::*;

    fn churn_input(category: &str, city: &str, store: &str, payment: &str) -> ChurnInput {
        ChurnInput {
            recency: 30.0,
            frequency: 25,
            monetary: 600.0,
            customer_category: category.to_string(),
            city: city.to_string(),
            store_type: store.to_string(),
            payment_method: payment.to_string(),
        }
    }

    #[test]
    fn test_high_spend_record() {
        let extractor = FeatureExtractor::new();
        let record = extractor
            .high_spend(&HighSpendInput::new(3, 20.0, "Wed", 14))
            .unwrap();

        assert_eq!(record.names(), HIGH_SPEND_FEATURES.to_vec());
        assert_eq!(record.get("Basket_Size"), Some(FeatureValue::Int(3)));
        assert_eq!(record.get("Avg_Item_Price"), Some(FeatureValue::Float(20.0)));
        assert_eq!(record.get("DayOfWeek"), Some(FeatureValue::Int(3)));
        assert_eq!(record.get("Hour"), Some(FeatureValue::Int(14)));
        assert_eq!(record.get("Basket_Value"), Some(FeatureValue::Float(60.0)));
    }

    #[test]
    fn test_day_mapping_edges() {
        let extractor = FeatureExtractor::new();
        let monday = extractor.high_spend(&HighSpendInput::new(1, 1.0, "Mon", 0)).unwrap();
        let sunday = extractor.high_spend(&HighSpendInput::new(1, 1.0, "Sun", 23)).unwrap();

        assert_eq!(monday.get("DayOfWeek"), Some(FeatureValue::Int(1)));
        assert_eq!(sunday.get("DayOfWeek"), Some(FeatureValue::Int(7)));
    }

    #[test]
    fn test_churn_record_codes() {
        let extractor = FeatureExtractor::new();
        let record = extractor
            .churn(&churn_input("Retiree", "Miami", "Pharmacy", "Cash"))
            .unwrap();

        assert_eq!(record.names(), CHURN_FEATURES.to_vec());
        assert_eq!(record.get("Customer_Category"), Some(FeatureValue::Int(4)));
        assert_eq!(record.get("City"), Some(FeatureValue::Int(8)));
        assert_eq!(record.get("Store_Type"), Some(FeatureValue::Int(2)));
        assert_eq!(record.get("Payment_Method"), Some(FeatureValue::Int(2)));
    }

    #[test]
    fn test_churn_inputs_not_clipped_by_default() {
        let extractor = FeatureExtractor::new();
        let record = extractor
            .churn(&churn_input("Student", "Boston", "Supermarket", "Debit Card"))
            .unwrap();

        assert_eq!(record.get("Recency"), Some(FeatureValue::Float(30.0)));
        assert_eq!(record.get("Frequency"), Some(FeatureValue::Int(25)));
        assert_eq!(record.get("Monetary"), Some(FeatureValue::Float(600.0)));
    }

    #[test]
    fn test_churn_clipping_when_enabled() {
        let extractor = FeatureExtractor::with_churn_clipping(true);
        let record = extractor
            .churn(&churn_input("Student", "Boston", "Supermarket", "Debit Card"))
            .unwrap();

        assert_eq!(record.get("Recency"), Some(FeatureValue::Float(50.0)));
        assert_eq!(record.get("Frequency"), Some(FeatureValue::Int(20)));
        assert_eq!(record.get("Monetary"), Some(FeatureValue::Float(550.0)));
    }

    #[test]
    fn test_unknown_category_propagates() {
        let extractor = FeatureExtractor::new();
        let err = extractor
            .churn(&churn_input("Retiree", "Paris", "Pharmacy", "Cash"))
            .unwrap_err();
        assert!(matches!(err, PredictError::UnknownCategory { field: "City", .. }));

        let err = extractor
            .high_spend(&HighSpendInput::new(3, 20.0, "Funday", 14))
            .unwrap_err();
        assert!(matches!(err, PredictError::UnknownCategory { field: "DayOfWeek", .. }));
    }

    #[test]
    fn test_record_insert_replaces() {
        let mut record = FeatureRecord::new().with("Hour", FeatureValue::Int(1));
        record.insert("Hour", FeatureValue::Int(2));
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("Hour"), Some(FeatureValue::Int(2)));
        assert_eq!(record.get("Minute"), None);
    }

    proptest! {
        #[test]
        fn basket_value_is_exact_product(size in 1i64..10_000, price in 1.0f64..100_000.0) {
            let extractor = FeatureExtractor::new();
            let record = extractor
                .high_spend(&HighSpendInput::new(size, price, "Fri", 12))
                .unwrap();
            prop_assert_eq!(
                record.get("Basket_Value"),
                Some(FeatureValue::Float(size as f64 * price))
            );
        }
    }
}
