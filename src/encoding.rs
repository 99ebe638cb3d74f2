//! Static category tables.
//!
//! Codes are the position of a label in its table. The tables must match the
//! label encoding the deployed models were trained with, so labels are never
//! reordered or inserted in the middle.

use crate::error::{PredictError, PredictResult};

pub const CUSTOMER_CATEGORIES: &[&str] =
    &["Student", "Teenager", "Middle-Aged", "Senior Citizen", "Retiree"];

pub const CITIES: &[&str] = &[
    "New York",
    "Chicago",
    "Los Angeles",
    "San Francisco",
    "Boston",
    "Dallas",
    "Seattle",
    "Houston",
    "Miami",
];

pub const STORE_TYPES: &[&str] = &["Department Store", "Warehouse Club", "Pharmacy", "Supermarket"];

pub const PAYMENT_METHODS: &[&str] = &["Credit Card", "Debit Card", "Cash"];

/// Day abbreviations, Monday first. `DayOfWeek` is position + 1.
pub const DAY_LABELS: &[&str] = &["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// The categorical fields of the churn model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CategoricalField {
    CustomerCategory,
    City,
    StoreType,
    PaymentMethod,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 4] = [
        CategoricalField::CustomerCategory,
        CategoricalField::City,
        CategoricalField::StoreType,
        CategoricalField::PaymentMethod,
    ];

    /// Training-time column name
    pub fn column_name(self) -> &'static str {
        match self {
            CategoricalField::CustomerCategory => "Customer_Category",
            CategoricalField::City => "City",
            CategoricalField::StoreType => "Store_Type",
            CategoricalField::PaymentMethod => "Payment_Method",
        }
    }

    pub fn labels(self) -> &'static [&'static str] {
        match self {
            CategoricalField::CustomerCategory => CUSTOMER_CATEGORIES,
            CategoricalField::City => CITIES,
            CategoricalField::StoreType => STORE_TYPES,
            CategoricalField::PaymentMethod => PAYMENT_METHODS,
        }
    }

    pub fn domain_size(self) -> usize {
        self.labels().len()
    }

    /// Look up a field by its column name
    pub fn from_column_name(name: &str) -> PredictResult<Self> {
        Self::ALL
            .into_iter()
            .find(|field| field.column_name() == name)
            .ok_or_else(|| PredictError::UnknownField(name.to_string()))
    }
}

/// Encode a label of a categorical field into its integer code.
///
/// Matching is exact. Any label outside the field's table is rejected.
pub fn encode(field: CategoricalField, label: &str) -> PredictResult<i64> {
    field
        .labels()
        .iter()
        .position(|&known| known == label)
        .map(|code| code as i64)
        .ok_or_else(|| PredictError::UnknownCategory {
            field: field.column_name(),
            label: label.to_string(),
        })
}

/// Encode by training-time column name, e.g. `"City"`.
pub fn encode_by_name(field_name: &str, label: &str) -> PredictResult<i64> {
    encode(CategoricalField::from_column_name(field_name)?, label)
}

/// Map a day abbreviation to `DayOfWeek` (Mon = 1 .. Sun = 7).
pub fn day_of_week(label: &str) -> PredictResult<i64> {
    DAY_LABELS
        .iter()
        .position(|&day| day == label)
        .map(|idx| idx as i64 + 1)
        .ok_or_else(|| PredictError::UnknownCategory {
            field: "DayOfWeek",
            label: label.to_string(),
        })
}
