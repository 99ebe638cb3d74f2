//! Type definitions for prediction requests and replies

pub mod outcome;
pub mod request;

pub use outcome::{Label, PredictionContext, PredictionResponse, Reply};
pub use request::{ChurnInput, HighSpendInput, PredictionRequest};
