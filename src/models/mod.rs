//! ML model loading and inference components

pub mod inference;
pub mod loader;
pub mod registry;

pub use inference::{align_to_columns, predict, AlignedRow, Classifier, Prediction};
pub use loader::{ModelLoader, ModelSource, OnnxModelSource};
pub use registry::ModelRegistry;
