//! Evaluation of a compiled rule table against measurement records.
pub mod blend;
pub mod engine;
pub mod hybrid;
pub mod predictor;
pub mod record;

pub use blend::{blend, blend_record, BlendPolicy};
pub use engine::{infer, InferenceEngine, InferenceReport};
pub use hybrid::{Estimate, HybridEstimator};
pub use predictor::{PredictionError, Predictor};
pub use record::{Entry, Provenance, Record};
