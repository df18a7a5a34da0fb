//! Boundary to the statistical predictor.
//!
//! The model itself lives outside this crate; it is consumed through the
//! [`Predictor`] trait over fixed input and target schemas.

use super::record::Record;
use crate::store::FieldName;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Predictor failed: {0}")]
    Failed(String),
    #[error("Predictor returned {actual} value(s) for {expected} target(s)")]
    SchemaMismatch { expected: usize, actual: usize },
}

pub trait Predictor {
    /// Features the model expects, in order.
    fn input_schema(&self) -> &[FieldName];

    /// Fields the model predicts, in output order.
    fn target_schema(&self) -> &[FieldName];

    /// Predicts every target. Missing features are passed as `None`.
    fn predict(&self, features: &[Option<f64>]) -> Result<Vec<f64>, PredictionError>;
}

/// Feature vector over `schema` built from the record's supplied values only.
pub fn feature_vector(schema: &[FieldName], record: &Record) -> Vec<Option<f64>> {
    schema
        .iter()
        .map(|f| if record.is_supplied(f) { record.get(f) } else { None })
        .collect()
}

/// Runs the predictor and pairs each output with its target field.
pub fn predict_targets<P>(predictor: &P, record: &Record) -> Result<Vec<(FieldName, f64)>, PredictionError>
where
    P: Predictor + ?Sized,
{
    let features = feature_vector(predictor.input_schema(), record);
    let values = predictor.predict(&features)?;

    let targets = predictor.target_schema();
    if values.len() != targets.len() {
        return Err(PredictionError::SchemaMismatch { expected: targets.len(), actual: values.len() });
    }
    Ok(targets.iter().cloned().zip(values).collect())
}
