//! Defines the error types for the validation module.
use crate::store::FieldName;

/// The specific category of a validation finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorType {
    /// A value lies outside the configured plausible range for its field.
    OutOfRange,
}

/// A structured report about one implausible value.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: FieldName,
    pub value: f64,
    pub min: f64,
    pub max: f64,
    pub kind: ValidationErrorType,
    /// A human-readable message explaining the finding.
    pub message: String,
}
