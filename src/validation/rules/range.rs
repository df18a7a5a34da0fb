//! Plausibility bounds on individual measurements.

use crate::compute::record::Entry;
use crate::config::Range;
use crate::store::FieldName;
use crate::validation::error::{ValidationError, ValidationErrorType};

/// Flags a value that falls outside `range`, whatever its provenance.
pub(crate) fn validate_range(field: &FieldName, entry: &Entry, range: &Range) -> Option<ValidationError> {
    if range.contains(entry.value) {
        return None;
    }
    Some(ValidationError {
        field: field.clone(),
        value: entry.value,
        min: range.min,
        max: range.max,
        kind: ValidationErrorType::OutOfRange,
        message: format!(
            "Out of range: '{}' is {:.1}, expected between {} and {}",
            field, entry.value, range.min, range.max
        ),
    })
}
