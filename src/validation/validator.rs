//! Runs the plausibility rules over a finished record.
use super::error::ValidationError;
use super::rules::range;
use crate::compute::record::Record;
use crate::config::EngineConfig;

/// Checks every value of a record against the configured plausible ranges.
pub struct Validator<'a> {
    config: &'a EngineConfig,
}

impl<'a> Validator<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    /// # Returns
    /// - `Ok(())` if every value with a configured range lies within it.
    /// - `Err(Vec<ValidationError>)` with one entry per offending field, in field order.
    pub fn validate(&self, record: &Record) -> Result<(), Vec<ValidationError>> {
        let errors: Vec<ValidationError> = record
            .iter()
            .filter_map(|(field, entry)| {
                let bounds = self.config.range_for(field)?;
                range::validate_range(field, entry, bounds)
            })
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Findings for `record`; empty when everything is plausible.
pub fn validate(record: &Record, config: &EngineConfig) -> Vec<ValidationError> {
    Validator::new(config).validate(record).err().unwrap_or_default()
}
