//! Engine configuration: blend weights, output rounding and plausibility ranges.

use crate::compute::blend::BlendPolicy;
use crate::store::FieldName;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Malformed configuration: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Blend weights must be finite, non-negative and sum to 1 (model {model}, rule {rule})")]
    InvalidWeights { model: f64, rule: f64 },
    #[error("Plausible range for '{field}' is empty or not finite")]
    InvalidRange { field: FieldName },
}

/// Inclusive bounds for a plausible measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub blend: BlendPolicy,
    /// Decimal places applied to derived values. Supplied values are never rounded.
    pub round_to: Option<u32>,
    pub plausible_ranges: BTreeMap<FieldName, Range>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let plausible_ranges = [
            ("height_cm", Range::new(100.0, 250.0)),
            ("waist_cm", Range::new(50.0, 200.0)),
            ("hip_cm", Range::new(70.0, 250.0)),
        ]
        .into_iter()
        .map(|(f, r)| (FieldName::new(f), r))
        .collect();

        Self { blend: BlendPolicy::default(), round_to: Some(1), plausible_ranges }
    }
}

impl EngineConfig {
    /// Parses a JSON document; missing keys take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.blend.validate()?;
        for (field, range) in &self.plausible_ranges {
            if !range.min.is_finite() || !range.max.is_finite() || range.min > range.max {
                return Err(ConfigError::InvalidRange { field: field.clone() });
            }
        }
        Ok(())
    }

    pub fn range_for(&self, field: &FieldName) -> Option<&Range> {
        self.plausible_ranges.get(field)
    }
}
