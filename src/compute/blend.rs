//! Combines model predictions with rule-derived estimates.

use super::record::{Entry, Provenance, Record};
use crate::config::ConfigError;
use crate::store::FieldName;
use serde::{Deserialize, Serialize};

const WEIGHT_TOLERANCE: f64 = 1e-9;

/// Fixed weighting between the predictor and the rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendPolicy {
    pub model_weight: f64,
    pub rule_weight: f64,
}

impl Default for BlendPolicy {
    fn default() -> Self {
        Self { model_weight: 0.8, rule_weight: 0.2 }
    }
}

impl BlendPolicy {
    /// Builds a policy from the model's share; the rules get the rest.
    pub fn new(model_weight: f64) -> Result<Self, ConfigError> {
        let policy = Self { model_weight, rule_weight: 1.0 - model_weight };
        policy.validate()?;
        Ok(policy)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let (model, rule) = (self.model_weight, self.rule_weight);
        let valid = model.is_finite()
            && rule.is_finite()
            && model >= 0.0
            && rule >= 0.0
            && ((model + rule) - 1.0).abs() <= WEIGHT_TOLERANCE;
        if valid {
            Ok(())
        } else {
            Err(ConfigError::InvalidWeights { model, rule })
        }
    }

    /// `model_weight * predicted + rule_weight * rule_estimate`, or the
    /// prediction unchanged when no rule fired.
    pub fn blend(&self, predicted: f64, rule_estimate: Option<f64>) -> f64 {
        match rule_estimate {
            Some(rule) => self.model_weight * predicted + self.rule_weight * rule,
            None => predicted,
        }
    }
}

/// Blends with the default `0.8 / 0.2` policy.
pub fn blend(predicted: f64, rule_estimate: Option<f64>) -> f64 {
    BlendPolicy::default().blend(predicted, rule_estimate)
}

/// Merges predictions into an inferred record.
///
/// Supplied fields pass through untouched. A field with both a rule estimate
/// and a prediction is blended; a prediction alone is taken as is; a rule
/// estimate alone is kept. Non-finite predictions are ignored.
pub fn blend_record<I>(inferred: &Record, predictions: I, policy: &BlendPolicy) -> Record
where
    I: IntoIterator<Item = (FieldName, f64)>,
{
    let mut out = inferred.clone();

    for (field, predicted) in predictions {
        if !predicted.is_finite() {
            continue;
        }
        let entry = match inferred.entry(&field) {
            Some(Entry { provenance: Provenance::Supplied, .. }) => continue,
            Some(Entry { value, provenance: Provenance::Rule { rule } }) => Entry {
                value: policy.blend(predicted, Some(*value)),
                provenance: Provenance::Blended { rule: *rule },
            },
            Some(Entry { provenance: Provenance::Predicted | Provenance::Blended { .. }, .. }) => continue,
            None => Entry { value: predicted, provenance: Provenance::Predicted },
        };
        out.insert(field, entry);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::RuleId;

    #[test]
    fn test_default_weights() {
        assert!((blend(90.0, Some(84.0)) - 88.8).abs() < 1e-9);
        assert_eq!(blend(90.0, None), 90.0);
    }

    #[test]
    fn test_policy_from_model_weight() {
        let policy = BlendPolicy::new(0.5).unwrap();
        assert_eq!(policy.blend(10.0, Some(20.0)), 15.0);
        assert!(BlendPolicy::new(1.5).is_err());
        assert!(BlendPolicy::new(f64::NAN).is_err());
    }

    #[test]
    fn test_blend_record_respects_provenance() {
        let mut inferred = Record::from_known([("waist_cm", 70.0)]);
        inferred.insert("hip_cm".into(), Entry { value: 84.0, provenance: Provenance::Rule { rule: RuleId(0) } });

        let predictions = vec![
            (FieldName::new("waist_cm"), 75.0),
            (FieldName::new("hip_cm"), 90.0),
            (FieldName::new("bust_cm"), 92.0),
            (FieldName::new("chest_cm"), f64::NAN),
        ];
        let out = blend_record(&inferred, predictions, &BlendPolicy::default());

        assert_eq!(out.get(&"waist_cm".into()), Some(70.0));
        let hip = out.entry(&"hip_cm".into()).unwrap();
        assert!((hip.value - 88.8).abs() < 1e-9);
        assert_eq!(hip.provenance, Provenance::Blended { rule: RuleId(0) });
        assert_eq!(out.entry(&"bust_cm".into()).unwrap().provenance, Provenance::Predicted);
        assert!(!out.is_known(&"chest_cm".into()));
    }
}
