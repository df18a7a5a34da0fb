//! Rule inference combined with a statistical predictor.

use super::blend::blend_record;
use super::engine::InferenceEngine;
use super::predictor::{predict_targets, PredictionError, Predictor};
use super::record::Record;
use crate::compiler::RuleTable;
use crate::config::{ConfigError, EngineConfig};
use crate::store::FieldName;
use crate::validation::{validate, ValidationError};

const LOG_TARGET: &str = "compute::hybrid";

/// Result of one hybrid estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct Estimate {
    pub record: Record,
    /// Rule targets neither the rules nor the predictor could fill.
    pub unresolved: Vec<FieldName>,
    /// Values outside their plausible range. Informational only.
    pub findings: Vec<ValidationError>,
}

pub struct HybridEstimator<'a, P: ?Sized> {
    table: &'a RuleTable,
    predictor: &'a P,
    config: EngineConfig,
}

impl<'a, P> HybridEstimator<'a, P>
where
    P: Predictor + ?Sized,
{
    pub fn new(table: &'a RuleTable, predictor: &'a P) -> Self {
        Self { table, predictor, config: EngineConfig::default() }
    }

    /// Uses `config` after checking its weights and ranges.
    pub fn with_config(table: &'a RuleTable, predictor: &'a P, config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { table, predictor, config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Runs the rules, then the predictor, then blends the two.
    pub fn estimate<I, K, V>(&self, known: I) -> Result<Estimate, PredictionError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Option<f64>>,
    {
        let mut record = Record::from_known(known);
        let report = InferenceEngine::new(self.table).run(&mut record);

        let predictions = predict_targets(self.predictor, &record)?;
        let blended = blend_record(&record, predictions, &self.config.blend);

        let record = match self.config.round_to {
            Some(decimals) => blended.rounded(decimals),
            None => blended,
        };
        let unresolved = report.unresolved.into_iter().filter(|f| !record.is_known(f)).collect();
        let findings = validate(&record, &self.config);

        for finding in &findings {
            log::warn!(target: LOG_TARGET, "{}", finding.message);
        }
        Ok(Estimate { record, unresolved, findings })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use crate::compute::blend::BlendPolicy;
    use crate::compute::predictor::mock::ScaledSum;
    use crate::compute::record::Provenance;
    use crate::store::{RuleId, RuleRow};

    fn table() -> RuleTable {
        let rows = vec![
            RuleRow::new("hip_cm = waist_cm * 1.2", 1),
            RuleRow::new("thigh_cm = hip_cm * 0.5", 1),
            RuleRow::new("knee_cm = calf_cm + 3", 1),
        ];
        compile(&rows, Vec::<(String, String)>::new()).unwrap().table
    }

    #[test]
    fn test_estimate_blends_and_predicts() {
        let table = table();
        // hip = 90 / 70 * 70 = 90, bust = 1.3 * 70 = 91
        let model = ScaledSum::new(&["waist_cm", "hip_cm"], &[("hip_cm", 90.0 / 70.0), ("bust_cm", 1.3)]);
        let estimator = HybridEstimator::new(&table, &model);

        let estimate = estimator.estimate([("waist_cm", 70.0)]).unwrap();
        let record = &estimate.record;

        assert_eq!(record.get(&"waist_cm".into()), Some(70.0));
        // 0.8 * 90 + 0.2 * 84
        let hip = record.entry(&"hip_cm".into()).unwrap();
        assert_eq!(hip.value, 88.8);
        assert_eq!(hip.provenance, Provenance::Blended { rule: RuleId(0) });
        assert_eq!(record.get(&"bust_cm".into()), Some(91.0));
        assert_eq!(record.entry(&"bust_cm".into()).unwrap().provenance, Provenance::Predicted);
        // rule-only field keeps the pre-blend hip estimate
        assert_eq!(record.get(&"thigh_cm".into()), Some(42.0));
        assert_eq!(estimate.unresolved, vec![FieldName::new("knee_cm")]);
        assert!(estimate.findings.is_empty());
    }

    #[test]
    fn test_supplied_values_are_kept_and_not_rounded() {
        let table = table();
        let model = ScaledSum::new(&["waist_cm"], &[("waist_cm", 2.0)]);
        let estimate = HybridEstimator::new(&table, &model).estimate([("waist_cm", 70.25)]).unwrap();
        assert_eq!(estimate.record.get(&"waist_cm".into()), Some(70.25));
    }

    #[test]
    fn test_custom_policy_and_no_rounding() {
        let table = table();
        let model = ScaledSum::new(&["waist_cm"], &[("hip_cm", 1.0)]);
        let config = EngineConfig { blend: BlendPolicy::new(0.5).unwrap(), round_to: None, ..Default::default() };
        let estimator = HybridEstimator::with_config(&table, &model, config).unwrap();
        assert_eq!(estimator.config().round_to, None);
        let estimate = estimator.estimate([("waist_cm", 70.0)]).unwrap();
        // 0.5 * 70 + 0.5 * 84
        assert!((estimate.record.get(&"hip_cm".into()).unwrap() - 77.0).abs() < 1e-9);
    }

    #[test]
    fn test_findings_reported_for_implausible_values() {
        let table = table();
        let model = ScaledSum::new(&["waist_cm"], &[]);
        let estimate = HybridEstimator::new(&table, &model).estimate([("waist_cm", 10.0)]).unwrap();
        let fields: Vec<String> = estimate.findings.iter().map(|f| f.field.to_string()).collect();
        assert_eq!(fields, vec!["hip_cm", "waist_cm"]);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let table = table();
        let model = ScaledSum::new(&["waist_cm"], &[("hip_cm", 1.0)]);
        let config = EngineConfig {
            blend: BlendPolicy { model_weight: 2.0, rule_weight: -1.0 },
            ..Default::default()
        };
        let err = HybridEstimator::with_config(&table, &model, config).err();
        assert!(matches!(err, Some(ConfigError::InvalidWeights { .. })));
    }

    struct Failing;
    impl Predictor for Failing {
        fn input_schema(&self) -> &[FieldName] { &[] }
        fn target_schema(&self) -> &[FieldName] { &[] }
        fn predict(&self, _features: &[Option<f64>]) -> Result<Vec<f64>, PredictionError> {
            Err(PredictionError::Failed("model not loaded".into()))
        }
    }

    #[test]
    fn test_predictor_failure_propagates() {
        let table = table();
        let err = HybridEstimator::new(&table, &Failing).estimate([("waist_cm", 70.0)]).unwrap_err();
        assert_eq!(err, PredictionError::Failed("model not loaded".into()));
    }
}
