//! Compiles authored body-measurement formulas into an ordered, acyclic rule
//! table and uses it to fill in missing measurements, optionally blending the
//! result with a statistical predictor.
//!
//! With the `python` feature this crate also builds the `_core` Python module.

pub mod analysis;
pub mod compiler;
pub mod compute;
pub mod config;
pub mod display;
pub mod graph;
pub mod store;
pub mod validation;

#[cfg(feature = "python")]
mod bindings;

pub use compiler::{compile, Compilation, CompileError, CompileLog, FormatError, RuleCompiler, RuleTable};
pub use compute::{blend, infer, BlendPolicy, Estimate, HybridEstimator, PredictionError, Predictor, Record};
pub use config::{ConfigError, EngineConfig};
pub use display::format_trace;
pub use store::{FieldName, Relation, Rule, RuleId, RuleRow};

#[cfg(feature = "python")]
use pyo3::prelude::*;

/// The `_core` Python module.
#[cfg(feature = "python")]
#[pymodule]
fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    bindings::python::register(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Provenance;

    fn rows(specs: &[(&str, i32)]) -> Vec<RuleRow> {
        specs.iter().map(|(f, p)| RuleRow::new(*f, *p)).collect()
    }

    #[test]
    fn test_compile_then_infer() {
        let compilation = compile(&rows(&[("hip_cm = waist_cm * 1.2", 1)]), [("hip_cm", "Hip girth")]).unwrap();
        assert!(compilation.log.is_clean());

        let record = Record::from_known([("waist_cm", Some(70.0)), ("hip_cm", None)]);
        let out = infer(&record, &compilation.table);
        assert_eq!(out.get(&"waist_cm".into()), Some(70.0));
        assert!((out.get(&"hip_cm".into()).unwrap() - 84.0).abs() < 1e-9);
        assert_eq!(compilation.table.description(&"hip_cm".into()), Some("Hip girth"));
    }

    #[test]
    fn test_cycle_broken_at_lowest_priority() {
        let compilation = compile(&rows(&[("b_cm = a_cm * 2", 2), ("a_cm = b_cm / 2", 1)]), [("", ""); 0]).unwrap();
        let table = &compilation.table;

        assert_eq!(compilation.log.removed.len(), 1);
        assert_eq!(compilation.log.removed[0].id, RuleId(1));
        assert_eq!(table.order(), &[FieldName::new("b_cm")]);

        // a_cm is no longer derivable
        let out = infer(&Record::from_known([("b_cm", 10.0)]), table);
        assert!(!out.is_known(&"a_cm".into()));
        let out = infer(&Record::from_known([("a_cm", 10.0)]), table);
        assert_eq!(out.get(&"b_cm".into()), Some(20.0));
    }

    #[test]
    fn test_malformed_rows_are_skipped_not_fatal() {
        let compilation = compile(
            &rows(&[("hip_cm = waist_cm * 1.2", 1), ("hip_cm waist_cm", 1), ("bust_cm = 2 - waist_cm", 1)]),
            [("", ""); 0],
        )
        .unwrap();
        assert_eq!(compilation.table.rule_count(), 1);
        let messages = compilation.log.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("(row 1)"));
    }

    #[test]
    fn test_table_survives_json() {
        let compilation = compile(
            &rows(&[
                ("around_elbow_cm = around_bicep_cm / 0.5", 1),
                ("dress_knee_length_cm = front_waist_length_cm + skirt_knee_length_cm", 2),
            ]),
            [("", ""); 0],
        )
        .unwrap();
        let json = compilation.table.to_json_string().unwrap();
        assert_eq!(RuleTable::from_json_str(&json).unwrap(), compilation.table);
    }

    #[test]
    fn test_blend_default_weights() {
        assert!((blend(90.0, Some(84.0)) - 88.8).abs() < 1e-9);
    }

    struct Fixed(Vec<FieldName>, Vec<FieldName>);

    impl Predictor for Fixed {
        fn input_schema(&self) -> &[FieldName] { &self.0 }
        fn target_schema(&self) -> &[FieldName] { &self.1 }
        fn predict(&self, features: &[Option<f64>]) -> Result<Vec<f64>, PredictionError> {
            assert_eq!(features, &[Some(70.0)]);
            Ok(vec![90.0])
        }
    }

    #[test]
    fn test_hybrid_estimate_end_to_end() {
        let table = compile(&rows(&[("hip_cm = waist_cm * 1.2", 1)]), [("", ""); 0]).unwrap().table;
        let model = Fixed(vec!["waist_cm".into()], vec!["hip_cm".into()]);

        let estimate = HybridEstimator::new(&table, &model).estimate([("waist_cm", 70.0)]).unwrap();
        let hip = estimate.record.entry(&"hip_cm".into()).unwrap();
        assert_eq!(hip.value, 88.8);
        assert_eq!(hip.provenance, Provenance::Blended { rule: RuleId(0) });

        let trace = format_trace(&table, &estimate.record, &"hip_cm".into());
        assert!(trace.contains("[BLENDED]"));
    }
}
