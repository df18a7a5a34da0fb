//! A synchronous, single-pass rule inference engine.
use super::record::{Entry, Provenance, Record};
use crate::compiler::RuleTable;
use crate::store::{FieldName, RuleId};

const LOG_TARGET: &str = "compute::engine";

/// What a single inference pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InferenceReport {
    /// Fields filled in this pass, with the rule that produced each, in evaluation order.
    pub filled: Vec<(FieldName, RuleId)>,
    /// Unknown targets for which no candidate rule had all of its bases known.
    pub unresolved: Vec<FieldName>,
}

pub struct InferenceEngine<'a> {
    table: &'a RuleTable,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(table: &'a RuleTable) -> Self {
        Self { table }
    }

    /// Fills unknown fields of `record` in place.
    ///
    /// Targets are visited in the table's topological order, so any base that
    /// can be derived at all is already filled when its dependents are reached.
    /// For each unknown target the first candidate (lowest priority) that
    /// evaluates is applied. Known fields are never touched, which makes a
    /// second pass over the same record a no-op.
    pub fn run(&self, record: &mut Record) -> InferenceReport {
        let mut report = InferenceReport::default();

        for (target, candidates) in self.table.iter() {
            if record.is_known(target) {
                continue;
            }

            let applied = candidates
                .iter()
                .find_map(|rule| rule.relation.evaluate(|f| record.get(f)).map(|value| (rule.id, value)));

            match applied {
                Some((rule, value)) => {
                    record.insert(target.clone(), Entry { value, provenance: Provenance::Rule { rule } });
                    report.filled.push((target.clone(), rule));
                }
                None => report.unresolved.push(target.clone()),
            }
        }

        log::debug!(
            target: LOG_TARGET,
            "Inference filled {} field(s), {} unresolved",
            report.filled.len(),
            report.unresolved.len()
        );
        report
    }

    /// Returns a filled copy of `record`.
    pub fn infer(&self, record: &Record) -> Record {
        let mut out = record.clone();
        self.run(&mut out);
        out
    }
}

/// `infer(record, table) -> record'`
pub fn infer(record: &Record, table: &RuleTable) -> Record {
    InferenceEngine::new(table).infer(record)
}
