use crate::compiler::{compile, CompileLog, RuleTable};
use crate::compute::{self, Record};
use crate::display::trace;
use crate::store::{FieldName, RuleRow};
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use std::collections::{BTreeMap, HashMap};

/// One authored row: `(formula, priority[, tolerance[, notes]])`.
#[derive(FromPyObject)]
enum RowSpec {
    Full(String, i32, Option<f64>, Option<String>),
    WithTolerance(String, i32, Option<f64>),
    Basic(String, i32),
}

impl From<RowSpec> for RuleRow {
    fn from(spec: RowSpec) -> Self {
        let (formula, priority, tolerance, notes) = match spec {
            RowSpec::Full(f, p, t, n) => (f, p, t, n),
            RowSpec::WithTolerance(f, p, t) => (f, p, t, None),
            RowSpec::Basic(f, p) => (f, p, None, None),
        };
        RuleRow { formula, priority, tolerance, notes }
    }
}

#[pyclass(name = "RuleTable")]
#[derive(Debug, Default)]
pub struct PyRuleTable {
    inner: RuleTable,
    log: CompileLog,
}

#[pymethods]
impl PyRuleTable {
    /// Compiles `(formula, priority[, tolerance[, notes]])` rows into an ordered table.
    #[staticmethod]
    #[pyo3(signature = (rows, descriptions = None))]
    fn compile(rows: Vec<RowSpec>, descriptions: Option<HashMap<String, String>>) -> PyResult<Self> {
        let rows: Vec<RuleRow> = rows.into_iter().map(RuleRow::from).collect();
        let compilation = compile(&rows, descriptions.unwrap_or_default())
            .map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner: compilation.table, log: compilation.log })
    }

    #[staticmethod]
    pub fn from_json(json: &str) -> PyResult<Self> {
        let inner = RuleTable::from_json_str(json).map_err(|e| PyValueError::new_err(e.to_string()))?;
        Ok(Self { inner, log: CompileLog::default() })
    }

    pub fn to_json(&self) -> PyResult<String> {
        self.inner.to_json_string().map_err(|e| PyValueError::new_err(e.to_string()))
    }

    /// Fills unknown fields; `None` marks a value as unknown.
    pub fn infer(&self, known: HashMap<String, Option<f64>>) -> BTreeMap<String, f64> {
        let record = compute::infer(&Record::from_known(known), &self.inner);
        record.values().into_iter().map(|(field, value)| (field.to_string(), value)).collect()
    }

    pub fn descriptions(&self) -> BTreeMap<String, String> {
        self.inner.descriptions().iter().map(|(field, desc)| (field.to_string(), desc.clone())).collect()
    }

    pub fn trace(&self, known: HashMap<String, Option<f64>>, field: &str) -> String {
        let record = compute::infer(&Record::from_known(known), &self.inner);
        trace::format_trace(&self.inner, &record, &FieldName::new(field))
    }

    pub fn order(&self) -> Vec<String> {
        self.inner.order().iter().map(|f| f.to_string()).collect()
    }

    pub fn log(&self) -> Vec<String> {
        self.log.messages()
    }

    pub fn rule_count(&self) -> usize { self.inner.rule_count() }
}

/// `model_weight * predicted + rule_weight * rule_estimate` with the default weights.
#[pyfunction]
#[pyo3(signature = (predicted, rule_estimate = None))]
pub fn blend(predicted: f64, rule_estimate: Option<f64>) -> f64 {
    compute::blend(predicted, rule_estimate)
}

pub(crate) fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyRuleTable>()?;
    m.add_function(wrap_pyfunction!(blend, m)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_spec_carries_optional_fields() {
        let full = RuleRow::from(RowSpec::Full("hip_cm = waist_cm * 1.2".into(), 2, Some(1.5), Some("book".into())));
        assert_eq!(full.tolerance, Some(1.5));
        assert_eq!(full.notes.as_deref(), Some("book"));

        let partial = RuleRow::from(RowSpec::WithTolerance("hip_cm = waist_cm * 1.2".into(), 2, Some(0.5)));
        assert_eq!((partial.priority, partial.tolerance, partial.notes), (2, Some(0.5), None));

        assert_eq!(RuleRow::from(RowSpec::Basic("hip_cm = waist_cm * 1.2".into(), 1)), RuleRow::new("hip_cm = waist_cm * 1.2", 1));
    }
}
