//! record.rs
//! One entity's measurements: known values with where each came from.

use crate::store::{FieldName, RuleId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Where a value in a [`Record`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Provenance {
    /// Provided by the caller. Never overwritten.
    Supplied,
    /// Derived by a compiled rule.
    Rule { rule: RuleId },
    /// Taken from the statistical predictor.
    Predicted,
    /// Weighted combination of a prediction and a rule estimate.
    Blended { rule: RuleId },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub value: f64,
    pub provenance: Provenance,
}

/// Field values for a single entity. Unknown fields are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    entries: BTreeMap<FieldName, Entry>,
}

impl Record {
    pub fn new() -> Self { Self::default() }

    /// Builds a record from caller-supplied values.
    ///
    /// Names are normalized; `None` and non-finite values count as unknown.
    pub fn from_known<I, K, V>(known: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Option<f64>>,
    {
        let mut record = Self::new();
        for (name, value) in known {
            if let Some(value) = value.into().filter(|v| v.is_finite()) {
                record.insert(FieldName::new(name.as_ref()), Entry { value, provenance: Provenance::Supplied });
            }
        }
        record
    }

    #[inline]
    pub fn get(&self, field: &FieldName) -> Option<f64> {
        self.entries.get(field).map(|e| e.value)
    }

    pub fn entry(&self, field: &FieldName) -> Option<&Entry> {
        self.entries.get(field)
    }

    pub fn is_known(&self, field: &FieldName) -> bool {
        self.entries.contains_key(field)
    }

    pub fn is_supplied(&self, field: &FieldName) -> bool {
        matches!(self.entry(field), Some(Entry { provenance: Provenance::Supplied, .. }))
    }

    /// Stores a value unless the field was supplied by the caller.
    ///
    /// Returns `false` when the existing supplied value was kept.
    pub fn insert(&mut self, field: FieldName, entry: Entry) -> bool {
        if self.is_supplied(&field) {
            return false;
        }
        self.entries.insert(field, entry);
        true
    }

    pub fn len(&self) -> usize { self.entries.len() }

    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &Entry)> {
        self.entries.iter()
    }

    /// Plain `field -> value` view.
    pub fn values(&self) -> BTreeMap<FieldName, f64> {
        self.entries.iter().map(|(f, e)| (f.clone(), e.value)).collect()
    }

    /// Returns a copy with every derived value rounded to `decimals` places.
    pub fn rounded(&self, decimals: u32) -> Self {
        let scale = 10f64.powi(decimals.min(15) as i32);
        let entries = self
            .entries
            .iter()
            .map(|(field, entry)| {
                let value = match entry.provenance {
                    Provenance::Supplied => entry.value,
                    _ => (entry.value * scale).round() / scale,
                };
                (field.clone(), Entry { value, ..*entry })
            })
            .collect();
        Self { entries }
    }
}
