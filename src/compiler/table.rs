//! The compiled, immutable rule table consumed by the inference engine.

use super::error::TableError;
use crate::graph::DependencyGraph;
use crate::store::{FieldName, Rule, RuleId, RuleSet};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Acyclic, priority-sorted rules plus the order in which targets are evaluated.
///
/// Every rule's base fields are either never derived, or appear before the
/// rule's target in [`RuleTable::order`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    order: Vec<FieldName>,
    rules: RuleSet,
    #[serde(default)]
    descriptions: BTreeMap<FieldName, String>,
}

impl RuleTable {
    /// `field_order` is a topological order over all graph fields; only
    /// fields with surviving rules are kept.
    pub(crate) fn new(
        mut rules: RuleSet,
        field_order: Vec<FieldName>,
        descriptions: BTreeMap<FieldName, String>,
    ) -> Self {
        rules.sort_by_priority();
        let order = field_order.into_iter().filter(|f| rules.contains_target(f)).collect();
        Self { order, rules, descriptions }
    }

    /// Target fields in evaluation order.
    pub fn order(&self) -> &[FieldName] {
        &self.order
    }

    /// Candidate rules for a target, lowest priority first.
    pub fn candidates(&self, target: &FieldName) -> &[Rule] {
        self.rules.get(target)
    }

    /// `(target, candidates)` pairs in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &[Rule])> {
        self.order.iter().map(move |t| (t, self.rules.get(t)))
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn find_rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.find(id)
    }

    pub fn target_count(&self) -> usize {
        self.order.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.rule_count()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn description(&self, field: &FieldName) -> Option<&str> {
        self.descriptions.get(field).map(String::as_str)
    }

    pub fn descriptions(&self) -> &BTreeMap<FieldName, String> {
        &self.descriptions
    }

    pub fn graph(&self) -> DependencyGraph {
        DependencyGraph::build(&self.rules)
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Loads a table and re-checks the ordering invariants before accepting it.
    pub fn from_json_str(json: &str) -> Result<Self, TableError> {
        let table: Self = serde_json::from_str(json)?;
        table.check()?;
        Ok(table)
    }

    fn check(&self) -> Result<(), TableError> {
        let inconsistent = |msg: String| Err(TableError::Inconsistent { msg });

        let mut position = HashMap::with_capacity(self.order.len());
        for (i, field) in self.order.iter().enumerate() {
            if position.insert(field, i).is_some() {
                return inconsistent(format!("'{}' appears more than once in the order", field));
            }
        }

        for (target, rules) in self.rules.iter() {
            let Some(&at) = position.get(target) else {
                return inconsistent(format!("target '{}' is missing from the order", target));
            };
            if rules.windows(2).any(|w| w[0].priority > w[1].priority) {
                return inconsistent(format!("rules for '{}' are not sorted by priority", target));
            }
            for rule in rules {
                if &rule.target != target {
                    return inconsistent(format!("rule {} is filed under '{}'", rule.id, target));
                }
                for base in rule.inputs() {
                    match position.get(base) {
                        Some(&b) if b >= at => {
                            return inconsistent(format!("'{}' is evaluated before its base '{}'", target, base));
                        }
                        _ => {}
                    }
                }
            }
        }

        if let Some(stray) = self.order.iter().find(|f| !self.rules.contains_target(f)) {
            return inconsistent(format!("'{}' is ordered but has no rules", stray));
        }
        Ok(())
    }
}
