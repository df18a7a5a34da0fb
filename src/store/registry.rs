use super::types::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-target lists of candidate rules.
///
/// Targets are kept in a `BTreeMap` so every traversal is deterministic.
/// A target never maps to an empty list: removing its last rule drops the entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    by_target: BTreeMap<FieldName, Vec<Rule>>,
}

impl RuleSet {
    pub fn new() -> Self { Self::default() }

    pub fn insert(&mut self, rule: Rule) {
        self.by_target.entry(rule.target.clone()).or_default().push(rule);
    }

    /// Removes the rule with the given id, dropping its target when no rules remain.
    pub fn remove(&mut self, id: RuleId) -> Option<Rule> {
        let target = self
            .by_target
            .iter()
            .find(|(_, rules)| rules.iter().any(|r| r.id == id))
            .map(|(t, _)| t.clone())?;

        let rules = self.by_target.get_mut(&target)?;
        let pos = rules.iter().position(|r| r.id == id)?;
        let removed = rules.remove(pos);
        if rules.is_empty() {
            self.by_target.remove(&target);
        }
        Some(removed)
    }

    pub fn get(&self, target: &FieldName) -> &[Rule] {
        self.by_target.get(target).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find(&self, id: RuleId) -> Option<&Rule> {
        self.rules().find(|r| r.id == id)
    }

    pub fn contains_target(&self, target: &FieldName) -> bool {
        self.by_target.contains_key(target)
    }

    pub fn targets(&self) -> impl Iterator<Item = &FieldName> {
        self.by_target.keys()
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.by_target.values().flatten()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldName, &[Rule])> {
        self.by_target.iter().map(|(t, r)| (t, r.as_slice()))
    }

    /// Number of targets with at least one rule.
    pub fn target_count(&self) -> usize { self.by_target.len() }

    pub fn rule_count(&self) -> usize {
        self.by_target.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool { self.by_target.is_empty() }

    /// Sorts every candidate list by ascending priority. Equal priorities keep
    /// their authored order.
    pub fn sort_by_priority(&mut self) {
        for rules in self.by_target.values_mut() {
            rules.sort_by_key(|r| r.priority);
        }
    }
}

impl FromIterator<Rule> for RuleSet {
    fn from_iter<I: IntoIterator<Item = Rule>>(iter: I) -> Self {
        let mut set = RuleSet::new();
        for rule in iter {
            set.insert(rule);
        }
        set
    }
}
