//! Breaks dependency cycles by discarding rules, one cycle at a time.
//!
//! This is a greedy heuristic: each detected cycle loses the rule chosen by the
//! [`RemovalStrategy`], and the graph is rebuilt until none remain. The total
//! number of removals is not guaranteed to be minimal.

use super::error::CompileError;
use crate::analysis::topology::{self, CycleEdge};
use crate::graph::DependencyGraph;
use crate::store::{FieldName, Rule, RuleId, RuleSet};
use std::cmp::Reverse;

const LOG_TARGET: &str = "compiler::resolver";

/// Picks which rule to discard from the rules that realize a cycle's edges.
pub trait RemovalStrategy {
    fn choose_rule_to_remove(&self, candidates: &[&Rule]) -> Option<RuleId>;
}

/// Discards the rule with the numerically lowest priority. On a tie the most
/// recently declared rule goes first.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowestPriority;

impl RemovalStrategy for LowestPriority {
    fn choose_rule_to_remove(&self, candidates: &[&Rule]) -> Option<RuleId> {
        candidates
            .iter()
            .min_by_key(|r| (r.priority, Reverse(r.id)))
            .map(|r| r.id)
    }
}

/// An acyclic rule set, its graph, and the rules given up to get there.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub rules: RuleSet,
    pub graph: DependencyGraph,
    /// Removed rules in removal order.
    pub removed: Vec<Rule>,
}

#[derive(Debug, Clone, Default)]
pub struct CycleResolver<S = LowestPriority> {
    strategy: S,
}

impl CycleResolver<LowestPriority> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: RemovalStrategy> CycleResolver<S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self { strategy }
    }

    /// Removes rules until `graph` (built from `rules`) is acyclic.
    ///
    /// Returns immediately, with nothing removed, when the graph already has a
    /// topological order.
    pub fn resolve(&self, mut graph: DependencyGraph, mut rules: RuleSet) -> Result<Resolution, CompileError> {
        let mut removed = Vec::new();

        while let Some(cycle) = topology::find_cycle(&graph) {
            let candidates = cycle_candidates(&rules, &cycle);
            let fields: Vec<FieldName> = cycle.iter().map(|e| e.target.clone()).collect();

            let chosen = self
                .strategy
                .choose_rule_to_remove(&candidates)
                .filter(|id| candidates.iter().any(|r| r.id == *id));
            let Some(id) = chosen else {
                return Err(CompileError::UnresolvableCycle { fields });
            };
            let Some(rule) = rules.remove(id) else {
                return Err(CompileError::UnresolvableCycle { fields });
            };

            log::warn!(
                target: LOG_TARGET,
                "Removed rule {} '{}' to break cycle through {:?}",
                rule.id,
                rule,
                fields.iter().map(FieldName::as_str).collect::<Vec<_>>()
            );
            removed.push(rule);
            graph = DependencyGraph::build(&rules);
        }

        Ok(Resolution { rules, graph, removed })
    }
}

/// Rules whose target lies on the cycle and whose inputs include the
/// target's predecessor on that cycle.
fn cycle_candidates<'a>(rules: &'a RuleSet, cycle: &[CycleEdge]) -> Vec<&'a Rule> {
    let mut out: Vec<&Rule> = Vec::new();
    for edge in cycle {
        for rule in rules.get(&edge.target) {
            if rule.depends_on(&edge.base) && !out.iter().any(|r| r.id == rule.id) {
                out.push(rule);
            }
        }
    }
    out
}
