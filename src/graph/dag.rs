//! dag.rs
//! Wraps a petgraph `DiGraph` keyed by field name.
//! Edges run base -> target, one per rule input, weighted by the rule that owns them.

use crate::store::{FieldName, RuleId, RuleSet};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<FieldName, RuleId>,
    index: BTreeMap<FieldName, NodeIndex>,
}

impl DependencyGraph {
    /// Builds the graph for a rule set. Pure function of its input.
    ///
    /// Nodes are inserted in lexical order so node indices, and every
    /// traversal built on them, are reproducible.
    pub fn build(rules: &RuleSet) -> Self {
        let mut fields = BTreeSet::new();
        for rule in rules.rules() {
            fields.insert(&rule.target);
            fields.extend(rule.inputs());
        }

        let mut graph = DiGraph::with_capacity(fields.len(), rules.rule_count());
        let mut index = BTreeMap::new();
        for field in fields {
            let idx = graph.add_node(field.clone());
            index.insert(field.clone(), idx);
        }

        for rule in rules.rules() {
            let target = index[&rule.target];
            for base in rule.inputs() {
                graph.add_edge(index[base], target, rule.id);
            }
        }

        Self { graph, index }
    }

    pub fn node_count(&self) -> usize { self.graph.node_count() }

    pub fn edge_count(&self) -> usize { self.graph.edge_count() }

    pub fn node(&self, field: &FieldName) -> Option<NodeIndex> {
        self.index.get(field).copied()
    }

    pub fn field(&self, idx: NodeIndex) -> &FieldName { &self.graph[idx] }

    /// Node indices in lexical field order.
    pub fn nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.index.values().copied()
    }

    /// Direct dependents of a node, sorted by field name.
    pub fn children(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(idx, Direction::Outgoing)
    }

    /// Direct dependencies of a node, sorted by field name.
    pub fn parents(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        self.sorted_neighbors(idx, Direction::Incoming)
    }

    pub fn is_acyclic(&self) -> bool {
        !petgraph::algo::is_cyclic_directed(&self.graph)
    }

    fn sorted_neighbors(&self, idx: NodeIndex, dir: Direction) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self.graph.neighbors_directed(idx, dir).collect();
        out.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));
        out.dedup();
        out
    }
}
