use crate::graph::DependencyGraph;
use crate::store::FieldName;
use petgraph::graph::NodeIndex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Cycle detected: {} field(s) could not be ordered", .unordered.len())]
pub struct CycleDetected {
    /// Fields left with unresolved dependencies once ordering stalled.
    pub unordered: Vec<FieldName>,
}

/// Returns a topological order of every field using Kahn's algorithm.
///
/// Among fields that are ready at the same time, the lexically smallest goes
/// first, so the order depends only on the rule set.
pub fn sort(graph: &DependencyGraph) -> Result<Vec<FieldName>, CycleDetected> {
    let count = graph.node_count();
    let mut in_degree = vec![0usize; count];
    let mut ready = BinaryHeap::with_capacity(count);
    let mut order = Vec::with_capacity(count);

    for node in graph.nodes() {
        let degree = graph.parents(node).len();
        in_degree[node.index()] = degree;
        if degree == 0 {
            ready.push(Reverse((graph.field(node), node)));
        }
    }

    while let Some(Reverse((field, node))) = ready.pop() {
        order.push(field.clone());
        for child in graph.children(node) {
            let slot = &mut in_degree[child.index()];
            *slot -= 1;
            if *slot == 0 {
                ready.push(Reverse((graph.field(child), child)));
            }
        }
    }

    if order.len() != count {
        let unordered = graph
            .nodes()
            .filter(|n| in_degree[n.index()] > 0)
            .map(|n| graph.field(n).clone())
            .collect();
        return Err(CycleDetected { unordered });
    }

    Ok(order)
}

/// One directed edge of a detected cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleEdge {
    pub base: FieldName,
    pub target: FieldName,
}

/// Finds a single cycle with a depth-first search, or `None` if the graph is acyclic.
///
/// Roots and children are visited in lexical order, so the same graph always
/// yields the same cycle. Edges are returned in traversal order and close the loop.
pub fn find_cycle(graph: &DependencyGraph) -> Option<Vec<CycleEdge>> {
    let mut state = vec![VisitState::None; graph.node_count()];
    let mut stack = Vec::new();

    for root in graph.nodes() {
        if state[root.index()] == VisitState::None {
            if let Some(cycle) = visit(root, graph, &mut state, &mut stack) {
                return Some(cycle);
            }
        }
    }
    None
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum VisitState {
    None,
    Visiting,
    Visited,
}

fn visit(
    node: NodeIndex,
    graph: &DependencyGraph,
    state: &mut Vec<VisitState>,
    stack: &mut Vec<NodeIndex>,
) -> Option<Vec<CycleEdge>> {
    state[node.index()] = VisitState::Visiting;
    stack.push(node);

    for child in graph.children(node) {
        match state[child.index()] {
            VisitState::Visited => {}
            VisitState::Visiting => return Some(close_cycle(graph, stack, child)),
            VisitState::None => {
                if let Some(cycle) = visit(child, graph, state, stack) {
                    return Some(cycle);
                }
            }
        }
    }

    stack.pop();
    state[node.index()] = VisitState::Visited;
    None
}

fn close_cycle(graph: &DependencyGraph, stack: &[NodeIndex], entry: NodeIndex) -> Vec<CycleEdge> {
    // `entry` is on the stack because it is still being visited.
    let start = stack.iter().position(|&n| n == entry).unwrap_or(0);
    let path = &stack[start..];
    path.iter()
        .zip(path.iter().skip(1).chain(std::iter::once(&entry)))
        .map(|(&base, &target)| CycleEdge {
            base: graph.field(base).clone(),
            target: graph.field(target).clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Relation, Rule, RuleId, RuleSet};

    fn graph_of(edges: &[(&str, &str)]) -> DependencyGraph {
        let rules: RuleSet = edges
            .iter()
            .enumerate()
            .map(|(i, (base, target))| Rule {
                id: RuleId::new(i),
                target: (*target).into(),
                relation: Relation::Proportion { base: (*base).into(), multiplier: 1.0 },
                priority: 1,
                tolerance: 0.0,
                notes: String::new(),
            })
            .collect();
        DependencyGraph::build(&rules)
    }

    fn names(order: &[FieldName]) -> Vec<&str> {
        order.iter().map(FieldName::as_str).collect()
    }

    #[test]
    fn test_sort_diamond_dependency() {
        // Shape: A -> B, A -> C, B -> D, C -> D
        let graph = graph_of(&[("a", "b"), ("a", "c"), ("b", "d"), ("c", "d")]);
        let order = sort(&graph).expect("Sort failed");
        assert_eq!(names(&order), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_sort_breaks_ties_lexically() {
        let graph = graph_of(&[("z", "y"), ("m", "n"), ("b", "a")]);
        let order = sort(&graph).unwrap();
        assert_eq!(names(&order), vec!["b", "a", "m", "n", "z", "y"]);
    }

    #[test]
    fn test_sort_reports_cycle_members() {
        let graph = graph_of(&[("root", "a"), ("a", "b"), ("b", "a")]);
        let err = sort(&graph).unwrap_err();
        assert_eq!(names(&err.unordered), vec!["a", "b"]);
        assert!(err.to_string().contains("Cycle detected"));
    }

    #[test]
    fn test_find_cycle_returns_closed_loop() {
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("c", "a"), ("x", "a")]);
        let cycle = find_cycle(&graph).expect("cycle expected");
        let edges: Vec<(&str, &str)> = cycle.iter().map(|e| (e.base.as_str(), e.target.as_str())).collect();
        assert_eq!(edges, vec![("a", "b"), ("b", "c"), ("c", "a")]);
    }

    #[test]
    fn test_find_cycle_on_dag_is_none() {
        let graph = graph_of(&[("a", "b"), ("b", "c"), ("a", "c")]);
        assert!(find_cycle(&graph).is_none());
    }
}
