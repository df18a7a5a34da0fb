//! Orchestrates parsing, cycle resolution and ordering into a [`RuleTable`].

use super::error::{CompileError, FormatError};
use super::parser;
use super::resolver::{CycleResolver, LowestPriority, RemovalStrategy};
use super::table::RuleTable;
use crate::analysis::topology;
use crate::graph::DependencyGraph;
use crate::store::{FieldName, Rule, RuleId, RuleRow, RuleSet};
use std::collections::BTreeMap;

const LOG_TARGET: &str = "compiler";

/// A row that failed to parse and was left out of the table.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedRow {
    pub row: usize,
    pub formula: String,
    pub reason: FormatError,
}

/// Diagnostics gathered during compilation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileLog {
    pub skipped: Vec<SkippedRow>,
    /// Rules discarded to break cycles, in removal order.
    pub removed: Vec<Rule>,
}

impl CompileLog {
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty() && self.removed.is_empty()
    }

    /// Human-readable log lines.
    pub fn messages(&self) -> Vec<String> {
        let skipped = self
            .skipped
            .iter()
            .map(|s| format!("Skipped formula '{}' (row {}): {}", s.formula, s.row, s.reason));
        let removed = self
            .removed
            .iter()
            .map(|r| format!("Removed rule {} '{}' to resolve a dependency cycle", r.id, r));
        skipped.chain(removed).collect()
    }
}

#[derive(Debug, Clone)]
pub struct Compilation {
    pub table: RuleTable,
    pub log: CompileLog,
}

#[derive(Debug, Clone, Default)]
pub struct RuleCompiler<S = LowestPriority> {
    resolver: CycleResolver<S>,
}

impl RuleCompiler<LowestPriority> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<S: RemovalStrategy> RuleCompiler<S> {
    pub fn with_strategy(strategy: S) -> Self {
        Self { resolver: CycleResolver::with_strategy(strategy) }
    }

    /// Compiles authored rows into an ordered rule table.
    ///
    /// Rows that fail to parse are skipped and logged; only a cycle that
    /// cannot be broken aborts compilation. `descriptions` annotates fields
    /// and is never evaluated.
    pub fn compile<I, K, V>(&self, rows: &[RuleRow], descriptions: I) -> Result<Compilation, CompileError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut log = CompileLog::default();
        let mut rules = RuleSet::new();

        for (row, entry) in rows.iter().enumerate() {
            match parser::parse_rule(RuleId::new(row), entry) {
                Ok(rule) => {
                    log::debug!(target: LOG_TARGET, "Parsed rule {}: {}", rule.id, rule);
                    rules.insert(rule);
                }
                Err(reason) => {
                    log::warn!(target: LOG_TARGET, "Skipped formula '{}' (row {}): {}", entry.formula, row, reason);
                    log.skipped.push(SkippedRow { row, formula: entry.formula.clone(), reason });
                }
            }
        }

        let mut graph = DependencyGraph::build(&rules);
        if !graph.is_acyclic() {
            log::info!(target: LOG_TARGET, "Circular dependencies found, removing low-priority rules");
            let resolution = self.resolver.resolve(graph, rules)?;
            log::info!(target: LOG_TARGET, "Removed {} rule(s) to fix cycles", resolution.removed.len());
            rules = resolution.rules;
            graph = resolution.graph;
            log.removed = resolution.removed;
        }

        let order = topology::sort(&graph)
            .map_err(|e| CompileError::UnresolvableCycle { fields: e.unordered })?;

        let descriptions: BTreeMap<FieldName, String> = descriptions
            .into_iter()
            .map(|(name, desc)| (FieldName::new(name.as_ref()), desc.as_ref().trim().to_string()))
            .collect();

        let table = RuleTable::new(rules, order, descriptions);
        log::info!(
            target: LOG_TARGET,
            "Compiled {} rule(s) for {} measurement(s); skipped {}",
            table.rule_count(),
            table.target_count(),
            log.skipped.len()
        );
        Ok(Compilation { table, log })
    }
}

/// Compiles with the default lowest-priority cycle breaking.
pub fn compile<I, K, V>(rows: &[RuleRow], descriptions: I) -> Result<Compilation, CompileError>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    RuleCompiler::new().compile(rows, descriptions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Relation;

    const NO_DESCRIPTIONS: [(&str, &str); 0] = [];

    fn rows(specs: &[(&str, i32)]) -> Vec<RuleRow> {
        specs.iter().map(|(f, p)| RuleRow::new(*f, *p)).collect()
    }

    fn order_of(c: &Compilation) -> Vec<&str> {
        c.table.order().iter().map(FieldName::as_str).collect()
    }

    #[test]
    fn test_bad_rows_are_skipped_not_fatal() {
        let input = rows(&[
            ("hip_cm = waist_cm * 1.2", 1),
            ("elbow_length_cm = sleeve_length_cm - 0.2 * height_cm", 1),
            ("nonsense", 2),
            ("bust_cm = hip_cm / 1.1", 1),
        ]);
        let c = compile(&input, NO_DESCRIPTIONS).unwrap();

        assert_eq!(c.log.skipped.iter().map(|s| s.row).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(order_of(&c), vec!["hip_cm", "bust_cm"]);
        assert_eq!(c.log.messages().len(), 2);
        assert!(c.log.messages()[0].contains("Skipped formula"));
    }

    #[test]
    fn test_malformed_coefficient_is_skipped() {
        let input = rows(&[("hip_cm = waist_cm * 1.2.3", 1), ("bust_cm = waist_cm * 1,3", 1)]);
        let c = compile(&input, NO_DESCRIPTIONS).unwrap();

        assert!(c.table.is_empty());
        assert_eq!(c.log.skipped.len(), 2);
        assert_eq!(c.log.skipped[0].reason, FormatError::InvalidLiteral { token: "1.2.3".into() });
        assert!(c.log.messages()[1].contains("'1,3' is not a valid number"));
    }

    #[test]
    fn test_cycle_keeps_higher_priority_direction() {
        let input = rows(&[("b_cm = a_cm * 2", 2), ("a_cm = b_cm / 2", 1)]);
        let c = compile(&input, NO_DESCRIPTIONS).unwrap();

        assert_eq!(c.log.removed.len(), 1);
        assert_eq!(c.log.removed[0].target.as_str(), "a_cm");
        assert_eq!(order_of(&c), vec!["b_cm"]);
        assert!(c.table.graph().is_acyclic());
        assert!(c.log.messages()[0].contains("Removed rule #1"));
    }

    #[test]
    fn test_every_base_precedes_its_target() {
        let input = rows(&[
            ("around_calf_cm = around_thigh_cm / 1.7", 1),
            ("around_ankle_cm = 0.5 * around_thigh_cm", 1),
            ("around_thigh_cm = 0.45 * height_cm", 1),
            ("around_knee_cm = 1.5 * around_ankle_cm", 2),
            ("around_knee_cm = 0.65 * around_thigh_cm", 1),
            ("around_thigh_cm = 1.5 * around_calf_cm", 3),
        ]);
        let c = compile(&input, NO_DESCRIPTIONS).unwrap();
        let order = order_of(&c);
        let pos = |f: &str| order.iter().position(|x| *x == f);

        for (target, rules) in c.table.iter() {
            for rule in rules {
                for base in rule.inputs() {
                    if let Some(b) = pos(base.as_str()) {
                        assert!(b < pos(target.as_str()).unwrap(), "{} before {}", base, target);
                    }
                }
            }
        }
        // thigh <-> calf: the priority-1 calf rule loses to the priority-3 thigh rule.
        assert_eq!(c.log.removed.len(), 1);
        assert_eq!(c.log.removed[0].target.as_str(), "around_calf_cm");
    }

    #[test]
    fn test_descriptions_are_normalized() {
        let input = rows(&[("hip_cm = waist_cm * 1.2", 1)]);
        let c = compile(&input, [("Hip CM", " Widest part of the hips ")]).unwrap();
        assert_eq!(c.table.description(&"hip_cm".into()), Some("Widest part of the hips"));
    }

    #[test]
    fn test_field_to_field_rules_compile() {
        let input = rows(&[
            ("dress_knee_length_cm = front_waist_length_cm + skirt_knee_length_cm", 1),
            ("skirt_knee_length_cm = 0.4 * height_cm", 1),
        ]);
        let c = compile(&input, NO_DESCRIPTIONS).unwrap();
        assert_eq!(order_of(&c), vec!["skirt_knee_length_cm", "dress_knee_length_cm"]);
        assert!(matches!(
            c.table.candidates(&"dress_knee_length_cm".into())[0].relation,
            Relation::Combine { .. }
        ));
    }
}
