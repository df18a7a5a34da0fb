use crate::compiler::RuleTable;
use crate::compute::record::{Provenance, Record};
use crate::store::{FieldName, Relation, Rule};
use std::collections::HashMap;
use std::fmt::Write;

/// Renders how `target` got its value as an indented tree.
///
/// Derived fields show the rule that produced them and recurse into its
/// bases. Supplied and predicted values are leaves; a field reached a second
/// time prints a back reference to the level where it first appeared.
pub fn format_trace(table: &RuleTable, record: &Record, target: &FieldName) -> String {
    let mut tracer = Tracer { table, record, visited_at_level: HashMap::new(), output: String::new() };

    let _ = writeln!(tracer.output, "DERIVATION TRACE for field '{}':", target);
    let _ = writeln!(tracer.output, "--------------------------------------------------");
    tracer.trace_field(target, 1, "");
    tracer.output
}

struct Tracer<'a> {
    table: &'a RuleTable,
    record: &'a Record,
    visited_at_level: HashMap<&'a FieldName, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_field(&mut self, field: &'a FieldName, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(field) {
            let _ = writeln!(self.output, "{}-> (Ref to L{})", prefix, first_seen);
            return;
        }
        self.visited_at_level.insert(field, level);

        let line_header = format!("[L{}] {}{}", level, field, self.format_value(field));

        let (rule_id, marker) = match self.record.entry(field).map(|e| e.provenance) {
            None => {
                let _ = writeln!(self.output, "{}{} -> Unknown", prefix, line_header);
                return;
            }
            Some(Provenance::Supplied) => {
                let _ = writeln!(self.output, "{}{} -> Supplied", prefix, line_header);
                return;
            }
            Some(Provenance::Predicted) => {
                let _ = writeln!(self.output, "{}{} -> Predicted", prefix, line_header);
                return;
            }
            Some(Provenance::Rule { rule }) => (rule, ""),
            Some(Provenance::Blended { rule }) => (rule, " [BLENDED]"),
        };

        match self.table.find_rule(rule_id) {
            Some(rule) => {
                let _ = writeln!(
                    self.output,
                    "{}{}{} = {} (rule {})",
                    prefix, line_header, marker, self.format_relation(rule), rule.id
                );
                self.recurse_bases(prefix, rule, level);
            }
            None => {
                let _ = writeln!(self.output, "{}{}{} -> Rule {} (not in table)", prefix, line_header, marker, rule_id);
            }
        }
    }

    fn recurse_bases(&mut self, prefix: &str, rule: &'a Rule, level: usize) {
        let stem = self.build_child_stem(prefix);
        let bases = rule.inputs();
        let count = bases.len();
        for (i, base) in bases.into_iter().enumerate() {
            let connector = if i == count - 1 { "`--" } else { "|--" };
            let full_prefix = format!("{}{}", stem, connector);
            self.trace_field(base, level + 1, &full_prefix);
        }
    }

    fn format_relation(&self, rule: &Rule) -> String {
        match &rule.relation {
            Relation::Proportion { base, multiplier } | Relation::Ratio { base, multiplier } => {
                format!("{}{} * {:.4}", base, self.format_value(base), multiplier)
            }
            Relation::Offset { base, offset } if *offset < 0.0 => {
                format!("{}{} - {}", base, self.format_value(base), -offset)
            }
            Relation::Offset { base, offset } => format!("{}{} + {}", base, self.format_value(base), offset),
            Relation::Combine { lhs, op, rhs } => format!(
                "{}{} {} {}{}",
                lhs,
                self.format_value(lhs),
                op.symbol(),
                rhs,
                self.format_value(rhs)
            ),
        }
    }

    fn format_value(&self, field: &FieldName) -> String {
        match self.record.get(field) {
            Some(v) => format!(" [{:.3}]", v),
            None => " [?]".to_string(),
        }
    }

    fn build_child_stem(&self, current_prefix: &str) -> String {
        current_prefix.replace("`--", "   ").replace("|--", "|  ")
    }
}
