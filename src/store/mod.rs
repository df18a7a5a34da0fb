//! Rule and field types, plus the per-target rule registry.
pub mod registry;
pub mod types;

pub use registry::RuleSet;
pub use types::{BinaryOp, FieldName, Relation, Rule, RuleId, RuleRow};
