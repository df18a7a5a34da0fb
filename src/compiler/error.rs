//! Defines the error types for the compiler module.
use crate::store::FieldName;
use thiserror::Error;

/// Why a single formula row could not be turned into a rule.
///
/// These are always recovered locally: the row is skipped and logged.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormatError {
    #[error("missing '=' in formula")]
    MissingEquals,
    #[error("more than one '=' in formula")]
    MultipleEquals,
    #[error("formula has no target field")]
    EmptyTarget,
    #[error("formula combines {count} operators; only a single binary operation is supported")]
    MultipleOperators { count: usize },
    #[error("unsupported or missing operator in formula")]
    MissingOperator,
    #[error("operator '{op}' is missing an operand")]
    EmptyOperand { op: char },
    #[error("formula has no field operand")]
    NoFieldOperand,
    #[error("'literal {op} field' cannot be expressed as a proportion or offset of the field")]
    UnsupportedOperandOrder { op: char },
    #[error("'{token}' is not a valid number")]
    InvalidLiteral { token: String },
    #[error("division by zero")]
    DivisionByZero,
    #[error("field '{field}' cannot be derived from itself")]
    SelfReference { field: FieldName },
}

/// Structural failures that abort compilation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    #[error("Cycle through {fields:?} could not be resolved: no removable rule found")]
    UnresolvableCycle { fields: Vec<FieldName> },
}

/// A deserialized rule table that does not satisfy the compiled-table invariants.
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Malformed rule table: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Rule table order is inconsistent: {msg}")]
    Inconsistent { msg: String },
}
