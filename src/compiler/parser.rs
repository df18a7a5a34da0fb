//! Formula parser: `TARGET = EXPR` with exactly one binary operator.
//!
//! `EXPR` is either a field and an unsigned decimal literal (in either order)
//! or two fields. Anything richer is rejected rather than partially evaluated.

use super::error::FormatError;
use crate::store::{BinaryOp, FieldName, Relation, Rule, RuleId, RuleRow};

const OPERATORS: [char; 4] = ['+', '-', '*', '/'];

/// Parses a formula into its target field and relation.
pub fn parse_formula(formula: &str) -> Result<(FieldName, Relation), FormatError> {
    let compact: String = formula.chars().filter(|c| !c.is_whitespace()).collect();

    let (lhs, rhs) = match compact.matches('=').count() {
        0 => return Err(FormatError::MissingEquals),
        1 => compact.split_once('=').ok_or(FormatError::MissingEquals)?,
        _ => return Err(FormatError::MultipleEquals),
    };

    let target = FieldName::new(lhs);
    if target.is_empty() || !matches!(parse_literal(lhs), Ok(None)) {
        return Err(FormatError::EmptyTarget);
    }

    let ops: Vec<(usize, char)> = rhs.char_indices().filter(|(_, c)| OPERATORS.contains(c)).collect();
    let (pos, symbol) = match ops.as_slice() {
        [] => return Err(FormatError::MissingOperator),
        [single] => *single,
        many => return Err(FormatError::MultipleOperators { count: many.len() }),
    };
    let op = BinaryOp::from_symbol(symbol).ok_or(FormatError::MissingOperator)?;

    let (left, right) = (&rhs[..pos], &rhs[pos + symbol.len_utf8()..]);
    if left.is_empty() || right.is_empty() {
        return Err(FormatError::EmptyOperand { op: symbol });
    }

    let relation = match (parse_literal(left)?, parse_literal(right)?) {
        (Some(_), Some(_)) => return Err(FormatError::NoFieldOperand),
        (None, Some(value)) => field_then_literal(field_operand(left, symbol)?, op, value)?,
        (Some(value), None) => literal_then_field(value, op, field_operand(right, symbol)?)?,
        (None, None) => Relation::Combine {
            lhs: field_operand(left, symbol)?,
            op,
            rhs: field_operand(right, symbol)?,
        },
    };

    if relation.inputs().contains(&&target) {
        return Err(FormatError::SelfReference { field: target });
    }

    Ok((target, relation))
}

/// Parses one authored row into a rule carrying its metadata.
pub fn parse_rule(id: RuleId, row: &RuleRow) -> Result<Rule, FormatError> {
    let (target, relation) = parse_formula(&row.formula)?;
    Ok(Rule {
        id,
        target,
        relation,
        priority: row.priority,
        tolerance: row.tolerance.filter(|t| t.is_finite()).unwrap_or(0.0),
        notes: row.notes.as_deref().map(str::trim).unwrap_or_default().to_string(),
    })
}

fn field_then_literal(base: FieldName, op: BinaryOp, value: f64) -> Result<Relation, FormatError> {
    Ok(match op {
        BinaryOp::Multiply => Relation::Proportion { base, multiplier: value },
        BinaryOp::Divide if value == 0.0 => return Err(FormatError::DivisionByZero),
        BinaryOp::Divide => Relation::Ratio { base, multiplier: 1.0 / value },
        BinaryOp::Add => Relation::Offset { base, offset: value },
        BinaryOp::Subtract => Relation::Offset { base, offset: -value },
    })
}

fn literal_then_field(value: f64, op: BinaryOp, base: FieldName) -> Result<Relation, FormatError> {
    match op {
        BinaryOp::Multiply => Ok(Relation::Proportion { base, multiplier: value }),
        BinaryOp::Add => Ok(Relation::Offset { base, offset: value }),
        BinaryOp::Subtract | BinaryOp::Divide => Err(FormatError::UnsupportedOperandOrder { op: op.symbol() }),
    }
}

fn field_operand(token: &str, op: char) -> Result<FieldName, FormatError> {
    let field = FieldName::new(token);
    if field.is_empty() {
        return Err(FormatError::EmptyOperand { op });
    }
    Ok(field)
}

/// Reads a numeric operand.
///
/// Only unsigned decimals (`12`, `0.85`, `.5`) are literals. A token that
/// does not start with a digit or `.` is a field reference, so names such as
/// `inf` or `nan` stay fields. Anything else that starts like a number
/// (`1.2.3`, `1,2`, `1e3`) is an error rather than a field.
fn parse_literal(token: &str) -> Result<Option<f64>, FormatError> {
    if !token.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return Ok(None);
    }
    let well_formed = token.chars().all(|c| c.is_ascii_digit() || c == '.')
        && token.chars().filter(|&c| c == '.').count() <= 1
        && token.chars().any(|c| c.is_ascii_digit());
    well_formed
        .then(|| token.parse::<f64>().ok())
        .flatten()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| FormatError::InvalidLiteral { token: token.to_string() })
}
