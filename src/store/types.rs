//! Core value types shared by the compiler and the inference engine.

use serde::{Deserialize, Deserializer, Serialize};
use smallvec::{smallvec, SmallVec};
use std::borrow::Borrow;
use std::fmt;

/// A normalized measurement name.
///
/// Identity is the snake-case form: lowercase, every character outside
/// `[a-z0-9_]` replaced by `_`, and runs of `_` collapsed to one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FieldName(String);

impl FieldName {
    pub fn new(raw: &str) -> Self {
        Self(normalize(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty() || self.0 == "_"
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Names read from JSON are normalized like any other input.
impl<'de> Deserialize<'de> for FieldName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(&raw))
    }
}

impl Borrow<str> for FieldName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FieldName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.trim().chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '_' };
        if c == '_' && out.ends_with('_') {
            continue;
        }
        out.push(c);
    }
    out
}

/// Stable identifier of a rule: the index of the row it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct RuleId(pub u32);

impl RuleId {
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Arithmetic operator of a field-to-field rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub fn symbol(&self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Subtract => '-',
            BinaryOp::Multiply => '*',
            BinaryOp::Divide => '/',
        }
    }

    pub(crate) fn from_symbol(c: char) -> Option<Self> {
        match c {
            '+' => Some(BinaryOp::Add),
            '-' => Some(BinaryOp::Subtract),
            '*' => Some(BinaryOp::Multiply),
            '/' => Some(BinaryOp::Divide),
            _ => None,
        }
    }

    /// Returns `None` when the result is not a finite number (e.g. division by zero).
    pub fn apply(&self, lhs: f64, rhs: f64) -> Option<f64> {
        let out = match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Subtract => lhs - rhs,
            BinaryOp::Multiply => lhs * rhs,
            BinaryOp::Divide => lhs / rhs,
        };
        out.is_finite().then_some(out)
    }
}

/// The arithmetic a rule applies to derive its target.
///
/// Proportion and ratio both evaluate as `base * multiplier`; a ratio keeps
/// its own tag so compiled tables still read the way they were authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Relation {
    /// `target = base * multiplier`
    Proportion { base: FieldName, multiplier: f64 },
    /// `target = base / divisor`, stored as `multiplier = 1 / divisor`.
    Ratio { base: FieldName, multiplier: f64 },
    /// `target = base + offset`; a `-` in the formula stores a negative offset.
    Offset { base: FieldName, offset: f64 },
    /// `target = lhs <op> rhs` where both operands are fields.
    Combine { lhs: FieldName, op: BinaryOp, rhs: FieldName },
}

impl Relation {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Relation::Proportion { .. } => "proportion",
            Relation::Ratio { .. } => "ratio",
            Relation::Offset { .. } => "offset",
            Relation::Combine { .. } => "combine",
        }
    }

    /// Fields that must be known before the relation can be evaluated.
    pub fn inputs(&self) -> SmallVec<[&FieldName; 2]> {
        match self {
            Relation::Proportion { base, .. }
            | Relation::Ratio { base, .. }
            | Relation::Offset { base, .. } => smallvec![base],
            Relation::Combine { lhs, rhs, .. } => smallvec![lhs, rhs],
        }
    }

    /// Evaluates the relation given a lookup for base values.
    ///
    /// Returns `None` if any input is unknown or the result is not finite.
    pub fn evaluate<F>(&self, lookup: F) -> Option<f64>
    where
        F: Fn(&FieldName) -> Option<f64>,
    {
        let out = match self {
            Relation::Proportion { base, multiplier } | Relation::Ratio { base, multiplier } => {
                lookup(base)? * multiplier
            }
            Relation::Offset { base, offset } => lookup(base)? + offset,
            Relation::Combine { lhs, op, rhs } => return op.apply(lookup(lhs)?, lookup(rhs)?),
        };
        out.is_finite().then_some(out)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::Proportion { base, multiplier } | Relation::Ratio { base, multiplier } => {
                write!(f, "{} * {:.4}", base, multiplier)
            }
            Relation::Offset { base, offset } if *offset < 0.0 => write!(f, "{} - {}", base, -offset),
            Relation::Offset { base, offset } => write!(f, "{} + {}", base, offset),
            Relation::Combine { lhs, op, rhs } => write!(f, "{} {} {}", lhs, op.symbol(), rhs),
        }
    }
}

/// A single compiled relation deriving `target` from one or two base fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: RuleId,
    pub target: FieldName,
    pub relation: Relation,
    /// Lower values are tried first at inference time and are also the first
    /// to be discarded when breaking a cycle.
    pub priority: i32,
    #[serde(default)]
    pub tolerance: f64,
    #[serde(default)]
    pub notes: String,
}

impl Rule {
    pub fn inputs(&self) -> SmallVec<[&FieldName; 2]> {
        self.relation.inputs()
    }

    pub fn depends_on(&self, field: &FieldName) -> bool {
        self.inputs().iter().any(|f| *f == field)
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {} ({}, priority {})",
            self.target,
            self.relation,
            self.relation.kind_name(),
            self.priority
        )
    }
}

/// One authored row of the relationship sheet, before parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuleRow {
    pub formula: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub tolerance: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl RuleRow {
    pub fn new(formula: impl Into<String>, priority: i32) -> Self {
        Self { formula: formula.into(), priority, ..Default::default() }
    }
}
