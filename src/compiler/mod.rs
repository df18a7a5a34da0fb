//! Turns authored formula rows into an executable, acyclic rule table.
pub mod compile;
pub mod error;
pub mod parser;
pub mod resolver;
pub mod table;

pub use compile::{compile, Compilation, CompileLog, RuleCompiler, SkippedRow};
pub use error::{CompileError, FormatError, TableError};
pub use parser::{parse_formula, parse_rule};
pub use resolver::{CycleResolver, LowestPriority, RemovalStrategy, Resolution};
pub use table::RuleTable;
