//! Builds the field dependency graph from per-target rule lists.
pub mod dag;

pub use dag::DependencyGraph;
