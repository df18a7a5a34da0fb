//! Graph analyses shared by the compiler and the rule table.
pub mod topology;
