//! Row-level security: per-row visibility decisions and predicate pushdown.
//!
//! `engine` is the authority; every decision it makes can be attributed to a
//! numbered rule. `predicate` compiles the same scope into a filter callers
//! can push into queries.

pub mod engine;
pub mod predicate;

pub use engine::{FilterDecision, RowDescriptor, RowFilterEngine, ScopeRule};
pub use predicate::{PredicateCompiler, RowPredicate, SqlColumns};
