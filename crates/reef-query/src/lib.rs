//! Query model and evaluation.
//!
//! A [`Query`] is a compiled AST: a table key plus either a SELECT (where
//! tree and limit) or a JOIN (rows to merge). Evaluation runs against a
//! [`reef_crdt::Namespace`] snapshot: SELECT is read-only and produces a
//! result namespace; JOIN produces the table the engine merges into its
//! working namespace. The grammar and parser that produce these ASTs live
//! outside this crate.

pub mod error;
pub mod eval;
pub mod query;

pub use error::{QueryError, QueryResult};
pub use eval::{evaluate_select, match_where, table_from_join};
pub use query::{Predicate, PredicateOp, Query, QueryJoin, QueryOp, QuerySelect, RowJoin, Where};
