//! SQL construction layer for Quarry.
//!
//! `quarry-query` turns structured query descriptions into SQL text plus an
//! ordered parameter vector. It has three pieces:
//!
//! - **Condition model**: [`Condition`] and [`ConditionGroup`] describe WHERE
//!   predicates as data, with operator arity checked at construction.
//! - **Query builder**: [`Query`] accumulates clauses immutably and compiles
//!   them with [`Query::build`]. Building never mutates the query, so a single
//!   description can be compiled repeatedly (a list query and its count
//!   variant, for example).
//! - **Mutation builders**: [`Insert`], [`Update`], and [`Delete`] generate
//!   write statements from [`Model`](quarry_core::Model) metadata.
//!
//! Values never appear in SQL text. Every comparison value becomes a
//! placeholder in dialect syntax and lands in [`Statement::params`] in
//! placeholder order. Identifiers are validated against a strict grammar
//! instead of quoted.

pub mod condition;
pub mod dialect;
pub mod mutation;
pub mod query;

pub use condition::{Combinator, Condition, ConditionGroup, Operator};
pub use dialect::Dialect;
pub use mutation::{Delete, Insert, Update};
pub use query::{Aggregate, Clause, Direction, Join, JoinKind, OrderBy, Query, Statement};
