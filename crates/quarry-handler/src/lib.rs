//! Operation orchestration for Quarry.
//!
//! [`Repository`] drives each operation through its fixed step order: reads
//! go cache check, build, execute, adapt, cache store; writes go adapt,
//! execute, invalidate, broadcast. Invalidation always precedes broadcast so
//! a handler that re-reads the record sees fresh data, and a failed or
//! cancelled execute skips both.
//!
//! The role traits ([`Finder`], [`Reader`], [`Counter`], [`Writer`]) let
//! consumers depend on just the operations they use.

pub mod criteria;
pub mod repository;

pub use criteria::Criteria;
pub use repository::{Counter, Finder, Reader, Repository, Writer};
