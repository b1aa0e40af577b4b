//! The storage execution boundary.
//!
//! [`Storage`] is the single seam between the query core and whatever backend
//! actually runs SQL. Implementations receive finished SQL text plus a bound
//! parameter vector and never see the builder or condition layers. All
//! operations take an asupersync `Cx` so cancellation propagates through the
//! backend call.

use crate::error::Error;
use crate::row::Row;
use crate::value::Value;
use asupersync::{Cx, Outcome};

/// Executes finished statements against a backend.
pub trait Storage: Send + Sync {
    /// Run a row-returning statement and collect all rows.
    fn query(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Vec<Row>, Error>> + Send;

    /// Run a row-returning statement, keeping at most the first row.
    fn query_one(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<Option<Row>, Error>> + Send;

    /// Run a mutating statement, returning the affected-row count.
    fn execute(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<u64, Error>> + Send;

    /// Run an INSERT, returning the backend-generated key.
    fn insert(
        &self,
        cx: &Cx,
        sql: &str,
        params: &[Value],
    ) -> impl Future<Output = Outcome<i64, Error>> + Send;
}
