//! The `Model` trait: the contract between domain structs and the query core.

use crate::error::Result;
use crate::row::Row;
use crate::value::Value;

/// A persistable record type.
///
/// Implementations map a struct to and from a [`Row`] and expose enough
/// metadata (table name, primary key column) for the query and handler layers
/// to build statements without reflection.
pub trait Model: Sized + Send + Sync {
    /// Table name this model persists to.
    const TABLE: &'static str;

    /// Single-column primary key name.
    const PRIMARY_KEY: &'static str = "id";

    /// Column names in declaration order, primary key included.
    fn columns() -> Vec<&'static str>;

    /// Current field values as a row, in [`columns`](Model::columns) order.
    fn to_row(&self) -> Row;

    /// Hydrate an instance from a result row.
    fn from_row(row: &Row) -> Result<Self>;

    /// Current primary key value. `Value::Null` for unsaved records.
    fn primary_key(&self) -> Value;

    /// True when the record has never been persisted.
    ///
    /// A null key means unsaved; a zero integer key is treated the same so
    /// that zero-defaulted structs insert instead of updating record 0.
    fn is_new(&self) -> bool {
        matches!(self.primary_key(), Value::Null | Value::Int(0))
    }

    /// Store a backend-generated key after an insert.
    fn set_generated_key(&mut self, key: i64);
}
