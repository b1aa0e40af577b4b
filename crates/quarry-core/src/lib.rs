//! Core types and traits for Quarry.
//!
//! This crate provides the foundational abstractions shared by the query,
//! cache, event, and handler layers:
//!
//! - `Value` dynamic SQL value for parameter binding and result fetching
//! - `Row` result row with typed column access
//! - `Model` trait mapping domain structs to table rows
//! - `Storage` trait for the statement execution boundary
//! - `Error` taxonomy covering construction-time and execution-time failures
//! - Identifier validation, the sole injection defense for table/column names

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod error;
pub mod ident;
pub mod model;
pub mod row;
pub mod storage;
pub mod value;

pub use error::{Error, Result, StorageError, StorageErrorKind};
pub use ident::check_identifier;
pub use model::Model;
pub use row::{FromValue, Row};
pub use storage::Storage;
pub use value::Value;
