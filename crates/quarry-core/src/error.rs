//! Error types for Quarry operations.

use crate::value::Value;
use std::fmt;

/// The primary error type for all Quarry operations.
///
/// Construction-time errors (`InvalidPredicate`, `EmptyGroup`,
/// `UnsafeIdentifier`, `EmptyQuerySpec`) indicate a caller bug and surface
/// immediately at the call that caused them. `NotFound` is an expected,
/// recoverable condition; `Storage` wraps execution-boundary failures and is
/// propagated unchanged, never retried by this core.
#[derive(Debug)]
pub enum Error {
    /// Operator/value arity mismatch when building a condition
    InvalidPredicate { message: String },
    /// A condition group was constructed with zero children
    EmptyGroup,
    /// An identifier contains characters outside the safe grammar
    UnsafeIdentifier { identifier: String },
    /// `build()` was called with no source table set
    EmptyQuerySpec,
    /// A single-record lookup matched no rows
    NotFound { table: String, key: Value },
    /// Execution boundary failure
    Storage(StorageError),
    /// Serialization/deserialization errors (cached payloads)
    Serde(String),
}

/// Failure reported by the storage execution boundary.
#[derive(Debug)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Backend unreachable or connection lost
    Unavailable,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Statement timed out
    Timeout,
    /// Other backend error
    Database,
}

impl StorageError {
    /// Create a storage error with no underlying source.
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }
}

impl Error {
    /// Is this the typed "no such record" condition?
    ///
    /// Callers use this to distinguish a missing record from an unreachable
    /// backend.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// Is this a construction-time (caller bug) error?
    pub fn is_construction(&self) -> bool {
        matches!(
            self,
            Error::InvalidPredicate { .. }
                | Error::EmptyGroup
                | Error::UnsafeIdentifier { .. }
                | Error::EmptyQuerySpec
        )
    }

    /// Convenience constructor for predicate arity failures.
    pub fn invalid_predicate(message: impl Into<String>) -> Self {
        Error::InvalidPredicate {
            message: message.into(),
        }
    }

    /// Convenience constructor for unsafe identifiers.
    pub fn unsafe_identifier(identifier: impl Into<String>) -> Self {
        Error::UnsafeIdentifier {
            identifier: identifier.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidPredicate { message } => write!(f, "Invalid predicate: {message}"),
            Error::EmptyGroup => write!(f, "Condition group requires at least one child"),
            Error::UnsafeIdentifier { identifier } => {
                write!(f, "Unsafe identifier: {identifier:?}")
            }
            Error::EmptyQuerySpec => write!(f, "Query has no source table"),
            Error::NotFound { table, key } => {
                write!(f, "No record in '{table}' with key {key:?}")
            }
            Error::Storage(e) => write!(f, "Storage error: {}", e.message),
            Error::Serde(msg) => write!(f, "Serialization error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Storage(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

/// Result type alias for Quarry operations.
pub type Result<T> = std::result::Result<T, Error>;
