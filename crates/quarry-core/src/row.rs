//! Result rows and typed column access.

use crate::error::{Error, Result};
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A single result row: parallel vectors of column names and values.
///
/// Rows are owned and serializable so they can round-trip through the cache
/// layer unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Build a row from (name, value) pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, Value)>,
        S: Into<String>,
    {
        let mut columns = Vec::new();
        let mut values = Vec::new();
        for (name, value) in pairs {
            columns.push(name.into());
            values.push(value);
        }
        Self { columns, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value at a positional index, if present.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Value for a named column, if present.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == name)
            .and_then(|i| self.values.get(i))
    }

    /// Typed access to a named column.
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        match self.get_by_name(name) {
            Some(value) => T::from_value(value),
            None => Err(Error::Serde(format!("no column named '{name}'"))),
        }
    }
}

/// Conversion from a database [`Value`] into a concrete Rust type.
pub trait FromValue: Sized {
    fn from_value(value: &Value) -> Result<Self>;
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| Error::Serde(format!("expected int, got {}", value.type_name())))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| Error::Serde(format!("expected float, got {}", value.type_name())))
    }
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| Error::Serde(format!("expected bool, got {}", value.type_name())))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::Serde(format!("expected text, got {}", value.type_name())))
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::Serde(format!("expected bytes, got {}", value.type_name())))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}
