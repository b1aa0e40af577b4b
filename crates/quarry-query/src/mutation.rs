//! Write-statement builders.
//!
//! These generate INSERT/UPDATE/DELETE statements from
//! [`Model`](quarry_core::Model) metadata. They follow the same rules as the
//! read path: values only ever appear as placeholders and identifiers are
//! validated before rendering.

use crate::condition::ConditionGroup;
use crate::dialect::Dialect;
use crate::query::Statement;
use quarry_core::{Error, Model, Result, Value, check_identifier};

/// Builds `INSERT INTO {table} (...) VALUES (...)`.
///
/// A null primary key is omitted from the column list so the backend can
/// generate it.
#[derive(Debug)]
pub struct Insert<'a, M: Model> {
    model: &'a M,
    dialect: Dialect,
}

impl<'a, M: Model> Insert<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self {
            model,
            dialect: Dialect::default(),
        }
    }

    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn build(&self) -> Result<Statement> {
        check_identifier(M::TABLE)?;
        let row = self.model.to_row();
        let skip_key = self.model.is_new();
        let mut columns = Vec::new();
        let mut params = Vec::new();
        for (i, column) in row.columns().iter().enumerate() {
            check_identifier(column)?;
            let value = row.get(i).cloned().unwrap_or(Value::Null);
            if column == M::PRIMARY_KEY && skip_key {
                continue;
            }
            columns.push(column.clone());
            params.push(value);
        }

        let mut sql = String::from("INSERT INTO ");
        sql.push_str(M::TABLE);
        sql.push_str(" (");
        sql.push_str(&columns.join(", "));
        sql.push_str(") VALUES (");
        for i in 1..=params.len() {
            if i > 1 {
                sql.push_str(", ");
            }
            sql.push_str(&self.dialect.placeholder(i));
        }
        sql.push(')');
        Ok(Statement { sql, params })
    }
}

/// Builds `UPDATE {table} SET ... WHERE ...`.
///
/// Without an explicit filter the WHERE targets the model's primary key, so
/// the default statement updates exactly the record it was built from.
#[derive(Debug)]
pub struct Update<'a, M: Model> {
    model: &'a M,
    filter: Option<ConditionGroup>,
    dialect: Dialect,
}

impl<'a, M: Model> Update<'a, M> {
    pub fn new(model: &'a M) -> Self {
        Self {
            model,
            filter: None,
            dialect: Dialect::default(),
        }
    }

    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Replace the default primary-key WHERE with an explicit predicate.
    #[must_use]
    pub fn filter(mut self, predicate: impl Into<ConditionGroup>) -> Self {
        self.filter = Some(predicate.into());
        self
    }

    pub fn build(&self) -> Result<Statement> {
        check_identifier(M::TABLE)?;
        let row = self.model.to_row();
        let mut sql = String::from("UPDATE ");
        sql.push_str(M::TABLE);
        sql.push_str(" SET ");
        let mut params = Vec::new();
        let mut index = 1;
        let mut first = true;
        for (i, column) in row.columns().iter().enumerate() {
            if column == M::PRIMARY_KEY {
                continue;
            }
            check_identifier(column)?;
            if !first {
                sql.push_str(", ");
            }
            first = false;
            sql.push_str(column);
            sql.push_str(" = ");
            sql.push_str(&self.dialect.placeholder(index));
            index += 1;
            params.push(row.get(i).cloned().unwrap_or(Value::Null));
        }

        sql.push_str(" WHERE ");
        match &self.filter {
            Some(filter) => filter.render(&mut sql, &mut params, self.dialect, &mut index)?,
            None => {
                if self.model.is_new() {
                    return Err(Error::invalid_predicate(
                        "cannot update a record with no primary key",
                    ));
                }
                let key = self.model.primary_key();
                check_identifier(M::PRIMARY_KEY)?;
                sql.push_str(M::PRIMARY_KEY);
                sql.push_str(" = ");
                sql.push_str(&self.dialect.placeholder(index));
                params.push(key);
            }
        }
        Ok(Statement { sql, params })
    }
}

/// Builds `DELETE FROM {table} WHERE ...`.
#[derive(Debug)]
pub struct Delete<M: Model> {
    key: Value,
    filter: Option<ConditionGroup>,
    dialect: Dialect,
    _model: std::marker::PhantomData<M>,
}

impl<M: Model> Delete<M> {
    /// Delete the record with the given primary key.
    pub fn by_key(key: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            filter: None,
            dialect: Dialect::default(),
            _model: std::marker::PhantomData,
        }
    }

    /// Delete every record matching a predicate.
    pub fn matching(predicate: impl Into<ConditionGroup>) -> Self {
        Self {
            key: Value::Null,
            filter: Some(predicate.into()),
            dialect: Dialect::default(),
            _model: std::marker::PhantomData,
        }
    }

    #[must_use]
    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn build(&self) -> Result<Statement> {
        check_identifier(M::TABLE)?;
        let mut sql = String::from("DELETE FROM ");
        sql.push_str(M::TABLE);
        sql.push_str(" WHERE ");
        let mut params = Vec::new();
        let mut index = 1;
        match &self.filter {
            Some(filter) => filter.render(&mut sql, &mut params, self.dialect, &mut index)?,
            None => {
                if self.key.is_null() {
                    return Err(Error::invalid_predicate(
                        "cannot delete a record with no primary key",
                    ));
                }
                check_identifier(M::PRIMARY_KEY)?;
                sql.push_str(M::PRIMARY_KEY);
                sql.push_str(" = ");
                sql.push_str(&self.dialect.placeholder(index));
                params.push(self.key.clone());
            }
        }
        Ok(Statement { sql, params })
    }
}
