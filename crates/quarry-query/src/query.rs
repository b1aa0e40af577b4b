//! The query builder and its compiler.
//!
//! [`Query`] accumulates clauses through consuming-`self` chain calls and
//! compiles them with [`Query::build`], which borrows the query and therefore
//! cannot mutate it. Compiling the same query twice yields byte-identical
//! output, which is what lets the handler layer derive a count statement and
//! a list statement from one description.

use crate::condition::ConditionGroup;
use crate::dialect::Dialect;
use quarry_core::{Error, Result, Value, check_identifier};
use serde::{Deserialize, Serialize};

/// MySQL has no standalone OFFSET; this is the documented "all rows" LIMIT
/// that pairs with an offset-only query there.
const MYSQL_UNBOUNDED_LIMIT: &str = "18446744073709551615";

/// Finished SQL text plus its ordered parameter vector.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Value>,
}

/// Join flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Left,
    Right,
}

impl JoinKind {
    const fn as_sql(self) -> &'static str {
        match self {
            JoinKind::Left => "LEFT JOIN",
            JoinKind::Right => "RIGHT JOIN",
        }
    }
}

/// One join clause, rendered in insertion order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub kind: JoinKind,
    pub table: String,
    pub left_column: String,
    pub right_column: String,
}

/// Sort direction for an ORDER BY term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    const fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

/// One ORDER BY term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: Direction,
}

/// An aggregate SELECT term with its output alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Aggregate {
    Count { column: String, alias: String },
    Sum { column: String, alias: String },
}

/// Clause categories that [`Query::without`] can clear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clause {
    Select,
    Joins,
    Where,
    GroupBy,
    Aggregates,
    OrderBy,
    Limit,
    Offset,
}

/// An accumulated query description.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    dialect: Dialect,
    columns: Vec<String>,
    table: Option<String>,
    alias: Option<String>,
    joins: Vec<Join>,
    filter: Option<ConditionGroup>,
    group_by: Vec<String>,
    aggregates: Vec<Aggregate>,
    order_by: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dialect(dialect: Dialect) -> Self {
        Self {
            dialect,
            ..Self::default()
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Set an explicit projection. Without this the query selects `*`.
    #[must_use]
    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| (*c).to_string()).collect();
        self
    }

    #[must_use]
    pub fn from(mut self, table: &str) -> Self {
        self.table = Some(table.to_string());
        self.alias = None;
        self
    }

    #[must_use]
    pub fn from_as(mut self, table: &str, alias: &str) -> Self {
        self.table = Some(table.to_string());
        self.alias = Some(alias.to_string());
        self
    }

    #[must_use]
    pub fn left_join(self, table: &str, left_column: &str, right_column: &str) -> Self {
        self.join(JoinKind::Left, table, left_column, right_column)
    }

    #[must_use]
    pub fn right_join(self, table: &str, left_column: &str, right_column: &str) -> Self {
        self.join(JoinKind::Right, table, left_column, right_column)
    }

    fn join(mut self, kind: JoinKind, table: &str, left_column: &str, right_column: &str) -> Self {
        self.joins.push(Join {
            kind,
            table: table.to_string(),
            left_column: left_column.to_string(),
            right_column: right_column.to_string(),
        });
        self
    }

    /// Set the WHERE predicate. A second call ANDs with the existing one.
    #[must_use]
    pub fn filter(mut self, predicate: impl Into<ConditionGroup>) -> Self {
        let predicate = predicate.into();
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(predicate),
            None => predicate,
        });
        self
    }

    #[must_use]
    pub fn group_by(mut self, columns: &[&str]) -> Self {
        self.group_by
            .extend(columns.iter().map(|c| (*c).to_string()));
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order_by.push(OrderBy {
            column: column.to_string(),
            direction,
        });
        self
    }

    #[must_use]
    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    #[must_use]
    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Add a `COUNT({column}) AS {alias}` term. Use `*` to count rows.
    #[must_use]
    pub fn count(mut self, column: &str, alias: &str) -> Self {
        self.aggregates.push(Aggregate::Count {
            column: column.to_string(),
            alias: alias.to_string(),
        });
        self
    }

    /// Add a `SUM({column}) AS {alias}` term.
    #[must_use]
    pub fn sum(mut self, column: &str, alias: &str) -> Self {
        self.aggregates.push(Aggregate::Sum {
            column: column.to_string(),
            alias: alias.to_string(),
        });
        self
    }

    /// A copy of this query with the named clause categories cleared.
    ///
    /// This is how one description yields variants: the count form of a list
    /// query is `query.without(&[Clause::OrderBy, Clause::Limit,
    /// Clause::Offset]).count("*", "total")`.
    #[must_use]
    pub fn without(&self, clauses: &[Clause]) -> Self {
        let mut copy = self.clone();
        for clause in clauses {
            match clause {
                Clause::Select => copy.columns.clear(),
                Clause::Joins => copy.joins.clear(),
                Clause::Where => copy.filter = None,
                Clause::GroupBy => copy.group_by.clear(),
                Clause::Aggregates => copy.aggregates.clear(),
                Clause::OrderBy => copy.order_by.clear(),
                Clause::Limit => copy.limit = None,
                Clause::Offset => copy.offset = None,
            }
        }
        copy
    }

    /// Compile to SQL text and an ordered parameter vector.
    ///
    /// Every condition value becomes a placeholder; identifiers are validated
    /// and rendered verbatim. Fails with
    /// [`EmptyQuerySpec`](quarry_core::Error::EmptyQuerySpec) when no table
    /// was set.
    pub fn build(&self) -> Result<Statement> {
        let table = self.table.as_deref().ok_or(Error::EmptyQuerySpec)?;
        check_identifier(table)?;
        if let Some(alias) = self.alias.as_deref() {
            check_identifier(alias)?;
        }

        let mut sql = String::from("SELECT ");
        self.render_projection(&mut sql)?;

        sql.push_str(" FROM ");
        sql.push_str(table);
        if let Some(alias) = self.alias.as_deref() {
            sql.push_str(" AS ");
            sql.push_str(alias);
        }

        for join in &self.joins {
            check_identifier(&join.table)?;
            check_identifier(&join.left_column)?;
            check_identifier(&join.right_column)?;
            sql.push(' ');
            sql.push_str(join.kind.as_sql());
            sql.push(' ');
            sql.push_str(&join.table);
            sql.push_str(" ON ");
            sql.push_str(&join.left_column);
            sql.push_str(" = ");
            sql.push_str(&join.right_column);
        }

        let mut params = Vec::new();
        if let Some(filter) = &self.filter {
            sql.push_str(" WHERE ");
            let mut index = 1;
            filter.render(&mut sql, &mut params, self.dialect, &mut index)?;
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            for (i, column) in self.group_by.iter().enumerate() {
                check_identifier(column)?;
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(column);
            }
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            for (i, term) in self.order_by.iter().enumerate() {
                check_identifier(&term.column)?;
                if i > 0 {
                    sql.push_str(", ");
                }
                sql.push_str(&term.column);
                sql.push(' ');
                sql.push_str(term.direction.as_sql());
            }
        }

        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ");
                sql.push_str(&limit.to_string());
                if let Some(offset) = offset {
                    sql.push_str(" OFFSET ");
                    sql.push_str(&offset.to_string());
                }
            }
            (None, Some(offset)) => {
                if self.dialect.offset_requires_limit() {
                    sql.push_str(" LIMIT ");
                    sql.push_str(MYSQL_UNBOUNDED_LIMIT);
                }
                sql.push_str(" OFFSET ");
                sql.push_str(&offset.to_string());
            }
            (None, None) => {}
        }

        Ok(Statement { sql, params })
    }

    fn render_projection(&self, sql: &mut String) -> Result<()> {
        let mut first = true;
        let qualifier = if self.joins.is_empty() {
            None
        } else {
            self.alias.as_deref().or(self.table.as_deref())
        };
        for column in &self.columns {
            check_identifier(column)?;
            if !first {
                sql.push_str(", ");
            }
            first = false;
            // Qualify bare columns when joins make them ambiguous.
            if let Some(qualifier) = qualifier {
                if !column.contains('.') {
                    sql.push_str(qualifier);
                    sql.push('.');
                }
            }
            sql.push_str(column);
        }
        for aggregate in &self.aggregates {
            if !first {
                sql.push_str(", ");
            }
            first = false;
            let (function, column, alias) = match aggregate {
                Aggregate::Count { column, alias } => ("COUNT", column, alias),
                Aggregate::Sum { column, alias } => ("SUM", column, alias),
            };
            if column != "*" {
                check_identifier(column)?;
            }
            check_identifier(alias)?;
            sql.push_str(function);
            sql.push('(');
            sql.push_str(column);
            sql.push_str(") AS ");
            sql.push_str(alias);
        }
        if first {
            sql.push('*');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::Condition;
    use crate::condition::ConditionGroup;

    #[test]
    fn filtered_select() {
        let stmt = Query::new()
            .from("posts")
            .filter(Condition::eq("status", "published").unwrap())
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM posts WHERE status = ?");
        assert_eq!(stmt.params, vec![Value::Text("published".to_string())]);
    }

    #[test]
    fn and_group() {
        let stmt = Query::new()
            .from("posts")
            .filter(
                ConditionGroup::all(vec![
                    Condition::eq("author_id", 123).unwrap().into(),
                    Condition::gt("views", 100).unwrap().into(),
                ])
                .unwrap(),
            )
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM posts WHERE author_id = ? AND views > ?"
        );
        assert_eq!(stmt.params, vec![Value::Int(123), Value::Int(100)]);
    }

    #[test]
    fn nested_or_group() {
        let stmt = Query::new()
            .from("t")
            .filter(
                ConditionGroup::all(vec![
                    Condition::eq("a", 1).unwrap().into(),
                    ConditionGroup::any(vec![
                        Condition::eq("b", 2).unwrap().into(),
                        Condition::eq("c", 3).unwrap().into(),
                    ])
                    .unwrap(),
                ])
                .unwrap(),
            )
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM t WHERE a = ? AND (b = ? OR c = ?)");
        assert_eq!(
            stmt.params,
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn build_is_idempotent() {
        let query = Query::new()
            .from("posts")
            .filter(Condition::is_in("id", [1, 2]).unwrap())
            .order_by("id", Direction::Asc)
            .limit(10);
        let first = query.build().unwrap();
        let second = query.build().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn missing_table_rejected() {
        let err = Query::new()
            .filter(Condition::eq("a", 1).unwrap())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::EmptyQuerySpec));
    }

    #[test]
    fn unsafe_table_rejected() {
        assert!(Query::new().from("posts; --").build().is_err());
        assert!(
            Query::new()
                .from("posts")
                .group_by(&["a b"])
                .build()
                .is_err()
        );
        assert!(
            Query::new()
                .from("posts")
                .order_by("x;", Direction::Asc)
                .build()
                .is_err()
        );
    }

    #[test]
    fn explicit_projection() {
        let stmt = Query::new()
            .select(&["id", "title"])
            .from("posts")
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT id, title FROM posts");
    }

    #[test]
    fn join_qualifies_projection() {
        let stmt = Query::new()
            .select(&["id", "title", "authors.name"])
            .from_as("posts", "p")
            .left_join("authors", "p.author_id", "authors.id")
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT p.id, p.title, authors.name FROM posts AS p \
             LEFT JOIN authors ON p.author_id = authors.id"
        );
    }

    #[test]
    fn right_join_renders() {
        let stmt = Query::new()
            .from("posts")
            .right_join("authors", "posts.author_id", "authors.id")
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM posts RIGHT JOIN authors ON posts.author_id = authors.id"
        );
    }

    #[test]
    fn group_by_with_aggregates() {
        let stmt = Query::new()
            .select(&["author_id"])
            .from("posts")
            .count("*", "post_count")
            .sum("views", "total_views")
            .group_by(&["author_id"])
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT author_id, COUNT(*) AS post_count, SUM(views) AS total_views \
             FROM posts GROUP BY author_id"
        );
    }

    #[test]
    fn aggregate_only_projection() {
        let stmt = Query::new().from("posts").count("*", "total").build().unwrap();
        assert_eq!(stmt.sql, "SELECT COUNT(*) AS total FROM posts");
    }

    #[test]
    fn order_limit_offset() {
        let stmt = Query::new()
            .from("posts")
            .order_by("created_at", Direction::Desc)
            .order_by("id", Direction::Asc)
            .limit(20)
            .offset(40)
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM posts ORDER BY created_at DESC, id ASC LIMIT 20 OFFSET 40"
        );
    }

    #[test]
    fn offset_without_limit_per_dialect() {
        let mysql = Query::new().from("posts").offset(10).build().unwrap();
        assert_eq!(
            mysql.sql,
            "SELECT * FROM posts LIMIT 18446744073709551615 OFFSET 10"
        );

        let postgres = Query::with_dialect(Dialect::Postgres)
            .from("posts")
            .offset(10)
            .build()
            .unwrap();
        assert_eq!(postgres.sql, "SELECT * FROM posts OFFSET 10");
    }

    #[test]
    fn postgres_placeholders_numbered() {
        let stmt = Query::with_dialect(Dialect::Postgres)
            .from("posts")
            .filter(
                ConditionGroup::from(Condition::eq("a", 1).unwrap())
                    .and(Condition::is_in("b", [2, 3]).unwrap()),
            )
            .build()
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM posts WHERE a = $1 AND b IN ($2, $3)"
        );
    }

    #[test]
    fn second_filter_call_ands() {
        let stmt = Query::new()
            .from("posts")
            .filter(Condition::eq("a", 1).unwrap())
            .filter(Condition::eq("b", 2).unwrap())
            .build()
            .unwrap();
        assert_eq!(stmt.sql, "SELECT * FROM posts WHERE a = ? AND b = ?");
    }

    #[test]
    fn without_clears_categories() {
        let list = Query::new()
            .from("posts")
            .filter(Condition::eq("status", "published").unwrap())
            .order_by("created_at", Direction::Desc)
            .limit(20)
            .offset(40);
        let count = list
            .without(&[Clause::OrderBy, Clause::Limit, Clause::Offset])
            .count("*", "total");

        let stmt = count.build().unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) AS total FROM posts WHERE status = ?"
        );
        // The original description is untouched.
        let original = list.build().unwrap();
        assert!(original.sql.contains("ORDER BY"));
        assert!(original.sql.contains("LIMIT 20 OFFSET 40"));
    }

    #[test]
    fn placeholder_count_matches_params() {
        let stmt = Query::new()
            .from("posts")
            .filter(
                ConditionGroup::from(Condition::eq("a", 1).unwrap())
                    .and(Condition::is_in("b", [2, 3, 4]).unwrap())
                    .and(Condition::between("c", 5, 6).unwrap())
                    .and(Condition::is_null("d").unwrap()),
            )
            .build()
            .unwrap();
        let placeholders = stmt.sql.matches('?').count();
        assert_eq!(placeholders, stmt.params.len());
        assert_eq!(placeholders, 6);
    }
}
