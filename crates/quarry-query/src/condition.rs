//! Structured predicates.
//!
//! A [`Condition`] is one column comparison; a [`ConditionGroup`] is a tree of
//! conditions joined by AND/OR. Both are plain serializable data. Operator
//! arity and identifier safety are checked when a condition is constructed,
//! so an invalid predicate fails at the call site that created it rather than
//! at compile time deep inside the query builder.

use crate::dialect::Dialect;
use quarry_core::{Error, Result, Value, check_identifier};
use serde::{Deserialize, Serialize};

/// Maximum nesting depth accepted when rendering a condition tree.
pub const MAX_GROUP_DEPTH: usize = 128;

/// Comparison operator for a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    Like,
    In,
    NotIn,
    Between,
    IsNull,
    IsNotNull,
}

impl Operator {
    /// SQL keyword or symbol for this operator.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::Between => "BETWEEN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }

    /// Check that `count` values are acceptable for this operator.
    fn check_arity(self, count: usize) -> Result<()> {
        let ok = match self {
            Operator::Eq
            | Operator::Ne
            | Operator::Gt
            | Operator::Ge
            | Operator::Lt
            | Operator::Le
            | Operator::Like => count == 1,
            Operator::In | Operator::NotIn => count >= 1,
            Operator::Between => count == 2,
            Operator::IsNull | Operator::IsNotNull => count == 0,
        };
        if ok {
            Ok(())
        } else {
            Err(Error::invalid_predicate(format!(
                "operator {:?} does not accept {count} value(s)",
                self
            )))
        }
    }
}

/// A single column comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    column: String,
    operator: Operator,
    values: Vec<Value>,
}

impl Condition {
    /// Build a condition, validating the column name and operator arity.
    pub fn new(column: &str, operator: Operator, values: Vec<Value>) -> Result<Self> {
        check_identifier(column)?;
        operator.check_arity(values.len())?;
        Ok(Self {
            column: column.to_string(),
            operator,
            values,
        })
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Result<Self> {
        Self::new(column, Operator::Eq, vec![value.into()])
    }

    pub fn ne(column: &str, value: impl Into<Value>) -> Result<Self> {
        Self::new(column, Operator::Ne, vec![value.into()])
    }

    pub fn gt(column: &str, value: impl Into<Value>) -> Result<Self> {
        Self::new(column, Operator::Gt, vec![value.into()])
    }

    pub fn ge(column: &str, value: impl Into<Value>) -> Result<Self> {
        Self::new(column, Operator::Ge, vec![value.into()])
    }

    pub fn lt(column: &str, value: impl Into<Value>) -> Result<Self> {
        Self::new(column, Operator::Lt, vec![value.into()])
    }

    pub fn le(column: &str, value: impl Into<Value>) -> Result<Self> {
        Self::new(column, Operator::Le, vec![value.into()])
    }

    pub fn like(column: &str, pattern: impl Into<Value>) -> Result<Self> {
        Self::new(column, Operator::Like, vec![pattern.into()])
    }

    pub fn is_in<I, V>(column: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            column,
            Operator::In,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn not_in<I, V>(column: &str, values: I) -> Result<Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::new(
            column,
            Operator::NotIn,
            values.into_iter().map(Into::into).collect(),
        )
    }

    pub fn between(column: &str, low: impl Into<Value>, high: impl Into<Value>) -> Result<Self> {
        Self::new(column, Operator::Between, vec![low.into(), high.into()])
    }

    pub fn is_null(column: &str) -> Result<Self> {
        Self::new(column, Operator::IsNull, Vec::new())
    }

    pub fn is_not_null(column: &str) -> Result<Self> {
        Self::new(column, Operator::IsNotNull, Vec::new())
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Append this condition's SQL fragment and push its values onto `params`.
    ///
    /// `index` is the 1-based number of the next placeholder and advances once
    /// per value pushed.
    fn render(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
        dialect: Dialect,
        index: &mut usize,
    ) {
        sql.push_str(&self.column);
        match self.operator {
            Operator::IsNull | Operator::IsNotNull => {
                sql.push(' ');
                sql.push_str(self.operator.as_sql());
            }
            Operator::In | Operator::NotIn => {
                sql.push(' ');
                sql.push_str(self.operator.as_sql());
                sql.push_str(" (");
                for (i, value) in self.values.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(", ");
                    }
                    sql.push_str(&dialect.placeholder(*index));
                    *index += 1;
                    params.push(value.clone());
                }
                sql.push(')');
            }
            Operator::Between => {
                sql.push(' ');
                sql.push_str(self.operator.as_sql());
                sql.push(' ');
                sql.push_str(&dialect.placeholder(*index));
                *index += 1;
                sql.push_str(" AND ");
                sql.push_str(&dialect.placeholder(*index));
                *index += 1;
                params.extend(self.values.iter().cloned());
            }
            _ => {
                sql.push(' ');
                sql.push_str(self.operator.as_sql());
                sql.push(' ');
                sql.push_str(&dialect.placeholder(*index));
                *index += 1;
                params.push(self.values[0].clone());
            }
        }
    }
}

/// How sibling predicates combine within a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    const fn as_sql(self) -> &'static str {
        match self {
            Combinator::And => " AND ",
            Combinator::Or => " OR ",
        }
    }
}

/// A tree of predicates.
///
/// Leaves are single [`Condition`]s; interior nodes hold one combinator and a
/// non-empty child list. Nested groups render inside parentheses, so operator
/// precedence is always explicit in the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ConditionGroup {
    Leaf(Condition),
    Group {
        combinator: Combinator,
        children: Vec<ConditionGroup>,
    },
}

impl ConditionGroup {
    /// AND together one or more predicates.
    pub fn all(children: Vec<ConditionGroup>) -> Result<Self> {
        Self::group(Combinator::And, children)
    }

    /// OR together one or more predicates.
    pub fn any(children: Vec<ConditionGroup>) -> Result<Self> {
        Self::group(Combinator::Or, children)
    }

    fn group(combinator: Combinator, children: Vec<ConditionGroup>) -> Result<Self> {
        if children.is_empty() {
            return Err(Error::EmptyGroup);
        }
        Ok(ConditionGroup::Group {
            combinator,
            children,
        })
    }

    /// Combine with another predicate under AND.
    #[must_use]
    pub fn and(self, other: impl Into<ConditionGroup>) -> Self {
        self.combine(Combinator::And, other.into())
    }

    /// Combine with another predicate under OR.
    #[must_use]
    pub fn or(self, other: impl Into<ConditionGroup>) -> Self {
        self.combine(Combinator::Or, other.into())
    }

    fn combine(self, combinator: Combinator, other: ConditionGroup) -> Self {
        // Flatten when the left side already combines with the same operator,
        // so a.and(b).and(c) renders without redundant parentheses.
        match self {
            ConditionGroup::Group {
                combinator: existing,
                mut children,
            } if existing == combinator => {
                children.push(other);
                ConditionGroup::Group {
                    combinator,
                    children,
                }
            }
            left => ConditionGroup::Group {
                combinator,
                children: vec![left, other],
            },
        }
    }

    /// Render this tree as a SQL fragment, appending values to `params`.
    ///
    /// `index` is the 1-based number of the next placeholder. Group nesting
    /// past [`MAX_GROUP_DEPTH`] is rejected.
    pub fn render(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
        dialect: Dialect,
        index: &mut usize,
    ) -> Result<()> {
        self.render_at(sql, params, dialect, index, 0)
    }

    fn render_at(
        &self,
        sql: &mut String,
        params: &mut Vec<Value>,
        dialect: Dialect,
        index: &mut usize,
        depth: usize,
    ) -> Result<()> {
        if depth > MAX_GROUP_DEPTH {
            return Err(Error::invalid_predicate(format!(
                "condition nesting exceeds {MAX_GROUP_DEPTH} levels"
            )));
        }
        match self {
            ConditionGroup::Leaf(condition) => {
                condition.render(sql, params, dialect, index);
                Ok(())
            }
            ConditionGroup::Group {
                combinator,
                children,
            } => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        sql.push_str(combinator.as_sql());
                    }
                    let needs_parens = matches!(child, ConditionGroup::Group { .. });
                    if needs_parens {
                        sql.push('(');
                    }
                    child.render_at(sql, params, dialect, index, depth + 1)?;
                    if needs_parens {
                        sql.push(')');
                    }
                }
                Ok(())
            }
        }
    }
}

impl From<Condition> for ConditionGroup {
    fn from(condition: Condition) -> Self {
        ConditionGroup::Leaf(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(group: &ConditionGroup, dialect: Dialect) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        let mut index = 1;
        group.render(&mut sql, &mut params, dialect, &mut index).unwrap();
        (sql, params)
    }

    #[test]
    fn single_comparison() {
        let cond: ConditionGroup = Condition::eq("status", "published").unwrap().into();
        let (sql, params) = render(&cond, Dialect::Mysql);
        assert_eq!(sql, "status = ?");
        assert_eq!(params, vec![Value::Text("published".to_string())]);
    }

    #[test]
    fn operator_sql_map() {
        for (cond, expected) in [
            (Condition::ne("a", 1).unwrap(), "a != ?"),
            (Condition::gt("a", 1).unwrap(), "a > ?"),
            (Condition::ge("a", 1).unwrap(), "a >= ?"),
            (Condition::lt("a", 1).unwrap(), "a < ?"),
            (Condition::le("a", 1).unwrap(), "a <= ?"),
            (Condition::like("a", "x%").unwrap(), "a LIKE ?"),
        ] {
            let (sql, _) = render(&cond.into(), Dialect::Mysql);
            assert_eq!(sql, expected);
        }
    }

    #[test]
    fn in_list_expands_placeholders() {
        let cond: ConditionGroup = Condition::is_in("id", [1, 2, 3]).unwrap().into();
        let (sql, params) = render(&cond, Dialect::Mysql);
        assert_eq!(sql, "id IN (?, ?, ?)");
        assert_eq!(params.len(), 3);

        let (sql, _) = render(
            &Condition::is_in("id", [1, 2]).unwrap().into(),
            Dialect::Postgres,
        );
        assert_eq!(sql, "id IN ($1, $2)");
    }

    #[test]
    fn not_in_renders() {
        let (sql, params) = render(
            &Condition::not_in("status", ["draft", "spam"]).unwrap().into(),
            Dialect::Mysql,
        );
        assert_eq!(sql, "status NOT IN (?, ?)");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn between_takes_two_placeholders() {
        let (sql, params) = render(
            &Condition::between("views", 10, 100).unwrap().into(),
            Dialect::Sqlite,
        );
        assert_eq!(sql, "views BETWEEN ?1 AND ?2");
        assert_eq!(params, vec![Value::Int(10), Value::Int(100)]);
    }

    #[test]
    fn null_checks_take_no_placeholder() {
        let (sql, params) = render(&Condition::is_null("deleted_at").unwrap().into(), Dialect::Mysql);
        assert_eq!(sql, "deleted_at IS NULL");
        assert!(params.is_empty());

        let (sql, _) = render(
            &Condition::is_not_null("published_at").unwrap().into(),
            Dialect::Mysql,
        );
        assert_eq!(sql, "published_at IS NOT NULL");
    }

    #[test]
    fn arity_violations_rejected() {
        assert!(Condition::new("a", Operator::Eq, vec![]).is_err());
        assert!(Condition::new("a", Operator::Eq, vec![Value::Int(1), Value::Int(2)]).is_err());
        assert!(Condition::new("a", Operator::Between, vec![Value::Int(1)]).is_err());
        assert!(Condition::new("a", Operator::IsNull, vec![Value::Int(1)]).is_err());
        assert!(Condition::is_in("a", Vec::<i64>::new()).is_err());
    }

    #[test]
    fn unsafe_column_rejected() {
        let err = Condition::eq("a; DROP TABLE x", 1).unwrap_err();
        assert!(matches!(
            err,
            quarry_core::Error::UnsafeIdentifier { .. }
        ));
    }

    #[test]
    fn and_chain_flattens() {
        let group = ConditionGroup::from(Condition::eq("a", 1).unwrap())
            .and(Condition::eq("b", 2).unwrap())
            .and(Condition::eq("c", 3).unwrap());
        let (sql, params) = render(&group, Dialect::Mysql);
        assert_eq!(sql, "a = ? AND b = ? AND c = ?");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn nested_groups_parenthesized() {
        let inner = ConditionGroup::any(vec![
            Condition::eq("status", "published").unwrap().into(),
            Condition::eq("status", "archived").unwrap().into(),
        ])
        .unwrap();
        let group = ConditionGroup::from(Condition::gt("views", 100).unwrap()).and(inner);
        let (sql, params) = render(&group, Dialect::Mysql);
        assert_eq!(sql, "views > ? AND (status = ? OR status = ?)");
        assert_eq!(params.len(), 3);
    }

    #[test]
    fn empty_group_rejected() {
        assert!(matches!(
            ConditionGroup::all(vec![]),
            Err(quarry_core::Error::EmptyGroup)
        ));
        assert!(matches!(
            ConditionGroup::any(vec![]),
            Err(quarry_core::Error::EmptyGroup)
        ));
    }

    #[test]
    fn postgres_indexes_continue_across_tree() {
        let group = ConditionGroup::from(Condition::eq("a", 1).unwrap())
            .and(Condition::is_in("b", [2, 3]).unwrap())
            .and(Condition::between("c", 4, 5).unwrap());
        let (sql, params) = render(&group, Dialect::Postgres);
        assert_eq!(sql, "a = $1 AND b IN ($2, $3) AND c BETWEEN $4 AND $5");
        assert_eq!(params.len(), 5);
    }

    #[test]
    fn depth_cap_enforced() {
        let mut group = ConditionGroup::from(Condition::eq("a", 1).unwrap());
        for _ in 0..=MAX_GROUP_DEPTH {
            group = ConditionGroup::Group {
                combinator: Combinator::And,
                children: vec![group],
            };
        }
        let mut sql = String::new();
        let mut params = Vec::new();
        let mut index = 1;
        assert!(
            group
                .render(&mut sql, &mut params, Dialect::Mysql, &mut index)
                .is_err()
        );
    }

    #[test]
    fn group_serde_round_trip() {
        let group = ConditionGroup::from(Condition::eq("a", 1).unwrap())
            .or(Condition::is_null("b").unwrap());
        let json = serde_json::to_string(&group).unwrap();
        let back: ConditionGroup = serde_json::from_str(&json).unwrap();
        assert_eq!(group, back);
    }
}
