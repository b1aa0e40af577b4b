//! SQL dialect differences.

/// Target SQL dialect.
///
/// The compiler output differs only in placeholder syntax and in how OFFSET
/// without LIMIT is expressed. Everything else is shared SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// MySQL dialect (uses ? placeholders)
    #[default]
    Mysql,
    /// PostgreSQL dialect (uses $1, $2 placeholders)
    Postgres,
    /// SQLite dialect (uses ?1, ?2 placeholders)
    Sqlite,
}

impl Dialect {
    /// Generate a placeholder for the given parameter index (1-based).
    pub fn placeholder(self, index: usize) -> String {
        match self {
            Dialect::Mysql => "?".to_string(),
            Dialect::Postgres => format!("${index}"),
            Dialect::Sqlite => format!("?{index}"),
        }
    }

    /// Does OFFSET require a LIMIT companion in this dialect?
    ///
    /// MySQL has no standalone OFFSET clause, so an offset-only query needs a
    /// synthetic `LIMIT 18446744073709551615` ahead of it.
    pub const fn offset_requires_limit(self) -> bool {
        matches!(self, Dialect::Mysql)
    }
}
