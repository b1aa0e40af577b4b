//! List/count criteria and their cache normalization.

use quarry_cache::CacheContext;
use quarry_core::{Result, Value};
use quarry_query::{ConditionGroup, Direction, OrderBy, Query};
use serde::{Deserialize, Serialize};

/// Filter, ordering, and pagination for list and count operations.
///
/// Serializable so the cache key can be derived from the criteria themselves
/// rather than from the compiled SQL.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Criteria {
    filter: Option<ConditionGroup>,
    order: Vec<OrderBy>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter predicate. A second call ANDs with the existing one.
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
    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.order.push(OrderBy {
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

    /// Apply filter, order, and pagination to a query.
    #[must_use]
    pub fn apply(&self, mut query: Query) -> Query {
        if let Some(filter) = &self.filter {
            query = query.filter(filter.clone());
        }
        for term in &self.order {
            query = query.order_by(&term.column, term.direction);
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        if let Some(offset) = self.offset {
            query = query.offset(offset);
        }
        query
    }

    /// Apply only the filter, for count queries.
    #[must_use]
    pub fn apply_filter(&self, mut query: Query) -> Query {
        if let Some(filter) = &self.filter {
            query = query.filter(filter.clone());
        }
        query
    }

    /// Normalized cache context for these criteria.
    ///
    /// Identical criteria always produce an identical context, regardless of
    /// how the pieces were assembled, so the derived cache keys collide
    /// exactly when the result sets would.
    pub fn cache_context(&self) -> Result<CacheContext> {
        let mut context = CacheContext::new();
        if let Some(filter) = &self.filter {
            context.insert(
                "filter".to_string(),
                Value::Text(serde_json::to_string(filter)?),
            );
        }
        if !self.order.is_empty() {
            context.insert(
                "order".to_string(),
                Value::Text(serde_json::to_string(&self.order)?),
            );
        }
        if let Some(limit) = self.limit {
            let limit = i64::try_from(limit).unwrap_or(i64::MAX);
            context.insert("limit".to_string(), Value::Int(limit));
        }
        if let Some(offset) = self.offset {
            let offset = i64::try_from(offset).unwrap_or(i64::MAX);
            context.insert("offset".to_string(), Value::Int(offset));
        }
        Ok(context)
    }

    /// Context for count operations: the filter only, since ordering and
    /// pagination do not change a count.
    pub fn count_context(&self) -> Result<CacheContext> {
        let mut context = CacheContext::new();
        if let Some(filter) = &self.filter {
            context.insert(
                "filter".to_string(),
                Value::Text(serde_json::to_string(filter)?),
            );
        }
        Ok(context)
    }
}
