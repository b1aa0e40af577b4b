//! The repository orchestrator and its role traits.

use crate::criteria::Criteria;
use asupersync::{Cx, Outcome};
use quarry_cache::{CacheContext, CacheMediator, CachedValue, MemoryStore, TablePolicy};
use quarry_core::{Error, Model, Storage, Value};
use quarry_events::{Broadcaster, EventKind, MutationEvent};
use quarry_query::{Condition, Delete, Dialect, Insert, Query, Update};
use std::marker::PhantomData;
use std::sync::Arc;

/// Single-record lookup by primary key.
pub trait Finder<M: Model>: Send + Sync {
    fn find(&self, cx: &Cx, key: Value) -> impl Future<Output = Outcome<M, Error>> + Send;
}

/// Filtered, ordered, paginated listing.
pub trait Reader<M: Model>: Send + Sync {
    fn list(&self, cx: &Cx, criteria: &Criteria)
    -> impl Future<Output = Outcome<Vec<M>, Error>> + Send;
}

/// Filtered counting.
pub trait Counter: Send + Sync {
    fn count(&self, cx: &Cx, criteria: &Criteria)
    -> impl Future<Output = Outcome<u64, Error>> + Send;
}

/// Persisting and removing records.
pub trait Writer<M: Model>: Send + Sync {
    fn save(&self, cx: &Cx, model: M) -> impl Future<Output = Outcome<M, Error>> + Send;

    fn delete(&self, cx: &Cx, model: &M) -> impl Future<Output = Outcome<u64, Error>> + Send;
}

/// Orchestrates one table's operations over a [`Storage`] backend.
///
/// Reads go through the cache mediator; writes execute first, then invalidate
/// the table's cache namespace, then broadcast a [`MutationEvent`]. A failed
/// or cancelled execute leaves cache and listeners untouched so no stale
/// state escapes a write that never happened.
///
/// The repository never retries; storage errors propagate to the caller
/// unchanged.
pub struct Repository<M: Model, S: Storage> {
    storage: S,
    cache: CacheMediator,
    events: Arc<Broadcaster>,
    dialect: Dialect,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model, S: Storage> Repository<M, S> {
    /// Repository with an in-process cache and a fresh broadcaster.
    pub fn new(storage: S) -> Self {
        let cache = CacheMediator::new(
            Arc::new(TablePolicy::new(M::TABLE)),
            Arc::new(MemoryStore::new()),
        );
        Self {
            storage,
            cache,
            events: Arc::new(Broadcaster::new()),
            dialect: Dialect::default(),
            _model: PhantomData,
        }
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheMediator) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn with_events(mut self, events: Arc<Broadcaster>) -> Self {
        self.events = events;
        self
    }

    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn events(&self) -> &Arc<Broadcaster> {
        &self.events
    }

    pub fn cache(&self) -> &CacheMediator {
        &self.cache
    }

    /// Look up one record by primary key.
    ///
    /// A missing record is the typed
    /// [`NotFound`](quarry_core::Error::NotFound) error, distinct from
    /// storage failures, and is never cached.
    pub async fn find(&self, cx: &Cx, key: impl Into<Value>) -> Outcome<M, Error> {
        let key = key.into();
        let context = key_context(&key);

        let storage = &self.storage;
        let key = &key;
        let dialect = self.dialect;
        let outcome = self
            .cache
            .get_with("find", &context, move || async move {
                let condition = match Condition::eq(M::PRIMARY_KEY, key.clone()) {
                    Ok(condition) => condition,
                    Err(e) => return Outcome::Err(e),
                };
                let stmt = match Query::with_dialect(dialect)
                    .from(M::TABLE)
                    .filter(condition)
                    .build()
                {
                    Ok(stmt) => stmt,
                    Err(e) => return Outcome::Err(e),
                };
                match storage.query_one(cx, &stmt.sql, &stmt.params).await {
                    Outcome::Ok(Some(row)) => Outcome::Ok(CachedValue::Row(row)),
                    Outcome::Ok(None) => Outcome::Err(Error::NotFound {
                        table: M::TABLE.to_string(),
                        key: key.clone(),
                    }),
                    Outcome::Err(e) => Outcome::Err(e),
                    Outcome::Cancelled(r) => Outcome::Cancelled(r),
                    Outcome::Panicked(p) => Outcome::Panicked(p),
                }
            })
            .await;

        match outcome {
            Outcome::Ok(CachedValue::Row(row)) => match M::from_row(&row) {
                Ok(model) => Outcome::Ok(model),
                Err(e) => Outcome::Err(e),
            },
            Outcome::Ok(_) => Outcome::Err(Error::Serde(
                "cached value for find is not a single row".to_string(),
            )),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// List records matching the criteria.
    pub async fn list(&self, cx: &Cx, criteria: &Criteria) -> Outcome<Vec<M>, Error> {
        let context = match criteria.cache_context() {
            Ok(context) => context,
            Err(e) => return Outcome::Err(e),
        };
        let storage = &self.storage;
        let dialect = self.dialect;
        let outcome = self
            .cache
            .get_with("list", &context, move || async move {
                let stmt = match criteria
                    .apply(Query::with_dialect(dialect).from(M::TABLE))
                    .build()
                {
                    Ok(stmt) => stmt,
                    Err(e) => return Outcome::Err(e),
                };
                match storage.query(cx, &stmt.sql, &stmt.params).await {
                    Outcome::Ok(rows) => Outcome::Ok(CachedValue::Rows(rows)),
                    Outcome::Err(e) => Outcome::Err(e),
                    Outcome::Cancelled(r) => Outcome::Cancelled(r),
                    Outcome::Panicked(p) => Outcome::Panicked(p),
                }
            })
            .await;

        match outcome {
            Outcome::Ok(CachedValue::Rows(rows)) => {
                let mut models = Vec::with_capacity(rows.len());
                for row in &rows {
                    match M::from_row(row) {
                        Ok(model) => models.push(model),
                        Err(e) => return Outcome::Err(e),
                    }
                }
                Outcome::Ok(models)
            }
            Outcome::Ok(_) => Outcome::Err(Error::Serde(
                "cached value for list is not a row set".to_string(),
            )),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Count records matching the criteria's filter.
    ///
    /// Ordering and pagination are ignored; they never change a count.
    pub async fn count(&self, cx: &Cx, criteria: &Criteria) -> Outcome<u64, Error> {
        let context = match criteria.count_context() {
            Ok(context) => context,
            Err(e) => return Outcome::Err(e),
        };
        let storage = &self.storage;
        let dialect = self.dialect;
        let outcome = self
            .cache
            .get_with("count", &context, move || async move {
                let stmt = match criteria
                    .apply_filter(
                        Query::with_dialect(dialect)
                            .from(M::TABLE)
                            .count("*", "total"),
                    )
                    .build()
                {
                    Ok(stmt) => stmt,
                    Err(e) => return Outcome::Err(e),
                };
                match storage.query_one(cx, &stmt.sql, &stmt.params).await {
                    Outcome::Ok(Some(row)) => match row.get_named::<i64>("total") {
                        Ok(total) => match u64::try_from(total) {
                            Ok(total) => Outcome::Ok(CachedValue::Count(total)),
                            Err(_) => Outcome::Err(Error::Serde(format!(
                                "negative count {total}"
                            ))),
                        },
                        Err(e) => Outcome::Err(e),
                    },
                    Outcome::Ok(None) => Outcome::Ok(CachedValue::Count(0)),
                    Outcome::Err(e) => Outcome::Err(e),
                    Outcome::Cancelled(r) => Outcome::Cancelled(r),
                    Outcome::Panicked(p) => Outcome::Panicked(p),
                }
            })
            .await;

        match outcome {
            Outcome::Ok(CachedValue::Count(total)) => Outcome::Ok(total),
            Outcome::Ok(_) => Outcome::Err(Error::Serde(
                "cached value for count is not a count".to_string(),
            )),
            Outcome::Err(e) => Outcome::Err(e),
            Outcome::Cancelled(r) => Outcome::Cancelled(r),
            Outcome::Panicked(p) => Outcome::Panicked(p),
        }
    }

    /// Persist a model: INSERT when it has no primary key, UPDATE otherwise.
    ///
    /// On insert the generated key is written back into the returned model.
    /// Invalidation runs before broadcast, so a listener that re-reads the
    /// record gets fresh data.
    pub async fn save(&self, cx: &Cx, mut model: M) -> Outcome<M, Error> {
        let kind = if model.is_new() {
            let stmt = match Insert::new(&model).dialect(self.dialect).build() {
                Ok(stmt) => stmt,
                Err(e) => return Outcome::Err(e),
            };
            match self.storage.insert(cx, &stmt.sql, &stmt.params).await {
                Outcome::Ok(key) => model.set_generated_key(key),
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
            EventKind::Created
        } else {
            let stmt = match Update::new(&model).dialect(self.dialect).build() {
                Ok(stmt) => stmt,
                Err(e) => return Outcome::Err(e),
            };
            match self.storage.execute(cx, &stmt.sql, &stmt.params).await {
                Outcome::Ok(_) => {}
                Outcome::Err(e) => return Outcome::Err(e),
                Outcome::Cancelled(r) => return Outcome::Cancelled(r),
                Outcome::Panicked(p) => return Outcome::Panicked(p),
            }
            EventKind::Updated
        };

        self.invalidate(&model.primary_key());
        tracing::debug!(table = M::TABLE, kind = ?kind, "record saved");
        self.events
            .broadcast(MutationEvent::new(kind, M::TABLE, model.to_row()));
        Outcome::Ok(model)
    }

    /// Delete a record by its primary key. Zero affected rows is success.
    pub async fn delete(&self, cx: &Cx, model: &M) -> Outcome<u64, Error> {
        let key = model.primary_key();
        let stmt = match Delete::<M>::by_key(key.clone()).dialect(self.dialect).build() {
            Ok(stmt) => stmt,
            Err(e) => return Outcome::Err(e),
        };
        let affected = match self.storage.execute(cx, &stmt.sql, &stmt.params).await {
            Outcome::Ok(affected) => affected,
            Outcome::Err(e) => return Outcome::Err(e),
            Outcome::Cancelled(r) => return Outcome::Cancelled(r),
            Outcome::Panicked(p) => return Outcome::Panicked(p),
        };

        self.invalidate(&key);
        if affected > 0 {
            tracing::debug!(table = M::TABLE, affected, "record deleted");
            self.events.broadcast(MutationEvent::new(
                EventKind::Deleted,
                M::TABLE,
                model.to_row(),
            ));
        }
        Outcome::Ok(affected)
    }

    /// Drop the record's own cache entry plus every list/count entry.
    ///
    /// The mediator cannot know which list results a write affected, so the
    /// whole list and count namespaces go.
    fn invalidate(&self, key: &Value) {
        self.cache.forget("find", &key_context(key));
        self.cache.forget_operation("list");
        self.cache.forget_operation("count");
    }
}

fn key_context(key: &Value) -> CacheContext {
    let mut context = CacheContext::new();
    context.insert("id".to_string(), key.clone());
    context
}

impl<M: Model, S: Storage> Finder<M> for Repository<M, S> {
    fn find(&self, cx: &Cx, key: Value) -> impl Future<Output = Outcome<M, Error>> + Send {
        Repository::find(self, cx, key)
    }
}

impl<M: Model, S: Storage> Reader<M> for Repository<M, S> {
    fn list(
        &self,
        cx: &Cx,
        criteria: &Criteria,
    ) -> impl Future<Output = Outcome<Vec<M>, Error>> + Send {
        Repository::list(self, cx, criteria)
    }
}

impl<M: Model, S: Storage> Counter for Repository<M, S> {
    fn count(
        &self,
        cx: &Cx,
        criteria: &Criteria,
    ) -> impl Future<Output = Outcome<u64, Error>> + Send {
        Repository::count(self, cx, criteria)
    }
}

impl<M: Model, S: Storage> Writer<M> for Repository<M, S> {
    fn save(&self, cx: &Cx, model: M) -> impl Future<Output = Outcome<M, Error>> + Send {
        Repository::save(self, cx, model)
    }

    fn delete(&self, cx: &Cx, model: &M) -> impl Future<Output = Outcome<u64, Error>> + Send {
        Repository::delete(self, cx, model)
    }
}
