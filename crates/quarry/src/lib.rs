//! Quarry - a SQL query construction and execution core.
//!
//! Quarry turns structured query descriptions into parameterized SQL and
//! drives each operation through a fixed lifecycle: cached reads, invalidating
//! writes, and synchronous mutation events.
//!
//! - Structured predicates with construction-time validation
//! - An immutable query builder compiling to SQL plus bound parameters
//! - Read-through caching with policy-driven keys and glob invalidation
//! - Mutation events dispatched in registration order
//! - A repository orchestrator tying the pieces together per table
//!
//! # Quick Start
//!
//! ```ignore
//! use quarry::prelude::*;
//!
//! async fn example(cx: &Cx, storage: impl Storage) {
//!     let repo: Repository<Post, _> = Repository::new(storage);
//!
//!     // Insert: a model without a primary key
//!     let draft = Post { id: None, title: "hello".into(), views: 0 };
//!     let saved = repo.save(cx, draft).await.unwrap();
//!
//!     // Cached read by key
//!     let post = repo.find(cx, saved.primary_key()).await.unwrap();
//!
//!     // Filtered, ordered, paginated list
//!     let recent = repo
//!         .list(
//!             cx,
//!             &Criteria::new()
//!                 .filter(Condition::eq("status", "published").unwrap())
//!                 .order_by("created_at", Direction::Desc)
//!                 .limit(20),
//!         )
//!         .await
//!         .unwrap();
//!
//!     let _ = (post, recent);
//! }
//! ```

pub use quarry_core::{
    Error, FromValue, Model, Result, Row, Storage, StorageError, StorageErrorKind, Value,
    check_identifier,
};

pub use quarry_query::{
    Aggregate, Clause, Combinator, Condition, ConditionGroup, Delete, Dialect, Direction, Insert,
    Join, JoinKind, Operator, OrderBy, Query, Statement, Update,
};

pub use quarry_cache::{
    CacheContext, CacheMediator, CachePolicy, CacheStore, CachedValue, MemoryStore, TablePolicy,
};

pub use quarry_events::{Broadcaster, EventKind, MutationEvent};

pub use quarry_handler::{Counter, Criteria, Finder, Reader, Repository, Writer};

pub use asupersync::{Cx, Outcome};

/// Everything most consumers need in one import.
pub mod prelude {
    pub use crate::{
        Broadcaster, CacheMediator, Condition, ConditionGroup, Counter, Criteria, Cx, Dialect,
        Direction, Error, EventKind, Finder, Model, MutationEvent, Outcome, Query, Reader,
        Repository, Result, Row, Statement, Storage, Value, Writer,
    };
}
