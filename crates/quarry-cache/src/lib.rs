//! Read-through caching for Quarry query results.
//!
//! The [`CacheMediator`] sits between the handler layer and storage. It asks a
//! [`CachePolicy`] whether an operation is cacheable and what key and TTL to
//! use, then serves hits from a [`CacheStore`] and fills misses from a loader
//! future. Invalidation is deliberately broad: a write to a table clears the
//! affected record's key and every list/count key in the table's namespace
//! through glob patterns.

pub mod mediator;
pub mod policy;
pub mod store;

pub use mediator::CacheMediator;
pub use policy::{CacheContext, CachePolicy, TablePolicy, context_fingerprint};
pub use store::{CacheStore, CachedValue, MemoryStore};
