//! Cache value types and the in-memory store.

use quarry_core::Row;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

/// A cached query result.
///
/// Serializable so a store backed by an external system can persist entries;
/// the bundled [`MemoryStore`] keeps them in process and clones on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CachedValue {
    /// A single-record lookup result.
    Row(Row),
    /// A list query result.
    Rows(Vec<Row>),
    /// A count query result.
    Count(u64),
}

/// Storage backend for cache entries.
///
/// Implementations are shared across tasks, so every method takes `&self`.
pub trait CacheStore: Send + Sync {
    /// Fetch a live entry. Expired entries read as absent.
    fn get(&self, key: &str) -> Option<CachedValue>;

    /// Store an entry. `ttl` of `None` means no expiry.
    fn put(&self, key: &str, value: CachedValue, ttl: Option<Duration>);

    /// Evict one key. Evicting an absent key is a no-op.
    fn remove(&self, key: &str);

    /// Evict every key matching a glob pattern (`*` any run, `?` one char).
    ///
    /// This walks the whole store, so cost grows with entry count. Returns
    /// the number of entries evicted.
    fn remove_matching(&self, pattern: &str) -> usize;

    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug)]
struct Entry {
    value: CachedValue,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-process cache store with per-entry TTL.
///
/// Expired entries are dropped lazily: reads treat them as absent and writes
/// sweep them out.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryStore {
    fn get(&self, key: &str) -> Option<CachedValue> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get(key)?;
        if entry.is_live(Instant::now()) {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    fn put(&self, key: &str, value: CachedValue, ttl: Option<Duration>) {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|ttl| now + ttl),
            },
        );
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
    }

    fn remove_matching(&self, pattern: &str) -> usize {
        let matcher = match glob_to_regex(pattern) {
            Some(matcher) => matcher,
            None => return 0,
        };
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|key, _| !matcher.is_match(key));
        before - entries.len()
    }

    fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.values().filter(|entry| entry.is_live(now)).count()
    }
}

/// Translate a glob pattern into an anchored regex.
fn glob_to_regex(pattern: &str) -> Option<regex::Regex> {
    let escaped = regex::escape(pattern)
        .replace(r"\*", ".*")
        .replace(r"\?", ".");
    regex::Regex::new(&format!("^{escaped}$")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use quarry_core::Value;

    fn row(id: i64) -> Row {
        Row::from_pairs([("id", Value::Int(id))])
    }

    #[test]
    fn put_get_remove() {
        let store = MemoryStore::new();
        assert!(store.get("posts:find:1").is_none());
        store.put("posts:find:1", CachedValue::Row(row(1)), None);
        assert_eq!(store.get("posts:find:1"), Some(CachedValue::Row(row(1))));
        store.remove("posts:find:1");
        assert!(store.get("posts:find:1").is_none());
        store.remove("posts:find:1");
    }

    #[test]
    fn expired_entries_read_as_absent() {
        let store = MemoryStore::new();
        store.put("k", CachedValue::Count(3), Some(Duration::ZERO));
        assert!(store.get("k").is_none());
        assert_eq!(store.len(), 0);
    }

    #[test]
    fn unexpired_ttl_survives() {
        let store = MemoryStore::new();
        store.put("k", CachedValue::Count(3), Some(Duration::from_secs(60)));
        assert_eq!(store.get("k"), Some(CachedValue::Count(3)));
    }

    #[test]
    fn glob_eviction() {
        let store = MemoryStore::new();
        store.put("posts:find:1", CachedValue::Row(row(1)), None);
        store.put("posts:list:a", CachedValue::Rows(vec![row(1)]), None);
        store.put("posts:list:b", CachedValue::Rows(vec![]), None);
        store.put("authors:list:a", CachedValue::Rows(vec![]), None);

        let evicted = store.remove_matching("posts:list:*");
        assert_eq!(evicted, 2);
        assert!(store.get("posts:find:1").is_some());
        assert!(store.get("authors:list:a").is_some());
    }

    #[test]
    fn glob_question_mark_matches_one_char() {
        let store = MemoryStore::new();
        store.put("k1", CachedValue::Count(1), None);
        store.put("k22", CachedValue::Count(2), None);
        assert_eq!(store.remove_matching("k?"), 1);
        assert!(store.get("k22").is_some());
    }

    #[test]
    fn glob_escapes_regex_metacharacters() {
        let store = MemoryStore::new();
        store.put("a.b", CachedValue::Count(1), None);
        store.put("axb", CachedValue::Count(2), None);
        // The dot is literal, not a regex wildcard.
        assert_eq!(store.remove_matching("a.b"), 1);
        assert!(store.get("axb").is_some());
    }

    #[test]
    fn cached_value_serde_round_trip() {
        let value = CachedValue::Rows(vec![row(1), row(2)]);
        let json = serde_json::to_string(&value).unwrap();
        let back: CachedValue = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }
}
