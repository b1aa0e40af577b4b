//! Cache policy: what to cache, under which key, for how long.

use quarry_core::Value;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::time::Duration;

/// Normalized operation context.
///
/// A `BTreeMap` so iteration order is the sorted key order. Two contexts that
/// hold the same pairs produce the same fingerprint regardless of the order
/// callers inserted them in.
pub type CacheContext = BTreeMap<String, Value>;

/// Render a context as a deterministic single-line fingerprint.
///
/// The output is stable across runs and insertion orders, which is what makes
/// it usable inside cache keys.
pub fn context_fingerprint(context: &CacheContext) -> String {
    let mut out = String::from("{");
    for (i, (key, value)) in context.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(key);
        out.push('=');
        write_value(&mut out, value);
    }
    out.push('}');
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Float(f) => {
            let _ = write!(out, "{f}");
        }
        Value::Text(s) => {
            let _ = write!(out, "{s:?}");
        }
        Value::Bytes(b) => {
            out.push_str("0x");
            for byte in b {
                let _ = write!(out, "{byte:02x}");
            }
        }
    }
}

/// Decides cacheability, keys, and TTLs for one namespace.
pub trait CachePolicy: Send + Sync {
    /// Should results of this operation be cached at all?
    fn should_cache(&self, operation: &str, context: &CacheContext) -> bool;

    /// Deterministic cache key for an operation and its context.
    fn cache_key(&self, operation: &str, context: &CacheContext) -> String;

    /// Time to live for fresh entries. `None` means no expiry.
    fn ttl(&self, context: &CacheContext) -> Option<Duration>;

    /// Glob pattern covering every key this policy generates for `operation`.
    fn operation_pattern(&self, operation: &str) -> String;
}

/// Standard per-table policy.
///
/// Keys take the form `{namespace}:{operation}:{fingerprint}`, so one table's
/// entries can be invalidated in bulk with the pattern
/// `{namespace}:{operation}:*`.
#[derive(Debug, Clone)]
pub struct TablePolicy {
    namespace: String,
    ttl: Option<Duration>,
}

impl TablePolicy {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            ttl: None,
        }
    }

    /// Same policy with an expiry applied to every entry.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }
}

impl CachePolicy for TablePolicy {
    fn should_cache(&self, _operation: &str, _context: &CacheContext) -> bool {
        true
    }

    fn cache_key(&self, operation: &str, context: &CacheContext) -> String {
        format!(
            "{}:{}:{}",
            self.namespace,
            operation,
            context_fingerprint(context)
        )
    }

    fn ttl(&self, _context: &CacheContext) -> Option<Duration> {
        self.ttl
    }

    fn operation_pattern(&self, operation: &str) -> String {
        format!("{}:{}:*", self.namespace, operation)
    }
}
