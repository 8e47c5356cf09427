use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use uuid::Uuid;

/// Logical query identity: operation name plus an optional scope parameter
/// (usually the user id the query was issued for).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    op: &'static str,
    scope: Option<String>,
}

impl QueryKey {
    pub fn global(op: &'static str) -> Self {
        Self { op, scope: None }
    }

    pub fn scoped(op: &'static str, scope: impl ToString) -> Self {
        Self {
            op,
            scope: Some(scope.to_string()),
        }
    }

    pub fn for_user(op: &'static str, user_id: Uuid) -> Self {
        Self::scoped(op, user_id)
    }

    pub fn op(&self) -> &'static str {
        self.op
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.scope {
            Some(scope) => write!(f, "{}:{}", self.op, scope),
            None => f.write_str(self.op),
        }
    }
}

/// Process-wide keyed cache of remote read results with manual
/// invalidation. Cheap to clone; all access goes through short critical
/// sections. Entries are replaced whole (last writer wins), never mutated
/// in place -- consumers invalidate and refetch instead.
#[derive(Clone, Default)]
pub struct QueryCache {
    inner: Arc<Mutex<HashMap<QueryKey, Arc<dyn Any + Send + Sync>>>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T>(&self, key: &QueryKey) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let map = self.inner.lock().expect("cache lock poisoned");
        map.get(key)
            .and_then(|entry| entry.downcast_ref::<T>())
            .cloned()
    }

    pub fn put<T>(&self, key: QueryKey, value: T)
    where
        T: Send + Sync + 'static,
    {
        let mut map = self.inner.lock().expect("cache lock poisoned");
        map.insert(key, Arc::new(value));
    }

    /// Remove one entry. Returns whether anything was cached under the key.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let mut map = self.inner.lock().expect("cache lock poisoned");
        let removed = map.remove(key).is_some();
        if removed {
            tracing::debug!(key = %key, "cache entry invalidated");
        }
        removed
    }

    /// Remove every entry for an operation regardless of scope. Returns the
    /// number of entries dropped.
    pub fn invalidate_op(&self, op: &str) -> usize {
        let mut map = self.inner.lock().expect("cache lock poisoned");
        let before = map.len();
        map.retain(|key, _| key.op != op);
        let dropped = before - map.len();
        if dropped > 0 {
            tracing::debug!(op, dropped, "cache operation invalidated");
        }
        dropped
    }

    pub fn contains(&self, key: &QueryKey) -> bool {
        let map = self.inner.lock().expect("cache lock poisoned");
        map.contains_key(key)
    }

    pub fn len(&self) -> usize {
        let map = self.inner.lock().expect("cache lock poisoned");
        map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
