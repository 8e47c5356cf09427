use async_trait::async_trait;
use tokio::task::JoinHandle;

use mentora_shared::clients::realtime::{RealtimeClient, Subscription, SubscriptionCloser};
use mentora_shared::clients::RestClient;
use mentora_shared::errors::AppResult;
use mentora_shared::types::{EventFilter, Session};

use crate::cache::{QueryCache, QueryKey};
use crate::invalidation::{self, ops, MutationKind};
use crate::models::Category;

const CHANNEL: &str = "category-changes";
const TABLE: &str = "categories";

/// Read boundary for the categories reference table.
#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn list(&self, session: &Session) -> AppResult<Vec<Category>>;
}

pub struct RestCategoryStore {
    rest: RestClient,
}

impl RestCategoryStore {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl CategoryStore for RestCategoryStore {
    async fn list(&self, session: &Session) -> AppResult<Vec<Category>> {
        self.rest
            .table(TABLE)
            .order_asc("sort_order")
            .select::<Category>(session)
            .await
    }
}

/// Read-through view of the categories list. Serves from the cache until
/// the watcher invalidates it, then refetches from the source of truth.
pub struct CategoryDirectory<S: CategoryStore> {
    store: S,
    cache: QueryCache,
    session: Session,
}

impl<S: CategoryStore> CategoryDirectory<S> {
    pub fn new(store: S, cache: QueryCache, session: Session) -> Self {
        Self {
            store,
            cache,
            session,
        }
    }

    pub async fn load(&self) -> AppResult<Vec<Category>> {
        let key = QueryKey::global(ops::CATEGORIES);
        if let Some(cached) = self.cache.get::<Vec<Category>>(&key) {
            return Ok(cached);
        }
        let items = self.store.list(&self.session).await?;
        self.cache.put(key, items.clone());
        Ok(items)
    }
}

/// Watches the categories reference table and invalidates the dependent
/// cache key on every change, so the next read refetches from the source
/// of truth. Event payloads are never merged into local state.
///
/// One subscription per watcher; deactivation (or drop) closes it exactly
/// once, and closing again is a safe no-op.
pub struct CategoryWatcher {
    closer: SubscriptionCloser,
    task: Option<JoinHandle<()>>,
}

impl CategoryWatcher {
    /// Open the subscription and start the invalidation loop.
    pub fn activate(realtime: &RealtimeClient, cache: QueryCache) -> Self {
        let subscription = realtime
            .channel(CHANNEL)
            .on_table_changes(TABLE, EventFilter::All)
            .subscribe();
        let closer = subscription.closer();

        let task = tokio::spawn(run(subscription, cache));

        Self {
            closer,
            task: Some(task),
        }
    }

    /// Close the subscription and wait for the loop to finish.
    pub async fn deactivate(mut self) {
        self.closer.close();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for CategoryWatcher {
    fn drop(&mut self) {
        // Safe if deactivate already ran: closing twice is a no-op.
        self.closer.close();
    }
}

async fn run(mut subscription: Subscription, cache: QueryCache) {
    while let Some(event) = subscription.next_event().await {
        tracing::debug!(kind = %event.kind, "category change received, invalidating cache");
        invalidation::apply(&cache, &MutationKind::CategoryChanged);
    }
    tracing::debug!("category watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use mentora_shared::types::{ChangeEvent, ChangeKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use uuid::Uuid;

    fn category(name: &str, tag: &str, sort_order: i32) -> Category {
        Category {
            id: Uuid::new_v4(),
            name: name.to_string(),
            tag: tag.to_string(),
            sort_order,
        }
    }

    fn cached_categories(cache: &QueryCache) {
        cache.put(
            QueryKey::global(ops::CATEGORIES),
            vec![category("Pitches", "pitches", 1)],
        );
    }

    #[derive(Default)]
    struct MemoryCategoryStore {
        rows: Vec<Category>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CategoryStore for MemoryCategoryStore {
        async fn list(&self, _session: &Session) -> AppResult<Vec<Category>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rows.clone())
        }
    }

    async fn wait_for_invalidation(cache: &QueryCache) -> bool {
        for _ in 0..100 {
            if !cache.contains(&QueryKey::global(ops::CATEGORIES)) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        false
    }

    #[tokio::test]
    async fn events_invalidate_the_categories_key() {
        let realtime = RealtimeClient::detached();
        let cache = QueryCache::new();
        cached_categories(&cache);

        let watcher = CategoryWatcher::activate(&realtime, cache.clone());
        assert_eq!(realtime.open_subscriptions(), 1);

        realtime.emit(ChangeEvent::new(ChangeKind::Update, "categories"));
        assert!(wait_for_invalidation(&cache).await);

        watcher.deactivate().await;
    }

    #[tokio::test]
    async fn unrelated_tables_do_not_invalidate() {
        let realtime = RealtimeClient::detached();
        let cache = QueryCache::new();
        cached_categories(&cache);

        let watcher = CategoryWatcher::activate(&realtime, cache.clone());
        realtime.emit(ChangeEvent::new(ChangeKind::Insert, "posts"));
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(cache.contains(&QueryKey::global(ops::CATEGORIES)));
        watcher.deactivate().await;
    }

    #[tokio::test]
    async fn teardown_leaves_zero_open_subscriptions() {
        let realtime = RealtimeClient::detached();
        let watcher = CategoryWatcher::activate(&realtime, QueryCache::new());
        assert_eq!(realtime.open_subscriptions(), 1);

        watcher.deactivate().await;
        assert_eq!(realtime.open_subscriptions(), 0);
    }

    #[tokio::test]
    async fn directory_serves_from_cache_until_invalidated() {
        let realtime = RealtimeClient::detached();
        let cache = QueryCache::new();
        let store = MemoryCategoryStore {
            rows: vec![category("Mentoring", "mentoring", 1), category("Pitches", "pitches", 2)],
            ..Default::default()
        };
        let directory = CategoryDirectory::new(store, cache.clone(), Session::anonymous());

        let items = directory.load().await.unwrap();
        assert_eq!(items.len(), 2);
        directory.load().await.unwrap();
        assert_eq!(directory.store.calls.load(Ordering::SeqCst), 1);

        // A category change forces the next read back to the store.
        let watcher = CategoryWatcher::activate(&realtime, cache.clone());
        realtime.emit(ChangeEvent::new(ChangeKind::Insert, "categories"));
        assert!(wait_for_invalidation(&cache).await);

        directory.load().await.unwrap();
        assert_eq!(directory.store.calls.load(Ordering::SeqCst), 2);
        watcher.deactivate().await;
    }

    #[tokio::test]
    async fn drop_also_closes_the_subscription() {
        let realtime = RealtimeClient::detached();
        let watcher = CategoryWatcher::activate(&realtime, QueryCache::new());
        drop(watcher);

        for _ in 0..100 {
            if realtime.open_subscriptions() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert_eq!(realtime.open_subscriptions(), 0);
    }
}
