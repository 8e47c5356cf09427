use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use mentora_shared::clients::RestClient;
use mentora_shared::errors::{AppError, AppResult};
use mentora_shared::types::Session;

use crate::cache::{QueryCache, QueryKey};
use crate::invalidation::{self, ops, MutationKind};
use crate::models::Notification;

/// Storage boundary for notifications. The REST implementation talks to
/// the Remote Data Service; tests swap in an in-memory one.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// All notifications for the user, newest first.
    async fn list_for_user(
        &self,
        session: &Session,
        user_id: Uuid,
    ) -> AppResult<Vec<Notification>>;

    /// Mark one notification read, restricted to rows matching both the
    /// notification id and the owner. Returns the number of rows updated.
    async fn mark_read(
        &self,
        session: &Session,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<usize>;

    /// Mark every unread notification for the owner read in one request.
    /// Returns the number of rows updated.
    async fn mark_all_read(&self, session: &Session, user_id: Uuid) -> AppResult<usize>;
}

pub struct RestNotificationStore {
    rest: RestClient,
}

impl RestNotificationStore {
    pub fn new(rest: RestClient) -> Self {
        Self { rest }
    }
}

#[async_trait]
impl NotificationStore for RestNotificationStore {
    async fn list_for_user(
        &self,
        session: &Session,
        user_id: Uuid,
    ) -> AppResult<Vec<Notification>> {
        self.rest
            .table("notifications")
            .eq("user_id", user_id)
            .order_desc("created_at")
            .select::<Notification>(session)
            .await
    }

    async fn mark_read(
        &self,
        session: &Session,
        notification_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<usize> {
        let updated: Vec<Notification> = self
            .rest
            .table("notifications")
            .eq("id", notification_id)
            .eq("user_id", user_id)
            .update(session, &json!({ "is_read": true }))
            .await?;
        Ok(updated.len())
    }

    async fn mark_all_read(&self, session: &Session, user_id: Uuid) -> AppResult<usize> {
        let updated: Vec<Notification> = self
            .rest
            .table("notifications")
            .eq("user_id", user_id)
            .eq("is_read", false)
            .update(session, &json!({ "is_read": true }))
            .await?;
        Ok(updated.len())
    }
}

/// Keeps a user's notification list and unread count in sync with the
/// backend.
///
/// The loaded collection is cached under a key scoped to the user; the
/// unread count derives from that cached collection with no extra round
/// trip. Mutations run first, then the declared invalidation, then a
/// refetch -- reads never race ahead of the write they depend on. A failed
/// mutation is propagated as-is; the next load reconciles the cache.
pub struct NotificationSynchronizer<S: NotificationStore> {
    store: S,
    cache: QueryCache,
    session: Session,
}

impl<S: NotificationStore> NotificationSynchronizer<S> {
    pub fn new(store: S, cache: QueryCache, session: Session) -> Self {
        Self {
            store,
            cache,
            session,
        }
    }

    fn cache_key(user_id: Uuid) -> QueryKey {
        QueryKey::for_user(ops::NOTIFICATIONS, user_id)
    }

    /// Fetch the user's notifications, newest first, and cache them.
    /// An anonymous session gets an empty collection without a request.
    pub async fn load(&self) -> AppResult<Vec<Notification>> {
        let Some(user_id) = self.session.user_id() else {
            return Ok(Vec::new());
        };
        self.refetch(user_id).await
    }

    /// Count of cached notifications with `is_read == false`. Zero when
    /// nothing has been loaded yet.
    pub fn unread_count(&self) -> usize {
        let Some(user_id) = self.session.user_id() else {
            return 0;
        };
        self.cache
            .get::<Vec<Notification>>(&Self::cache_key(user_id))
            .map(|items| items.iter().filter(|n| !n.is_read).count())
            .unwrap_or(0)
    }

    /// Mark one notification read. No-op for an anonymous session. The
    /// update is restricted to rows owned by the current user; a foreign or
    /// unknown id matches nothing and is a not-found error.
    pub async fn mark_as_read(&self, notification_id: Uuid) -> AppResult<()> {
        let Some(user_id) = self.session.user_id() else {
            tracing::debug!("mark_as_read skipped, no signed-in user");
            return Ok(());
        };

        let updated = self
            .store
            .mark_read(&self.session, notification_id, user_id)
            .await
            .map_err(|e| {
                tracing::warn!(notification_id = %notification_id, error = %e, "mark_as_read failed");
                e
            })?;

        if updated == 0 {
            return Err(AppError::not_found("notification not found"));
        }

        invalidation::apply(&self.cache, &MutationKind::MarkNotificationRead { user_id });
        self.refetch(user_id).await?;
        Ok(())
    }

    /// Mark every unread notification for the current user read in one
    /// request. No-op for an anonymous session.
    pub async fn mark_all_as_read(&self) -> AppResult<()> {
        let Some(user_id) = self.session.user_id() else {
            tracing::debug!("mark_all_as_read skipped, no signed-in user");
            return Ok(());
        };

        let updated = self
            .store
            .mark_all_read(&self.session, user_id)
            .await
            .map_err(|e| {
                tracing::warn!(user_id = %user_id, error = %e, "mark_all_as_read failed");
                e
            })?;

        tracing::debug!(user_id = %user_id, updated, "marked all notifications read");

        invalidation::apply(&self.cache, &MutationKind::MarkAllNotificationsRead { user_id });
        self.refetch(user_id).await?;
        Ok(())
    }

    async fn refetch(&self, user_id: Uuid) -> AppResult<Vec<Notification>> {
        let items = self.store.list_for_user(&self.session, user_id).await?;
        self.cache.put(Self::cache_key(user_id), items.clone());
        Ok(items)
    }
}
