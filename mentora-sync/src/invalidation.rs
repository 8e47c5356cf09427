use uuid::Uuid;

use crate::cache::{QueryCache, QueryKey};

/// Operation names used as cache key prefixes.
pub mod ops {
    pub const NOTIFICATIONS: &str = "notifications";
    pub const CATEGORIES: &str = "categories";
}

/// Every mutation this layer performs, paired with the cache keys it
/// invalidates. The relationship is a declared table rather than a
/// library's key-matching convention, so a reviewer can see exactly which
/// reads a write affects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    MarkNotificationRead { user_id: Uuid },
    MarkAllNotificationsRead { user_id: Uuid },
    CategoryChanged,
}

impl MutationKind {
    pub fn affected_keys(&self) -> Vec<QueryKey> {
        match self {
            Self::MarkNotificationRead { user_id } | Self::MarkAllNotificationsRead { user_id } => {
                vec![QueryKey::for_user(ops::NOTIFICATIONS, *user_id)]
            }
            Self::CategoryChanged => vec![QueryKey::global(ops::CATEGORIES)],
        }
    }
}

/// Invalidate every key the mutation declares. The next read of each key
/// refetches from the source of truth.
pub fn apply(cache: &QueryCache, mutation: &MutationKind) {
    for key in mutation.affected_keys() {
        cache.invalidate(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notification_mutations_hit_the_user_scope() {
        let user_id = Uuid::new_v4();
        let keys = MutationKind::MarkNotificationRead { user_id }.affected_keys();
        assert_eq!(keys, vec![QueryKey::for_user(ops::NOTIFICATIONS, user_id)]);

        let keys = MutationKind::MarkAllNotificationsRead { user_id }.affected_keys();
        assert_eq!(keys, vec![QueryKey::for_user(ops::NOTIFICATIONS, user_id)]);
    }

    #[test]
    fn apply_only_touches_declared_keys() {
        let cache = QueryCache::new();
        let user_id = Uuid::new_v4();
        let other_user = Uuid::new_v4();
        cache.put(QueryKey::for_user(ops::NOTIFICATIONS, user_id), 5u32);
        cache.put(QueryKey::for_user(ops::NOTIFICATIONS, other_user), 3u32);
        cache.put(QueryKey::global(ops::CATEGORIES), 1u32);

        apply(&cache, &MutationKind::MarkAllNotificationsRead { user_id });

        assert!(!cache.contains(&QueryKey::for_user(ops::NOTIFICATIONS, user_id)));
        assert!(cache.contains(&QueryKey::for_user(ops::NOTIFICATIONS, other_user)));
        assert!(cache.contains(&QueryKey::global(ops::CATEGORIES)));
    }

    #[test]
    fn category_change_invalidates_the_global_key() {
        let cache = QueryCache::new();
        cache.put(QueryKey::global(ops::CATEGORIES), 1u32);

        apply(&cache, &MutationKind::CategoryChanged);
        assert!(cache.is_empty());
    }
}
