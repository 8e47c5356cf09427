//! Client-side data synchronization for Mentora.
//!
//! Everything here layers over the Remote Data Service clients in
//! `mentora-shared`: a keyed query cache with declared invalidation, the
//! notification synchronizer, the realtime category watcher, the link
//! preview resolver, and the infinite scroll trigger.

pub mod cache;
pub mod icons;
pub mod invalidation;
pub mod models;
pub mod services;

pub use cache::{QueryCache, QueryKey};
pub use icons::CategoryIcon;
pub use invalidation::MutationKind;
pub use models::{Category, LinkPreview, Notification};
pub use services::categories::{CategoryDirectory, CategoryWatcher, RestCategoryStore};
pub use services::link_preview::{LinkPreviewResolver, PreviewState};
pub use services::notifications::{NotificationSynchronizer, RestNotificationStore};
pub use services::scroll::{ObserverOptions, ScrollTrigger};
