use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An in-app notification. Created by backend triggers; this layer only
/// ever flips `is_read`, never deletes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub body: String,
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Reference data owned by the backend; this layer observes change events
/// and refetches, it never mutates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub tag: String,
    pub sort_order: i32,
}

/// Preview metadata resolved for the first URL in a piece of content.
/// Transient: superseded whenever the originating text changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkPreview {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub domain: String,
    pub favicon: Option<String>,
    pub site_name: Option<String>,
}
