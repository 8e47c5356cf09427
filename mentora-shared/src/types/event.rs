use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row-level change kind, matching the wire names used by the Remote Data
/// Service's change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "INSERT")]
    Insert,
    #[serde(rename = "UPDATE")]
    Update,
    #[serde(rename = "DELETE")]
    Delete,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event-type filter for a subscription. `All` is the wire `*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFilter {
    #[default]
    All,
    Only(ChangeKind),
}

impl EventFilter {
    pub fn matches(&self, kind: ChangeKind) -> bool {
        match self {
            Self::All => true,
            Self::Only(k) => *k == kind,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "*",
            Self::Only(k) => k.as_str(),
        }
    }
}

/// A row-level change delivered over the change feed.
///
/// `record` is the new row for inserts and updates; `old_record` the
/// previous row for updates and deletes. Consumers never merge these into
/// local state; they invalidate and refetch from the source of truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,
    pub table: String,
    pub commit_timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_record: Option<serde_json::Value>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, table: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            commit_timestamp: Utc::now(),
            record: None,
            old_record: None,
        }
    }

    pub fn with_record(mut self, record: serde_json::Value) -> Self {
        self.record = Some(record);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_kind_wire_names() {
        let json = serde_json::to_string(&ChangeKind::Insert).unwrap();
        assert_eq!(json, "\"INSERT\"");

        let parsed: ChangeKind = serde_json::from_str("\"DELETE\"").unwrap();
        assert_eq!(parsed, ChangeKind::Delete);
    }

    #[test]
    fn filter_matching() {
        assert!(EventFilter::All.matches(ChangeKind::Update));
        assert!(EventFilter::Only(ChangeKind::Insert).matches(ChangeKind::Insert));
        assert!(!EventFilter::Only(ChangeKind::Insert).matches(ChangeKind::Delete));
        assert_eq!(EventFilter::All.as_str(), "*");
    }

    #[test]
    fn event_envelope_roundtrip() {
        let event = ChangeEvent::new(ChangeKind::Update, "categories")
            .with_record(serde_json::json!({ "name": "Fundraising" }));
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"UPDATE\""));

        let parsed: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.table, "categories");
        assert!(parsed.old_record.is_none());
    }
}
