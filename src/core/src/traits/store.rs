//! Identity lookup store

use crate::error::Result;
use crate::types::IdentityRecord;
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

/// A notification from the store's change feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    /// The record with this canonical id changed or was removed
    Changed { id: String },

    /// Changes were lost; every derived copy of store data is suspect
    Resync,
}

impl ChangeEvent {
    pub fn new(id: impl Into<String>) -> Self {
        ChangeEvent::Changed { id: id.into() }
    }

    /// Canonical id of a single-record change
    pub fn id(&self) -> Option<&str> {
        match self {
            ChangeEvent::Changed { id } => Some(id),
            ChangeEvent::Resync => None,
        }
    }
}

/// Stream of changes starting from the moment of subscription
pub type ChangeStream = BoxStream<'static, ChangeEvent>;

/// Lookup store holding identity records
///
/// Both lookups are indexed queries; when several records match, the first
/// one is returned.
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Find a record by display name
    async fn get_by_name(&self, name: &str) -> Result<Option<IdentityRecord>>;

    /// Find a record by alternate id (`authentication.apiId`)
    async fn get_by_alternate_id(&self, id: &str) -> Result<Option<IdentityRecord>>;

    /// Subscribe to record changes. No backlog is replayed.
    async fn subscribe_changes(&self) -> Result<ChangeStream>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    // Store with a single fixed record and a finite change feed
    struct FixedStore {
        record: IdentityRecord,
    }

    #[async_trait]
    impl IdentityStore for FixedStore {
        async fn get_by_name(&self, name: &str) -> Result<Option<IdentityRecord>> {
            Ok((self.record.name == name).then(|| self.record.clone()))
        }

        async fn get_by_alternate_id(&self, id: &str) -> Result<Option<IdentityRecord>> {
            Ok((self.record.authentication.api_id == id).then(|| self.record.clone()))
        }

        async fn subscribe_changes(&self) -> Result<ChangeStream> {
            let events = vec![ChangeEvent::new(self.record.store_id.clone())];
            Ok(futures::stream::iter(events).boxed())
        }
    }

    #[tokio::test]
    async fn test_store_trait_object() {
        let store: Box<dyn IdentityStore> = Box::new(FixedStore {
            record: IdentityRecord::new("doc-1", "svc", "api-1"),
        });

        assert!(store.get_by_name("svc").await.unwrap().is_some());
        assert!(store.get_by_alternate_id("api-2").await.unwrap().is_none());

        let changes: Vec<_> = store.subscribe_changes().await.unwrap().collect().await;
        assert_eq!(changes, vec![ChangeEvent::new("doc-1")]);
    }

    #[test]
    fn test_change_event_wire_format() {
        let changed = serde_json::to_value(ChangeEvent::new("doc-1")).unwrap();
        assert_eq!(changed, serde_json::json!({ "type": "changed", "id": "doc-1" }));

        let resync: ChangeEvent = serde_json::from_str(r#"{"type":"resync"}"#).unwrap();
        assert_eq!(resync, ChangeEvent::Resync);
        assert_eq!(resync.id(), None);
    }
}
