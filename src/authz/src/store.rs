//! In-memory identity store
//!
//! Implements [`IdentityStore`] over a map of records with name and
//! alternate-id indices. Writes publish a [`ChangeEvent`] to every live
//! subscriber. Used by the demo server and the test suites.

use async_trait::async_trait;
use futures::StreamExt;
use gatehouse_core::{ChangeEvent, ChangeStream, CoreError, IdentityRecord, IdentityStore, Result};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Capacity of the change feed before slow subscribers start lagging
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// Record map keyed by canonical id
pub struct MemoryIdentityStore {
    records: RwLock<BTreeMap<String, IdentityRecord>>,
    changes: broadcast::Sender<ChangeEvent>,
    available: AtomicBool,
    queries: AtomicUsize,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            records: RwLock::new(BTreeMap::new()),
            changes,
            available: AtomicBool::new(true),
            queries: AtomicUsize::new(0),
        }
    }

    /// Create a store pre-populated with records. No changes are published.
    pub fn with_records(records: impl IntoIterator<Item = IdentityRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.write();
            for record in records {
                map.insert(record.store_id.clone(), record);
            }
        }
        store
    }

    /// Insert or replace a record and notify subscribers
    pub fn put(&self, record: IdentityRecord) {
        let id = record.store_id.clone();
        self.records.write().insert(id.clone(), record);
        self.publish(id);
    }

    /// Remove a record and notify subscribers
    pub fn remove(&self, store_id: &str) -> Option<IdentityRecord> {
        let removed = self.records.write().remove(store_id);
        if removed.is_some() {
            self.publish(store_id.to_string());
        }
        removed
    }

    /// Simulate losing (or regaining) the store connection
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of lookup queries served so far
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    fn publish(&self, id: String) {
        // No receivers is not an error: nobody is watching yet
        let receivers = self.changes.send(ChangeEvent::new(id.clone())).unwrap_or(0);
        debug!(id = %id, receivers, "Published identity change");
    }

    fn query<F>(&self, matches: F) -> Result<Option<IdentityRecord>>
    where
        F: Fn(&IdentityRecord) -> bool,
    {
        if !self.available.load(Ordering::SeqCst) {
            return Err(CoreError::store("identity store not available"));
        }
        self.queries.fetch_add(1, Ordering::SeqCst);

        Ok(self.records.read().values().find(|r| matches(r)).cloned())
    }
}

impl Default for MemoryIdentityStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn get_by_name(&self, name: &str) -> Result<Option<IdentityRecord>> {
        self.query(|record| record.name == name)
    }

    async fn get_by_alternate_id(&self, id: &str) -> Result<Option<IdentityRecord>> {
        self.query(|record| record.authentication.api_id == id)
    }

    async fn subscribe_changes(&self) -> Result<ChangeStream> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(CoreError::store("identity store not available"));
        }

        let receiver = self.changes.subscribe();
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            loop {
                match receiver.recv().await {
                    Ok(event) => return Some((event, receiver)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Change feed subscriber lagged; requesting resync");
                        return Some((ChangeEvent::Resync, receiver));
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        });

        Ok(stream.boxed())
    }
}
