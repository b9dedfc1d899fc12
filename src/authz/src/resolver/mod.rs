//! Identity resolution with write-through invalidation
//!
//! Lookups go lookup index -> cache -> store, and a store hit populates
//! both the cache and the index. A background task follows the store's
//! change feed and evicts changed records from both.
//!
//! Store and cache failures never escape the resolver: they are logged and
//! the lookup reports "not found", forcing the caller to re-authenticate.

pub mod index;
pub mod verifiers;

pub use index::{LookupIndex, LookupKind};
pub use verifiers::{ServiceIdentityVerifier, SessionIdentityVerifier};

use crate::cache::IdentityCache;
use crate::error::{AuthError, Result};
use futures::StreamExt;
use gatehouse_core::{ChangeEvent, IdentityRecord, IdentityStore};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Cache namespace for identity records
pub const DEFAULT_NAMESPACE: &str = "ApiUserNs";

/// Identity cache TTL (10 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Upper bound on a single store query
pub const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolver tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    pub namespace: String,
    pub ttl: Duration,
    pub store_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            ttl: DEFAULT_TTL,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Resolves identity records by name or alternate id
pub struct IdentityResolver {
    store: Arc<dyn IdentityStore>,
    cache: IdentityCache,
    index: Arc<LookupIndex>,
    config: ResolverConfig,
}

impl IdentityResolver {
    pub fn new(store: Arc<dyn IdentityStore>, cache: IdentityCache, config: ResolverConfig) -> Self {
        Self::with_index(store, cache, Arc::new(LookupIndex::new()), config)
    }

    /// Create a resolver sharing an existing lookup index
    pub fn with_index(
        store: Arc<dyn IdentityStore>,
        cache: IdentityCache,
        index: Arc<LookupIndex>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            cache,
            index,
            config,
        }
    }

    pub fn index(&self) -> &Arc<LookupIndex> {
        &self.index
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve a record by display name
    pub async fn resolve_by_name(&self, name: &str) -> Option<IdentityRecord> {
        self.resolve(name, LookupKind::Name).await
    }

    /// Resolve a record by alternate id (`authentication.apiId`)
    pub async fn resolve_by_alternate_id(&self, id: &str) -> Option<IdentityRecord> {
        self.resolve(id, LookupKind::AlternateId).await
    }

    async fn resolve(&self, key: &str, kind: LookupKind) -> Option<IdentityRecord> {
        if let Some(store_id) = self.index.lookup(kind, key) {
            match self
                .cache
                .ns_get::<IdentityRecord>(&self.config.namespace, &store_id)
                .await
            {
                Ok(Some(record)) => {
                    debug!(key = %key, id = %store_id, "Identity cache hit");
                    return Some(record);
                }
                Ok(None) => debug!(key = %key, id = %store_id, "Identity cache entry gone"),
                Err(e) => warn!(key = %key, error = %e, "Identity cache read failed"),
            }
        }

        let record = match kind {
            LookupKind::Name => self.query_store(key, self.store.get_by_name(key)).await,
            LookupKind::AlternateId => {
                self.query_store(key, self.store.get_by_alternate_id(key)).await
            }
        }?;

        self.populate(kind, key, &record).await;
        Some(record)
    }

    async fn query_store<F>(&self, key: &str, query: F) -> Option<IdentityRecord>
    where
        F: Future<Output = gatehouse_core::Result<Option<IdentityRecord>>>,
    {
        let result = match tokio::time::timeout(self.config.store_timeout, query).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(AuthError::StoreUnavailable(format!(
                "query for {} timed out after {:?}",
                key, self.config.store_timeout
            ))),
        };

        match result {
            Ok(record) => record,
            Err(e) => {
                error!(key = %key, error = %e, "Identity store lookup failed");
                None
            }
        }
    }

    async fn populate(&self, kind: LookupKind, key: &str, record: &IdentityRecord) {
        let stored = self
            .cache
            .ns_set(
                &self.config.namespace,
                &record.store_id,
                record,
                Some(self.config.ttl),
            )
            .await;

        match stored {
            Ok(()) => self.index.record(kind, key, record.store_id.clone()),
            Err(e) => warn!(key = %key, error = %e, "Failed to cache identity"),
        }
    }

    /// Evict a canonical id from the cache and the lookup index
    ///
    /// Index entries are pruned even when the cache delete fails.
    pub async fn invalidate(&self, store_id: &str) {
        if let Err(e) = self
            .cache
            .ns_del(&self.config.namespace, &[store_id])
            .await
        {
            warn!(id = %store_id, error = %e, "Failed to flush identity from the cache");
        }

        let pruned = self.index.remove_id(store_id);
        debug!(id = %store_id, pruned, "Invalidated identity");
    }

    /// Evict every record the index knows about and empty the index
    ///
    /// Used when the change feed reports lost notifications.
    pub async fn resync(&self) {
        let ids = self.index.clear();
        let keys: Vec<&str> = ids.iter().map(String::as_str).collect();

        if !keys.is_empty() {
            if let Err(e) = self.cache.ns_del(&self.config.namespace, &keys).await {
                warn!(ids = keys.len(), error = %e, "Failed to flush identities from the cache");
            }
        }
        warn!(ids = ids.len(), "Identity changes were missed; flushed cached identities");
    }

    /// Follow the store's change feed, invalidating each changed id
    ///
    /// Only changes made after this call are seen. A resync notification
    /// flushes everything the resolver cached. The task ends when the feed
    /// closes.
    pub async fn watch_changes(self: Arc<Self>) -> Result<JoinHandle<()>> {
        let mut changes = self
            .store
            .subscribe_changes()
            .await
            .map_err(|e| AuthError::StoreUnavailable(e.to_string()))?;

        info!(namespace = %self.config.namespace, "Watching identity store for changes");

        Ok(tokio::spawn(async move {
            while let Some(change) = changes.next().await {
                match change {
                    ChangeEvent::Changed { id } => self.invalidate(&id).await,
                    ChangeEvent::Resync => self.resync().await,
                }
            }
            info!("Identity change feed closed");
        }))
    }
}
