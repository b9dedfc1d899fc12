//! Namespace-partitioned identity cache
//!
//! Wraps an external [`CacheBackend`] and qualifies every key as
//! `namespace_key`. Calls without a namespace use [`DEFAULT_NAMESPACE`].

pub mod memory;

pub use memory::{CacheStats, MemoryCacheBackend};

use crate::error::{AuthError, Result};
use gatehouse_core::CacheBackend;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Namespace used when none is given
pub const DEFAULT_NAMESPACE: &str = "$def$";

/// Build the backend key for a namespaced entry
pub fn make_key(namespace: Option<&str>, key: &str) -> String {
    format!("{}_{}", namespace.unwrap_or(DEFAULT_NAMESPACE), key)
}

/// Typed, namespaced view over a cache backend
#[derive(Clone)]
pub struct IdentityCache {
    backend: Arc<dyn CacheBackend>,
}

impl IdentityCache {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    /// Get from the default namespace
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.ns_get(DEFAULT_NAMESPACE, key).await
    }

    /// Get from a namespace
    ///
    /// An entry that does not decode as `T` is reported as an error so the
    /// caller can treat it as a miss.
    pub async fn ns_get<T: DeserializeOwned>(&self, namespace: &str, key: &str) -> Result<Option<T>> {
        let value = self
            .backend
            .get(&make_key(Some(namespace), key))
            .await
            .map_err(|e| AuthError::CacheUnavailable(e.to_string()))?;

        value
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| AuthError::CacheUnavailable(format!("undecodable entry {}: {}", key, e)))
    }

    /// Set in the default namespace
    pub async fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> Result<()> {
        self.ns_set(DEFAULT_NAMESPACE, key, value, ttl).await
    }

    /// Set in a namespace
    pub async fn ns_set<T: Serialize>(
        &self,
        namespace: &str,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.backend
            .set(&make_key(Some(namespace), key), value, ttl)
            .await
            .map_err(|e| AuthError::CacheUnavailable(e.to_string()))
    }

    /// Delete from the default namespace
    pub async fn del(&self, keys: &[&str]) -> Result<usize> {
        self.ns_del(DEFAULT_NAMESPACE, keys).await
    }

    /// Delete one or more keys from a namespace
    pub async fn ns_del(&self, namespace: &str, keys: &[&str]) -> Result<usize> {
        let keys: Vec<String> = keys
            .iter()
            .map(|key| make_key(Some(namespace), key))
            .collect();

        self.backend
            .delete(&keys)
            .await
            .map_err(|e| AuthError::CacheUnavailable(e.to_string()))
    }
}
