//! External key/value cache service

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

/// Key/value cache with per-entry expiry
///
/// Keys arrive fully qualified; namespacing is applied by the caller.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Fetch a live entry
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store an entry. `None` means no expiry.
    async fn set(&self, key: &str, value: Value, ttl: Option<Duration>) -> Result<()>;

    /// Remove entries, returning how many existed
    async fn delete(&self, keys: &[String]) -> Result<usize>;
}
