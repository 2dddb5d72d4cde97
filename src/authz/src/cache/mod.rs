//! Key/value cache with per-entry TTL
//!
//! One cache instance serves two layers: the permission store caches
//! permission records, and the evaluator caches boolean decisions. Payloads
//! are stored as JSON so any serializable type fits, the same way a Redis
//! backend would hold them.

pub mod keys;
pub mod memory;

pub use memory::{CacheStats, MemoryCache};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

use crate::error::Result;

/// Cache backend
///
/// Implementations must be safe for concurrent use. Reads past an entry's
/// expiry behave as misses.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a live entry
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Insert or overwrite an entry
    async fn set(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Remove an entry; absent keys are not an error
    async fn delete(&self, key: &str) -> Result<()>;

    /// Remove every entry whose key starts with `prefix`
    async fn delete_prefix(&self, prefix: &str) -> Result<usize>;

    /// Remove all entries
    async fn clear(&self) -> Result<()>;
}

impl dyn CacheBackend {
    /// Get and decode an entry
    ///
    /// An entry that no longer decodes as `T` is evicted and reported as a miss.
    pub async fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(value) = self.get(key).await? else {
            return Ok(None);
        };

        match serde_json::from_value(value) {
            Ok(decoded) => Ok(Some(decoded)),
            Err(e) => {
                warn!(key, error = %e, "Evicting undecodable cache entry");
                self.delete(key).await?;
                Ok(None)
            }
        }
    }

    /// Encode and store an entry
    pub async fn set_as<T: Serialize + Sync>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        let encoded = serde_json::to_value(value)?;
        self.set(key, encoded, ttl).await
    }
}
