//! Cache store trait definitions

use crate::error::StorageResult;
use async_trait::async_trait;
use depcache_core::AssetNode;

/// Trait for places the encoded cache can live
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Load cached nodes
    ///
    /// A missing or corrupt cache loads as an empty collection, which
    /// callers treat as "never built".
    async fn load(&self) -> StorageResult<Vec<AssetNode>>;

    /// Replace the cached nodes
    async fn save(&self, nodes: &[AssetNode]) -> StorageResult<()>;

    /// Remove the cache
    async fn clear(&self) -> StorageResult<()>;

    /// Whether a cache has been saved
    async fn exists(&self) -> StorageResult<bool>;

    /// Human-readable location, for diagnostics
    fn location(&self) -> String;
}
