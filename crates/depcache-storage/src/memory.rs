//! In-memory cache store for testing

use crate::codec;
use crate::error::{StorageError, StorageResult};
use crate::traits::CacheStore;
use async_trait::async_trait;
use depcache_core::AssetNode;
use std::sync::RwLock;

/// In-memory cache store
///
/// Keeps the encoded bytes rather than the nodes, so loads go through the
/// same codec path as on-disk caches.
#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    bytes: RwLock<Option<Vec<u8>>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from raw bytes, e.g. a damaged cache
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            bytes: RwLock::new(Some(bytes)),
        }
    }

    /// Copy of the stored bytes
    pub fn bytes(&self) -> StorageResult<Option<Vec<u8>>> {
        let bytes = self
            .bytes
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(bytes.clone())
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn load(&self) -> StorageResult<Vec<AssetNode>> {
        let bytes = self
            .bytes
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(bytes.as_deref().map(codec::decode).unwrap_or_default())
    }

    async fn save(&self, nodes: &[AssetNode]) -> StorageResult<()> {
        let encoded = codec::encode(nodes)?;
        let mut bytes = self
            .bytes
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        *bytes = Some(encoded);
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        let mut bytes = self
            .bytes
            .write()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        *bytes = None;
        Ok(())
    }

    async fn exists(&self) -> StorageResult<bool> {
        let bytes = self
            .bytes
            .read()
            .map_err(|e| StorageError::Lock(e.to_string()))?;
        Ok(bytes.is_some())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depcache_core::ResolverData;

    #[tokio::test]
    async fn test_save_and_load() {
        let store = MemoryCacheStore::new();
        assert!(!store.exists().await.unwrap());
        assert!(store.load().await.unwrap().is_empty());

        let nodes = vec![AssetNode::new("a").with_resolver_data(ResolverData::new("objects", 3))];
        store.save(&nodes).await.unwrap();
        assert!(store.exists().await.unwrap());
        assert_eq!(store.load().await.unwrap(), nodes);

        store.clear().await.unwrap();
        assert!(!store.exists().await.unwrap());
    }

    #[tokio::test]
    async fn test_corrupt_bytes_load_empty() {
        let store = MemoryCacheStore::with_bytes(vec![1, 0, 9]);
        assert!(store.exists().await.unwrap());
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_previous() {
        let store = MemoryCacheStore::new();
        let nodes = vec![AssetNode::new("a")];
        store.save(&nodes).await.unwrap();

        assert!(store.save(&[AssetNode::new("")]).await.is_err());
        assert_eq!(store.load().await.unwrap(), nodes);
    }
}
