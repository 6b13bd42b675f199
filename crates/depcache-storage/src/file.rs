//! On-disk cache store
//!
//! The cache lives in a single file named after the format version, e.g.
//! `AssetDependencyCache_v1.cache`. Saving removes cache files written by
//! other versions, so a format change simply starts from an empty cache.

use crate::codec::{self, FORMAT_VERSION};
use crate::error::StorageResult;
use crate::traits::CacheStore;
use async_trait::async_trait;
use depcache_core::AssetNode;
use std::io::Write;
use std::path::{Path, PathBuf};

const FILE_PREFIX: &str = "AssetDependencyCache_v";
const FILE_EXTENSION: &str = ".cache";

/// File name of the cache for a format version
pub fn cache_file_name(version: u32) -> String {
    format!("{}{}{}", FILE_PREFIX, version, FILE_EXTENSION)
}

fn is_cache_file(name: &str) -> bool {
    name.strip_prefix(FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(FILE_EXTENSION))
        .is_some_and(|v| !v.is_empty() && v.bytes().all(|b| b.is_ascii_digit()))
}

/// Cache store backed by a file in a directory
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    dir: PathBuf,
}

impl FileCacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the current-version cache file
    pub fn path(&self) -> PathBuf {
        self.dir.join(cache_file_name(FORMAT_VERSION))
    }

    /// Cache files in the directory, any version
    async fn cache_files(&self) -> StorageResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name().to_str().is_some_and(is_cache_file) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

}

/// Write `bytes` to a temporary file in `dir`, then rename it over `path`
fn write_atomic(dir: &Path, path: &Path, bytes: &[u8]) -> StorageResult<()> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().flush()?;
    tmp.persist(path)?;
    Ok(())
}

#[async_trait]
impl CacheStore for FileCacheStore {
    async fn load(&self) -> StorageResult<Vec<AssetNode>> {
        let path = self.path();
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No cache at {}", path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(e.into()),
        };
        let nodes = codec::decode(&bytes);
        tracing::debug!("Loaded {} nodes from {}", nodes.len(), path.display());
        Ok(nodes)
    }

    async fn save(&self, nodes: &[AssetNode]) -> StorageResult<()> {
        let bytes = codec::encode(nodes)?;
        let size = bytes.len();
        let current = self.path();

        let (dir, path) = (self.dir.clone(), current.clone());
        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &bytes)).await??;

        for file in self.cache_files().await? {
            if file != current {
                tracing::debug!(
                    "Removing cache from another format version: {}",
                    file.display()
                );
                tokio::fs::remove_file(&file).await?;
            }
        }

        tracing::debug!(
            "Saved {} nodes ({} bytes) to {}",
            nodes.len(),
            size,
            current.display()
        );
        Ok(())
    }

    async fn clear(&self) -> StorageResult<()> {
        for file in self.cache_files().await? {
            tokio::fs::remove_file(&file).await?;
        }
        Ok(())
    }

    async fn exists(&self) -> StorageResult<bool> {
        Ok(tokio::fs::try_exists(self.path()).await?)
    }

    fn location(&self) -> String {
        self.path().display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use depcache_core::{Dependency, PathSegment, ResolverData};
    use tempfile::TempDir;

    fn nodes() -> Vec<AssetNode> {
        vec![
            AssetNode::new("a").with_resolver_data(
                ResolverData::new("objects", 10).with_dependencies(vec![Dependency::new(
                    "b",
                    "Object",
                    "Asset",
                    vec![PathSegment::property("m_Ref")],
                )]),
            ),
            AssetNode::new("b"),
        ]
    }

    #[test]
    fn test_cache_file_names() {
        assert_eq!(cache_file_name(1), "AssetDependencyCache_v1.cache");
        assert!(is_cache_file("AssetDependencyCache_v12.cache"));
        assert!(!is_cache_file("AssetDependencyCache_v.cache"));
        assert!(!is_cache_file("AssetDependencyCache_vx.cache"));
        assert!(!is_cache_file("other.cache"));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let store = FileCacheStore::new(dir.path().join("nested"));

        assert!(!store.exists().await.unwrap());
        assert!(store.load().await.unwrap().is_empty());

        store.save(&nodes()).await.unwrap();
        assert!(store.exists().await.unwrap());
        assert!(store.path().ends_with(cache_file_name(FORMAT_VERSION)));
        assert_eq!(store.load().await.unwrap(), nodes());
    }

    #[tokio::test]
    async fn test_save_removes_other_versions() {
        let dir = TempDir::new().unwrap();
        let stale = dir.path().join(cache_file_name(FORMAT_VERSION + 1));
        let unrelated = dir.path().join("notes.txt");
        std::fs::write(&stale, b"old").unwrap();
        std::fs::write(&unrelated, b"keep").unwrap();

        let store = FileCacheStore::new(dir.path());
        store.save(&nodes()).await.unwrap();

        assert!(!stale.exists());
        assert!(unrelated.exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileCacheStore::new(dir.path());
        store.save(&nodes()).await.unwrap();

        let mut bytes = std::fs::read(store.path()).unwrap();
        bytes.truncate(bytes.len() - 3);
        std::fs::write(store.path(), &bytes).unwrap();

        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileCacheStore::new(dir.path());
        store.save(&nodes()).await.unwrap();
        store.clear().await.unwrap();

        assert!(!store.exists().await.unwrap());
        assert!(store.load().await.unwrap().is_empty());

        // Clearing a directory that was never created is fine
        FileCacheStore::new(dir.path().join("missing")).clear().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_replaces_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let store = FileCacheStore::new(dir.path());
        store.save(&nodes()).await.unwrap();

        let fewer = vec![AssetNode::new("c")];
        store.save(&fewer).await.unwrap();
        assert_eq!(store.load().await.unwrap(), fewer);

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![cache_file_name(FORMAT_VERSION)]);
    }
}
