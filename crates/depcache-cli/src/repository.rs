//! Item repository backed by JSON files
//!
//! Every `*.item.json` file below the root is one item. Its id is the
//! repository-relative path without the suffix, using `/` separators, and
//! references between items are repository-relative file paths.

use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use depcache_core::{
    Error, ItemSource, ReferenceResolver, ResolvedReference, Result, StructuredItem,
};
use walkdir::WalkDir;

/// Suffix marking item files
pub const ITEM_SUFFIX: &str = ".item.json";

/// Directory of JSON item files
#[derive(Debug, Clone)]
pub struct JsonRepository {
    root: PathBuf,
}

impl JsonRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Repository-relative path of an item id
    pub fn item_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{}{}", id, ITEM_SUFFIX))
    }

    fn id_for(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let relative = normalize(relative)?;
        relative.strip_suffix(ITEM_SUFFIX).map(str::to_string)
    }
}

/// Join normal components with `/`; rejects paths leaving the root
fn normalize(path: &Path) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop()?;
            }
            Component::RootDir | Component::Prefix(_) => {}
        }
    }
    (!parts.is_empty()).then(|| parts.join("/"))
}

impl ItemSource for JsonRepository {
    fn item_ids(&self) -> Result<Vec<String>> {
        if !self.root.is_dir() {
            return Err(Error::ItemSource(format!(
                "Repository not found: {}",
                self.root.display()
            )));
        }

        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(id) = self.id_for(entry.path()) {
                tracing::trace!("Found item {}", id);
                ids.push(id);
            }
        }

        ids.sort();
        tracing::debug!("Found {} items in {}", ids.len(), self.root.display());
        Ok(ids)
    }

    fn last_modified(&self, id: &str) -> Result<i64> {
        let path = self.item_path(id);
        let metadata = std::fs::metadata(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ItemNotFound(id.to_string()),
            _ => Error::Io(e),
        })?;
        let modified: DateTime<Utc> = metadata.modified()?.into();
        Ok(modified.timestamp_millis())
    }

    fn load_item(&self, id: &str) -> Result<StructuredItem> {
        let path = self.item_path(id);
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ItemNotFound(id.to_string()),
            _ => Error::Io(e),
        })?;
        let mut item: StructuredItem = serde_json::from_str(&content)
            .map_err(|e| Error::ItemSource(format!("{}: {}", path.display(), e)))?;
        item.id = id.to_string();
        Ok(item)
    }
}

impl ReferenceResolver for JsonRepository {
    fn resolve(&self, handle: &str) -> Option<ResolvedReference> {
        let path = normalize(Path::new(handle.trim()))?;
        let id = path.strip_suffix(ITEM_SUFFIX).unwrap_or(&path).to_string();
        let exists = self.root.join(&path).is_file();
        Some(ResolvedReference {
            path,
            id,
            exists,
        })
    }
}
