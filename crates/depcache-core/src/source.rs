//! Interfaces the surrounding content repository implements

use crate::error::Result;
use crate::item::StructuredItem;

/// Canonical form of a reference handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// Repository path of the referenced file
    pub path: String,

    /// Stable identifier of the referenced item
    pub id: String,

    /// Whether the target currently exists in the repository
    pub exists: bool,
}

impl ResolvedReference {
    pub fn new(path: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            id: id.into(),
            exists: true,
        }
    }
}

/// Maps internal reference handles to canonical paths and ids
pub trait ReferenceResolver: Send + Sync {
    /// Resolve a handle. `None` means the handle leads nowhere.
    fn resolve(&self, handle: &str) -> Option<ResolvedReference>;
}

/// Enumerates and loads the items of a content repository
pub trait ItemSource: Send + Sync {
    /// Ids of all items currently present
    fn item_ids(&self) -> Result<Vec<String>>;

    /// Last-modified timestamp of an item
    fn last_modified(&self, id: &str) -> Result<i64>;

    /// Load an item's structured data. Iteration order of the returned
    /// structure must be stable for a fixed revision.
    fn load_item(&self, id: &str) -> Result<StructuredItem>;
}
