//! Dependency (edge) types

use crate::path::PathSegment;
use serde::{Deserialize, Serialize};

/// A discovered edge from a source item to a target item
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dependency {
    /// Identifier of the referenced item
    pub target_id: String,

    /// Semantic label of the reference (e.g. "Object", "Variant Of")
    pub connection_type: String,

    /// Logical type of the target (e.g. "Asset")
    pub target_node_type: String,

    /// Route from the source item's root to the referencing field, root first
    pub path: Vec<PathSegment>,
}

impl Dependency {
    pub fn new(
        target_id: impl Into<String>,
        connection_type: impl Into<String>,
        target_node_type: impl Into<String>,
        path: Vec<PathSegment>,
    ) -> Self {
        Self {
            target_id: target_id.into(),
            connection_type: connection_type.into(),
            target_node_type: target_node_type.into(),
            path,
        }
    }

    /// Human-readable form of the path, e.g. `Player/Renderer/m_Material`
    pub fn path_display(&self) -> String {
        self.path
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}
