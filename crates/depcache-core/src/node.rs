//! Asset node (per-item cache record) types

use crate::dependency::Dependency;
use crate::limits::{validate_count, validate_string, ValidationError};
use serde::{Deserialize, Serialize};

/// Output of one resolver run against one item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverData {
    /// Resolver that produced this data
    pub resolver_id: String,

    /// Last-modified time of the item when the data was computed
    pub timestamp: i64,

    /// Discovered dependencies, in discovery order
    pub dependencies: Vec<Dependency>,
}

impl ResolverData {
    pub fn new(resolver_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            resolver_id: resolver_id.into(),
            timestamp,
            dependencies: Vec::new(),
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<Dependency>) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// Whether this data was computed for an item revision other than `timestamp`
    pub fn is_stale(&self, timestamp: i64) -> bool {
        self.timestamp != timestamp
    }

    /// Check every count and string against the cache format limits
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_string("resolver id", &self.resolver_id)?;
        validate_count("dependencies", self.dependencies.len())?;
        for dependency in &self.dependencies {
            validate_string("target id", &dependency.target_id)?;
            validate_string("connection type", &dependency.connection_type)?;
            validate_string("node type", &dependency.target_node_type)?;
            validate_count("path segments", dependency.path.len())?;
            for segment in &dependency.path {
                validate_string("segment name", &segment.name)?;
            }
        }
        Ok(())
    }
}

/// Cache record for a single item; the unit of persistence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetNode {
    pub asset_id: String,

    /// One entry per resolver that has run on this item
    pub resolver_datas: Vec<ResolverData>,
}

impl AssetNode {
    /// Create a node with no resolver data
    pub fn new(asset_id: impl Into<String>) -> Self {
        Self {
            asset_id: asset_id.into(),
            resolver_datas: Vec::new(),
        }
    }

    pub fn with_resolver_data(mut self, data: ResolverData) -> Self {
        self.resolver_datas.push(data);
        self
    }

    /// Append resolver data without checking for an existing entry
    pub fn push_resolver_data(&mut self, data: ResolverData) {
        self.resolver_datas.push(data);
    }

    /// Replace the entry with the same resolver id in place, or append it
    pub fn upsert_resolver_data(&mut self, data: ResolverData) {
        match self
            .resolver_datas
            .iter_mut()
            .find(|d| d.resolver_id == data.resolver_id)
        {
            Some(existing) => *existing = data,
            None => self.resolver_datas.push(data),
        }
    }

    pub fn resolver_data(&self, resolver_id: &str) -> Option<&ResolverData> {
        self.resolver_datas
            .iter()
            .find(|d| d.resolver_id == resolver_id)
    }

    /// Drop resolver data for which `keep` returns false
    pub fn retain_resolver_datas(&mut self, keep: impl FnMut(&ResolverData) -> bool) {
        self.resolver_datas.retain(keep);
    }

    /// All dependencies across resolvers, in resolver order
    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.resolver_datas.iter().flat_map(|d| d.dependencies.iter())
    }

    pub fn dependency_count(&self) -> usize {
        self.resolver_datas.iter().map(|d| d.dependencies.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathSegment;

    #[test]
    fn test_node_creation() {
        let node = AssetNode::new("a1");
        assert_eq!(node.asset_id, "a1");
        assert!(node.resolver_datas.is_empty());
        assert_eq!(node.dependency_count(), 0);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut node = AssetNode::new("a1")
            .with_resolver_data(ResolverData::new("objects", 1))
            .with_resolver_data(ResolverData::new("loca", 1));

        let deps = vec![Dependency::new(
            "b2",
            "Object",
            "Asset",
            vec![PathSegment::property("m_Field")],
        )];
        node.upsert_resolver_data(ResolverData::new("objects", 2).with_dependencies(deps));

        assert_eq!(node.resolver_datas.len(), 2);
        assert_eq!(node.resolver_datas[0].resolver_id, "objects");
        assert_eq!(node.resolver_datas[0].timestamp, 2);
        assert_eq!(node.dependency_count(), 1);

        node.upsert_resolver_data(ResolverData::new("variants", 2));
        assert_eq!(node.resolver_datas.len(), 3);
        assert!(node.resolver_data("variants").is_some());
    }

    #[test]
    fn test_staleness() {
        let data = ResolverData::new("objects", 42);
        assert!(!data.is_stale(42));
        assert!(data.is_stale(43));
        assert!(data.is_stale(41));
    }

    #[test]
    fn test_equality_by_value() {
        let a = AssetNode::new("a1").with_resolver_data(ResolverData::new("r", 1));
        let b = AssetNode::new("a1").with_resolver_data(ResolverData::new("r", 1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_validate_against_format_limits() {
        let dependency = |target: String| Dependency::new(target, "Object", "Asset", Vec::new());

        let ok = ResolverData::new("objects", 1).with_dependencies(vec![dependency("b".into())]);
        assert!(ok.validate().is_ok());

        let long_target = ResolverData::new("objects", 1)
            .with_dependencies(vec![dependency("x".repeat(u16::MAX as usize + 1))]);
        assert!(matches!(
            long_target.validate(),
            Err(ValidationError::StringTooLong { what: "target id", .. })
        ));

        let too_many = ResolverData::new("objects", 1)
            .with_dependencies(vec![dependency("b".into()); u16::MAX as usize + 1]);
        assert!(matches!(
            too_many.validate(),
            Err(ValidationError::TooManyEntries { what: "dependencies", .. })
        ));
    }
}
