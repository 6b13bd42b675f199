//! Traversal configuration and exclusion policy

use crate::limits::{DEFAULT_TRAVERSAL_DEPTH, MAX_TRAVERSAL_DEPTH};
use crate::traversal::DependencyCandidate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Configuration for a traverser
///
/// Every field has a default, so partial TOML tables deserialize cleanly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalConfig {
    /// Property paths whose references are never dependencies
    pub excluded_properties: BTreeSet<String>,

    /// File names of targets that are never dependencies
    pub excluded_targets: BTreeSet<String>,

    /// Ids starting with this prefix denote engine-internal objects
    pub internal_id_prefix: String,

    /// Maximum number of path segments the walk may enter
    pub max_depth: usize,

    /// Property names holding localization keys
    pub localization_properties: BTreeSet<String>,
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            // Every overridden object points back at its source; not a real dependency
            excluded_properties: ["m_CorrespondingSourceObject"]
                .into_iter()
                .map(String::from)
                .collect(),
            excluded_targets: ["UnityEngine.UI.dll", "UnityEngine.dll"]
                .into_iter()
                .map(String::from)
                .collect(),
            internal_id_prefix: "000000".to_string(),
            max_depth: DEFAULT_TRAVERSAL_DEPTH,
            localization_properties: BTreeSet::new(),
        }
    }
}

impl TraversalConfig {
    pub fn exclude_property(mut self, property_path: impl Into<String>) -> Self {
        self.excluded_properties.insert(property_path.into());
        self
    }

    pub fn exclude_target(mut self, file_name: impl Into<String>) -> Self {
        self.excluded_targets.insert(file_name.into());
        self
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_localization_property(mut self, name: impl Into<String>) -> Self {
        self.localization_properties.insert(name.into());
        self
    }

    /// Depth actually used by the walk
    pub fn effective_max_depth(&self) -> usize {
        self.max_depth.min(MAX_TRAVERSAL_DEPTH)
    }
}

/// Why a candidate edge was dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ExcludedProperty,
    ExcludedTarget,
    InternalTarget,
    SelfReference,
    EmptyTarget,
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ExcludedProperty => "excluded property",
            Self::ExcludedTarget => "excluded target",
            Self::InternalTarget => "internal target",
            Self::SelfReference => "self reference",
            Self::EmptyTarget => "empty target",
        };
        write!(f, "{}", s)
    }
}

/// Filter applied to every candidate edge before it is accepted
#[derive(Debug, Clone)]
pub struct ExclusionPolicy {
    excluded_properties: HashSet<String>,
    excluded_targets: HashSet<String>,
    internal_id_prefix: String,
}

impl ExclusionPolicy {
    pub fn from_config(config: &TraversalConfig) -> Self {
        Self {
            excluded_properties: config.excluded_properties.iter().cloned().collect(),
            excluded_targets: config.excluded_targets.iter().cloned().collect(),
            internal_id_prefix: config.internal_id_prefix.clone(),
        }
    }

    /// Check a candidate discovered on the field at `property_path`
    pub fn check_field(
        &self,
        property_path: &str,
        candidate: &DependencyCandidate,
    ) -> Result<(), Rejection> {
        if self.excluded_properties.contains(property_path) {
            return Err(Rejection::ExcludedProperty);
        }
        self.check_target(candidate)
    }

    /// Check a structural (variant) candidate of the item `source_id`
    pub fn check_structural(
        &self,
        source_id: &str,
        candidate: &DependencyCandidate,
    ) -> Result<(), Rejection> {
        self.check_target(candidate)?;
        if candidate.id == source_id {
            return Err(Rejection::SelfReference);
        }
        Ok(())
    }

    fn check_target(&self, candidate: &DependencyCandidate) -> Result<(), Rejection> {
        if candidate.id.is_empty() {
            return Err(Rejection::EmptyTarget);
        }
        if let Some(file_name) = candidate.target_file_name() {
            if self.excluded_targets.contains(file_name) {
                return Err(Rejection::ExcludedTarget);
            }
        }
        if !self.internal_id_prefix.is_empty() && candidate.id.starts_with(&self.internal_id_prefix)
        {
            return Err(Rejection::InternalTarget);
        }
        Ok(())
    }
}

impl Default for ExclusionPolicy {
    fn default() -> Self {
        Self::from_config(&TraversalConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str, path: &str) -> DependencyCandidate {
        DependencyCandidate::new(id, "Object", "Asset").with_target_path(path)
    }

    #[test]
    fn test_default_config() {
        let config = TraversalConfig::default();
        assert!(config.excluded_properties.contains("m_CorrespondingSourceObject"));
        assert!(config.excluded_targets.contains("UnityEngine.dll"));
        assert_eq!(config.internal_id_prefix, "000000");
        assert_eq!(config.max_depth, DEFAULT_TRAVERSAL_DEPTH);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: TraversalConfig = serde_json::from_str(r#"{"max_depth": 8}"#).unwrap();
        assert_eq!(config.max_depth, 8);
        assert_eq!(config.internal_id_prefix, "000000");
    }

    #[test]
    fn test_effective_depth_is_capped() {
        let config = TraversalConfig::default().with_max_depth(usize::MAX);
        assert_eq!(config.effective_max_depth(), MAX_TRAVERSAL_DEPTH);
    }

    #[test]
    fn test_field_rules() {
        let policy = ExclusionPolicy::default();

        assert_eq!(
            policy.check_field("m_CorrespondingSourceObject", &asset("b2", "Assets/B.prefab")),
            Err(Rejection::ExcludedProperty)
        );
        assert_eq!(
            policy.check_field("m_Script", &asset("b2", "Library/UnityEngine.dll")),
            Err(Rejection::ExcludedTarget)
        );
        assert_eq!(
            policy.check_field(
                "m_Mesh",
                &asset("0000000000000000f000000000000000", "Resources/builtin")
            ),
            Err(Rejection::InternalTarget)
        );
        assert_eq!(
            policy.check_field("m_Mesh", &asset("", "Assets/B.prefab")),
            Err(Rejection::EmptyTarget)
        );
        assert!(policy.check_field("m_Mesh", &asset("b2", "Assets/B.fbx")).is_ok());
    }

    #[test]
    fn test_self_reference_only_rejected_for_structural() {
        let policy = ExclusionPolicy::default();
        let candidate = asset("a1", "Assets/A.prefab");

        assert!(policy.check_field("m_Self", &candidate).is_ok());
        assert_eq!(
            policy.check_structural("a1", &candidate),
            Err(Rejection::SelfReference)
        );
        assert!(policy.check_structural("a2", &candidate).is_ok());
    }

    #[test]
    fn test_empty_prefix_disables_internal_rule() {
        let config = TraversalConfig {
            internal_id_prefix: String::new(),
            ..Default::default()
        };
        let policy = ExclusionPolicy::from_config(&config);
        assert!(policy.check_field("m_Mesh", &asset("000000ff", "Assets/B.fbx")).is_ok());
    }
}
