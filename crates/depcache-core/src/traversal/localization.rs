//! Localization keys stored in string fields

use crate::item::FieldKind;
use crate::path::PathStack;
use crate::source::ReferenceResolver;
use crate::traversal::subsystem::{DependencyCandidate, FieldVisit, TraverserSubSystem};
use std::collections::HashSet;

pub const LOCA_KEY_CONNECTION_TYPE: &str = "LocaKey";
pub const LOCA_KEY_NODE_TYPE: &str = "LocaKey";

/// Treats string fields with configured names as references to
/// localization keys. The key itself is the target id.
#[derive(Debug, Clone, Default)]
pub struct LocalizationKeySubSystem {
    properties: HashSet<String>,
}

impl LocalizationKeySubSystem {
    pub fn new(properties: impl IntoIterator<Item = String>) -> Self {
        Self {
            properties: properties.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl TraverserSubSystem for LocalizationKeySubSystem {
    fn name(&self) -> &str {
        "localization-key"
    }

    fn get_dependency(
        &self,
        field: &FieldVisit<'_>,
        _references: &dyn ReferenceResolver,
        _stack: &PathStack,
    ) -> Option<DependencyCandidate> {
        if field.kind != FieldKind::String || !self.properties.contains(field.name) {
            return None;
        }
        let key = field.value.as_str()?.trim();
        if key.is_empty() {
            return None;
        }
        Some(DependencyCandidate::new(
            key,
            LOCA_KEY_CONNECTION_TYPE,
            LOCA_KEY_NODE_TYPE,
        ))
    }
}
