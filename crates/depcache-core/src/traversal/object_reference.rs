//! Direct object references between items

use crate::item::{FieldKind, StructuredItem};
use crate::path::{PathSegment, PathStack};
use crate::source::ReferenceResolver;
use crate::traversal::subsystem::{
    DependencyCandidate, FieldVisit, HookContext, TraverserSubSystem,
};

pub const OBJECT_CONNECTION_TYPE: &str = "Object";
pub const ASSET_NODE_TYPE: &str = "Asset";

/// Segment entered before recording the base of a variant
pub const VARIANT_OF_SEGMENT: &str = "Variant Of";

/// Finds object reference fields and variant/source relationships
#[derive(Debug, Clone, Default)]
pub struct ObjectReferenceSubSystem;

impl ObjectReferenceSubSystem {
    pub fn new() -> Self {
        Self
    }

    fn candidate(
        &self,
        handle: &str,
        references: &dyn ReferenceResolver,
    ) -> Option<DependencyCandidate> {
        let resolved = references.resolve(handle)?;
        if resolved.path.is_empty() || resolved.id.is_empty() {
            return None;
        }
        Some(DependencyCandidate::from_resolved(
            resolved,
            OBJECT_CONNECTION_TYPE,
            ASSET_NODE_TYPE,
        ))
    }

    fn add_source(&self, handle: &str, cx: &mut HookContext<'_, '_>) {
        if let Some(candidate) = self.candidate(handle, cx.references()) {
            cx.add_structural(candidate);
        }
    }
}

impl TraverserSubSystem for ObjectReferenceSubSystem {
    fn name(&self) -> &str {
        "object-reference"
    }

    fn get_dependency(
        &self,
        field: &FieldVisit<'_>,
        references: &dyn ReferenceResolver,
        _stack: &PathStack,
    ) -> Option<DependencyCandidate> {
        if field.kind != FieldKind::ObjectReference {
            return None;
        }
        let handle = field.value.as_reference()?;
        self.candidate(handle, references)
    }

    fn traverse_variant_root(
        &self,
        _item: &StructuredItem,
        source: Option<&str>,
        cx: &mut HookContext<'_, '_>,
    ) {
        if let Some(source) = source {
            self.add_source(source, cx);
        }
    }

    fn traverse_variant_of(
        &self,
        _item: &StructuredItem,
        base: &str,
        cx: &mut HookContext<'_, '_>,
    ) {
        cx.scoped(PathSegment::component(VARIANT_OF_SEGMENT), |cx| {
            self.add_source(base, cx);
        });
    }
}
