//! Sub-system trait and the context handed to it

use crate::dependency::Dependency;
use crate::item::{FieldKind, FieldValue, StructuredItem};
use crate::path::{PathSegment, PathStack};
use crate::source::{ReferenceResolver, ResolvedReference};
use crate::traversal::config::{ExclusionPolicy, Rejection};
use crate::traversal::TraversalStats;

/// Leaf field offered to sub-systems
#[derive(Debug, Clone, Copy)]
pub struct FieldVisit<'a> {
    /// Type name of the component (or embedded object) declaring the field
    pub owner_type: &'a str,

    /// Declared field name; for array elements, the array's name
    pub name: &'a str,

    /// Full dotted property path, e.g. `m_Items.Array.data[2].m_Icon`
    pub property_path: &'a str,

    pub kind: FieldKind,

    pub value: &'a FieldValue,
}

/// Edge proposed by a sub-system, not yet filtered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyCandidate {
    pub id: String,
    pub connection_type: String,
    pub node_type: String,

    /// Repository path of the target, when it is a file
    pub target_path: Option<String>,

    /// False when the target is referenced but not present in the repository
    pub target_exists: bool,
}

impl DependencyCandidate {
    pub fn new(
        id: impl Into<String>,
        connection_type: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            connection_type: connection_type.into(),
            node_type: node_type.into(),
            target_path: None,
            target_exists: true,
        }
    }

    pub fn with_target_path(mut self, path: impl Into<String>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    /// Candidate pointing at a resolved file reference
    pub fn from_resolved(
        resolved: ResolvedReference,
        connection_type: impl Into<String>,
        node_type: impl Into<String>,
    ) -> Self {
        Self {
            id: resolved.id,
            connection_type: connection_type.into(),
            node_type: node_type.into(),
            target_path: Some(resolved.path),
            target_exists: resolved.exists,
        }
    }

    pub fn target_file_name(&self) -> Option<&str> {
        self.target_path
            .as_deref()
            .map(|p| p.rsplit(['/', '\\']).next().unwrap_or(p))
    }

    fn into_dependency(self, path: Vec<PathSegment>) -> Dependency {
        Dependency::new(self.id, self.connection_type, self.node_type, path)
    }
}

/// A pluggable unit discovering one category of reference
///
/// Sub-systems only read the item. Implementations must be safe to call
/// from several worker threads at once.
pub trait TraverserSubSystem: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Inspect a leaf field. `None` declines: most fields are not references.
    fn get_dependency(
        &self,
        field: &FieldVisit<'_>,
        references: &dyn ReferenceResolver,
        stack: &PathStack,
    ) -> Option<DependencyCandidate>;

    /// Called once for an item that is a base (root) structure
    fn traverse_variant_root(
        &self,
        _item: &StructuredItem,
        _source: Option<&str>,
        _cx: &mut HookContext<'_, '_>,
    ) {
    }

    /// Called once for an item that is a variant of `base`
    fn traverse_variant_of(
        &self,
        _item: &StructuredItem,
        _base: &str,
        _cx: &mut HookContext<'_, '_>,
    ) {
    }
}

/// Accumulates accepted dependencies for one item
#[derive(Debug)]
pub(crate) struct Collector<'p> {
    item_id: &'p str,
    policy: &'p ExclusionPolicy,
    pub(crate) dependencies: Vec<Dependency>,
    pub(crate) stats: TraversalStats,
}

impl<'p> Collector<'p> {
    pub(crate) fn new(item_id: &'p str, policy: &'p ExclusionPolicy) -> Self {
        Self {
            item_id,
            policy,
            dependencies: Vec::new(),
            stats: TraversalStats::default(),
        }
    }

    pub(crate) fn accept_field(
        &mut self,
        property_path: &str,
        candidate: DependencyCandidate,
        stack: &PathStack,
    ) -> bool {
        let verdict = self.policy.check_field(property_path, &candidate);
        self.accept(verdict, candidate, stack)
    }

    pub(crate) fn accept_structural(
        &mut self,
        candidate: DependencyCandidate,
        stack: &PathStack,
    ) -> bool {
        let verdict = self.policy.check_structural(self.item_id, &candidate);
        self.accept(verdict, candidate, stack)
    }

    fn accept(
        &mut self,
        verdict: Result<(), Rejection>,
        candidate: DependencyCandidate,
        stack: &PathStack,
    ) -> bool {
        self.stats.candidates += 1;
        match verdict {
            Ok(()) => {
                if !candidate.target_exists {
                    self.stats.missing_targets += 1;
                    tracing::debug!("{} references missing {}", self.item_id, candidate.id);
                }
                self.dependencies.push(candidate.into_dependency(stack.to_path()));
                true
            }
            Err(rejection) => {
                self.stats.filtered += 1;
                tracing::trace!(
                    "Dropped {} -> {} ({})",
                    self.item_id,
                    candidate.id,
                    rejection
                );
                false
            }
        }
    }
}

/// Context for the variant hooks
///
/// Lets a sub-system enter additional path segments and record structural
/// edges, which are checked for self-references before being kept.
pub struct HookContext<'a, 'p> {
    references: &'a dyn ReferenceResolver,
    stack: &'a mut PathStack,
    collector: &'a mut Collector<'p>,
}

impl<'a, 'p> HookContext<'a, 'p> {
    pub(crate) fn new(
        references: &'a dyn ReferenceResolver,
        stack: &'a mut PathStack,
        collector: &'a mut Collector<'p>,
    ) -> Self {
        Self {
            references,
            stack,
            collector,
        }
    }

    pub fn item_id(&self) -> &str {
        self.collector.item_id
    }

    pub fn references(&self) -> &dyn ReferenceResolver {
        self.references
    }

    pub fn stack(&self) -> &PathStack {
        &*self.stack
    }

    /// Push `segment`, run `f`, then pop the segment
    pub fn scoped<R>(&mut self, segment: PathSegment, f: impl FnOnce(&mut Self) -> R) -> R {
        self.stack.push(segment);
        let result = f(self);
        self.stack.pop();
        result
    }

    /// Record a structural edge at the current path. Returns whether it was kept.
    pub fn add_structural(&mut self, candidate: DependencyCandidate) -> bool {
        self.collector.accept_structural(candidate, &*self.stack)
    }
}
