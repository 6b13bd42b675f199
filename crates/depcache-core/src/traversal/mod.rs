//! Dependency discovery over an item's structured data
//!
//! A [`Traverser`] walks one item depth-first, keeping the route it took on a
//! [`PathStack`], and offers every leaf field to its registered sub-systems.
//! Candidate edges pass through the [`ExclusionPolicy`] before they are kept.
//!
//! The walk visits, in order: the variant hooks, the item's own components,
//! then the object hierarchy (components before children). Fields are
//! visited in declaration order and array elements by index, so repeated
//! traversals of the same revision produce the same edges in the same order.

mod config;
mod localization;
mod object_reference;
mod subsystem;

pub use config::{ExclusionPolicy, Rejection, TraversalConfig};
pub use localization::{LocalizationKeySubSystem, LOCA_KEY_CONNECTION_TYPE, LOCA_KEY_NODE_TYPE};
pub use object_reference::{
    ObjectReferenceSubSystem, ASSET_NODE_TYPE, OBJECT_CONNECTION_TYPE, VARIANT_OF_SEGMENT,
};
pub use subsystem::{DependencyCandidate, FieldVisit, HookContext, TraverserSubSystem};

use crate::dependency::Dependency;
use crate::item::{Component, Field, FieldValue, ItemObject, StructuredItem, VariantRole};
use crate::path::{PathSegment, PathStack};
use crate::source::ReferenceResolver;
use serde::{Deserialize, Serialize};
use subsystem::Collector;

/// Traversal statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraversalStats {
    pub fields_visited: usize,
    pub candidates: usize,
    pub filtered: usize,
    pub cycles_skipped: usize,
    pub depth_limited: usize,
    /// Kept edges whose target is not present in the repository
    pub missing_targets: usize,
    pub max_depth_reached: usize,
}

impl TraversalStats {
    pub fn merge(&mut self, other: &TraversalStats) {
        self.fields_visited += other.fields_visited;
        self.candidates += other.candidates;
        self.filtered += other.filtered;
        self.cycles_skipped += other.cycles_skipped;
        self.depth_limited += other.depth_limited;
        self.missing_targets += other.missing_targets;
        self.max_depth_reached = self.max_depth_reached.max(other.max_depth_reached);
    }
}

/// Result of traversing one item
#[derive(Debug, Clone, Default)]
pub struct TraversalOutcome {
    pub dependencies: Vec<Dependency>,
    pub stats: TraversalStats,
}

/// Walks items and collects their dependencies
pub struct Traverser {
    config: TraversalConfig,
    policy: ExclusionPolicy,
    subsystems: Vec<Box<dyn TraverserSubSystem>>,
}

impl Traverser {
    /// Create a traverser with no sub-systems
    pub fn new(config: TraversalConfig) -> Self {
        if config.max_depth != config.effective_max_depth() {
            tracing::warn!(
                "Traversal depth {} exceeds the maximum, using {}",
                config.max_depth,
                config.effective_max_depth()
            );
        }
        Self {
            policy: ExclusionPolicy::from_config(&config),
            config,
            subsystems: Vec::new(),
        }
    }

    /// Create a traverser with the built-in sub-systems the config asks for
    pub fn with_defaults(config: TraversalConfig) -> Self {
        let localization =
            LocalizationKeySubSystem::new(config.localization_properties.iter().cloned());
        let traverser = Self::new(config).with_subsystem(ObjectReferenceSubSystem::new());
        if localization.is_empty() {
            traverser
        } else {
            traverser.with_subsystem(localization)
        }
    }

    /// Register a sub-system. Sub-systems are queried in registration order.
    pub fn with_subsystem(mut self, subsystem: impl TraverserSubSystem + 'static) -> Self {
        self.subsystems.push(Box::new(subsystem));
        self
    }

    pub fn config(&self) -> &TraversalConfig {
        &self.config
    }

    pub fn subsystem_names(&self) -> Vec<&str> {
        self.subsystems.iter().map(|s| s.name()).collect()
    }

    /// Discover every dependency of `item`
    pub fn build_dependencies(
        &self,
        item: &StructuredItem,
        references: &dyn ReferenceResolver,
    ) -> Vec<Dependency> {
        let mut stack = PathStack::new();
        self.traverse(item, references, &mut stack).dependencies
    }

    /// Traverse `item` using a caller-owned path stack
    ///
    /// The stack is left exactly as it was passed in.
    pub fn traverse(
        &self,
        item: &StructuredItem,
        references: &dyn ReferenceResolver,
        stack: &mut PathStack,
    ) -> TraversalOutcome {
        let mut walk = Walk {
            traverser: self,
            item,
            references,
            max_depth: stack.len() + self.config.effective_max_depth(),
            collector: Collector::new(&item.id, &self.policy),
            active_embedded: Vec::new(),
        };

        walk.run(stack);

        let Walk { collector, .. } = walk;
        tracing::debug!(
            "Traversed {}: {} dependencies ({} fields, {} filtered)",
            item.id,
            collector.dependencies.len(),
            collector.stats.fields_visited,
            collector.stats.filtered
        );

        TraversalOutcome {
            dependencies: collector.dependencies,
            stats: collector.stats,
        }
    }
}

impl std::fmt::Debug for Traverser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Traverser")
            .field("config", &self.config)
            .field("subsystems", &self.subsystem_names())
            .finish()
    }
}

/// State of a single item walk
struct Walk<'a> {
    traverser: &'a Traverser,
    item: &'a StructuredItem,
    references: &'a dyn ReferenceResolver,
    max_depth: usize,
    collector: Collector<'a>,
    /// Embedded objects on the current route
    active_embedded: Vec<usize>,
}

impl<'a> Walk<'a> {
    fn run(&mut self, stack: &mut PathStack) {
        let traverser = self.traverser;
        let item = self.item;

        match &item.variant {
            VariantRole::None => {}
            VariantRole::Root { source } => {
                for subsystem in &traverser.subsystems {
                    let mut cx = HookContext::new(self.references, stack, &mut self.collector);
                    subsystem.traverse_variant_root(item, source.as_deref(), &mut cx);
                }
            }
            VariantRole::VariantOf { base } => {
                for subsystem in &traverser.subsystems {
                    let mut cx = HookContext::new(self.references, stack, &mut self.collector);
                    subsystem.traverse_variant_of(item, base, &mut cx);
                }
            }
        }

        for component in &item.components {
            self.visit_component(component, stack);
        }
        for object in &item.objects {
            self.visit_object(object, stack);
        }
    }

    /// Enter `segment` unless the depth bound is reached
    fn descend(
        &mut self,
        stack: &mut PathStack,
        segment: PathSegment,
        f: impl FnOnce(&mut Self, &mut PathStack),
    ) {
        if stack.len() >= self.max_depth {
            self.collector.stats.depth_limited += 1;
            tracing::debug!(
                "Depth limit {} reached in {} at {}",
                self.max_depth,
                self.item.id,
                segment.name
            );
            return;
        }
        stack.scoped(segment, |stack| {
            self.collector.stats.max_depth_reached =
                self.collector.stats.max_depth_reached.max(stack.len());
            f(self, stack)
        });
    }

    fn visit_object(&mut self, object: &'a ItemObject, stack: &mut PathStack) {
        self.descend(stack, PathSegment::game_object(&object.name), |walk, stack| {
            for component in &object.components {
                walk.visit_component(component, stack);
            }
            for child in &object.children {
                walk.visit_object(child, stack);
            }
        });
    }

    fn visit_component(&mut self, component: &'a Component, stack: &mut PathStack) {
        self.descend(stack, PathSegment::component(&component.type_name), |walk, stack| {
            for field in &component.fields {
                walk.visit_field(&component.type_name, field, "", stack);
            }
        });
    }

    fn visit_field(
        &mut self,
        owner_type: &'a str,
        field: &'a Field,
        prefix: &str,
        stack: &mut PathStack,
    ) {
        let property_path = if prefix.is_empty() {
            field.name.clone()
        } else {
            format!("{}.{}", prefix, field.name)
        };
        self.descend(stack, PathSegment::property(&field.name), |walk, stack| {
            walk.visit_value(owner_type, &field.name, &property_path, &field.value, stack);
        });
    }

    fn visit_value(
        &mut self,
        owner_type: &'a str,
        name: &str,
        property_path: &str,
        value: &'a FieldValue,
        stack: &mut PathStack,
    ) {
        match value {
            FieldValue::Struct(fields) => {
                for field in fields {
                    self.visit_field(owner_type, field, property_path, stack);
                }
            }
            FieldValue::Array(values) => {
                for (i, element) in values.iter().enumerate() {
                    let element_path = format!("{}.Array.data[{}]", property_path, i);
                    self.descend(stack, PathSegment::property(format!("[{}]", i)), |walk, stack| {
                        walk.visit_value(owner_type, name, &element_path, element, stack);
                    });
                }
            }
            FieldValue::Embedded(index) => self.visit_embedded(*index, property_path, stack),
            _ => self.offer(owner_type, name, property_path, value, stack),
        }
    }

    fn visit_embedded(&mut self, index: usize, property_path: &str, stack: &mut PathStack) {
        let item = self.item;
        let Some(embedded) = item.embedded.get(index) else {
            tracing::debug!("Embedded object {} missing in {}", index, item.id);
            return;
        };
        if self.active_embedded.contains(&index) {
            self.collector.stats.cycles_skipped += 1;
            tracing::debug!(
                "Skipping cyclic embedded object {} in {} at {}",
                index,
                item.id,
                property_path
            );
            return;
        }

        self.active_embedded.push(index);
        self.descend(stack, PathSegment::component(&embedded.type_name), |walk, stack| {
            for field in &embedded.fields {
                walk.visit_field(&embedded.type_name, field, property_path, stack);
            }
        });
        self.active_embedded.pop();
    }

    fn offer(
        &mut self,
        owner_type: &str,
        name: &str,
        property_path: &str,
        value: &FieldValue,
        stack: &PathStack,
    ) {
        self.collector.stats.fields_visited += 1;
        let visit = FieldVisit {
            owner_type,
            name,
            property_path,
            kind: value.kind(),
            value,
        };

        let traverser = self.traverser;
        for subsystem in &traverser.subsystems {
            if let Some(candidate) = subsystem.get_dependency(&visit, self.references, stack) {
                self.collector.accept_field(property_path, candidate, stack);
            }
        }
    }
}
