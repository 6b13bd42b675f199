//! Depcache Core - Dependency graph model and traversal
//!
//! This crate provides the data types describing resolved dependency edges,
//! the traversal framework that discovers them inside an item's structured
//! data, and the cache orchestrator that keeps them up to date.

pub mod cache;
pub mod dependency;
pub mod error;
pub mod item;
pub mod limits;
pub mod lookup;
pub mod node;
pub mod path;
pub mod source;
pub mod traversal;

pub use cache::{DependencyCache, DependencyResolver, UpdateReport};
pub use dependency::Dependency;
pub use error::{Error, Result};
pub use item::{Component, Field, FieldKind, FieldValue, ItemObject, StructuredItem, VariantRole};
pub use lookup::{
    DependencyChain, DependencyIndex, Direction, Edge, LookupResult, LookupStats, ResolvedNode,
};
pub use node::{AssetNode, ResolverData};
pub use path::{PathSegment, PathSegmentKind, PathStack};
pub use source::{ItemSource, ReferenceResolver, ResolvedReference};
pub use traversal::{
    DependencyCandidate, ExclusionPolicy, FieldVisit, HookContext, LocalizationKeySubSystem,
    ObjectReferenceSubSystem, Rejection, TraversalConfig, TraversalOutcome, TraversalStats,
    Traverser, TraverserSubSystem,
};
