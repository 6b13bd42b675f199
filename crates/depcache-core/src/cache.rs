//! Cache orchestration: staleness detection and incremental rebuilds

use crate::error::Result;
use crate::item::StructuredItem;
use crate::limits::validate_asset_id;
use crate::lookup::DependencyIndex;
use crate::node::{AssetNode, ResolverData};
use crate::path::PathStack;
use crate::source::{ItemSource, ReferenceResolver};
use crate::traversal::{TraversalStats, Traverser};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Named producer of [`ResolverData`]
#[derive(Debug)]
pub struct DependencyResolver {
    id: String,
    traverser: Traverser,
}

impl DependencyResolver {
    pub fn new(id: impl Into<String>, traverser: Traverser) -> Self {
        Self {
            id: id.into(),
            traverser,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn traverser(&self) -> &Traverser {
        &self.traverser
    }

    /// Traverse `item` with a private path stack
    pub fn run(
        &self,
        item: &StructuredItem,
        references: &dyn ReferenceResolver,
        timestamp: i64,
    ) -> (ResolverData, TraversalStats) {
        let mut stack = PathStack::new();
        let outcome = self.traverser.traverse(item, references, &mut stack);
        let data =
            ResolverData::new(self.id.clone(), timestamp).with_dependencies(outcome.dependencies);
        (data, outcome.stats)
    }
}

/// Summary of a cache update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    /// Items present in the source
    pub items: usize,
    /// Items with at least one resolver re-run
    pub rebuilt: usize,
    pub up_to_date: usize,
    /// Nodes dropped because their item disappeared
    pub removed: usize,
    /// Items that could not be read or whose results do not fit the cache
    /// format; their previous data is kept
    pub failed: Vec<String>,
    /// Dependencies produced by this update
    pub dependencies: usize,
    pub stats: TraversalStats,
}

/// One item and the resolvers that must re-run on it
struct Job {
    id: String,
    timestamp: i64,
    resolvers: Vec<usize>,
}

type JobResult = (String, Result<Vec<(ResolverData, TraversalStats)>>);

/// In-memory dependency cache, keyed and ordered by asset id
#[derive(Debug)]
pub struct DependencyCache {
    resolvers: Vec<DependencyResolver>,
    nodes: BTreeMap<String, AssetNode>,
}

impl DependencyCache {
    pub fn new(resolvers: Vec<DependencyResolver>) -> Self {
        Self {
            resolvers,
            nodes: BTreeMap::new(),
        }
    }

    /// Seed the cache with previously persisted nodes
    pub fn with_nodes(mut self, nodes: Vec<AssetNode>) -> Self {
        for node in nodes {
            if let Err(e) = validate_asset_id(&node.asset_id) {
                tracing::warn!("Ignoring cached node: {}", e);
                continue;
            }
            self.nodes.insert(node.asset_id.clone(), node);
        }
        self
    }

    pub fn resolver_ids(&self) -> Vec<&str> {
        self.resolvers.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, asset_id: &str) -> Option<&AssetNode> {
        self.nodes.get(asset_id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &AssetNode> {
        self.nodes.values()
    }

    /// Snapshot for persistence
    pub fn to_vec(&self) -> Vec<AssetNode> {
        self.nodes.values().cloned().collect()
    }

    pub fn into_nodes(self) -> Vec<AssetNode> {
        self.nodes.into_values().collect()
    }

    /// Forward and reverse lookup over the current nodes
    pub fn index(&self) -> DependencyIndex {
        DependencyIndex::build(self.nodes.values())
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    /// Bring the cache up to date with `source`
    ///
    /// Resolver data is recomputed when its timestamp differs from the
    /// item's current one, or for every item when `force` is set. Stale items
    /// are traversed in parallel; results are merged afterwards by this
    /// thread only.
    pub fn update(
        &mut self,
        source: &dyn ItemSource,
        references: &dyn ReferenceResolver,
        force: bool,
    ) -> Result<UpdateReport> {
        let mut report = UpdateReport::default();

        let mut ids = source.item_ids()?;
        ids.sort();
        ids.dedup();
        ids.retain(|id| match validate_asset_id(id) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Skipping item: {}", e);
                false
            }
        });
        report.items = ids.len();

        report.removed = self.prune(&ids);

        let jobs = self.plan(source, &ids, force, &mut report);
        tracing::debug!("{} of {} items need traversal", jobs.len(), ids.len());

        let resolvers = &self.resolvers;
        let results: Vec<JobResult> = jobs
            .par_iter()
            .map(|job| {
                let result = source.load_item(&job.id).map(|item| {
                    if item.id != job.id {
                        tracing::warn!("Item {} reports id {}", job.id, item.id);
                    }
                    job.resolvers
                        .iter()
                        .map(|&i| resolvers[i].run(&item, references, job.timestamp))
                        .collect()
                });
                (job.id.clone(), result)
            })
            .collect();

        for (id, result) in results {
            let datas = match result {
                Ok(datas) => datas,
                Err(e) => {
                    tracing::warn!("Failed to load item {}: {}", id, e);
                    report.failed.push(id);
                    continue;
                }
            };

            if let Some(e) = datas.iter().find_map(|(data, _)| data.validate().err()) {
                tracing::warn!("Keeping previous data of item {}: {}", id, e);
                report.failed.push(id);
                continue;
            }

            let node = self
                .nodes
                .entry(id)
                .or_insert_with_key(|id| AssetNode::new(id.as_str()));
            for (data, stats) in datas {
                report.dependencies += data.dependencies.len();
                report.stats.merge(&stats);
                node.upsert_resolver_data(data);
            }
            report.rebuilt += 1;
        }

        tracing::info!(
            "Cache updated: {} items, {} rebuilt, {} up to date, {} removed, {} failed",
            report.items,
            report.rebuilt,
            report.up_to_date,
            report.removed,
            report.failed.len()
        );

        Ok(report)
    }

    /// Drop nodes for vanished items and data of unregistered resolvers
    fn prune(&mut self, ids: &[String]) -> usize {
        let present: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.nodes.len();
        self.nodes.retain(|id, _| present.contains(id.as_str()));

        let registered: HashSet<&str> = self.resolvers.iter().map(|r| r.id()).collect();
        for node in self.nodes.values_mut() {
            node.retain_resolver_datas(|d| registered.contains(d.resolver_id.as_str()));
        }

        before - self.nodes.len()
    }

    fn plan(
        &self,
        source: &dyn ItemSource,
        ids: &[String],
        force: bool,
        report: &mut UpdateReport,
    ) -> Vec<Job> {
        let mut jobs = Vec::new();

        for id in ids {
            let timestamp = match source.last_modified(id) {
                Ok(t) => t,
                Err(e) => {
                    tracing::warn!("No timestamp for item {}: {}", id, e);
                    report.failed.push(id.clone());
                    continue;
                }
            };

            let node = self.nodes.get(id);
            let stale: Vec<usize> = self
                .resolvers
                .iter()
                .enumerate()
                .filter(|(_, resolver)| {
                    force
                        || node
                            .and_then(|n| n.resolver_data(resolver.id()))
                            .map_or(true, |d| d.is_stale(timestamp))
                })
                .map(|(i, _)| i)
                .collect();

            if stale.is_empty() {
                report.up_to_date += 1;
            } else {
                jobs.push(Job {
                    id: id.clone(),
                    timestamp,
                    resolvers: stale,
                });
            }
        }

        jobs
    }
}
