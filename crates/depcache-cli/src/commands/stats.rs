//! Cache statistics command

use std::collections::BTreeMap;

use serde::Serialize;

use crate::output::{table, to_json, OutputFormat};
use crate::{AppContext, Cli};
use depcache_core::DependencyIndex;
use depcache_storage::CacheStore;

#[derive(Debug, Default, Serialize)]
struct CacheStats {
    location: String,
    exists: bool,
    size_bytes: u64,
    nodes: usize,
    edges: usize,
    /// Edge targets with no node of their own
    missing_targets: usize,
    resolvers: BTreeMap<String, usize>,
    connection_types: BTreeMap<String, usize>,
}

pub async fn run(cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let mut stats = CacheStats {
        location: ctx.store.location(),
        exists: ctx.store.exists().await?,
        ..Default::default()
    };

    if stats.exists {
        stats.size_bytes = tokio::fs::metadata(ctx.store.path()).await?.len();
        let nodes = ctx.store.load().await?;
        let index = DependencyIndex::build(&nodes);

        stats.nodes = index.node_count();
        stats.edges = index.edge_count();
        for node in &nodes {
            for data in &node.resolver_datas {
                let count = stats.resolvers.entry(data.resolver_id.clone()).or_default();
                *count += data.dependencies.len();
            }
        }
        let mut targets: Vec<&str> = Vec::new();
        for edge in index.edges() {
            *stats.connection_types.entry(edge.connection_type.clone()).or_default() += 1;
            targets.push(&edge.target);
        }
        targets.sort_unstable();
        targets.dedup();
        stats.missing_targets = targets
            .into_iter()
            .filter_map(|t| index.resolve_node(t))
            .filter(|n| !n.existing)
            .count();
    }

    if cli.output_format() == OutputFormat::Json {
        println!("{}", to_json(&stats)?);
        return Ok(());
    }

    println!("Cache: {}", stats.location);
    if !stats.exists {
        println!("  (not built)");
        return Ok(());
    }
    println!("  size: {} bytes", stats.size_bytes);
    println!("  nodes: {}", stats.nodes);
    println!("  dependencies: {}", stats.edges);
    println!("  missing targets: {}", stats.missing_targets);

    if !stats.resolvers.is_empty() {
        let rows: Vec<Vec<String>> = stats
            .resolvers
            .iter()
            .map(|(id, count)| vec![id.clone(), count.to_string()])
            .collect();
        println!();
        println!("{}", table(&["RESOLVER", "DEPENDENCIES"], &rows));
    }
    if !stats.connection_types.is_empty() {
        let rows: Vec<Vec<String>> = stats
            .connection_types
            .iter()
            .map(|(kind, count)| vec![kind.clone(), count.to_string()])
            .collect();
        println!();
        println!("{}", table(&["CONNECTION", "COUNT"], &rows));
    }
    Ok(())
}
