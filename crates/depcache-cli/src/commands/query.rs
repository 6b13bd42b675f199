//! Cache query commands

use clap::Args;
use serde::Serialize;

use crate::output::{format_timestamp, table, to_json, OutputFormat};
use crate::{AppContext, Cli};
use depcache_core::{AssetNode, DependencyIndex, Direction, Edge, ResolvedNode, ResolverData};
use depcache_storage::CacheStore;

#[derive(Args)]
pub struct DepsArgs {
    /// Item id
    pub id: String,

    /// Follow edges transitively up to this depth
    #[arg(short, long, default_value = "1")]
    pub depth: usize,
}

#[derive(Args)]
pub struct ShowArgs {
    /// Node id
    pub id: String,
}

#[derive(Args)]
pub struct PathArgs {
    /// Item the chain starts at
    pub from: String,

    /// Node the chain ends at
    pub to: String,

    /// Maximum chain length
    #[arg(long, default_value = "10")]
    pub max_depth: usize,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    #[serde(flatten)]
    node: ResolvedNode,
    resolver_datas: &'a [ResolverData],
    dependents: usize,
}

/// Cached nodes and their index, or `None` when nothing is cached
async fn load(ctx: &AppContext) -> anyhow::Result<Option<(Vec<AssetNode>, DependencyIndex)>> {
    let nodes = ctx.store.load().await?;
    if nodes.is_empty() {
        eprintln!("Cache is empty. Run `depcache build` first.");
        return Ok(None);
    }
    let index = DependencyIndex::build(&nodes);
    Ok(Some((nodes, index)))
}

fn edge_rows(edges: &[&Edge], incoming: bool) -> Vec<Vec<String>> {
    edges
        .iter()
        .map(|e| {
            vec![
                if incoming { e.source.clone() } else { e.target.clone() },
                e.connection_type.clone(),
                e.target_node_type.clone(),
                e.resolver_id.clone(),
                e.path_display(),
            ]
        })
        .collect()
}

pub async fn run_deps(
    args: &DepsArgs,
    cli: &Cli,
    ctx: &AppContext,
    incoming: bool,
) -> anyhow::Result<()> {
    let Some((_, index)) = load(ctx).await? else {
        return Ok(());
    };
    if !index.contains(&args.id) {
        anyhow::bail!("'{}' is not in the cache", args.id);
    }

    let direction = if incoming {
        Direction::Incoming
    } else {
        Direction::Outgoing
    };
    tracing::debug!("Looking up {} of {} (depth {})", direction, args.id, args.depth);

    if args.depth <= 1 {
        let edges = if incoming {
            index.dependents_of(&args.id)
        } else {
            index.dependencies_of(&args.id)
        };

        if cli.output_format() == OutputFormat::Json {
            println!("{}", to_json(&edges)?);
            return Ok(());
        }

        let label = if incoming { "Dependents" } else { "Dependencies" };
        if edges.is_empty() {
            println!("{} of '{}': (none)", label, args.id);
            return Ok(());
        }
        println!("{} of '{}' ({}):", label, args.id, edges.len());
        let first = if incoming { "SOURCE" } else { "TARGET" };
        let headers = [first, "CONNECTION", "NODE TYPE", "RESOLVER", "PATH"];
        println!("{}", table(&headers, &edge_rows(&edges, incoming)));
        return Ok(());
    }

    let result = index.transitive(&args.id, direction, args.depth);

    if cli.output_format() == OutputFormat::Json {
        println!("{}", to_json(&result)?);
        return Ok(());
    }

    println!(
        "Transitive {} of '{}' (depth: {}): {} found",
        direction,
        args.id,
        args.depth,
        result.visited.len()
    );
    let rows: Vec<Vec<String>> = result
        .visited
        .iter()
        .filter_map(|id| index.resolve_node(id))
        .map(|n| {
            vec![
                n.id,
                n.node_type,
                if n.existing { String::new() } else { "missing".to_string() },
            ]
        })
        .collect();
    if !rows.is_empty() {
        println!("{}", table(&["ID", "NODE TYPE", "STATUS"], &rows));
    }
    println!(
        "  Visited {} nodes, traversed {} edges",
        result.stats.nodes_visited, result.stats.edges_traversed
    );
    Ok(())
}

pub async fn run_show(args: &ShowArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let Some((nodes, index)) = load(ctx).await? else {
        return Ok(());
    };
    let Some(resolved) = index.resolve_node(&args.id) else {
        anyhow::bail!("'{}' is not in the cache", args.id);
    };

    let datas = nodes
        .iter()
        .find(|n| n.asset_id == args.id)
        .map(|n| n.resolver_datas.as_slice())
        .unwrap_or_default();
    let dependents = index.dependents_of(&args.id).len();

    if cli.output_format() == OutputFormat::Json {
        let out = ShowOutput {
            node: resolved,
            resolver_datas: datas,
            dependents,
        };
        println!("{}", to_json(&out)?);
        return Ok(());
    }

    println!("{}", resolved.id);
    println!("  type: {}", resolved.node_type);
    if !resolved.existing {
        println!("  status: missing (referenced, but no longer in the repository)");
    }
    println!("  dependents: {}", dependents);

    if datas.is_empty() {
        println!("  (no resolver data)");
    } else {
        let rows: Vec<Vec<String>> = datas
            .iter()
            .map(|d| {
                vec![
                    d.resolver_id.clone(),
                    format_timestamp(d.timestamp),
                    d.dependencies.len().to_string(),
                ]
            })
            .collect();
        println!("{}", table(&["RESOLVER", "MODIFIED", "DEPENDENCIES"], &rows));
    }
    Ok(())
}

pub async fn run_path(args: &PathArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let Some((_, index)) = load(ctx).await? else {
        return Ok(());
    };

    tracing::info!(
        "Finding chain from {} to {} (max_depth: {})",
        args.from,
        args.to,
        args.max_depth
    );
    let result = index.find_chain(&args.from, &args.to, args.max_depth);

    if cli.output_format() == OutputFormat::Json {
        println!("{}", to_json(&result)?);
        return Ok(());
    }

    match &result.chain {
        None => {
            println!("No dependency chain from '{}' to '{}'", args.from, args.to);
            println!(
                "  (searched {} nodes, {} edges)",
                result.stats.nodes_visited, result.stats.edges_traversed
            );
        }
        Some(chain) => {
            println!("Chain from '{}' to '{}' ({} hops):", args.from, args.to, chain.len());
            println!("  Route: {}", chain.nodes.join(" -> "));
            for edge in &chain.edges {
                println!(
                    "    {} -[{}]-> {}  via {}",
                    edge.source,
                    edge.connection_type,
                    edge.target,
                    edge.path_display()
                );
            }
        }
    }
    Ok(())
}
