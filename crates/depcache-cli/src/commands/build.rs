//! Build and clear commands

use clap::Args;
use serde::Serialize;

use crate::output::{to_json, OutputFormat};
use crate::{AppContext, Cli};
use depcache_core::UpdateReport;
use depcache_storage::CacheStore;

#[derive(Args)]
pub struct BuildArgs {
    /// Rebuild every item, ignoring timestamps
    #[arg(long)]
    pub force: bool,
}

#[derive(Serialize)]
struct BuildOutput<'a> {
    cache: String,
    nodes: usize,
    report: &'a UpdateReport,
}

pub async fn run(args: &BuildArgs, cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    let repository = ctx.repository(cli)?;
    let mut cache = ctx.load_cache().await?;
    tracing::info!(
        "Building cache from {} ({} cached nodes)",
        repository.root().display(),
        cache.len()
    );

    let force = args.force;
    let (cache, report) = tokio::task::spawn_blocking(move || {
        cache
            .update(&repository, &repository, force)
            .map(|report| (cache, report))
    })
    .await??;

    ctx.store.save(&cache.to_vec()).await?;

    if cli.output_format() == OutputFormat::Json {
        let out = BuildOutput {
            cache: ctx.store.location(),
            nodes: cache.len(),
            report: &report,
        };
        println!("{}", to_json(&out)?);
        return Ok(());
    }

    if cli.quiet {
        return Ok(());
    }

    println!("Cache written to {}", ctx.store.location());
    println!(
        "  {} items: {} rebuilt, {} up to date, {} removed",
        report.items, report.rebuilt, report.up_to_date, report.removed
    );
    println!(
        "  {} dependencies found ({} fields visited, {} filtered)",
        report.dependencies, report.stats.fields_visited, report.stats.filtered
    );
    if report.stats.cycles_skipped > 0 || report.stats.depth_limited > 0 {
        println!(
            "  {} cyclic references skipped, {} paths cut at the depth limit",
            report.stats.cycles_skipped, report.stats.depth_limited
        );
    }
    if report.stats.missing_targets > 0 {
        println!(
            "  {} references to items missing from the repository",
            report.stats.missing_targets
        );
    }
    if !report.failed.is_empty() {
        println!("  {} items failed, previous data kept:", report.failed.len());
        for id in &report.failed {
            println!("    {}", id);
        }
    }

    Ok(())
}

pub async fn run_clear(cli: &Cli, ctx: &AppContext) -> anyhow::Result<()> {
    ctx.store.clear().await?;
    tracing::info!("Cleared cache at {}", ctx.store.location());
    if !cli.quiet {
        println!("Cleared cache at {}", ctx.store.location());
    }
    Ok(())
}
