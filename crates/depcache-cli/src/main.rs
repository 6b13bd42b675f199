//! Depcache CLI - Build and query dependency caches

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod config;
mod output;
mod repository;

use commands::{build, completions, query, stats};
use config::{config_file_path, default_cache_dir, Config};
use depcache_core::{
    DependencyCache, DependencyResolver, LocalizationKeySubSystem, ObjectReferenceSubSystem,
    Traverser,
};
use depcache_storage::{CacheStore, FileCacheStore};
use output::OutputFormat;
use repository::JsonRepository;

/// Resolver recording references between items
pub const OBJECT_RESOLVER: &str = "objects";
/// Resolver recording localization keys used by items
pub const LOCALIZATION_RESOLVER: &str = "localization";

#[derive(Parser)]
#[command(name = "depcache")]
#[command(author, version, about = "Dependency cache for structured content repositories")]
pub struct Cli {
    /// Config file
    #[arg(long, global = true, env = "DEPCACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Item repository root
    #[arg(short, long, global = true)]
    pub repository: Option<PathBuf>,

    /// Output format: table, json
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn config_path(&self) -> PathBuf {
        config_file_path(self.config.as_deref())
    }

    pub fn output_format(&self) -> OutputFormat {
        OutputFormat::from(self.format.as_str())
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build or refresh the cache from the repository
    Build(build::BuildArgs),
    /// Show what an item depends on
    Deps(query::DepsArgs),
    /// Show what depends on an item
    Dependents(query::DepsArgs),
    /// Show cached data of a node
    Show(query::ShowArgs),
    /// Find a dependency chain between two items
    Path(query::PathArgs),
    /// Show cache statistics
    Stats,
    /// Delete the cache
    Clear,
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Application context with config and cache store
pub struct AppContext {
    pub config: Config,
    pub store: FileCacheStore,
}

impl AppContext {
    pub fn new(cli: &Cli) -> anyhow::Result<Self> {
        let config = Config::load_from(&cli.config_path())?;

        let cache_dir = cli
            .cache_dir
            .clone()
            .or_else(|| config.cache_dir.clone())
            .unwrap_or_else(default_cache_dir);
        tracing::debug!("Using cache directory: {}", cache_dir.display());

        Ok(Self {
            store: FileCacheStore::new(cache_dir),
            config,
        })
    }

    /// Repository from the command line or config
    pub fn repository(&self, cli: &Cli) -> anyhow::Result<JsonRepository> {
        let root = cli
            .repository
            .clone()
            .or_else(|| self.config.repository.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "No repository given. Pass --repository or set it with \
                     `depcache config set repository <dir>`"
                )
            })?;
        Ok(JsonRepository::new(root))
    }

    /// Resolvers configured for this run
    pub fn resolvers(&self) -> Vec<DependencyResolver> {
        let traversal = &self.config.traversal;
        let mut resolvers = vec![DependencyResolver::new(
            OBJECT_RESOLVER,
            Traverser::new(traversal.clone()).with_subsystem(ObjectReferenceSubSystem::new()),
        )];

        let keys = LocalizationKeySubSystem::new(traversal.localization_properties.iter().cloned());
        if !keys.is_empty() {
            resolvers.push(DependencyResolver::new(
                LOCALIZATION_RESOLVER,
                Traverser::new(traversal.clone()).with_subsystem(keys),
            ));
        }
        resolvers
    }

    /// Cache seeded from the store
    pub async fn load_cache(&self) -> anyhow::Result<DependencyCache> {
        let nodes = self.store.load().await?;
        Ok(DependencyCache::new(self.resolvers()).with_nodes(nodes))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .init();

    tracing::debug!("Starting depcache CLI");

    match &cli.command {
        Commands::Config(args) => return commands::config::run(args, &cli),
        Commands::Completions(args) => return completions::run(args),
        _ => {}
    }

    let ctx = AppContext::new(&cli)?;

    match &cli.command {
        Commands::Build(args) => build::run(args, &cli, &ctx).await?,
        Commands::Deps(args) => query::run_deps(args, &cli, &ctx, false).await?,
        Commands::Dependents(args) => query::run_deps(args, &cli, &ctx, true).await?,
        Commands::Show(args) => query::run_show(args, &cli, &ctx).await?,
        Commands::Path(args) => query::run_path(args, &cli, &ctx).await?,
        Commands::Stats => stats::run(&cli, &ctx).await?,
        Commands::Clear => build::run_clear(&cli, &ctx).await?,
        Commands::Config(_) | Commands::Completions(_) => {}
    }

    Ok(())
}
