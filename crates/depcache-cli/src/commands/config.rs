//! `depcache config` subcommands

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use clap::{Args, Subcommand};

use crate::config::Config;
use crate::output::{table, to_json, OutputFormat};
use crate::Cli;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Get a config value
    Get {
        /// Config key name, e.g. traversal.max_depth
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key name
        key: String,
        /// New value; lists are comma-separated
        value: String,
    },
    /// List all config values
    List,
    /// Show config file path
    Path,
    /// Initialize default config file
    Init {
        /// Overwrite existing config
        #[arg(long)]
        force: bool,
    },
}

pub fn run(args: &ConfigArgs, cli: &Cli) -> anyhow::Result<()> {
    let path = cli.config_path();
    match &args.command {
        ConfigCommands::Get { key } => {
            let config = Config::load_from(&path)?;
            let value = config
                .get(key)
                .with_context(|| format!("Available keys: {}", Config::keys().join(", ")))?;
            println!("{}", value.as_deref().unwrap_or("(not set)"));
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load_from(&path)?;
            config.set(key, value)?;
            config.save_to(&path)?;
            tracing::info!("Updated {}", path.display());
            println!("Set {} = {}", key, value);
        }
        ConfigCommands::List => list(&path, cli.output_format())?,
        ConfigCommands::Path => println!("{}", path.display()),
        ConfigCommands::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "Config file already exists at {}. Use --force to overwrite.",
                    path.display()
                );
            }
            Config::default().save_to(&path)?;
            println!("Created config file at {}", path.display());
        }
    }
    Ok(())
}

fn list(path: &Path, format: OutputFormat) -> anyhow::Result<()> {
    let config = Config::load_from(path)?;
    let mut values = BTreeMap::new();
    for key in Config::keys() {
        values.insert(*key, config.get(key)?);
    }

    if format == OutputFormat::Json {
        println!("{}", to_json(&values)?);
        return Ok(());
    }

    println!("Config file: {}", path.display());
    let rows: Vec<Vec<String>> = values
        .into_iter()
        .map(|(key, value)| vec![key.to_string(), value.unwrap_or_else(|| "(not set)".to_string())])
        .collect();
    println!("{}", table(&["KEY", "VALUE"], &rows));
    Ok(())
}
