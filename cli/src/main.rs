//! `scout` command line.
//!
//! Loads `scout.toml`, opens the store and runs one index maintenance
//! command against the configured engines.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scout_core::{ChunkProgress, IndexOptions, RedbStore, Scout, ScoutConfig};
use scout_search::build_engines;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;


#[derive(Parser)]
#[command(name = "scout")]
#[command(about = "Keep search indexes in sync with the store")]
#[command(version)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "scout.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import every record of a model into its index
    Import {
        /// Model name as configured under [models]
        model: String,
    },

    /// Remove every record of a model from its index
    Flush { model: String },

    /// Remove a model's records from its index chunk by chunk
    Purge { model: String },

    /// Create an index
    Index {
        name: String,

        /// Primary key of the index documents
        #[arg(short, long)]
        key: Option<String>,
    },

    /// Delete an index
    DeleteIndex { name: String },

    /// Delete every index
    DeleteAllIndexes,

    /// Push configured index settings to the engine
    SyncIndexSettings,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scout=info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let scout = open(&cli.config)?;

    match cli.command {
        Commands::Import { model } => cmd_import(&scout, &model),
        Commands::Flush { model } => cmd_flush(&scout, &model),
        Commands::Purge { model } => cmd_purge(&scout, &model),
        Commands::Index { name, key } => cmd_index(&scout, &name, key),
        Commands::DeleteIndex { name } => cmd_delete_index(&scout, &name),
        Commands::DeleteAllIndexes => cmd_delete_all_indexes(&scout),
        Commands::SyncIndexSettings => cmd_sync_index_settings(&scout),
    }
}

/// Loads the config, falling back to defaults for invalid values, and wires
/// the store and engines. A relative store path is resolved against the
/// config file's directory.
fn open(config_path: &Path) -> Result<Scout> {
    let config = ScoutConfig::load(config_path)
        .with_context(|| format!("Failed to load {}", config_path.display()))?;
    let errors = config.validate();
    let config = if errors.is_empty() {
        config
    } else {
        for error in &errors {
            warn!(config = %config_path.display(), "{error}");
        }
        config.with_defaults_for_invalid()
    };

    let store_path = match config_path.parent() {
        Some(dir) if config.store.path.is_relative() => dir.join(&config.store.path),
        _ => config.store.path.clone(),
    };
    let store = Arc::new(
        RedbStore::open(&store_path)
            .with_context(|| format!("Failed to open store {}", store_path.display()))?,
    );
    info!(store = %store_path.display(), driver = %config.driver, "opened");

    let engines = build_engines(&config, store.clone()).context("Failed to build engines")?;
    Ok(Scout::new(config, store, engines))
}

fn cmd_import(scout: &Scout, name: &str) -> Result<()> {
    let model = scout.model(name)?;
    let mut observer = |progress: &ChunkProgress| {
        println!(
            "Imported [{}] models up to ID: {}",
            progress.model, progress.last_key
        );
    };
    scout.make_all_searchable(&model, &mut observer)?;
    println!("All [{name}] records have been imported.");
    Ok(())
}

fn cmd_flush(scout: &Scout, name: &str) -> Result<()> {
    let model = scout.model(name)?;
    scout.flush(&model)?;
    println!("All [{name}] records have been flushed.");
    Ok(())
}

fn cmd_purge(scout: &Scout, name: &str) -> Result<()> {
    let model = scout.model(name)?;
    let mut observer = |progress: &ChunkProgress| {
        println!(
            "Removed [{}] models up to ID: {}",
            progress.model, progress.last_key
        );
    };
    scout.remove_all_from_search(&model, &mut observer)?;
    println!("All [{name}] records have been removed.");
    Ok(())
}

fn cmd_index(scout: &Scout, name: &str, key: Option<String>) -> Result<()> {
    let options = IndexOptions {
        primary_key: key,
        ..IndexOptions::default()
    };
    scout.create_index(name, &options)?;
    println!("Index [{name}] created successfully.");
    Ok(())
}

fn cmd_delete_index(scout: &Scout, name: &str) -> Result<()> {
    scout.delete_index(name)?;
    println!("Index [{name}] deleted successfully.");
    Ok(())
}

fn cmd_delete_all_indexes(scout: &Scout) -> Result<()> {
    scout.delete_all_indexes()?;
    println!("All indexes deleted successfully.");
    Ok(())
}

fn cmd_sync_index_settings(scout: &Scout) -> Result<()> {
    let synced = scout.sync_index_settings()?;
    if synced.is_empty() {
        println!("No index settings found for the \"{}\" engine.", scout.config().driver);
    }
    for index in synced {
        println!("Settings for the [{index}] index synced successfully.");
    }
    Ok(())
}
