use anyhow::{Context, Result};
use clap::Parser;
use huddle_core::config::Config;
use huddle_core::logging::{init_logging_with_config, LogConfig};
use huddle_core::{metrics, SqlStore};
use std::path::PathBuf;
use tracing::{debug, info};

mod commands;

use commands::Command;

#[derive(Parser, Debug)]
#[command(name = "huddle")]
#[command(author, version, about = "Users, chats and access-controlled events", long_about = None)]
struct Args {
    /// TOML configuration file (defaults to HUDDLE_* environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// SQLite database file, overriding the configuration
    #[arg(short, long, global = true)]
    database: Option<String>,

    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Enable JSON formatted logging
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };

    if let Some(database) = &args.database {
        config.store.database_path = PathBuf::from(shellexpand::tilde(database).as_ref());
    }
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.json_format = true;
    }

    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    init_logging_with_config(LogConfig::try_from(&config.logging)?)?;
    metrics::init_metrics();

    debug!(database = %config.store.database_path.display(), "huddle starting");

    let store = SqlStore::open(&config.store).with_context(|| {
        format!(
            "opening database {}",
            config.store.database_path.display()
        )
    })?;

    let output = commands::run(args.command, store, &config)?;
    println!("{}", serde_json::to_string_pretty(&output)?);

    info!("huddle finished");
    Ok(())
}
