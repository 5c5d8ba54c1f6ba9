mod cli;
mod commands;
mod config;
mod error;
mod output;
mod setup;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use mnemo_core::MemoryManager;
use mnemo_storage::paths;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error::handle_error(err);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = config::CliConfig::load();
    config.apply_api_key_env();

    // Logs go to a file so they never interleave with chat output.
    let log_dir = paths::ensure_mnemo_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir).ok();

    let file_appender = tracing_appender::rolling::daily(log_dir, "mnemo.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .init();

    let db_path = setup::resolve_db_path(cli.db_path, &config)?;
    let format = cli.format;
    info!(path = %db_path.display(), "Using memory database");

    match cli.command {
        Commands::Chat(args) => {
            let llm = setup::build_llm(&config, args.model.as_deref())?;
            let manager = setup::prepare_manager(&config, &db_path, llm.clone())?;
            let result = commands::chat::run(&manager, llm, args).await;
            shutdown(manager, result).await
        }
        Commands::Memory { command } => {
            let manager = setup::prepare_admin_manager(&config, &db_path)?;
            let result = commands::memory::run(&manager, command, format).await;
            shutdown(manager, result).await
        }
        Commands::Summary { command } => {
            let manager = setup::prepare_admin_manager(&config, &db_path)?;
            let result = commands::summary::run(&manager, command, format).await;
            shutdown(manager, result).await
        }
        Commands::Messages { command } => {
            let manager = setup::prepare_admin_manager(&config, &db_path)?;
            let result = commands::messages::run(&manager, command, format).await;
            shutdown(manager, result).await
        }
    }
}

/// Close the manager, draining queued background work, even when the command failed.
async fn shutdown(manager: MemoryManager, result: Result<()>) -> Result<()> {
    manager.close().await?;
    result
}
