use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use notes_sync::cli::args::{Cli, Commands};
use notes_sync::cli::commands;
use notes_sync::config::Config;
use notes_sync::connectivity::{initial_signal, ConnectivityMonitor, ConnectivityProbe};
use notes_sync::logging;
use notes_sync::storage::Database;
use notes_sync::sync::{HttpRemoteStore, RemoteStore, SyncService};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("{}: {:#}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let config = Config::load().context("loading configuration")?;
    let format = cli.output.unwrap_or(config.general.default_output);

    let db = Database::open().await?;
    let remote: Arc<dyn RemoteStore> = Arc::new(HttpRemoteStore::from_config(&config.remote)?);
    let probe = ConnectivityProbe::from_config(&config)?;

    let signal = if cli.offline {
        Some(false)
    } else {
        initial_signal(&config, &probe).await
    };
    let monitor = ConnectivityMonitor::new(signal);
    let service = SyncService::start(db, remote, monitor, &config.sync).await?;

    let output = match cli.command {
        Commands::Submit { profile, note } => {
            commands::submit(&service, &profile, &note, format).await?
        },
        Commands::Status => commands::status(&service, format).await?,
        Commands::List { status } => commands::list(&service, status.map(Into::into), format).await?,
        Commands::Sync => commands::sync(&service, format).await?,
        Commands::Retry => commands::retry(&service, format).await?,
        Commands::Clear { force, completed } => {
            commands::clear(&service, force, completed, format).await?
        },
        Commands::Watch => {
            if cli.offline {
                anyhow::bail!("watch probes connectivity itself; drop --offline");
            }
            let interval = config.connectivity.probe_interval();
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "could not listen for Ctrl-C");
                    std::future::pending::<()>().await;
                }
            };
            commands::watch(&service, probe, interval, shutdown, format).await?
        },
    };

    if !output.is_empty() {
        println!("{output}");
    }
    Ok(())
}
