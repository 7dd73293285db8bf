// ABOUTME: Entry point for the rollout CLI application.
// ABOUTME: Parses arguments, sets up tracing and signals, and dispatches to command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use rollout::config::Config;
use rollout::deploy::{CancelHandle, CancelToken};
use rollout::error::Result;
use rollout::output::{Output, OutputMode};
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise the verbose flag picks the level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if cli.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new("warn")
        }
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mode = OutputMode::from_flags(cli.quiet, cli.json);
    let output = Output::new(mode);
    let (handle, cancel) = CancelToken::new();
    tokio::spawn(forward_signals(handle));

    if let Err(e) = run(cli, output, cancel).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: Output, cancel: CancelToken) -> Result<()> {
    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            commands::init(&cwd, force, &output)
        }
        Commands::Deploy { dry_run } => {
            let config = load_config(cli.config.as_deref())?;
            commands::deploy(config, dry_run, output, cancel).await
        }
        Commands::Outputs => {
            let config = load_config(cli.config.as_deref())?;
            commands::outputs(&config, &output).await
        }
    }
}

fn load_config(path: Option<&std::path::Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load(path),
        None => Config::discover(&env::current_dir()?),
    }
}

/// Cancel the run on Ctrl+C or SIGTERM. A second signal exits immediately.
async fn forward_signals(handle: CancelHandle) {
    shutdown_signal().await;
    tracing::warn!("interrupt received, finishing in-flight work");
    handle.cancel();
    shutdown_signal().await;
    std::process::exit(130);
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
