// Conftree - Configuration resolution engine
// Copyright (c) 2025 Conftree Contributors
// Licensed under the MIT License

use clap::Parser;
use conftree::cli::{Cli, Commands, EXIT_FATAL};
use conftree::config::LoggingConfig;
use conftree::logging::init_logging;
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Console-only logging for the CLI
    let log_level = cli.log_level.as_deref().unwrap_or("warn");
    let _guard = match init_logging(log_level, &LoggingConfig::default()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(EXIT_FATAL);
        }
    };

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "conftree starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to create SIGTERM handler");
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT (Ctrl+C), shutting down");
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, shutting down");
                }
            }
            let _ = shutdown_tx.send(true);
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Received SIGINT (Ctrl+C), shutting down");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    let exit_code = match execute_command(cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            EXIT_FATAL
        }
    };

    process::exit(exit_code);
}

/// Execute the CLI command
///
/// Synchronous commands run on the blocking pool: the remote key adapter
/// uses a blocking HTTP client.
async fn execute_command(cli: Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    let global = cli.global;
    match cli.command {
        Commands::Watch(args) => args.execute(&global, shutdown_signal).await,
        command => {
            tokio::task::spawn_blocking(move || match command {
                Commands::CreateKey(args) => args.execute(&global),
                Commands::Encrypt(args) => args.execute(&global),
                Commands::Decrypt(args) => args.execute(&global),
                Commands::Validate(args) => args.execute(&global),
                Commands::Get(args) => args.execute(&global),
                Commands::Watch(_) => Ok(EXIT_FATAL),
            })
            .await?
        }
    }
}
