// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use walletgate::api;
use walletgate::config::{Config, LogFormat};
use walletgate::state::AppState;

#[derive(Parser)]
#[command(name = "walletgate", version, about = "JSON-RPC gateway for wallet SDK servers")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start the gateway HTTP server
    Serve,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve => match serve().await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                // The subscriber may not be installed yet when startup fails.
                eprintln!("fatal startup error: {e}");
                error!(error = %e, "fatal startup error");
                ExitCode::FAILURE
            }
        },
    }
}

async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    let state = AppState::build(config)?;
    let shutdown = CancellationToken::new();

    tokio::spawn(state.router.clone().watch_load(
        state.config.load_watch_interval,
        state.metrics.clone(),
        shutdown.clone(),
    ));

    let listener = tokio::net::TcpListener::bind(state.config.address.as_str()).await?;
    info!(address = %state.config.address, "gateway listening");

    let app = api::router(state);
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("gateway drained, exiting");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

/// Resolve on SIGINT or SIGTERM, cancelling background tasks so the HTTP
/// server can drain.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {},
            _ = sigterm.recv() => {},
        }
    }
    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    info!("shutdown signal received");
    token.cancel();
}
