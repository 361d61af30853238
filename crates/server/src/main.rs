//! TradeLab control plane server binary.
//!
//! Loads configuration, initializes tracing, restores state from the
//! decision journal if one is configured, and serves the control-plane
//! HTTP API until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use tl_core::config::ControlConfig;
use tl_control::{DecisionJournal, GlobalKillSwitch, MemoryStore};
use tl_server::{build_state, control_router};

/// TradeLab control plane
#[derive(Parser, Debug)]
#[command(name = "tl-server", about = "TradeLab global control plane server")]
struct Args {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = ControlConfig::load(args.config)?;

    tl_core::logging::init_tracing(config.server.json_logs);

    tracing::info!(
        port = config.server.port,
        journal = ?config.audit.journal_path,
        reset_enabled = config.admin_token.is_some(),
        "starting tl-server"
    );

    let kill_switch = Arc::new(GlobalKillSwitch::new());
    let store = match &config.audit.journal_path {
        Some(path) => {
            let journal = DecisionJournal::new(path.clone())?;
            Arc::new(MemoryStore::with_journal(kill_switch.clone(), journal)?)
        }
        None => Arc::new(MemoryStore::new(kill_switch.clone())),
    };

    let app = control_router(build_state(&config, store, kill_switch));

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutdown signal received");
            shutdown.cancel();
        }
    });

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!(%addr, "control plane HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            cancel.cancelled().await;
        })
        .await?;

    Ok(())
}
