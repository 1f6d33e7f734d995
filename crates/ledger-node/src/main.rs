mod constants;
mod routes;

use anyhow::Context;
use clap::Parser;
use constants::{DEFAULT_DISPLAY_SUFFIX, DEFAULT_LISTEN};
use ledger_core::{
    constants::{DEFAULT_DIFFICULTY, DEFAULT_LEDGER_NAME},
    CancelToken, LedgerConfig, SharedLedger,
};
use routes::AppState;
use std::net::SocketAddr;
use tracing::{info, Level};

#[derive(Parser, Debug)]
struct Args {
    /// Address to listen on, e.g. 127.0.0.1:8080
    #[arg(long, default_value = DEFAULT_LISTEN)]
    listen: String,

    /// Ledger owner name, recorded in the genesis block
    #[arg(long, default_value = DEFAULT_LEDGER_NAME)]
    name: String,

    /// Name shown by /view (defaults to "<name> Blockchain")
    #[arg(long)]
    display_name: Option<String>,

    /// Leading zero hex digits required of mined block hashes
    #[arg(long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: u32,

    /// Make genesis pay the same proof of work as every other block
    #[arg(long)]
    mine_genesis: bool,

    /// Search nonces on all cores
    #[arg(long)]
    parallel: bool,

    /// Transaction admitted and mined into block 1 at startup (repeatable)
    #[arg(long = "seed-tx")]
    seed_tx: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let cancel = CancelToken::new();
    let config = LedgerConfig {
        name: args.name.clone(),
        difficulty: args.difficulty,
        mine_genesis: args.mine_genesis,
        parallel: args.parallel,
    };

    let ledger = {
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || SharedLedger::new(config, &cancel))
            .await?
            .context("failed to create genesis block")?
    };

    if !args.seed_tx.is_empty() {
        for tx in &args.seed_tx {
            ledger.add_transaction(tx.as_str());
        }
        let block = {
            let ledger = ledger.clone();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || ledger.mine_pending(&cancel))
                .await?
                .context("failed to mine seed block")?
        };
        info!(index = block.index, hash = %block.hash, "seed transactions recorded on-chain");
    }

    let state = AppState {
        ledger,
        display_name: args
            .display_name
            .unwrap_or_else(|| format!("{} {DEFAULT_DISPLAY_SUFFIX}", args.name)),
        cancel: cancel.clone(),
    };
    let app = routes::router(state);

    let addr: SocketAddr = args.listen.parse()?;
    info!("ledger-node listening on http://{addr}");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .with_graceful_shutdown(shutdown_signal(cancel))
        .await?;
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM and stops any running nonce search.
async fn shutdown_signal(cancel: CancelToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {e}");
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
    info!("shutdown requested, cancelling mining");
    cancel.cancel();
}
