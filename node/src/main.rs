// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # Token Ledger Node
//!
//! Entry point for the `token-node` binary. Parses CLI arguments, initializes
//! logging and metrics, opens the ledger, and serves the JSON-RPC API.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — open the ledger and serve it
//! - `init`    — create the token in a data directory offline
//! - `version` — print build version information

mod api;
mod cli;
mod logging;
mod metrics;

use anyhow::{Context, Result};
use clap::Parser;
use parking_lot::Mutex;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;

use token_ledger::{Ledger, SledStore, StaticCaller};

use cli::{Commands, TokenNodeCli};
use logging::LogFormat;
use metrics::LedgerMetrics;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TokenNodeCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_ledger(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Starts the node: API server and metrics endpoint.
async fn run_node(args: cli::RunArgs) -> Result<()> {
    logging::init_logging(
        "token_node=info,token_ledger=info,tower_http=debug",
        args.log_format,
    );

    tracing::info!(
        rpc_port = args.rpc_port,
        metrics_port = args.metrics_port,
        in_memory = args.in_memory,
        data_dir = %args.data_dir.display(),
        "starting token-node"
    );

    // --- Storage ---
    let store = if args.in_memory {
        tracing::warn!("running with an in-memory ledger; state is lost on exit");
        SledStore::open_temporary().context("failed to open in-memory store")?
    } else {
        open_store(&args.data_dir)?
    };

    let ledger = Ledger::open(store).context("failed to load ledger state")?;
    match ledger.token_info() {
        Ok(info) => tracing::info!(
            name = %info.name,
            ticker = %info.ticker,
            total_supply = info.total_supply,
            "ledger loaded"
        ),
        Err(_) => tracing::info!("ledger is uninitialized; waiting for token_initialize"),
    }

    // --- Metrics ---
    let ledger_metrics = Arc::new(LedgerMetrics::new());
    ledger_metrics
        .accounts
        .set(ledger.store().account_count() as i64);

    // --- Application state ---
    let app_state = api::AppState {
        version: format!(
            "{} (ledger {})",
            env!("CARGO_PKG_VERSION"),
            token_ledger::config::LEDGER_VERSION,
        ),
        ledger: Arc::new(Mutex::new(ledger)),
        metrics: Arc::clone(&ledger_metrics),
    };

    // --- API server ---
    let api_router = api::create_router(app_state.clone());
    let api_addr = format!("0.0.0.0:{}", args.rpc_port);
    let api_listener = tokio::net::TcpListener::bind(&api_addr)
        .await
        .with_context(|| format!("failed to bind RPC listener on {}", api_addr))?;
    tracing::info!("RPC/API server listening on {}", api_addr);

    // --- Metrics server ---
    let metrics_router = axum::Router::new()
        .route("/metrics", axum::routing::get(metrics::metrics_handler))
        .with_state(Arc::clone(&ledger_metrics));
    let metrics_addr = format!("0.0.0.0:{}", args.metrics_port);
    let metrics_listener = tokio::net::TcpListener::bind(&metrics_addr)
        .await
        .with_context(|| format!("failed to bind metrics listener on {}", metrics_addr))?;
    tracing::info!("Metrics server listening on {}", metrics_addr);

    // --- Serve ---
    tokio::select! {
        res = axum::serve(api_listener, api_router) => {
            if let Err(e) = res {
                tracing::error!("API server error: {}", e);
            }
        }
        res = axum::serve(metrics_listener, metrics_router) => {
            if let Err(e) = res {
                tracing::error!("Metrics server error: {}", e);
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received, draining connections");
        }
    }

    app_state
        .ledger
        .lock()
        .store()
        .flush()
        .context("failed to flush ledger on shutdown")?;
    tracing::info!("token-node stopped");
    Ok(())
}

/// Creates the token in `data_dir` without starting the server.
fn init_ledger(args: cli::InitArgs) -> Result<()> {
    logging::init_logging("token_node=info,token_ledger=info", LogFormat::Pretty);

    let store = open_store(&args.data_dir)?;
    let mut ledger = Ledger::open(store).context("failed to load ledger state")?;

    let creator = StaticCaller::parse(&args.creator)
        .with_context(|| format!("invalid creator address: {:?}", args.creator))?;
    let address = ledger
        .initialize(&creator, args.name, args.ticker, args.total_supply)
        .context("failed to initialize token")?;
    let info = ledger.token_info()?;

    println!("Ledger initialized successfully.");
    println!("  Data directory : {}", args.data_dir.display());
    println!("  Token          : {} ({})", info.name, info.ticker);
    println!("  Total supply   : {}", info.total_supply);
    println!("  Creator        : {}", address);
    println!("  State root     : {}", hex::encode(ledger.state_root()?));

    Ok(())
}

/// Opens the sled database under `<data_dir>/db`.
fn open_store(data_dir: &Path) -> Result<SledStore> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;

    let store = SledStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "database opened");
    Ok(store)
}

/// Prints version information to stdout.
fn print_version() {
    println!("token-node {}", env!("CARGO_PKG_VERSION"));
    println!("ledger     {}", token_ledger::config::LEDGER_VERSION);
    println!("rustc      {}", rustc_version());
}

/// Returns the Rust compiler version used to build this binary.
fn rustc_version() -> &'static str {
    option_env!("RUSTC_VERSION").unwrap_or("unknown")
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
///
/// On non-Unix platforms, only Ctrl+C is supported.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
