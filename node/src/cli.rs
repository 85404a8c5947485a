// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # CLI Interface
//!
//! Command-line arguments for `token-node`, via `clap` derive. Three
//! subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use token_ledger::config::{DEFAULT_METRICS_PORT, DEFAULT_RPC_PORT};

use crate::logging::LogFormat;

/// Token ledger node.
///
/// Serves a single fixed-supply token over JSON-RPC and exposes Prometheus
/// metrics.
#[derive(Parser, Debug)]
#[command(
    name = "token-node",
    about = "Fungible token ledger node",
    version,
    propagate_version = true
)]
pub struct TokenNodeCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the node.
    Run(RunArgs),
    /// Create the token in a data directory without starting the server.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Directory holding the ledger database. Created if missing.
    #[arg(long, short = 'd', env = "TOKEN_DATA_DIR", default_value = "./token-data")]
    pub data_dir: PathBuf,

    /// Keep the ledger in memory only; `--data-dir` is ignored and
    /// everything is lost on exit.
    #[arg(long)]
    pub in_memory: bool,

    /// Port for the JSON-RPC and REST API.
    #[arg(long, env = "TOKEN_RPC_PORT", default_value_t = DEFAULT_RPC_PORT)]
    pub rpc_port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "TOKEN_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// Log output format.
    #[arg(long, env = "TOKEN_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Directory holding the ledger database. Created if missing.
    #[arg(long, short = 'd', env = "TOKEN_DATA_DIR", default_value = "./token-data")]
    pub data_dir: PathBuf,

    /// Address that receives the whole supply.
    #[arg(long)]
    pub creator: String,

    /// Display name of the token.
    #[arg(long)]
    pub name: String,

    /// Ticker symbol of the token.
    #[arg(long)]
    pub ticker: String,

    /// Fixed total supply, in base units.
    #[arg(long)]
    pub total_supply: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_structure() {
        TokenNodeCli::command().debug_assert();
    }

    #[test]
    fn init_requires_token_parameters() {
        let parsed = TokenNodeCli::try_parse_from(["token-node", "init", "--creator", "alice"]);
        assert!(parsed.is_err());

        let parsed = TokenNodeCli::try_parse_from([
            "token-node",
            "init",
            "--creator",
            "alice",
            "--name",
            "Coin",
            "--ticker",
            "COIN",
            "--total-supply",
            "1000",
        ])
        .unwrap();
        match parsed.command {
            Commands::Init(args) => assert_eq!(args.total_supply, 1000),
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
