use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Strategy harness: deploy a strategy stack and drive it through test flows.
#[derive(Parser)]
#[command(name = "strat-harness", version, about)]
pub struct Cli {
    /// Log level or tracing filter directive (RUST_LOG takes precedence)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Chain, signer and registry settings shared by the on-chain commands.
#[derive(Args, Clone)]
pub struct ChainArgs {
    /// JSON-RPC URL (overrides the suite's chain)
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Treat the chain as simulated (true) or live (false) instead of probing the node
    #[arg(long)]
    pub simulated: Option<bool>,

    /// Base URL of the swap quote API
    #[arg(long)]
    pub quote_api: Option<String>,

    /// Directory of compiled contract artifacts
    #[arg(long, default_value = "artifacts")]
    pub artifacts: PathBuf,

    /// Address book JSON, updated with newly deployed addresses
    #[arg(long, default_value = "addresses.json")]
    pub addresses: PathBuf,

    /// Submit source verification for deployed contracts (needs HARNESS_EXPLORER_API_KEY)
    #[arg(long)]
    pub verify: bool,

    /// Etherscan-compatible explorer API URL used by --verify
    #[arg(long)]
    pub explorer_api: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlanOp {
    Invest,
    Liquidate,
    Harvest,
}

#[derive(Subcommand)]
pub enum Command {
    /// Output the JSON schema for suite files
    Schema,

    /// Validate a suite JSON file
    Validate {
        /// Path to the suite JSON file
        file: PathBuf,
    },

    /// Deploy or bind the suite's strategy stack and initialize it
    Deploy {
        /// Path to the suite JSON file
        file: PathBuf,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Print the swap plan an invest, liquidate or harvest would use
    Plan {
        /// Path to the suite JSON file
        file: PathBuf,

        #[arg(long, value_enum)]
        op: PlanOp,

        /// Amount of underlying in human units (ignored for harvest)
        #[arg(long, default_value = "10.0")]
        amount: f64,

        #[command(flatten)]
        chain: ChainArgs,
    },

    /// Set up the strategy, fund the deployer and run the suite's flows
    Run {
        /// Path to the suite JSON file
        file: PathBuf,

        /// Write the suite report as JSON to this file
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,

        #[command(flatten)]
        chain: ChainArgs,
    },
}
