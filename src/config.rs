use std::path::{Path, PathBuf};

use alloy::signers::local::PrivateKeySigner;
use anyhow::{Context, Result, anyhow};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::flow::Flow;
use crate::model::{Chain, FeeOverrides};

/// Env var holding the signer's hex private key.
pub const PRIVATE_KEY_ENV: &str = "HARNESS_PRIVATE_KEY";

/// Env var holding the block explorer API key, required with `--verify`.
pub const EXPLORER_KEY_ENV: &str = "HARNESS_EXPLORER_API_KEY";

/// A test suite: the strategy to stand up and the flows to drive it through.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SuiteConfig {
    pub name: String,
    pub chain: Chain,
    pub strategy: StrategyConfig,
    /// Swaps that fund the deployer before the flows run.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub funding: Vec<FundingRequest>,
    /// Flows, run in order. Empty runs the default suite.
    #[serde(default)]
    pub flows: Vec<Flow>,
}

impl SuiteConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading suite {}", path.display()))?;
        serde_json::from_str(&contents).with_context(|| format!("parsing suite {}", path.display()))
    }
}

/// Strategy descriptor, turned into deployable units and `init` parameters.
///
/// Token, oracle and protocol fields take address references: a literal `0x…`
/// address, `category.name` in the address book, or a bare token symbol.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct StrategyConfig {
    /// ERC20 name of the strategy share, also its address book key.
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Implementation contract (artifact name), e.g. "VenusMultiStake".
    pub contract: String,
    #[serde(default = "default_agent")]
    pub agent_contract: String,
    pub underlying: String,
    pub inputs: Vec<String>,
    /// Basis points per input. Empty or a single weight means 100% on input 0.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input_weights: Vec<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lp_tokens: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reward_tokens: Vec<String>,
    #[serde(default)]
    pub fees: FeeOverrides,
    #[serde(default)]
    pub oracle: OracleConfig,
    /// ABI-encoded protocol-specific `init` tail, hex.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_params: Option<String>,
    /// Libraries to link besides `AsMaths` (always deployed) and the oracle library.
    #[serde(default = "default_libraries")]
    pub libraries: Vec<String>,
    /// Minimum seed liquidity, in USD.
    #[serde(default = "default_min_liquidity_usd")]
    pub min_liquidity_usd: f64,
}

fn default_version() -> String {
    "1".to_string()
}

fn default_agent() -> String {
    "StrategyV5Agent".to_string()
}

fn default_libraries() -> Vec<String> {
    vec!["AsAccounting".to_string()]
}

fn default_min_liquidity_usd() -> f64 {
    10.0
}

/// Oracle family of the strategy, selecting the `init` overload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum OracleConfig {
    #[default]
    None,
    Chainlink {
        asset_price_feed: String,
        input_price_feeds: Vec<String>,
    },
    Pyth {
        pyth: String,
        /// Pyth price id (bytes32 hex) of the underlying.
        underlying_pyth_id: String,
        input_pyth_ids: Vec<String>,
    },
}

/// Swap `amount` of wrapped gas into `asset` for the deployer, through the Swapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FundingRequest {
    pub asset: String,
    /// Wrapped gas to spend, in human units.
    pub amount: f64,
}

// ── Runtime ────────────────────────────────────────────────────────

/// Settings that come from the environment and the command line, not the suite file.
pub struct RuntimeConfig {
    pub private_key: String,
    pub rpc_url: Option<String>,
    /// Overrides node probing when set.
    pub simulated: Option<bool>,
    pub quote_api: Option<String>,
    pub artifacts_dir: PathBuf,
    pub address_book: PathBuf,
    pub verify: bool,
    /// Etherscan-compatible API URL. Etherscan's multichain API when unset.
    pub explorer_api: Option<String>,
    /// Set whenever `verify` is.
    pub explorer_key: Option<String>,
}

impl RuntimeConfig {
    pub fn from_cli(cli: &crate::cli::ChainArgs) -> Result<Self> {
        let private_key = std::env::var(PRIVATE_KEY_ENV).map_err(|_| {
            anyhow!(
                "{PRIVATE_KEY_ENV} env var not set. \
                 Set it to the deployer's hex private key."
            )
        })?;
        // fail early on a malformed key
        let _: PrivateKeySigner = private_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| anyhow!("Invalid private key: {e}"))?;
        let explorer_key = explorer_key(cli.verify, std::env::var(EXPLORER_KEY_ENV).ok())?;

        Ok(RuntimeConfig {
            private_key,
            rpc_url: cli.rpc_url.clone(),
            simulated: cli.simulated,
            quote_api: cli.quote_api.clone(),
            artifacts_dir: cli.artifacts.clone(),
            address_book: cli.addresses.clone(),
            verify: cli.verify,
            explorer_api: cli.explorer_api.clone(),
            explorer_key,
        })
    }

    /// The suite's chain with CLI overrides applied.
    pub fn chain(&self, suite: &SuiteConfig) -> Chain {
        let mut chain = suite.chain.clone();
        if let Some(url) = &self.rpc_url {
            chain.rpc_url = Some(url.clone());
        }
        if self.simulated.is_some() {
            chain.simulated = self.simulated;
        }
        chain
    }
}

/// The explorer key is only read, and then required, when verifying.
fn explorer_key(verify: bool, key: Option<String>) -> Result<Option<String>> {
    if !verify {
        return Ok(None);
    }
    match key {
        Some(key) if !key.trim().is_empty() => Ok(Some(key)),
        _ => Err(anyhow!(
            "--verify needs the {EXPLORER_KEY_ENV} env var set to a block explorer API key"
        )),
    }
}
