use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The chain a suite runs against.
///
/// In JSON, chains are objects:
/// - Known chain: `{"name": "optimism", "chain_id": 10}` (rpc_url filled from the registry)
/// - Local fork: `{"name": "anvil", "chain_id": 10, "rpc_url": "http://127.0.0.1:8545", "simulated": true}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
pub struct Chain {
    /// Human-readable chain name (e.g. "ethereum", "optimism", "bsc").
    pub name: String,
    /// EVM chain ID. Selects the address book section.
    pub chain_id: u64,
    /// JSON-RPC endpoint URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    /// Force the simulated/live classification instead of probing the node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulated: Option<bool>,
}

// ── Methods ──────────────────────────────────────────────────────────

impl Chain {
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    /// JSON-RPC URL, falling back to the public endpoint of a known chain.
    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_url
            .as_deref()
            .or_else(|| default_rpc_url(self.chain_id))
    }
}

fn default_rpc_url(chain_id: u64) -> Option<&'static str> {
    match chain_id {
        1 => Some("https://eth.llamarpc.com"),
        10 => Some("https://mainnet.optimism.io"),
        56 => Some("https://bsc-dataseed.binance.org"),
        137 => Some("https://polygon-rpc.com"),
        8453 => Some("https://mainnet.base.org"),
        42161 => Some("https://arb1.arbitrum.io/rpc"),
        _ => None,
    }
}

// ── Constructors ─────────────────────────────────────────────────────

impl Chain {
    /// A local fork (anvil/hardhat) of `chain_id` at `rpc_url`.
    pub fn fork(chain_id: u64, rpc_url: impl Into<String>) -> Self {
        Chain {
            name: "fork".into(),
            chain_id,
            rpc_url: Some(rpc_url.into()),
            simulated: Some(true),
        }
    }
}

// ── Display ──────────────────────────────────────────────────────────

impl std::fmt::Display for Chain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.chain_id)
    }
}
