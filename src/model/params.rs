use alloy::primitives::{Address, B256, Bytes};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Strategy fees in basis points (10_000 = 100%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Fees {
    /// Performance fee.
    pub perf: u64,
    /// Management fee.
    pub mgmt: u64,
    pub entry: u64,
    pub exit: u64,
}

impl Default for Fees {
    fn default() -> Self {
        Fees {
            perf: 1_000, // 10%
            mgmt: 20,    // .2%
            entry: 2,    // .02%
            exit: 2,     // .02%
        }
    }
}

/// Per-field fee overrides. Unset fields keep the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FeeOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perf: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mgmt: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entry: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit: Option<u64>,
}

impl Fees {
    /// Apply overrides over `self`, field by field: perf, mgmt, entry, exit.
    pub fn merge(self, overrides: &FeeOverrides) -> Fees {
        Fees {
            perf: overrides.perf.unwrap_or(self.perf),
            mgmt: overrides.mgmt.unwrap_or(self.mgmt),
            entry: overrides.entry.unwrap_or(self.entry),
            exit: overrides.exit.unwrap_or(self.exit),
        }
    }
}

/// ERC20 metadata passed to the strategy constructor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Erc20Metadata {
    pub name: String,
    pub symbol: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_version() -> String {
    "1".to_string()
}

/// Parameters shared by every strategy family.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseParams {
    pub fees: Fees,
    pub underlying: Address,
    /// `[fee collector, swapper, agent]`.
    pub core_addresses: [Address; 3],
    pub inputs: Vec<Address>,
    /// Basis points per input.
    pub input_weights: Vec<u16>,
    pub lp_tokens: Vec<Address>,
    pub reward_tokens: Vec<Address>,
}

/// Oracle wiring, one variant per strategy family.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleParams {
    /// Strategy prices its inputs without an external oracle.
    None,
    Chainlink {
        asset_price_feed: Address,
        input_price_feeds: Vec<Address>,
    },
    Pyth {
        pyth: Address,
        underlying_pyth_id: B256,
        input_pyth_ids: Vec<B256>,
    },
}

impl OracleParams {
    /// Oracle library the strategy must be linked against.
    pub fn library(&self) -> Option<&'static str> {
        match self {
            OracleParams::None => None,
            OracleParams::Chainlink { .. } => Some("ChainlinkUtils"),
            OracleParams::Pyth { .. } => Some("PythUtils"),
        }
    }
}

/// Typed `init(...)` arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct InitParams {
    pub base: BaseParams,
    pub oracle: OracleParams,
    /// ABI-encoded protocol-specific tail (e.g. a comptroller address).
    pub protocol: Bytes,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fees() {
        let fees = Fees::default();
        assert_eq!((fees.perf, fees.mgmt, fees.entry, fees.exit), (1_000, 20, 2, 2));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let overrides = FeeOverrides {
            perf: Some(500),
            exit: Some(0),
            ..FeeOverrides::default()
        };
        let fees = Fees::default().merge(&overrides);
        assert_eq!(fees, Fees { perf: 500, mgmt: 20, entry: 2, exit: 0 });
    }

    #[test]
    fn test_oracle_library() {
        assert_eq!(OracleParams::None.library(), None);
        let pyth = OracleParams::Pyth {
            pyth: Address::ZERO,
            underlying_pyth_id: B256::ZERO,
            input_pyth_ids: vec![],
        };
        assert_eq!(pyth.library(), Some("PythUtils"));
    }
}
