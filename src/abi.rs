//! Chain-agnostic ABI encoding for constructor and `init` arguments.

use alloy::primitives::Bytes;
use alloy::sol;
use alloy::sol_types::{SolCall, SolValue};

use crate::model::{self, InitParams, OracleParams};

sol! {
    #[derive(Debug, PartialEq)]
    struct Fees {
        uint64 perf;
        uint64 mgmt;
        uint64 entry;
        uint64 exit;
    }

    #[derive(Debug, PartialEq)]
    struct BaseParams {
        Fees fees;
        address underlying;
        address[3] coreAddresses;
        address[] inputs;
        uint16[] inputWeights;
        address[] lpTokens;
        address[] rewardTokens;
    }

    #[derive(Debug, PartialEq)]
    struct ChainlinkParams {
        address assetPriceFeed;
        address[] inputPriceFeeds;
    }

    #[derive(Debug, PartialEq)]
    struct PythParams {
        address pyth;
        bytes32 underlyingPythId;
        bytes32[] inputPythIds;
    }

    #[derive(Debug, PartialEq)]
    struct Erc20Metadata {
        string name;
        string symbol;
        string version;
    }

    interface IStrategyInit {
        function init(BaseParams calldata base, bytes calldata protocol) external;
    }

    interface IChainlinkStrategyInit {
        function init(BaseParams calldata base, ChainlinkParams calldata oracle, bytes calldata protocol) external;
    }

    interface IPythStrategyInit {
        function init(BaseParams calldata base, PythParams calldata oracle, bytes calldata protocol) external;
    }
}

/// Constructor arguments of a strategy: `constructor(Erc20Metadata)`.
pub fn encode_constructor(meta: &model::Erc20Metadata) -> Bytes {
    let meta = Erc20Metadata {
        name: meta.name.clone(),
        symbol: meta.symbol.clone(),
        version: meta.version.clone(),
    };
    (meta,).abi_encode_params().into()
}

fn base_params(base: &model::BaseParams) -> BaseParams {
    BaseParams {
        fees: Fees {
            perf: base.fees.perf,
            mgmt: base.fees.mgmt,
            entry: base.fees.entry,
            exit: base.fees.exit,
        },
        underlying: base.underlying,
        coreAddresses: base.core_addresses,
        inputs: base.inputs.clone(),
        inputWeights: base.input_weights.clone(),
        lpTokens: base.lp_tokens.clone(),
        rewardTokens: base.reward_tokens.clone(),
    }
}

/// Calldata for the family-specific `init` overload.
pub fn encode_init(params: &InitParams) -> Bytes {
    let base = base_params(&params.base);
    let protocol = params.protocol.clone();
    let data = match &params.oracle {
        OracleParams::None => IStrategyInit::initCall { base, protocol }.abi_encode(),
        OracleParams::Chainlink {
            asset_price_feed,
            input_price_feeds,
        } => IChainlinkStrategyInit::initCall {
            base,
            oracle: ChainlinkParams {
                assetPriceFeed: *asset_price_feed,
                inputPriceFeeds: input_price_feeds.clone(),
            },
            protocol,
        }
        .abi_encode(),
        OracleParams::Pyth {
            pyth,
            underlying_pyth_id,
            input_pyth_ids,
        } => IPythStrategyInit::initCall {
            base,
            oracle: PythParams {
                pyth: *pyth,
                underlyingPythId: *underlying_pyth_id,
                inputPythIds: input_pyth_ids.clone(),
            },
            protocol,
        }
        .abi_encode(),
    };
    data.into()
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Address;

    use super::*;
    use crate::model::Fees as ModelFees;

    fn params(oracle: OracleParams) -> InitParams {
        InitParams {
            base: model::BaseParams {
                fees: ModelFees::default(),
                underlying: Address::repeat_byte(1),
                core_addresses: [Address::repeat_byte(2), Address::repeat_byte(3), Address::repeat_byte(4)],
                inputs: vec![Address::repeat_byte(5)],
                input_weights: vec![10_000],
                lp_tokens: vec![],
                reward_tokens: vec![],
            },
            oracle,
            protocol: Bytes::new(),
        }
    }

    #[test]
    fn test_init_selector_depends_on_family() {
        let plain = encode_init(&params(OracleParams::None));
        let chainlink = encode_init(&params(OracleParams::Chainlink {
            asset_price_feed: Address::repeat_byte(9),
            input_price_feeds: vec![Address::repeat_byte(8)],
        }));
        assert_eq!(&plain[..4], IStrategyInit::initCall::SELECTOR.as_slice());
        assert_eq!(&chainlink[..4], IChainlinkStrategyInit::initCall::SELECTOR.as_slice());
        assert_ne!(plain[..4], chainlink[..4]);
    }

    #[test]
    fn test_init_roundtrips_fees() {
        let data = encode_init(&params(OracleParams::None));
        let call = IStrategyInit::initCall::abi_decode(&data).unwrap();
        assert_eq!(call.base.fees.perf, 1_000);
        assert_eq!(call.base.inputWeights, vec![10_000u16]);
    }
}
