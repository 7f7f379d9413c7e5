use std::collections::BTreeSet;

use alloy::hex;
use alloy::primitives::{Address, B256, Bytes};
use anyhow::{Context, Result, anyhow};

use super::materialize;
use crate::abi;
use crate::config::{OracleConfig, StrategyConfig};
use crate::context::HarnessContext;
use crate::error::HarnessError;
use crate::model::{
    BaseParams, DeployableUnit, Erc20Metadata, Fees, InitParams, MAX_SLOTS, OracleParams,
    StrategyDeployment, UnitKind,
};

/// Library every other library and the agent link against.
pub const BASE_MATH_LIBRARY: &str = "AsMaths";

/// Bind or deploy the Swapper and cache its address in the context.
pub async fn ensure_swapper(ctx: &mut HarnessContext, verify: bool) -> Result<Address> {
    if let Some(addr) = ctx.swapper() {
        return Ok(addr);
    }
    let out = materialize(ctx, vec![DeployableUnit::swapper()], verify).await?;
    let addr = out
        .address("Swapper")
        .ok_or_else(|| anyhow!("Swapper did not materialize"))?;
    ctx.set_swapper(addr);
    Ok(addr)
}

/// Library names the strategy needs: math, configured libraries, then the oracle library.
pub fn library_names(cfg: &StrategyConfig) -> BTreeSet<String> {
    let mut names: BTreeSet<String> = cfg.libraries.iter().cloned().collect();
    names.insert(BASE_MATH_LIBRARY.to_string());
    let oracle_lib = match cfg.oracle {
        OracleConfig::None => None,
        OracleConfig::Chainlink { .. } => Some("ChainlinkUtils"),
        OracleConfig::Pyth { .. } => Some("PythUtils"),
    };
    names.extend(oracle_lib.map(str::to_string));
    names
}

/// Deployable units of one strategy stack: libraries, agent, strategy proxy.
pub fn strategy_units(cfg: &StrategyConfig) -> Vec<DeployableUnit> {
    let mut units: Vec<DeployableUnit> = library_names(cfg)
        .iter()
        .map(|name| DeployableUnit::library(name))
        .collect();
    units.push(DeployableUnit::agent(&cfg.agent_contract));

    let metadata = Erc20Metadata {
        name: cfg.name.clone(),
        symbol: cfg.symbol.clone(),
        version: cfg.version.clone(),
    };
    units.push(DeployableUnit::strategy(
        &cfg.contract,
        &cfg.name,
        &cfg.agent_contract,
        abi::encode_constructor(&metadata),
    ));
    units
}

/// Resolve tokens, bind or deploy the stack, and assemble `init` parameters.
///
/// Nothing is initialized on-chain here; see `ops::setup_strategy`.
pub async fn deploy_strategy(
    ctx: &mut HarnessContext,
    cfg: &StrategyConfig,
    verify: bool,
) -> Result<StrategyDeployment> {
    if cfg.inputs.len() > MAX_SLOTS {
        return Err(HarnessError::SlotOverflow {
            count: cfg.inputs.len(),
            max: MAX_SLOTS,
        }
        .into());
    }

    let underlying = ctx.token(&cfg.underlying).await?;
    let mut inputs = Vec::with_capacity(cfg.inputs.len());
    for input in &cfg.inputs {
        inputs.push(ctx.token(input).await?);
    }
    let mut reward_tokens = Vec::with_capacity(cfg.reward_tokens.len());
    for reward in &cfg.reward_tokens {
        reward_tokens.push(ctx.token(reward).await?);
    }
    tracing::info!(
        strategy = %cfg.name,
        underlying = %underlying,
        inputs = ?inputs.iter().map(|t| t.symbol.as_str()).collect::<Vec<_>>(),
        "resolved tokens"
    );

    let swapper = ensure_swapper(ctx, verify).await?;
    let out = materialize(ctx, strategy_units(cfg), verify).await?;

    let agent = out
        .address(&cfg.agent_contract)
        .ok_or_else(|| anyhow!("agent {} did not materialize", cfg.agent_contract))?;

    let base = BaseParams {
        fees: Fees::default().merge(&cfg.fees),
        underlying: underlying.address,
        core_addresses: [ctx.deployer(), swapper, agent],
        inputs: inputs.iter().map(|t| t.address).collect(),
        input_weights: input_weights(&cfg.input_weights),
        lp_tokens: cfg
            .lp_tokens
            .iter()
            .map(|r| ctx.resolve_address(r))
            .collect::<Result<_>>()?,
        reward_tokens: reward_tokens.iter().map(|t| t.address).collect(),
    };
    let init_params = InitParams {
        base,
        oracle: oracle_params(ctx, &cfg.oracle)?,
        protocol: decode_hex(cfg.protocol_params.as_deref())?,
    };

    let mut units = out.units;
    let mut kinds = out.kinds;
    if let Some(unit) = ctx.cached_unit("Swapper") {
        units.insert(unit.name.clone(), unit.clone());
        kinds.insert(unit.name.clone(), UnitKind::Swapper);
    }

    Ok(StrategyDeployment {
        name: cfg.name.clone(),
        contract: cfg.contract.clone(),
        underlying,
        inputs,
        reward_tokens,
        units,
        kinds,
        init_params: Some(init_params),
    })
}

/// Zero or one weight means 100% on input 0.
pub fn input_weights(weights: &[u16]) -> Vec<u16> {
    if weights.len() <= 1 {
        vec![10_000]
    } else {
        weights.to_vec()
    }
}

fn oracle_params(ctx: &HarnessContext, cfg: &OracleConfig) -> Result<OracleParams> {
    Ok(match cfg {
        OracleConfig::None => OracleParams::None,
        OracleConfig::Chainlink {
            asset_price_feed,
            input_price_feeds,
        } => OracleParams::Chainlink {
            asset_price_feed: ctx.resolve_address(asset_price_feed)?,
            input_price_feeds: input_price_feeds
                .iter()
                .map(|r| ctx.resolve_address(r))
                .collect::<Result<_>>()?,
        },
        OracleConfig::Pyth {
            pyth,
            underlying_pyth_id,
            input_pyth_ids,
        } => OracleParams::Pyth {
            pyth: ctx.resolve_address(pyth)?,
            underlying_pyth_id: parse_b256(underlying_pyth_id)?,
            input_pyth_ids: input_pyth_ids
                .iter()
                .map(|id| parse_b256(id))
                .collect::<Result<_>>()?,
        },
    })
}

fn parse_b256(raw: &str) -> Result<B256> {
    raw.parse()
        .map_err(|e| anyhow!("invalid bytes32 '{raw}': {e}"))
}

fn decode_hex(raw: Option<&str>) -> Result<Bytes> {
    match raw {
        None => Ok(Bytes::new()),
        Some(raw) => Ok(hex::decode(raw.trim_start_matches("0x"))
            .with_context(|| format!("invalid protocol params hex '{raw}'"))?
            .into()),
    }
}
