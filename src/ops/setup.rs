use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};

use super::{log_state, read_uint};
use crate::chain::StrategyCall;
use crate::config::StrategyConfig;
use crate::context::HarnessContext;
use crate::deploy::deploy_strategy;
use crate::error::HarnessError;
use crate::model::{StrategyDeployment, SwapRequest, Token};
use crate::planner::is_stable_pair;

/// Quote currency for the min-liquidity USD target.
const USD_REFERENCE: &str = "USDC";

/// Deploy or bind the stack and bring the strategy to a usable state.
///
/// Idempotent: roles, min-liquidity and `init` are only written when missing.
/// Fails with `StateMismatch` when the on-chain input or reward order differs
/// from the configured one.
pub async fn setup_strategy(
    ctx: &mut HarnessContext,
    cfg: &StrategyConfig,
    verify: bool,
) -> Result<StrategyDeployment> {
    let dep = deploy_strategy(ctx, cfg, verify).await?;
    let ctx = &*ctx;

    grant_roles(ctx, &dep, ctx.deployer()).await?;
    set_min_liquidity(ctx, &dep, cfg.min_liquidity_usd).await?;

    let agent = ctx
        .chain
        .strategy_call(dep.strategy(), StrategyCall::Agent)
        .await
        .context("agent()")?
        .address()?;
    if agent != Address::ZERO {
        tracing::info!(strategy = %dep.name, "skipping init, already initialized");
    } else if let Some(params) = &dep.init_params {
        tracing::info!(strategy = %dep.name, oracle = ?params.oracle.library(), "initializing");
        ctx.chain
            .strategy_call(dep.strategy(), StrategyCall::Init(Box::new(params.clone())))
            .await
            .context("init")?;
    }

    check_order(ctx, &dep).await?;
    log_state(ctx, &dep, "After init").await;
    Ok(dep)
}

/// Grant KEEPER and MANAGER roles to `account` where missing.
pub async fn grant_roles(ctx: &HarnessContext, dep: &StrategyDeployment, account: Address) -> Result<()> {
    let strat = dep.strategy();
    for role_call in [StrategyCall::KeeperRole, StrategyCall::ManagerRole] {
        let role = ctx.chain.strategy_call(strat, role_call).await?.word()?;
        let has = ctx
            .chain
            .strategy_call(strat, StrategyCall::HasRole { role, account })
            .await?
            .boolean()?;
        if !has {
            tracing::info!(%role, %account, "granting role");
            ctx.chain
                .strategy_call(strat, StrategyCall::GrantRole { role, account })
                .await
                .context("grantRole")?;
        }
    }
    Ok(())
}

/// Units of underlying one USD buys.
async fn usd_rate(ctx: &HarnessContext, dep: &StrategyDeployment) -> Result<f64> {
    if is_stable_pair(&dep.underlying.symbol, USD_REFERENCE) {
        return Ok(1.0);
    }
    let usdc = ctx
        .resolve_address(USD_REFERENCE)
        .context("pricing min liquidity in USD")?;
    let (symbol, decimals) = ctx.chain.erc20_metadata(usdc).await?;
    let usdc = Token::new(usdc, symbol, decimals);
    let request = SwapRequest {
        input: usdc.address,
        output: dep.underlying.address,
        amount_wei: usdc.to_wei(1_000.0),
        chain_id: ctx.chain_id(),
        payer: ctx.deployer(),
        test_payer: ctx.test_payer(),
    };
    let route = ctx
        .quotes
        .best_route(&request)
        .await?
        .ok_or_else(|| HarnessError::QuoteUnavailable {
            input: usdc.symbol.clone(),
            output: dep.underlying.symbol.clone(),
        })?;
    Ok(route.estimated_exchange_rate)
}

/// Raise `minLiquidity` to the USD target if it is below it. Returns the target in wei.
pub async fn set_min_liquidity(ctx: &HarnessContext, dep: &StrategyDeployment, usd: f64) -> Result<U256> {
    let rate = usd_rate(ctx, dep).await?;
    let seed = dep.underlying.to_wei(usd * rate);
    let current = read_uint(ctx, dep, StrategyCall::MinLiquidity).await?;
    if current >= seed {
        tracing::info!(%current, "skipping setMinLiquidity");
    } else {
        tracing::info!(%seed, underlying = %dep.underlying, usd, "setting minLiquidity");
        ctx.chain
            .strategy_call(dep.strategy(), StrategyCall::SetMinLiquidity(seed))
            .await
            .context("setMinLiquidity")?;
    }
    Ok(seed)
}

/// Compare on-chain `inputs(i)` and `rewardTokens(i)` to the configured order.
async fn check_order(ctx: &HarnessContext, dep: &StrategyDeployment) -> Result<()> {
    let groups = [
        ("Input", &dep.inputs, StrategyCall::Inputs as fn(usize) -> StrategyCall),
        ("RewardToken", &dep.reward_tokens, StrategyCall::RewardTokens as fn(usize) -> StrategyCall),
    ];
    for (kind, tokens, call) in groups {
        for (i, token) in tokens.iter().enumerate() {
            let actual = ctx.chain.strategy_call(dep.strategy(), call(i)).await?.address()?;
            if actual != token.address {
                return Err(HarnessError::StateMismatch {
                    kind: kind.to_string(),
                    index: i,
                    expected: token.address.to_string(),
                    actual: actual.to_string(),
                }
                .into());
            }
        }
    }
    Ok(())
}
