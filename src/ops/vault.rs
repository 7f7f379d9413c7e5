//! Share-side operations: seeding, deposits and withdrawals.

use alloy::primitives::{Bytes, U256};
use anyhow::{Context, Result};

use super::{SKIPPED, ensure_allowance, log_state, read_uint};
use crate::chain::StrategyCall;
use crate::context::HarnessContext;
use crate::model::{StrategyDeployment, SwapLeg, Token};
use crate::planner::require_route;
use crate::planner::slippage::DUST_THRESHOLD;

/// Seed the vault's first liquidity. Skipped once total assets reach the minimum.
pub async fn seed_liquidity(ctx: &HarnessContext, dep: &StrategyDeployment, amount: f64) -> Result<U256> {
    let amount = dep.underlying.to_wei(amount);
    let total_assets = read_uint(ctx, dep, StrategyCall::TotalAssets).await?;
    let min_liquidity = read_uint(ctx, dep, StrategyCall::MinLiquidity).await?;
    if total_assets >= min_liquidity {
        tracing::info!(%total_assets, %min_liquidity, "skipping seedLiquidity, already seeded");
        return Ok(U256::from(SKIPPED));
    }
    ensure_allowance(ctx, dep.underlying.address, dep.strategy(), amount).await?;

    log_state(ctx, dep, "Before SeedLiquidity").await;
    let out = ctx
        .chain
        .strategy_call(
            dep.strategy(),
            StrategyCall::SeedLiquidity {
                amount,
                max_shares: U256::MAX,
            },
        )
        .await
        .context("seedLiquidity")?
        .tx()?;
    log_state(ctx, dep, "After SeedLiquidity").await;
    Ok(out.log_word(0))
}

/// Deposit underlying, capped to the deployer's balance.
pub async fn deposit(ctx: &HarnessContext, dep: &StrategyDeployment, amount: f64) -> Result<U256> {
    let mut amount = dep.underlying.to_wei(amount);
    let balance = ctx
        .chain
        .balance_of(dep.underlying.address, ctx.deployer())
        .await
        .context("reading deployer balance")?;
    if balance < amount {
        tracing::info!(%balance, requested = %amount, "using full balance");
        amount = balance;
    }
    ensure_allowance(ctx, dep.underlying.address, dep.strategy(), amount).await?;

    log_state(ctx, dep, "Before Deposit").await;
    let out = ctx
        .chain
        .strategy_call(
            dep.strategy(),
            StrategyCall::SafeDeposit {
                amount,
                receiver: ctx.deployer(),
                min_shares: U256::from(1u64),
            },
        )
        .await
        .context("safeDeposit")?
        .tx()?;
    log_state(ctx, dep, "After Deposit").await;
    Ok(out.log_word(0))
}

/// Deposit another asset, swapped into the underlying by the strategy.
pub async fn swap_deposit(
    ctx: &HarnessContext,
    dep: &StrategyDeployment,
    input: &str,
    amount: f64,
) -> Result<U256> {
    let input_address = ctx.resolve_address(input)?;
    let (symbol, decimals) = ctx.chain.erc20_metadata(input_address).await?;
    let input = Token::new(input_address, symbol, decimals);
    let amount = input.to_wei(amount);
    ensure_allowance(ctx, input.address, dep.strategy(), amount).await?;

    let swap_data = if input.address == dep.underlying.address {
        Bytes::new()
    } else {
        let route = require_route(ctx, dep, &input, &dep.underlying, amount).await?;
        SwapLeg::from_route(route).encode()
    };

    log_state(ctx, dep, "Before SwapDeposit").await;
    let out = ctx
        .chain
        .strategy_call(
            dep.strategy(),
            StrategyCall::SwapSafeDeposit {
                input: input.address,
                amount,
                receiver: ctx.deployer(),
                min_shares: U256::from(1u64),
                swap_data,
            },
        )
        .await
        .context("swapSafeDeposit")?
        .tx()?;
    log_state(ctx, dep, "After SwapDeposit").await;
    Ok(out.log_word(0))
}

/// Withdraw underlying, capped to `maxWithdraw`. Skipped when nothing can exit.
pub async fn withdraw(ctx: &HarnessContext, dep: &StrategyDeployment, amount: f64) -> Result<U256> {
    let mut amount = dep.underlying.to_wei(amount);
    let max = read_uint(ctx, dep, StrategyCall::MaxWithdraw(ctx.deployer())).await?;
    if max < U256::from(DUST_THRESHOLD) {
        tracing::info!(%max, "skipping withdraw, maxWithdraw below dust");
        return Ok(U256::from(SKIPPED));
    }
    if amount > max {
        tracing::info!(%max, requested = %amount, "using maxWithdraw");
        amount = max;
    }

    log_state(ctx, dep, "Before Withdraw").await;
    let out = ctx
        .chain
        .strategy_call(
            dep.strategy(),
            StrategyCall::SafeWithdraw {
                amount,
                min_amount_out: U256::from(1u64),
                receiver: ctx.deployer(),
                owner: ctx.deployer(),
            },
        )
        .await
        .context("safeWithdraw")?
        .tx()?;
    log_state(ctx, dep, "After Withdraw").await;
    Ok(out.log_word(0))
}

/// Queue a withdrawal request, capped to the deployer's shares.
///
/// Skipped when the deployer holds no shares or an existing request already
/// covers the amount.
pub async fn request_withdraw(ctx: &HarnessContext, dep: &StrategyDeployment, amount: f64) -> Result<U256> {
    let mut amount = dep.underlying.to_wei(amount);
    let owner = ctx.deployer();
    let balance = read_uint(ctx, dep, StrategyCall::BalanceOf(owner)).await?;
    let pending = read_uint(ctx, dep, StrategyCall::PendingUnderlyingRequest(owner)).await?;

    if balance < U256::from(DUST_THRESHOLD) {
        tracing::info!(%balance, "skipping requestWithdraw, no shares");
        return Ok(U256::from(SKIPPED));
    }
    if amount > balance {
        tracing::info!(%balance, requested = %amount, "using full share balance");
        amount = balance;
    }
    if pending >= amount {
        tracing::info!(%pending, requested = %amount, "skipping requestWithdraw, already requested");
        return Ok(U256::from(SKIPPED));
    }

    log_state(ctx, dep, "Before RequestWithdraw").await;
    let out = ctx
        .chain
        .strategy_call(
            dep.strategy(),
            StrategyCall::RequestWithdraw {
                amount,
                receiver: owner,
                owner,
            },
        )
        .await
        .context("requestWithdraw")?
        .tx()?;
    log_state(ctx, dep, "After RequestWithdraw").await;
    // the requested amount is the event's last word
    Ok(out.log_word(-1))
}
