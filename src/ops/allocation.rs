//! Allocation-side operations: invest, liquidate, harvest, compound.

use alloy::primitives::U256;
use anyhow::{Context, Result};

use super::{SKIPPED, log_state, read_uint};
use crate::chain::StrategyCall;
use crate::context::HarnessContext;
use crate::model::StrategyDeployment;
use crate::planner::slippage::DUST_THRESHOLD;
use crate::planner::{plan_harvest, plan_invest, plan_liquidate};

/// Compound invests the harvest estimate less this divisor's share (2%).
const COMPOUND_BUFFER_DIVISOR: u64 = 50;

/// Invest idle underlying into the inputs, capped to `available()`.
pub async fn invest(ctx: &HarnessContext, dep: &StrategyDeployment, amount: Option<f64>) -> Result<U256> {
    let available = read_uint(ctx, dep, StrategyCall::Available).await?;
    let amount = match amount {
        Some(a) if dep.underlying.to_wei(a) <= available => dep.underlying.to_wei(a),
        Some(a) => {
            tracing::info!(%available, requested = a, "using available liquidity");
            available
        }
        None => available,
    };

    let planned = plan_invest(ctx, dep, amount).await?;
    log_state(ctx, dep, "Before Invest").await;
    let out = ctx
        .chain
        .strategy_call(
            dep.strategy(),
            StrategyCall::Invest {
                amounts: planned.amounts,
                swap_data: planned.plan.encode(),
            },
        )
        .await
        .context("invest")?
        .tx()?;
    log_state(ctx, dep, "After Invest").await;
    Ok(out.log_word(0))
}

/// Liquidate inputs back into the underlying.
///
/// The amount is raised to cover pending withdrawal requests, then capped to the
/// larger of `invested()` and those requests. Below dust nothing is liquidated.
pub async fn liquidate(ctx: &HarnessContext, dep: &StrategyDeployment, amount: f64) -> Result<U256> {
    let mut amount = dep.underlying.to_wei(amount);
    let pending = read_uint(ctx, dep, StrategyCall::TotalPendingUnderlyingRequest).await?;
    let invested = read_uint(ctx, dep, StrategyCall::Invested).await?;
    let max = invested.max(pending);

    if pending > invested {
        tracing::warn!(%pending, %invested, "pending withdrawal requests exceed invested");
    }
    if pending > amount {
        tracing::info!(%pending, requested = %amount, "using pending withdrawal requests");
        amount = pending;
    }
    if max < amount {
        tracing::info!(%max, requested = %amount, "using total allocated assets");
        amount = max;
    }
    if amount < U256::from(DUST_THRESHOLD) {
        tracing::info!(%amount, "skipping liquidate, amount below dust");
        return Ok(U256::from(SKIPPED));
    }

    let planned = plan_liquidate(ctx, dep, amount).await?;
    tracing::info!(
        amount = dep.underlying.to_amount(amount),
        underlying = %dep.underlying,
        legs = planned.plan.len(),
        "liquidating"
    );
    log_state(ctx, dep, "Before Liquidate").await;
    let out = ctx
        .chain
        .strategy_call(
            dep.strategy(),
            StrategyCall::Liquidate {
                amounts: planned.amounts,
                min_liquidity: U256::from(1u64),
                panic: false,
                swap_data: planned.plan.encode(),
            },
        )
        .await
        .context("liquidate")?
        .tx()?;
    log_state(ctx, dep, "After Liquidate").await;
    // liquidity available after the call
    Ok(out.log_word(2))
}

pub async fn harvest(ctx: &HarnessContext, dep: &StrategyDeployment) -> Result<U256> {
    let plan = plan_harvest(ctx, dep).await?;
    log_state(ctx, dep, "Before Harvest").await;
    let out = ctx
        .chain
        .strategy_call(
            dep.strategy(),
            StrategyCall::Harvest {
                swap_data: plan.encode(),
            },
        )
        .await
        .context("harvest")?
        .tx()?;
    log_state(ctx, dep, "After Harvest").await;
    Ok(out.log_word(0))
}

/// Harvest and reinvest the proceeds in one call.
///
/// The reinvested amount is the static-call harvest estimate less 2%. A failed
/// estimate counts as zero.
pub async fn compound(ctx: &HarnessContext, dep: &StrategyDeployment) -> Result<U256> {
    let harvest_plan = plan_harvest(ctx, dep).await?;

    let estimate = match read_uint(
        ctx,
        dep,
        StrategyCall::HarvestEstimate {
            swap_data: harvest_plan.encode(),
        },
    )
    .await
    {
        Ok(estimate) => estimate,
        Err(e) => {
            tracing::error!("harvest static call failed, probably reverted: {e:#}");
            U256::ZERO
        }
    };
    let reinvest = estimate - estimate / U256::from(COMPOUND_BUFFER_DIVISOR);
    let invest_plan = plan_invest(ctx, dep, reinvest).await?;

    log_state(ctx, dep, "Before Compound").await;
    let out = ctx
        .chain
        .strategy_call(
            dep.strategy(),
            StrategyCall::Compound {
                amounts: invest_plan.amounts,
                swap_data: harvest_plan.chain(invest_plan.plan).encode(),
            },
        )
        .await
        .context("compound")?
        .tx()?;
    log_state(ctx, dep, "After Compound").await;
    Ok(out.log_word(0))
}
