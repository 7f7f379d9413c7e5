//! Turns a target amount into per-slot amounts plus the swap legs the strategy
//! needs to move between the underlying and its inputs or reward tokens.

pub mod slippage;

use alloy::primitives::U256;
use anyhow::{Context, Result};
use serde::Serialize;

use crate::chain::StrategyCall;
use crate::context::HarnessContext;
use crate::error::HarnessError;
use crate::model::{
    EncodedSwapPlan, MAX_SLOTS, SlotAmounts, StrategyDeployment, SwapRequest, SwapRoute, Token,
};

pub use slippage::{SlippagePolicy, is_stable_pair};

/// Output of `plan_invest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestPlan {
    /// Underlying to allocate per input slot, as `previewInvest` returned it.
    pub amounts: SlotAmounts,
    pub plan: EncodedSwapPlan,
}

/// Output of `plan_liquidate`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LiquidatePlan {
    /// Per-slot amounts to pull out, inflated by the derivation bound.
    pub amounts: SlotAmounts,
    /// Per-slot swap inputs, the inflated amounts reduced by the slippage bound.
    pub swap_amounts: SlotAmounts,
    pub plan: EncodedSwapPlan,
}

fn swap_request(
    ctx: &HarnessContext,
    dep: &StrategyDeployment,
    input: &Token,
    output: &Token,
    amount_wei: U256,
) -> SwapRequest {
    SwapRequest {
        input: input.address,
        output: output.address,
        amount_wei,
        chain_id: ctx.chain_id(),
        payer: dep.strategy(),
        test_payer: ctx.test_payer(),
    }
}

/// Quote `input → output`, paid by the strategy. Fails with `QuoteUnavailable`
/// when no route with a router comes back.
pub(crate) async fn require_route(
    ctx: &HarnessContext,
    dep: &StrategyDeployment,
    input: &Token,
    output: &Token,
    amount_wei: U256,
) -> Result<SwapRoute> {
    let request = swap_request(ctx, dep, input, output, amount_wei);
    let route = ctx
        .quotes
        .best_route(&request)
        .await
        .with_context(|| format!("quoting {input} -> {output}"))?;
    match route {
        Some(route) if !route.is_identity() => Ok(route),
        _ => Err(HarnessError::QuoteUnavailable {
            input: input.symbol.clone(),
            output: output.symbol.clone(),
        }
        .into()),
    }
}

/// Inputs index into fixed `uint256[8]` slot arrays.
fn check_slots(dep: &StrategyDeployment) -> Result<()> {
    if dep.inputs.len() > MAX_SLOTS {
        return Err(HarnessError::SlotOverflow {
            count: dep.inputs.len(),
            max: MAX_SLOTS,
        }
        .into());
    }
    Ok(())
}

/// Split `total` underlying across the inputs and route the swaps into them.
///
/// Slots whose input is the underlying get the identity route and are not quoted.
pub async fn plan_invest(
    ctx: &HarnessContext,
    dep: &StrategyDeployment,
    total: U256,
) -> Result<InvestPlan> {
    check_slots(dep)?;
    let amounts = ctx
        .chain
        .strategy_call(dep.strategy(), StrategyCall::PreviewInvest(total))
        .await
        .context("previewInvest")?
        .slots()?;

    let mut plan = EncodedSwapPlan::default();
    for (i, input) in dep.inputs.iter().enumerate() {
        let route = if input.address == dep.underlying.address {
            SwapRoute::identity(amounts[i])
        } else {
            require_route(ctx, dep, &dep.underlying, input, amounts[i]).await?
        };
        tracing::debug!(
            slot = i,
            input = %input,
            amount = %amounts[i],
            router = ?route.router,
            "invest leg"
        );
        plan.push(route);
    }
    Ok(InvestPlan { amounts, plan })
}

/// Work out how much of each input to pull out for `total` underlying, and route
/// the swaps back into the underlying.
///
/// Non-underlying slots above dust are inflated by the pair's derivation bound,
/// then the swap input is the inflated amount less the slippage bound, so the
/// swap never spends more than the position released. Zero, dust and
/// underlying slots pass through unchanged with the identity route.
pub async fn plan_liquidate(
    ctx: &HarnessContext,
    dep: &StrategyDeployment,
    total: U256,
) -> Result<LiquidatePlan> {
    check_slots(dep)?;
    let mut amounts = ctx
        .chain
        .strategy_call(dep.strategy(), StrategyCall::PreviewLiquidate(total))
        .await
        .context("previewLiquidate")?
        .slots()?;
    let mut swap_amounts = amounts;

    let mut plan = EncodedSwapPlan::default();
    for (i, input) in dep.inputs.iter().enumerate() {
        if input.address == dep.underlying.address || slippage::is_dust(amounts[i]) {
            plan.push(SwapRoute::identity(amounts[i]));
            continue;
        }
        let policy = SlippagePolicy::for_pair(&input.symbol, &dep.underlying.symbol);
        amounts[i] = policy.inflate(amounts[i]);
        swap_amounts[i] = policy.reduce(amounts[i]);
        let route = require_route(ctx, dep, input, &dep.underlying, swap_amounts[i]).await?;
        tracing::debug!(
            slot = i,
            input = %input,
            amount = %amounts[i],
            swap_amount = %swap_amounts[i],
            est_output = %route.estimated_output_wei,
            rate = route.estimated_exchange_rate,
            "liquidate leg"
        );
        plan.push(route);
    }
    Ok(LiquidatePlan {
        amounts,
        swap_amounts,
        plan,
    })
}

/// Route every harvestable reward balance above dust into the underlying.
pub async fn plan_harvest(ctx: &HarnessContext, dep: &StrategyDeployment) -> Result<EncodedSwapPlan> {
    let balances = ctx
        .chain
        .strategy_call(dep.strategy(), StrategyCall::RewardsAvailable)
        .await
        .context("rewardsAvailable")?
        .uints()?;

    let mut plan = EncodedSwapPlan::default();
    for (i, reward) in dep.reward_tokens.iter().enumerate() {
        let balance = balances.get(i).copied().unwrap_or(U256::ZERO);
        let route = if slippage::is_dust(balance) || reward.address == dep.underlying.address {
            SwapRoute::identity(balance)
        } else {
            let amount = slippage::harvest_amount(balance);
            require_route(ctx, dep, reward, &dep.underlying, amount).await?
        };
        tracing::debug!(slot = i, reward = %reward, %balance, router = ?route.router, "harvest leg");
        plan.push(route);
    }
    Ok(plan)
}
