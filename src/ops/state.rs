use alloy::primitives::U256;
use anyhow::Result;
use serde::Serialize;

use super::read_uint;
use crate::chain::StrategyCall;
use crate::context::HarnessContext;
use crate::model::StrategyDeployment;

/// Strategy accounting at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StrategyState {
    pub share_price: U256,
    pub total_assets: U256,
    pub invested: U256,
    pub available: U256,
    /// Underlying held by the strategy contract itself.
    pub underlying_balance: U256,
    /// Strategy shares held by the deployer.
    pub deployer_shares: U256,
}

async fn read_state(ctx: &HarnessContext, dep: &StrategyDeployment) -> Result<StrategyState> {
    Ok(StrategyState {
        share_price: read_uint(ctx, dep, StrategyCall::SharePrice).await?,
        total_assets: read_uint(ctx, dep, StrategyCall::TotalAssets).await?,
        invested: read_uint(ctx, dep, StrategyCall::Invested).await?,
        available: read_uint(ctx, dep, StrategyCall::Available).await?,
        underlying_balance: ctx
            .chain
            .balance_of(dep.underlying.address, dep.strategy())
            .await?,
        deployer_shares: read_uint(ctx, dep, StrategyCall::BalanceOf(ctx.deployer())).await?,
    })
}

/// Read and log the strategy state. Read failures are logged, not raised.
pub async fn log_state(ctx: &HarnessContext, dep: &StrategyDeployment, step: &str) -> Option<StrategyState> {
    match read_state(ctx, dep).await {
        Ok(state) => {
            let ul = &dep.underlying;
            tracing::info!(
                step,
                share_price = %state.share_price,
                total_assets = ul.to_amount(state.total_assets),
                invested = ul.to_amount(state.invested),
                available = ul.to_amount(state.available),
                balance = ul.to_amount(state.underlying_balance),
                shares = %state.deployer_shares,
                "{} state", dep.name
            );
            Some(state)
        }
        Err(e) => {
            tracing::warn!(step, "could not read strategy state: {e:#}");
            None
        }
    }
}
