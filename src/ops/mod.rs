//! Economic operations against a deployed strategy.
//!
//! Every operation logs the strategy state around its transaction and returns a
//! `U256` read from the last event of the receipt. Skipped operations return 1.

pub mod allocation;
pub mod funding;
pub mod setup;
pub mod state;
pub mod vault;

use alloy::primitives::{Address, U256};
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::chain::StrategyCall;
use crate::context::HarnessContext;
use crate::model::StrategyDeployment;

pub use funding::fund_account;
pub use setup::setup_strategy;
pub use state::{StrategyState, log_state};

/// Returned by operations that had nothing to do.
pub const SKIPPED: u64 = 1;

fn default_small() -> f64 {
    10.0
}

fn default_large() -> f64 {
    50.0
}

/// One economic operation. Amounts are in human units of the underlying.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    SeedLiquidity {
        #[serde(default = "default_small")]
        amount: f64,
    },
    Deposit {
        #[serde(default = "default_small")]
        amount: f64,
    },
    /// Deposit `input`, swapped into the underlying by the strategy.
    SwapDeposit {
        input: String,
        #[serde(default = "default_small")]
        amount: f64,
    },
    /// Invest idle liquidity. No amount invests everything available.
    Invest {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<f64>,
    },
    Liquidate {
        #[serde(default = "default_large")]
        amount: f64,
    },
    Harvest,
    Compound,
    Withdraw {
        #[serde(default = "default_large")]
        amount: f64,
    },
    RequestWithdraw {
        #[serde(default = "default_large")]
        amount: f64,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::SeedLiquidity { .. } => "seedLiquidity",
            Operation::Deposit { .. } => "deposit",
            Operation::SwapDeposit { .. } => "swapDeposit",
            Operation::Invest { .. } => "invest",
            Operation::Liquidate { .. } => "liquidate",
            Operation::Harvest => "harvest",
            Operation::Compound => "compound",
            Operation::Withdraw { .. } => "withdraw",
            Operation::RequestWithdraw { .. } => "requestWithdraw",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::SeedLiquidity { amount }
            | Operation::Deposit { amount }
            | Operation::Liquidate { amount }
            | Operation::Withdraw { amount }
            | Operation::RequestWithdraw { amount } => write!(f, "{}({amount})", self.name()),
            Operation::SwapDeposit { input, amount } => write!(f, "{}({input}, {amount})", self.name()),
            Operation::Invest { amount: Some(amount) } => write!(f, "{}({amount})", self.name()),
            Operation::Invest { amount: None } | Operation::Harvest | Operation::Compound => {
                write!(f, "{}()", self.name())
            }
        }
    }
}

/// Dispatch an operation to its handler.
pub async fn execute(ctx: &HarnessContext, dep: &StrategyDeployment, op: &Operation) -> Result<U256> {
    match op {
        Operation::SeedLiquidity { amount } => vault::seed_liquidity(ctx, dep, *amount).await,
        Operation::Deposit { amount } => vault::deposit(ctx, dep, *amount).await,
        Operation::SwapDeposit { input, amount } => vault::swap_deposit(ctx, dep, input, *amount).await,
        Operation::Invest { amount } => allocation::invest(ctx, dep, *amount).await,
        Operation::Liquidate { amount } => allocation::liquidate(ctx, dep, *amount).await,
        Operation::Harvest => allocation::harvest(ctx, dep).await,
        Operation::Compound => allocation::compound(ctx, dep).await,
        Operation::Withdraw { amount } => vault::withdraw(ctx, dep, *amount).await,
        Operation::RequestWithdraw { amount } => vault::request_withdraw(ctx, dep, *amount).await,
    }
}

/// A uint-returning strategy read.
pub(crate) async fn read_uint(
    ctx: &HarnessContext,
    dep: &StrategyDeployment,
    call: StrategyCall,
) -> Result<U256> {
    ctx.chain.strategy_call(dep.strategy(), call).await?.uint()
}

/// Approve `spender` for the max amount when the current allowance is below `amount`.
pub(crate) async fn ensure_allowance(
    ctx: &HarnessContext,
    token: Address,
    spender: Address,
    amount: U256,
) -> Result<()> {
    let owner = ctx.deployer();
    let allowance = ctx
        .chain
        .allowance(token, owner, spender)
        .await
        .context("reading allowance")?;
    if allowance < amount {
        tracing::debug!(%token, %spender, "approving");
        ctx.chain.approve(token, spender, U256::MAX).await.context("approve")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_json_defaults() {
        let op: Operation = serde_json::from_str(r#"{ "op": "liquidate" }"#).unwrap();
        assert_eq!(op, Operation::Liquidate { amount: 50.0 });
        let op: Operation = serde_json::from_str(r#"{ "op": "invest" }"#).unwrap();
        assert_eq!(op, Operation::Invest { amount: None });
        let op: Operation =
            serde_json::from_str(r#"{ "op": "swap_deposit", "input": "USDT", "amount": 5 }"#).unwrap();
        assert_eq!(op.to_string(), "swapDeposit(USDT, 5)");
    }
}
