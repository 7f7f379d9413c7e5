use std::path::Path;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Assertion, Flow, FlowOutcome, FlowRunner};
use crate::config::{FundingRequest, SuiteConfig};
use crate::context::HarnessContext;
use crate::error::HarnessError;
use crate::model::StrategyDeployment;
use crate::ops::{self, Operation};

const DAY: u64 = 24 * 60 * 60;

/// The flows a suite runs when its file lists none.
pub fn default_suite() -> Vec<Flow> {
    vec![
        Flow::new(Operation::SeedLiquidity { amount: 10.0 }).expect(Assertion::Positive),
        Flow::new(Operation::Deposit { amount: 10.0 }).expect(Assertion::Positive),
        Flow::new(Operation::Invest { amount: None }).expect(Assertion::Positive),
        Flow::new(Operation::Liquidate { amount: 50.0 })
            .after(DAY)
            .expect(Assertion::Positive),
        Flow::new(Operation::Harvest)
            .after(7 * DAY)
            .reverted()
            .expect(Assertion::Positive),
        Flow::new(Operation::Compound).reverted().expect(Assertion::Positive),
        Flow::new(Operation::RequestWithdraw { amount: 50.0 }).expect(Assertion::Positive),
        Flow::new(Operation::Withdraw { amount: 50.0 }).expect(Assertion::Positive),
    ]
}

/// Outcome of a whole suite.
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub chain_id: u64,
    pub simulated: bool,
    pub strategy: Address,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub passed: usize,
    pub failed: usize,
    pub flows: Vec<FlowOutcome>,
}

impl SuiteReport {
    pub fn success(&self) -> bool {
        self.failed == 0
    }

    /// `AssertionFailure` naming the first failed flow, if any.
    pub fn ensure_passed(&self) -> Result<()> {
        match self.flows.iter().find(|f| !f.passed) {
            Some(flow) => Err(HarnessError::AssertionFailure {
                flow: flow.operation.clone(),
            }
            .into()),
            None => Ok(()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
        Ok(())
    }

    pub fn print_summary(&self) {
        println!("Suite '{}' on chain {}", self.suite, self.chain_id);
        for flow in &self.flows {
            let mark = if flow.passed { "PASS" } else { "FAIL" };
            match (&flow.result, &flow.error) {
                (_, Some(err)) => println!("  [{mark}] {}: {err}", flow.operation),
                (Some(result), None) => println!("  [{mark}] {} -> {result}", flow.operation),
                (None, None) => println!("  [{mark}] {}", flow.operation),
            }
        }
        println!("{} passed, {} failed", self.passed, self.failed);
    }
}

/// Run `flows` in order against a deployed strategy.
pub async fn run_flows(
    ctx: &HarnessContext,
    dep: &StrategyDeployment,
    suite: &str,
    flows: &[Flow],
) -> SuiteReport {
    let started_at = Utc::now();
    let runner = FlowRunner::new(ctx, dep);
    let mut outcomes = Vec::with_capacity(flows.len());
    for (i, flow) in flows.iter().enumerate() {
        tracing::info!(index = i + 1, total = flows.len(), flow = %flow.operation, "flow");
        outcomes.push(runner.run(flow).await);
    }
    let passed = outcomes.iter().filter(|o| o.passed).count();
    SuiteReport {
        suite: suite.to_string(),
        chain_id: ctx.chain_id(),
        simulated: ctx.is_simulated(),
        strategy: dep.strategy(),
        started_at,
        finished_at: Utc::now(),
        passed,
        failed: outcomes.len() - passed,
        flows: outcomes,
    }
}

/// Swap wrapped gas into each requested asset.
pub async fn fund(ctx: &mut HarnessContext, requests: &[FundingRequest]) -> Result<()> {
    if requests.is_empty() {
        return Ok(());
    }
    let wgas = ctx.token("WGAS").await?;
    for request in requests {
        let asset = ctx.token(&request.asset).await?;
        let received = ops::fund_account(ctx, asset.address, wgas.to_wei(request.amount))
            .await
            .with_context(|| format!("funding {asset}"))?;
        tracing::info!(
            %asset,
            received = asset.to_amount(received),
            spent = request.amount,
            "funded deployer"
        );
    }
    Ok(())
}

/// Fund the deployer, then run the suite's flows against a set-up strategy.
///
/// Funding errors abort the suite. Flow failures are recorded in the report
/// instead.
pub async fn run_suite(
    ctx: &mut HarnessContext,
    suite: &SuiteConfig,
    dep: &StrategyDeployment,
) -> Result<SuiteReport> {
    fund(ctx, &suite.funding).await?;
    let flows = if suite.flows.is_empty() {
        tracing::info!("no flows configured, running the default suite");
        default_suite()
    } else {
        suite.flows.clone()
    };
    Ok(run_flows(ctx, dep, &suite.name, &flows).await)
}
