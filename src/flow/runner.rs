use std::time::Instant;

use alloy::primitives::U256;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::Flow;
use crate::chain::SnapshotId;
use crate::context::HarnessContext;
use crate::model::StrategyDeployment;
use crate::ops;

/// Blocks mined after a time jump so block-number based accrual catches up.
pub const BLOCKS_AFTER_TIME_TRAVEL: u64 = 32;

/// Steps a flow moves through. Every flow ends in `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowState {
    Idle,
    Snapshot,
    AdvanceTime,
    Execute,
    Assert,
    Revert,
    Done,
}

/// Result of one flow, as written to the suite report.
#[derive(Debug, Clone, Serialize)]
pub struct FlowOutcome {
    pub operation: String,
    pub passed: bool,
    /// Value returned by the operation. `None` when it failed.
    pub result: Option<U256>,
    pub error: Option<String>,
    pub snapshot_taken: bool,
    pub reverted: bool,
    /// Chain timestamp when the flow started.
    pub time_before: Option<u64>,
    /// Chain timestamp once time was advanced and blocks mined.
    pub time_advanced: Option<u64>,
    /// Chain timestamp after execution, before any revert.
    pub time_after: Option<u64>,
    /// Chain timestamp after the revert.
    pub time_restored: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub trace: Vec<FlowState>,
}

/// Drives flows against one deployed strategy.
///
/// Snapshots, reverts and time travel only happen on simulated chains. On a
/// live chain a flow is execute then assert.
pub struct FlowRunner<'a> {
    ctx: &'a HarnessContext,
    dep: &'a StrategyDeployment,
}

impl<'a> FlowRunner<'a> {
    pub fn new(ctx: &'a HarnessContext, dep: &'a StrategyDeployment) -> Self {
        FlowRunner { ctx, dep }
    }

    async fn timestamp(&self) -> Option<u64> {
        match self.ctx.chain.block_timestamp().await {
            Ok(t) => Some(t),
            Err(e) => {
                tracing::warn!("reading block timestamp: {e:#}");
                None
            }
        }
    }

    pub async fn run(&self, flow: &Flow) -> FlowOutcome {
        let started_at = Utc::now();
        let clock = Instant::now();
        let simulated = self.ctx.is_simulated();
        let name = flow.operation.to_string();

        let mut state = FlowState::Idle;
        let mut trace = vec![state];
        let mut snapshot: Option<SnapshotId> = None;
        let mut result: Option<U256> = None;
        let mut error: Option<String> = None;
        let mut passed = false;
        let mut reverted = false;
        let mut time_before = None;
        let mut time_advanced = None;
        let mut time_after = None;
        let mut time_restored = None;

        while state != FlowState::Done {
            state = match state {
                FlowState::Idle => {
                    time_before = self.timestamp().await;
                    if !simulated && (flow.revert || flow.elapsed_seconds > 0) {
                        tracing::info!(flow = %name, "live chain, skipping snapshot and time travel");
                    }
                    if simulated && flow.revert {
                        FlowState::Snapshot
                    } else if simulated && flow.elapsed_seconds > 0 {
                        FlowState::AdvanceTime
                    } else {
                        FlowState::Execute
                    }
                }
                FlowState::Snapshot => {
                    match self.ctx.chain.snapshot().await {
                        Ok(id) => {
                            tracing::debug!(flow = %name, id = %id.0, "snapshot taken");
                            snapshot = Some(id);
                        }
                        Err(e) => error = Some(format!("snapshot failed: {e:#}")),
                    }
                    if error.is_some() {
                        FlowState::Assert
                    } else if flow.elapsed_seconds > 0 {
                        FlowState::AdvanceTime
                    } else {
                        FlowState::Execute
                    }
                }
                FlowState::AdvanceTime => {
                    let jumped = async {
                        self.ctx.chain.advance_time(flow.elapsed_seconds).await?;
                        self.ctx.chain.mine(BLOCKS_AFTER_TIME_TRAVEL).await
                    }
                    .await;
                    match jumped {
                        Ok(()) => {
                            time_advanced = self.timestamp().await;
                            tracing::info!(
                                flow = %name,
                                seconds = flow.elapsed_seconds,
                                before = ?time_before,
                                after = ?time_advanced,
                                "advanced time"
                            );
                            FlowState::Execute
                        }
                        Err(e) => {
                            error = Some(format!("advancing time failed: {e:#}"));
                            FlowState::Assert
                        }
                    }
                }
                FlowState::Execute => {
                    tracing::info!(flow = %name, "executing");
                    match ops::execute(self.ctx, self.dep, &flow.operation).await {
                        Ok(value) => result = Some(value),
                        Err(e) => {
                            tracing::error!(flow = %name, "execution failed: {e:#}");
                            error = Some(format!("{e:#}"));
                        }
                    }
                    time_after = self.timestamp().await;
                    FlowState::Assert
                }
                FlowState::Assert => {
                    // a failed execution never passes, whatever the predicate says
                    passed = error.is_none() && flow.assertion.check(result);
                    if passed {
                        tracing::info!(flow = %name, result = ?result, "passed");
                    } else {
                        tracing::error!(flow = %name, result = ?result, assertion = ?flow.assertion, "failed");
                    }
                    if snapshot.is_some() {
                        FlowState::Revert
                    } else {
                        FlowState::Done
                    }
                }
                FlowState::Revert => {
                    if let Some(id) = snapshot {
                        match self.ctx.chain.revert(id).await {
                            Ok(()) => {
                                reverted = true;
                                time_restored = self.timestamp().await;
                                tracing::info!(
                                    flow = %name,
                                    before = ?time_after,
                                    after = ?time_restored,
                                    "reverted to snapshot"
                                );
                            }
                            Err(e) => {
                                tracing::error!(flow = %name, "revert failed: {e:#}");
                                passed = false;
                                error.get_or_insert_with(|| format!("revert failed: {e:#}"));
                            }
                        }
                    }
                    FlowState::Done
                }
                FlowState::Done => FlowState::Done,
            };
            trace.push(state);
        }

        FlowOutcome {
            operation: name,
            passed,
            result,
            error,
            snapshot_taken: snapshot.is_some(),
            reverted,
            time_before,
            time_advanced,
            time_after,
            time_restored,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
            trace,
        }
    }
}
