
use std::sync::Arc;

use alloy::primitives::U256;

use strat_harness::config::StrategyConfig;
use strat_harness::context::HarnessContext;
use strat_harness::deploy::deploy_strategy;
use strat_harness::error::HarnessError;
use strat_harness::model::StrategyDeployment;
use strat_harness::planner::{plan_harvest, plan_invest, plan_liquidate};

use mock_common::*;

async fn deployment(
    chain: &Arc<MockChain>,
    quotes: &Arc<MockQuotes>,
    cfg: StrategyConfig,
) -> (HarnessContext, StrategyDeployment) {
    let mut ctx = harness(chain, quotes);
    let dep = deploy_strategy(&mut ctx, &cfg, false).await.unwrap();
    (ctx, dep)
}

fn with_inputs(inputs: &[&str]) -> StrategyConfig {
    let mut cfg = strategy_config();
    cfg.inputs = inputs.iter().map(|s| s.to_string()).collect();
    cfg.input_weights = vec![];
    cfg
}

// ── Invest ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invest_underlying_slot_is_identity() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let (ctx, dep) = deployment(&chain, &quotes, strategy_config()).await;

    let planned = plan_invest(&ctx, &dep, usdc_units(20)).await.unwrap();

    assert_eq!(planned.amounts, slots(&[10_000_000, 10_000_000]));
    assert_eq!(planned.plan.len(), 2);
    assert!(planned.plan.legs[0].router.is_none());
    assert!(planned.plan.legs[0].call_data.is_empty());
    assert_eq!(planned.plan.legs[1].router, Some(router()));

    // only the USDT slot is quoted, paid by the strategy
    let requests = quotes.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!((requests[0].input, requests[0].output), (usdc(), usdt()));
    assert_eq!(requests[0].amount_wei, usdc_units(10));
    assert_eq!(requests[0].payer, dep.strategy());
    assert_eq!(requests[0].chain_id, CHAIN_ID);
}

#[tokio::test]
async fn test_invest_without_route_is_quote_unavailable() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    quotes.unavailable(usdc(), usdt());
    let (ctx, dep) = deployment(&chain, &quotes, strategy_config()).await;

    let err = plan_invest(&ctx, &dep, usdc_units(20)).await.unwrap_err();
    match err.downcast_ref::<HarnessError>() {
        Some(HarnessError::QuoteUnavailable { input, output }) => {
            assert_eq!(input, "USDC");
            assert_eq!(output, "USDT");
        }
        other => panic!("expected QuoteUnavailable, got {other:?}"),
    }
}

// ── Liquidate ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_liquidate_stable_inputs() {
    let chain = MockChain::simulated();
    chain.with_vault(|v| v.liquidate_split = Some(slots(&[30_000_000, 20_000_000])));
    let quotes = MockQuotes::new();
    let (ctx, dep) = deployment(&chain, &quotes, with_inputs(&["USDT", "DAI"])).await;

    let planned = plan_liquidate(&ctx, &dep, usdc_units(50)).await.unwrap();

    assert_eq!(planned.amounts, slots(&[30_030_000, 20_020_000]));
    assert_eq!(planned.swap_amounts, slots(&[30_022_492, 20_014_995]));
    for i in 0..2 {
        let original = [30_000_000u64, 20_000_000][i];
        assert!(planned.swap_amounts[i] <= planned.amounts[i]);
        assert!(planned.swap_amounts[i] >= U256::from(original));
        assert_eq!(planned.plan.legs[i].router, Some(router()));
    }

    let requests = quotes.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!((requests[0].input, requests[0].output), (usdt(), usdc()));
    assert_eq!(requests[0].amount_wei, U256::from(30_022_492u64));
    assert_eq!((requests[1].input, requests[1].output), (dai(), usdc()));
}

#[tokio::test]
async fn test_liquidate_volatile_input_uses_wider_bounds() {
    let chain = MockChain::simulated();
    chain.with_vault(|v| v.liquidate_split = Some(slots(&[1_000_000])));
    let quotes = MockQuotes::new();
    let (ctx, dep) = deployment(&chain, &quotes, with_inputs(&["WETH"])).await;

    let planned = plan_liquidate(&ctx, &dep, usdc_units(1)).await.unwrap();

    assert_eq!(planned.amounts[0], U256::from(1_010_000u64));
    assert_eq!(planned.swap_amounts[0], U256::from(1_007_475u64));
}

#[tokio::test]
async fn test_liquidate_dust_and_underlying_slots_pass_through() {
    let chain = MockChain::simulated();
    chain.with_vault(|v| v.liquidate_split = Some(slots(&[5_000_000, 7, 0])));
    let quotes = MockQuotes::new();
    let (ctx, dep) = deployment(&chain, &quotes, with_inputs(&["USDC", "USDT", "DAI"])).await;

    let planned = plan_liquidate(&ctx, &dep, usdc_units(5)).await.unwrap();

    assert_eq!(planned.amounts, slots(&[5_000_000, 7, 0]));
    assert_eq!(planned.swap_amounts, planned.amounts);
    assert!(planned.plan.legs.iter().all(|l| l.router.is_none()));
    assert!(quotes.requests().is_empty());
}

// ── Harvest ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_harvest_skips_dust_rewards() {
    let chain = MockChain::simulated();
    chain.with_vault(|v| v.rewards = vec![U256::from(10u64)]);
    let quotes = MockQuotes::new();
    let (ctx, dep) = deployment(&chain, &quotes, strategy_config()).await;

    let plan = plan_harvest(&ctx, &dep).await.unwrap();

    assert_eq!(plan.len(), 1);
    assert!(plan.legs[0].router.is_none());
    assert!(quotes.requests().is_empty());
}

#[tokio::test]
async fn test_harvest_quotes_rewards_less_buffer() {
    let chain = MockChain::simulated();
    chain.with_vault(|v| v.rewards = vec![ether(3)]);
    let quotes = MockQuotes::new();
    let (ctx, dep) = deployment(&chain, &quotes, strategy_config()).await;

    let plan = plan_harvest(&ctx, &dep).await.unwrap();

    assert_eq!(plan.legs[0].router, Some(router()));
    let requests = quotes.requests();
    assert_eq!((requests[0].input, requests[0].output), (xvs(), usdc()));
    assert_eq!(requests[0].amount_wei, ether(3) - ether(3) / U256::from(1_000u64));
    assert_eq!(plan.encode().len(), 1);
}

// ── Slot capacity ───────────────────────────────────────────────────

#[tokio::test]
async fn test_plans_reject_more_inputs_than_slots() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let (ctx, mut dep) = deployment(&chain, &quotes, strategy_config()).await;
    dep.inputs = vec![dep.inputs[1].clone(); 9];

    let err = plan_invest(&ctx, &dep, usdc_units(20)).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HarnessError>(),
        Some(HarnessError::SlotOverflow { count: 9, max: 8 })
    ));
    let err = plan_liquidate(&ctx, &dep, usdc_units(20)).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<HarnessError>(),
        Some(HarnessError::SlotOverflow { count: 9, max: 8 })
    ));
    assert!(quotes.requests().is_empty());
}
