
use std::collections::BTreeSet;

use alloy::primitives::Address;

use strat_harness::config::OracleConfig;
use strat_harness::context::HarnessContext;
use strat_harness::deploy::{self, deploy_strategy, materialize};
use strat_harness::error::HarnessError;
use strat_harness::model::{DeployableUnit, UnitKind};
use strat_harness::ops::setup_strategy;

use mock_common::*;

fn pyth_config() -> strat_harness::config::StrategyConfig {
    let mut cfg = strategy_config();
    cfg.oracle = OracleConfig::Pyth {
        pyth: "oracles.Pyth".into(),
        underlying_pyth_id: format!("0x{}", "ea".repeat(32)),
        input_pyth_ids: vec![format!("0x{}", "ea".repeat(32)), format!("0x{}", "2b".repeat(32))],
    };
    cfg
}

fn harness_error(err: &anyhow::Error) -> &HarnessError {
    err.downcast_ref::<HarnessError>()
        .unwrap_or_else(|| panic!("expected a HarnessError, got {err:#}"))
}

// ── Ordering and linking ────────────────────────────────────────────

#[tokio::test]
async fn test_deploys_libraries_before_agent_and_strategy() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    let dep = deploy_strategy(&mut ctx, &pyth_config(), false).await.unwrap();

    assert_eq!(
        chain.deployed_names(),
        [
            "Swapper",
            "AsMaths",
            "AsAccounting",
            "PythUtils",
            "StrategyV5Agent",
            "Astrolab Primitive Venus USD",
        ]
    );
    assert_ne!(dep.strategy(), Address::ZERO);
    assert_ne!(dep.agent(), Address::ZERO);
    assert!(dep.units.values().all(|u| u.deployed));
}

#[tokio::test]
async fn test_agent_and_strategy_link_sets_differ() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    let dep = deploy_strategy(&mut ctx, &pyth_config(), false).await.unwrap();
    let order = chain.deployed_names();
    let position = |name: &str| order.iter().position(|n| n == name).unwrap();
    // the agent must exist before the strategy, which gets its address at init
    assert!(position("StrategyV5Agent") < position("Astrolab Primitive Venus USD"));

    let agent = chain.deploy_request("StrategyV5Agent").unwrap();
    let agent_libs: Vec<_> = agent.libraries.keys().cloned().collect();
    assert_eq!(agent_libs, ["AsAccounting", "AsMaths"]);

    let strategy = chain.deploy_request("Astrolab Primitive Venus USD").unwrap();
    let strategy_libs: Vec<_> = strategy.libraries.keys().cloned().collect();
    assert_eq!(strategy_libs, ["AsAccounting", "PythUtils"]);
    assert_eq!(strategy.libraries["PythUtils"], dep.unit("PythUtils").unwrap().address);
}

// ── Idempotency ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_second_materialization_deploys_nothing() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    let first = deploy_strategy(&mut ctx, &strategy_config(), false).await.unwrap();
    let deployed = chain.deployed_names().len();

    // same context: units come from the cache
    let again = deploy_strategy(&mut ctx, &strategy_config(), false).await.unwrap();
    assert_eq!(chain.deployed_names().len(), deployed);
    assert_eq!(again.strategy(), first.strategy());
    assert!(again
        .units
        .values()
        .filter(|u| u.name != "Swapper")
        .all(|u| !u.deployed));

    // fresh context over the recorded address book: units are bound, not deployed
    let mut fresh = HarnessContext::new(chain.clone(), quotes.clone(), ctx.addresses.clone());
    let bound = deploy_strategy(&mut fresh, &strategy_config(), false).await.unwrap();
    assert_eq!(chain.deployed_names().len(), deployed);
    assert_eq!(bound.strategy(), first.strategy());
    assert_eq!(bound.agent(), first.agent());
}

#[tokio::test]
async fn test_existing_address_is_bound_and_linked() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);
    let maths = Address::repeat_byte(0x42);

    let out = materialize(
        &mut ctx,
        vec![
            DeployableUnit::library("AsMaths").with_existing(Some(maths)),
            DeployableUnit::library("AsAccounting"),
        ],
        false,
    )
    .await
    .unwrap();

    assert_eq!(chain.deployed_names(), ["AsAccounting"]);
    assert_eq!(out.address("AsMaths"), Some(maths));
    assert!(!out.units["AsMaths"].deployed);
    let request = chain.deploy_request("AsAccounting").unwrap();
    assert_eq!(request.libraries["AsMaths"], maths);
    assert_eq!(
        ctx.addresses.lib("AsAccounting").unwrap(),
        out.address("AsAccounting")
    );
}

// ── Verification ────────────────────────────────────────────────────

#[tokio::test]
async fn test_verify_submits_only_deployed_units() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    materialize(
        &mut ctx,
        vec![
            DeployableUnit::library("AsMaths").with_existing(Some(Address::repeat_byte(0x42))),
            DeployableUnit::library("AsAccounting"),
        ],
        true,
    )
    .await
    .unwrap();

    assert_eq!(chain.verified_names(), ["AsAccounting"]);
}

#[tokio::test]
async fn test_no_verification_unless_requested() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    deploy_strategy(&mut ctx, &strategy_config(), false).await.unwrap();
    assert!(chain.verified_names().is_empty());

    // a fresh context binds everything from the address book: nothing to verify
    let mut fresh = HarnessContext::new(chain.clone(), quotes.clone(), ctx.addresses.clone());
    deploy_strategy(&mut fresh, &strategy_config(), true).await.unwrap();
    assert!(chain.verified_names().is_empty());
}

#[tokio::test]
async fn test_verify_covers_the_whole_fresh_stack() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    deploy_strategy(&mut ctx, &strategy_config(), true).await.unwrap();

    assert_eq!(chain.verified_names(), chain.deployed_names());
}

// ── Failures ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_failed_deploy_is_a_deployment_error() {
    let chain = MockChain::simulated();
    chain.fail_deploy("StrategyV5Agent");
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    let err = deploy_strategy(&mut ctx, &strategy_config(), false).await.unwrap_err();
    match harness_error(&err) {
        HarnessError::Deployment { unit, .. } => assert_eq!(unit, "StrategyV5Agent"),
        other => panic!("unexpected error {other}"),
    }
    assert!(!chain.deployed_names().iter().any(|n| n.starts_with("Astrolab")));
}

#[tokio::test]
async fn test_dependency_cycle_is_rejected() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    let mut a = DeployableUnit::library("LibA");
    a.required_libraries = BTreeSet::from(["LibB".to_string()]);
    let mut b = DeployableUnit::library("LibB");
    b.required_libraries = BTreeSet::from(["LibA".to_string()]);

    let err = materialize(&mut ctx, vec![a, b], false).await.unwrap_err();
    assert!(matches!(harness_error(&err), HarnessError::DependencyCycle { units } if units.len() == 2));
    assert!(chain.deployed_names().is_empty());
}

#[tokio::test]
async fn test_unknown_dependency_is_rejected() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    let mut lib = DeployableUnit::library("AsAccounting");
    lib.required_libraries = BTreeSet::from(["Missing".to_string()]);

    let err = materialize(&mut ctx, vec![lib], false).await.unwrap_err();
    assert!(matches!(
        harness_error(&err),
        HarnessError::UnknownDependency { dependency, .. } if dependency == "Missing"
    ));
}

#[tokio::test]
async fn test_too_many_inputs_overflow() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);
    let mut cfg = strategy_config();
    cfg.inputs = vec!["USDC".to_string(); 9];

    let err = deploy_strategy(&mut ctx, &cfg, false).await.unwrap_err();
    assert!(matches!(harness_error(&err), HarnessError::SlotOverflow { count: 9, max: 8 }));
}

// ── Setup ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_setup_initializes_once() {
    let chain = MockChain::simulated();
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    let dep = setup_strategy(&mut ctx, &strategy_config(), false).await.unwrap();
    let vault = chain.vault();
    assert_eq!(vault.agent, dep.agent());
    assert_eq!(vault.inputs, vec![usdc(), usdt()]);
    assert_eq!(vault.min_liquidity, usdc_units(10));
    assert!(vault.roles.contains(&(KEEPER_ROLE, signer())));
    assert!(vault.roles.contains(&(MANAGER_ROLE, signer())));
    let writes = chain.writes().len();

    // already initialized, roles granted, min liquidity set: nothing to write
    setup_strategy(&mut ctx, &strategy_config(), false).await.unwrap();
    assert_eq!(chain.writes().len(), writes);
}

#[tokio::test]
async fn test_setup_detects_input_order_mismatch() {
    let chain = MockChain::simulated();
    chain.with_vault(|v| v.inputs_override = Some(vec![usdt(), usdc()]));
    let quotes = MockQuotes::new();
    let mut ctx = harness(&chain, &quotes);

    let err = setup_strategy(&mut ctx, &strategy_config(), false).await.unwrap_err();
    match harness_error(&err) {
        HarnessError::StateMismatch { kind, index, .. } => {
            assert_eq!(kind, "Input");
            assert_eq!(*index, 0);
        }
        other => panic!("unexpected error {other}"),
    }
}

#[test]
fn test_link_set_helpers() {
    let libs = [
        DeployableUnit::library("AsMaths"),
        DeployableUnit::library("AsAccounting"),
        DeployableUnit::library("ChainlinkUtils"),
    ];
    let agent = deploy::agent_link_set(&libs);
    let strategy = deploy::strategy_link_set(&libs);
    assert!(agent.contains("AsMaths") && !agent.contains("ChainlinkUtils"));
    assert!(strategy.contains("ChainlinkUtils") && !strategy.contains("AsMaths"));
    assert!(libs.iter().all(|u| matches!(u.kind, UnitKind::Library(_))));
}
