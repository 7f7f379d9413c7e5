//! Cheat-code paths of the RPC adapter against a local Anvil node.
//!
//! Requires `anvil` on PATH. Run with `cargo test --test test_anvil -- --ignored`.

use alloy::node_bindings::{Anvil, AnvilInstance};
use alloy::primitives::U256;

use strat_harness::chain::artifacts::ArtifactStore;
use strat_harness::chain::{ChainAdapter, ChainKind, evm::AlloyChain};
use strat_harness::model::Chain;

async fn connect(simulated: Option<bool>) -> (AnvilInstance, AlloyChain) {
    let anvil = Anvil::new().spawn();
    let mut chain = Chain::fork(anvil.chain_id(), anvil.endpoint());
    chain.simulated = simulated;
    let key = hex::encode(anvil.keys()[0].to_bytes());
    let adapter = AlloyChain::connect(&chain, &key, ArtifactStore::new("artifacts"))
        .await
        .unwrap();
    (anvil, adapter)
}

#[tokio::test]
#[ignore]
async fn test_anvil_is_detected_as_simulated() {
    let (anvil, chain) = connect(None).await;
    assert_eq!(chain.kind(), ChainKind::Simulated);
    assert_eq!(chain.signer(), anvil.addresses()[0]);
    assert!(chain.native_balance(chain.signer()).await.unwrap() > U256::ZERO);
}

#[tokio::test]
#[ignore]
async fn test_override_forces_live() {
    let (_anvil, chain) = connect(Some(false)).await;
    assert_eq!(chain.kind(), ChainKind::Live);
}

#[tokio::test]
#[ignore]
async fn test_time_travel_is_undone_by_revert() {
    let (_anvil, chain) = connect(None).await;
    let start = chain.block_timestamp().await.unwrap();

    let id = chain.snapshot().await.unwrap();
    chain.advance_time(7 * 86_400).await.unwrap();
    chain.mine(32).await.unwrap();
    assert!(chain.block_timestamp().await.unwrap() >= start + 7 * 86_400);

    chain.revert(id).await.unwrap();
    let restored = chain.block_timestamp().await.unwrap();
    assert!(restored < start + 86_400, "timestamp {restored} not restored");
}

#[tokio::test]
#[ignore]
async fn test_wrong_chain_id_is_rejected() {
    let anvil = Anvil::new().spawn();
    let chain = Chain::fork(anvil.chain_id() + 1, anvil.endpoint());
    let key = hex::encode(anvil.keys()[0].to_bytes());
    let err = AlloyChain::connect(&chain, &key, ArtifactStore::new("artifacts"))
        .await
        .err()
        .unwrap();
    assert!(err.to_string().contains("suite expects"), "{err:#}");
}
