pub mod artifacts;
pub mod evm;
pub mod verify;

use std::collections::BTreeMap;

use alloy::primitives::{Address, B256, Bytes, U256};
use anyhow::{Result, bail};
use async_trait::async_trait;

use crate::model::{InitParams, MaterializedUnit, SlotAmounts};

/// Whether the node behind the adapter can rewind state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainKind {
    /// Fork or devnet with snapshot/revert/time control (anvil, hardhat).
    Simulated,
    /// Real network. State changes are permanent.
    Live,
}

/// Opaque restore handle returned by `snapshot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotId(pub U256);

/// What the orchestrator asks the adapter to deploy.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployRequest {
    pub name: String,
    pub contract: String,
    pub constructor_args: Bytes,
    /// Library name → address, spliced into the bytecode.
    pub libraries: BTreeMap<String, Address>,
}

/// A confirmed transaction and the data words of its last event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TxOutcome {
    pub hash: Option<B256>,
    pub log_words: Vec<U256>,
}

impl TxOutcome {
    /// Word `index` of the last event's data. Negative indexes count from the end.
    pub fn log_word(&self, index: isize) -> U256 {
        let len = self.log_words.len() as isize;
        let i = if index < 0 { len + index } else { index };
        if i < 0 || i >= len {
            return U256::ZERO;
        }
        self.log_words[i as usize]
    }
}

/// Arguments to `Swapper.swap(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwapperCall {
    pub input: Address,
    pub output: Address,
    pub amount: U256,
    pub min_out: U256,
    pub router: Address,
    pub call_data: Bytes,
}

/// The strategy's call surface, as a closed set.
#[derive(Debug, Clone, PartialEq)]
pub enum StrategyCall {
    // ── Reads ──
    Agent,
    Inputs(usize),
    RewardTokens(usize),
    MinLiquidity,
    TotalAssets,
    Available,
    Invested,
    SharePrice,
    TotalPendingUnderlyingRequest,
    MaxWithdraw(Address),
    BalanceOf(Address),
    PendingUnderlyingRequest(Address),
    PreviewInvest(U256),
    PreviewLiquidate(U256),
    RewardsAvailable,
    KeeperRole,
    ManagerRole,
    HasRole { role: B256, account: Address },
    /// Static call of `harvest`, returning the expected underlying proceeds.
    HarvestEstimate { swap_data: Vec<Bytes> },

    // ── Writes ──
    Init(Box<InitParams>),
    GrantRole { role: B256, account: Address },
    SetMinLiquidity(U256),
    SeedLiquidity { amount: U256, max_shares: U256 },
    SafeDeposit { amount: U256, receiver: Address, min_shares: U256 },
    SwapSafeDeposit {
        input: Address,
        amount: U256,
        receiver: Address,
        min_shares: U256,
        swap_data: Bytes,
    },
    Invest { amounts: SlotAmounts, swap_data: Vec<Bytes> },
    Liquidate {
        amounts: SlotAmounts,
        min_liquidity: U256,
        panic: bool,
        swap_data: Vec<Bytes>,
    },
    Harvest { swap_data: Vec<Bytes> },
    Compound { amounts: SlotAmounts, swap_data: Vec<Bytes> },
    SafeWithdraw {
        amount: U256,
        min_amount_out: U256,
        receiver: Address,
        owner: Address,
    },
    RequestWithdraw { amount: U256, receiver: Address, owner: Address },
}

impl StrategyCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            StrategyCall::Init(_)
                | StrategyCall::GrantRole { .. }
                | StrategyCall::SetMinLiquidity(_)
                | StrategyCall::SeedLiquidity { .. }
                | StrategyCall::SafeDeposit { .. }
                | StrategyCall::SwapSafeDeposit { .. }
                | StrategyCall::Invest { .. }
                | StrategyCall::Liquidate { .. }
                | StrategyCall::Harvest { .. }
                | StrategyCall::Compound { .. }
                | StrategyCall::SafeWithdraw { .. }
                | StrategyCall::RequestWithdraw { .. }
        )
    }
}

/// Decoded result of a `StrategyCall`.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutput {
    Uint(U256),
    Slots(SlotAmounts),
    Uints(Vec<U256>),
    Address(Address),
    Bool(bool),
    Word(B256),
    Tx(TxOutcome),
}

impl CallOutput {
    pub fn uint(self) -> Result<U256> {
        match self {
            CallOutput::Uint(v) => Ok(v),
            other => bail!("expected uint256, got {other:?}"),
        }
    }

    pub fn slots(self) -> Result<SlotAmounts> {
        match self {
            CallOutput::Slots(v) => Ok(v),
            other => bail!("expected uint256[8], got {other:?}"),
        }
    }

    pub fn uints(self) -> Result<Vec<U256>> {
        match self {
            CallOutput::Uints(v) => Ok(v),
            other => bail!("expected uint256[], got {other:?}"),
        }
    }

    pub fn address(self) -> Result<Address> {
        match self {
            CallOutput::Address(v) => Ok(v),
            other => bail!("expected address, got {other:?}"),
        }
    }

    pub fn boolean(self) -> Result<bool> {
        match self {
            CallOutput::Bool(v) => Ok(v),
            other => bail!("expected bool, got {other:?}"),
        }
    }

    pub fn word(self) -> Result<B256> {
        match self {
            CallOutput::Word(v) => Ok(v),
            other => bail!("expected bytes32, got {other:?}"),
        }
    }

    pub fn tx(self) -> Result<TxOutcome> {
        match self {
            CallOutput::Tx(v) => Ok(v),
            other => bail!("expected transaction outcome, got {other:?}"),
        }
    }
}

// ── Chain adapter ───────────────────────────────────────────────────

/// Everything the harness needs from a chain.
///
/// Writes return only once the transaction is confirmed. Implementations sign
/// with a single identity (`signer`), so calls must not be issued concurrently.
#[async_trait]
pub trait ChainAdapter: Send + Sync {
    fn chain_id(&self) -> u64;

    fn kind(&self) -> ChainKind;

    /// Account that signs every transaction.
    fn signer(&self) -> Address;

    // ── Block and time control ──

    async fn block_timestamp(&self) -> Result<u64>;

    async fn snapshot(&self) -> Result<SnapshotId>;

    async fn revert(&self, id: SnapshotId) -> Result<()>;

    async fn advance_time(&self, seconds: u64) -> Result<()>;

    async fn mine(&self, blocks: u64) -> Result<()>;

    // ── Deployment ──

    async fn deploy(&self, request: &DeployRequest) -> Result<Address>;

    /// Submit source verification for `unit`, deployed from `request`.
    async fn verify(&self, unit: &MaterializedUnit, request: &DeployRequest) -> Result<()>;

    // ── ERC20 ──

    /// `(symbol, decimals)`.
    async fn erc20_metadata(&self, token: Address) -> Result<(String, u8)>;

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256>;

    async fn native_balance(&self, owner: Address) -> Result<U256>;

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256>;

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<()>;

    /// Wrap native gas into the wrapped-gas token.
    async fn wrap_native(&self, wrapped: Address, amount: U256) -> Result<()>;

    // ── Swapper ──

    async fn is_whitelisted(&self, swapper: Address, account: Address) -> Result<bool>;

    async fn add_to_whitelist(&self, swapper: Address, account: Address) -> Result<()>;

    async fn swapper_swap(&self, swapper: Address, call: &SwapperCall) -> Result<TxOutcome>;

    // ── Strategy ──

    async fn strategy_call(&self, strategy: Address, call: StrategyCall) -> Result<CallOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_word_negative_index() {
        let out = TxOutcome {
            hash: None,
            log_words: vec![U256::from(1u64), U256::from(2u64), U256::from(3u64)],
        };
        assert_eq!(out.log_word(0), U256::from(1u64));
        assert_eq!(out.log_word(-2), U256::from(2u64));
        assert_eq!(out.log_word(5), U256::ZERO);
        assert_eq!(out.log_word(-4), U256::ZERO);
    }

    #[test]
    fn test_call_output_accessors() {
        assert_eq!(CallOutput::Uint(U256::from(9u64)).uint().unwrap(), U256::from(9u64));
        assert!(CallOutput::Bool(true).uint().is_err());
        assert!(StrategyCall::Harvest { swap_data: vec![] }.is_write());
        assert!(!StrategyCall::HarvestEstimate { swap_data: vec![] }.is_write());
    }
}
