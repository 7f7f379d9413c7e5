use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::{BlockNumberOrTag, TransactionReceipt, TransactionRequest};
use alloy::signers::local::PrivateKeySigner;
use alloy::sol;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;

use super::artifacts::ArtifactStore;
use super::verify::ExplorerVerifier;
use super::{
    CallOutput, ChainAdapter, ChainKind, DeployRequest, SnapshotId, StrategyCall, SwapperCall,
    TxOutcome,
};
use crate::model::{Chain, MaterializedUnit};

// ── Contract interfaces ─────────────────────────────────────────────

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IERC20 {
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IWETH {
        function deposit() external payable;
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract ISwapper {
        function isWhitelisted(address account) external view returns (bool);
        function addToWhitelist(address account) external;
        function swap(
            address input,
            address output,
            uint256 amountIn,
            uint256 minAmountOut,
            address targetRouter,
            bytes calldata callData
        ) external returns (uint256 received, uint256 spent);
    }
}

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    contract IStrategyV5 {
        function agent() external view returns (address);
        function inputs(uint256 index) external view returns (address);
        function rewardTokens(uint256 index) external view returns (address);
        function minLiquidity() external view returns (uint256);
        function totalAssets() external view returns (uint256);
        function available() external view returns (uint256);
        function invested() external view returns (uint256);
        function sharePrice() external view returns (uint256);
        function totalPendingUnderlyingRequest() external view returns (uint256);
        function maxWithdraw(address owner) external view returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
        function pendingUnderlyingRequest(address owner) external view returns (uint256);
        function previewInvest(uint256 amount) external view returns (uint256[8] memory);
        function previewLiquidate(uint256 amount) external view returns (uint256[8] memory);
        function rewardsAvailable() external view returns (uint256[] memory);
        function KEEPER_ROLE() external view returns (bytes32);
        function MANAGER_ROLE() external view returns (bytes32);
        function hasRole(bytes32 role, address account) external view returns (bool);

        function grantRole(bytes32 role, address account) external;
        function setMinLiquidity(uint256 amount) external;
        function seedLiquidity(uint256 amount, uint256 maxTotalAssets) external returns (uint256);
        function safeDeposit(uint256 amount, address receiver, uint256 minShareAmount) external returns (uint256);
        function swapSafeDeposit(address input, uint256 amount, address receiver, uint256 minShareAmount, bytes calldata params) external returns (uint256);
        function invest(uint256[8] calldata amounts, bytes[] calldata params) external returns (uint256);
        function liquidate(uint256[8] calldata amounts, uint256 minLiquidity, bool panic, bytes[] calldata params) external returns (uint256);
        function harvest(bytes[] calldata params) external returns (uint256);
        function compound(uint256[8] calldata amounts, bytes[] calldata params) external returns (uint256);
        function safeWithdraw(uint256 amount, uint256 minAmount, address receiver, address owner) external returns (uint256);
        function requestWithdraw(uint256 amount, address receiver, address owner) external returns (uint256);
    }
}

/// Blocks mined by `mine` fall back through these methods until one is supported.
const MINE_METHODS: [&str; 3] = ["anvil_mine", "hardhat_mine", "evm_increaseBlocks"];

/// Client-version substrings of nodes that expose snapshot/revert/time control.
const SIMULATED_CLIENTS: [&str; 4] = ["anvil", "hardhat", "ganache", "tenderly"];

// ── Alloy-backed adapter ────────────────────────────────────────────

/// `ChainAdapter` over JSON-RPC, signing with one local key.
pub struct AlloyChain {
    provider: DynProvider,
    signer: Address,
    chain_id: u64,
    kind: ChainKind,
    artifacts: ArtifactStore,
    verifier: Option<ExplorerVerifier>,
}

impl AlloyChain {
    pub async fn connect(chain: &Chain, private_key: &str, artifacts: ArtifactStore) -> Result<Self> {
        let rpc_url = chain
            .rpc_url()
            .with_context(|| format!("chain {chain} has no rpc_url"))?;
        let signer: PrivateKeySigner = private_key
            .trim_start_matches("0x")
            .parse()
            .map_err(|e| anyhow!("Invalid private key: {e}"))?;
        let signer_address = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer))
            .connect_http(rpc_url.parse().context("invalid rpc url")?)
            .erased();

        let node_chain_id = provider.get_chain_id().await.context("eth_chainId")?;
        if node_chain_id != chain.chain_id() {
            bail!(
                "RPC at {rpc_url} serves chain {node_chain_id}, suite expects {}",
                chain.chain_id()
            );
        }

        let kind = match chain.simulated {
            Some(true) => ChainKind::Simulated,
            Some(false) => ChainKind::Live,
            None => detect_kind(&provider).await,
        };
        tracing::info!(chain = %chain, ?kind, signer = %signer_address, "connected");

        Ok(AlloyChain {
            provider,
            signer: signer_address,
            chain_id: node_chain_id,
            kind,
            artifacts,
            verifier: None,
        })
    }

    pub fn with_verifier(mut self, verifier: ExplorerVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    async fn send_raw(&self, to: Address, data: Bytes, label: &str) -> Result<TxOutcome> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .with_context(|| format!("{label} send failed"))?;
        let receipt = pending
            .get_receipt()
            .await
            .with_context(|| format!("{label} receipt"))?;
        require_success(&receipt, label)?;
        Ok(outcome(&receipt))
    }
}

async fn detect_kind(provider: &DynProvider) -> ChainKind {
    match provider.get_client_version().await {
        Ok(version) => {
            let version = version.to_lowercase();
            if SIMULATED_CLIENTS.iter().any(|c| version.contains(c)) {
                ChainKind::Simulated
            } else {
                ChainKind::Live
            }
        }
        Err(e) => {
            tracing::warn!("web3_clientVersion failed ({e}), treating chain as live");
            ChainKind::Live
        }
    }
}

fn require_success(receipt: &TransactionReceipt, label: &str) -> Result<()> {
    if !receipt.status() {
        bail!(
            "{} tx reverted (hash: {:?}, gas_used: {:?})",
            label,
            receipt.transaction_hash,
            receipt.gas_used,
        );
    }
    Ok(())
}

fn outcome(receipt: &TransactionReceipt) -> TxOutcome {
    let log_words = receipt
        .inner
        .logs()
        .last()
        .map(|log| {
            log.data()
                .data
                .chunks_exact(32)
                .map(U256::from_be_slice)
                .collect()
        })
        .unwrap_or_default();
    TxOutcome {
        hash: Some(receipt.transaction_hash),
        log_words,
    }
}

/// Send a contract call and wait for a successful receipt.
macro_rules! send_tx {
    ($call:expr, $label:expr) => {{
        let pending = $call
            .send()
            .await
            .with_context(|| format!("{} send failed", $label))?;
        let receipt = pending
            .get_receipt()
            .await
            .with_context(|| format!("{} receipt", $label))?;
        require_success(&receipt, $label)?;
        outcome(&receipt)
    }};
}

#[async_trait]
impl ChainAdapter for AlloyChain {
    fn chain_id(&self) -> u64 {
        self.chain_id
    }

    fn kind(&self) -> ChainKind {
        self.kind
    }

    fn signer(&self) -> Address {
        self.signer
    }

    async fn block_timestamp(&self) -> Result<u64> {
        let block = self
            .provider
            .get_block_by_number(BlockNumberOrTag::Latest)
            .await
            .context("eth_getBlockByNumber")?
            .context("latest block missing")?;
        Ok(block.header.timestamp)
    }

    async fn snapshot(&self) -> Result<SnapshotId> {
        let id: U256 = self
            .provider
            .raw_request("evm_snapshot".into(), ())
            .await
            .context("evm_snapshot")?;
        Ok(SnapshotId(id))
    }

    async fn revert(&self, id: SnapshotId) -> Result<()> {
        let ok: bool = self
            .provider
            .raw_request("evm_revert".into(), [id.0])
            .await
            .context("evm_revert")?;
        if !ok {
            bail!("evm_revert to snapshot {} was refused", id.0);
        }
        Ok(())
    }

    async fn advance_time(&self, seconds: u64) -> Result<()> {
        let _: serde_json::Value = self
            .provider
            .raw_request("evm_increaseTime".into(), [U256::from(seconds)])
            .await
            .context("evm_increaseTime")?;
        Ok(())
    }

    async fn mine(&self, blocks: u64) -> Result<()> {
        let mut last_err = None;
        for method in MINE_METHODS {
            let res: Result<serde_json::Value, _> = self
                .provider
                .raw_request(method.into(), [U256::from(blocks)])
                .await;
            match res {
                Ok(_) => return Ok(()),
                Err(e) => last_err = Some(anyhow!("{method}: {e}")),
            }
        }
        Err(last_err.unwrap_or_else(|| anyhow!("no mining method available")))
    }

    async fn deploy(&self, request: &DeployRequest) -> Result<Address> {
        let artifact = self.artifacts.load(&request.contract)?;
        let mut code = artifact.link(&request.libraries)?.to_vec();
        code.extend_from_slice(&request.constructor_args);

        let tx = TransactionRequest::default().with_deploy_code(code);
        let label = format!("deploy {}", request.name);
        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .with_context(|| format!("{label} send failed"))?;
        let receipt = pending
            .get_receipt()
            .await
            .with_context(|| format!("{label} receipt"))?;
        require_success(&receipt, &label)?;
        receipt
            .contract_address
            .with_context(|| format!("{label}: receipt carries no contract address"))
    }

    async fn verify(&self, unit: &MaterializedUnit, request: &DeployRequest) -> Result<()> {
        let verifier = self
            .verifier
            .as_ref()
            .context("no explorer API key configured for verification")?;
        let artifact = self.artifacts.load(&request.contract)?;
        let build = self.artifacts.load_build_info(&request.contract)?;
        let guid = verifier
            .submit(&artifact, &build, unit.address, &request.libraries, &request.constructor_args)
            .await
            .with_context(|| format!("verifying {}", unit.name))?;
        tracing::info!(unit = %unit.name, address = %unit.address, %guid, "verification submitted");
        Ok(())
    }

    async fn erc20_metadata(&self, token: Address) -> Result<(String, u8)> {
        let erc20 = IERC20::new(token, &self.provider);
        let symbol = erc20
            .symbol()
            .call()
            .await
            .with_context(|| format!("symbol() failed for {token}"))?;
        let decimals = erc20
            .decimals()
            .call()
            .await
            .with_context(|| format!("decimals() failed for {token}"))?;
        Ok((symbol, decimals))
    }

    async fn balance_of(&self, token: Address, owner: Address) -> Result<U256> {
        IERC20::new(token, &self.provider)
            .balanceOf(owner)
            .call()
            .await
            .with_context(|| format!("balanceOf({owner}) failed for {token}"))
    }

    async fn native_balance(&self, owner: Address) -> Result<U256> {
        self.provider
            .get_balance(owner)
            .await
            .with_context(|| format!("eth_getBalance({owner})"))
    }

    async fn allowance(&self, token: Address, owner: Address, spender: Address) -> Result<U256> {
        IERC20::new(token, &self.provider)
            .allowance(owner, spender)
            .call()
            .await
            .with_context(|| format!("allowance() failed for {token}"))
    }

    async fn approve(&self, token: Address, spender: Address, amount: U256) -> Result<()> {
        let erc20 = IERC20::new(token, &self.provider);
        send_tx!(erc20.approve(spender, amount), "approve");
        Ok(())
    }

    async fn wrap_native(&self, wrapped: Address, amount: U256) -> Result<()> {
        let weth = IWETH::new(wrapped, &self.provider);
        send_tx!(weth.deposit().value(amount), "wrap");
        Ok(())
    }

    async fn is_whitelisted(&self, swapper: Address, account: Address) -> Result<bool> {
        ISwapper::new(swapper, &self.provider)
            .isWhitelisted(account)
            .call()
            .await
            .context("isWhitelisted() failed")
    }

    async fn add_to_whitelist(&self, swapper: Address, account: Address) -> Result<()> {
        let swapper = ISwapper::new(swapper, &self.provider);
        send_tx!(swapper.addToWhitelist(account), "whitelist");
        Ok(())
    }

    async fn swapper_swap(&self, swapper: Address, call: &SwapperCall) -> Result<TxOutcome> {
        let swapper = ISwapper::new(swapper, &self.provider);
        Ok(send_tx!(
            swapper.swap(
                call.input,
                call.output,
                call.amount,
                call.min_out,
                call.router,
                call.call_data.clone(),
            ),
            "swap"
        ))
    }

    async fn strategy_call(&self, strategy: Address, call: StrategyCall) -> Result<CallOutput> {
        let strat = IStrategyV5::new(strategy, &self.provider);
        let out = match call {
            StrategyCall::Agent => CallOutput::Address(strat.agent().call().await?),
            StrategyCall::Inputs(i) => CallOutput::Address(strat.inputs(U256::from(i)).call().await?),
            StrategyCall::RewardTokens(i) => {
                CallOutput::Address(strat.rewardTokens(U256::from(i)).call().await?)
            }
            StrategyCall::MinLiquidity => CallOutput::Uint(strat.minLiquidity().call().await?),
            StrategyCall::TotalAssets => CallOutput::Uint(strat.totalAssets().call().await?),
            StrategyCall::Available => CallOutput::Uint(strat.available().call().await?),
            StrategyCall::Invested => CallOutput::Uint(strat.invested().call().await?),
            StrategyCall::SharePrice => CallOutput::Uint(strat.sharePrice().call().await?),
            StrategyCall::TotalPendingUnderlyingRequest => {
                CallOutput::Uint(strat.totalPendingUnderlyingRequest().call().await?)
            }
            StrategyCall::MaxWithdraw(owner) => CallOutput::Uint(strat.maxWithdraw(owner).call().await?),
            StrategyCall::BalanceOf(owner) => CallOutput::Uint(strat.balanceOf(owner).call().await?),
            StrategyCall::PendingUnderlyingRequest(owner) => {
                CallOutput::Uint(strat.pendingUnderlyingRequest(owner).call().await?)
            }
            StrategyCall::PreviewInvest(amount) => {
                CallOutput::Slots(strat.previewInvest(amount).call().await?)
            }
            StrategyCall::PreviewLiquidate(amount) => {
                CallOutput::Slots(strat.previewLiquidate(amount).call().await?)
            }
            StrategyCall::RewardsAvailable => CallOutput::Uints(strat.rewardsAvailable().call().await?),
            StrategyCall::KeeperRole => CallOutput::Word(strat.KEEPER_ROLE().call().await?),
            StrategyCall::ManagerRole => CallOutput::Word(strat.MANAGER_ROLE().call().await?),
            StrategyCall::HasRole { role, account } => {
                CallOutput::Bool(strat.hasRole(role, account).call().await?)
            }
            StrategyCall::HarvestEstimate { swap_data } => {
                CallOutput::Uint(strat.harvest(swap_data).call().await?)
            }

            StrategyCall::Init(params) => {
                CallOutput::Tx(self.send_raw(strategy, crate::abi::encode_init(&params), "init").await?)
            }
            StrategyCall::GrantRole { role, account } => {
                CallOutput::Tx(send_tx!(strat.grantRole(role, account), "grantRole"))
            }
            StrategyCall::SetMinLiquidity(amount) => {
                CallOutput::Tx(send_tx!(strat.setMinLiquidity(amount), "setMinLiquidity"))
            }
            StrategyCall::SeedLiquidity { amount, max_shares } => {
                CallOutput::Tx(send_tx!(strat.seedLiquidity(amount, max_shares), "seedLiquidity"))
            }
            StrategyCall::SafeDeposit {
                amount,
                receiver,
                min_shares,
            } => CallOutput::Tx(send_tx!(
                strat.safeDeposit(amount, receiver, min_shares),
                "safeDeposit"
            )),
            StrategyCall::SwapSafeDeposit {
                input,
                amount,
                receiver,
                min_shares,
                swap_data,
            } => CallOutput::Tx(send_tx!(
                strat.swapSafeDeposit(input, amount, receiver, min_shares, swap_data),
                "swapSafeDeposit"
            )),
            StrategyCall::Invest { amounts, swap_data } => {
                CallOutput::Tx(send_tx!(strat.invest(amounts, swap_data), "invest"))
            }
            StrategyCall::Liquidate {
                amounts,
                min_liquidity,
                panic,
                swap_data,
            } => CallOutput::Tx(send_tx!(
                strat.liquidate(amounts, min_liquidity, panic, swap_data),
                "liquidate"
            )),
            StrategyCall::Harvest { swap_data } => {
                CallOutput::Tx(send_tx!(strat.harvest(swap_data), "harvest"))
            }
            StrategyCall::Compound { amounts, swap_data } => {
                CallOutput::Tx(send_tx!(strat.compound(amounts, swap_data), "compound"))
            }
            StrategyCall::SafeWithdraw {
                amount,
                min_amount_out,
                receiver,
                owner,
            } => CallOutput::Tx(send_tx!(
                strat.safeWithdraw(amount, min_amount_out, receiver, owner),
                "safeWithdraw"
            )),
            StrategyCall::RequestWithdraw {
                amount,
                receiver,
                owner,
            } => CallOutput::Tx(send_tx!(
                strat.requestWithdraw(amount, receiver, owner),
                "requestWithdraw"
            )),
        };
        Ok(out)
    }
}
