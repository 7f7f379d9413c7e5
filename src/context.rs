use std::collections::BTreeMap;
use std::sync::Arc;

use alloy::primitives::Address;
use anyhow::{Context, Result, anyhow};

use crate::chain::{ChainAdapter, ChainKind};
use crate::model::{MaterializedUnit, NetworkAddresses, Token};
use crate::quote::QuoteProvider;

/// Namespace of the harness's own contracts (Swapper, agent, strategies) in the address book.
pub const DEFAULT_NAMESPACE: &str = "astrolab";

/// Handles every operation needs, threaded explicitly instead of living in globals.
///
/// Holds the chain and quote collaborators, the chain's address book section, and
/// the per-run caches of materialized units and resolved tokens.
pub struct HarnessContext {
    pub chain: Arc<dyn ChainAdapter>,
    pub quotes: Arc<dyn QuoteProvider>,
    pub addresses: NetworkAddresses,
    pub namespace: String,
    units: BTreeMap<String, MaterializedUnit>,
    tokens: BTreeMap<Address, Token>,
    swapper: Option<Address>,
}

impl HarnessContext {
    pub fn new(
        chain: Arc<dyn ChainAdapter>,
        quotes: Arc<dyn QuoteProvider>,
        addresses: NetworkAddresses,
    ) -> Self {
        HarnessContext {
            chain,
            quotes,
            addresses,
            namespace: DEFAULT_NAMESPACE.to_string(),
            units: BTreeMap::new(),
            tokens: BTreeMap::new(),
            swapper: None,
        }
    }

    /// The single signing identity: deployer, fee collector and test user.
    pub fn deployer(&self) -> Address {
        self.chain.signer()
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id()
    }

    pub fn is_simulated(&self) -> bool {
        self.chain.kind() == ChainKind::Simulated
    }

    /// Account quote providers may simulate swaps with.
    pub fn test_payer(&self) -> Option<Address> {
        self.addresses.impersonate().ok().flatten()
    }

    // ── Unit cache ──

    pub fn cached_unit(&self, name: &str) -> Option<&MaterializedUnit> {
        self.units.get(name)
    }

    pub fn cache_unit(&mut self, unit: MaterializedUnit) {
        self.units.insert(unit.name.clone(), unit);
    }

    pub fn swapper(&self) -> Option<Address> {
        self.swapper
    }

    pub fn set_swapper(&mut self, address: Address) {
        self.swapper = Some(address);
    }

    // ── Address resolution ──

    /// Resolve an address reference from config.
    ///
    /// Accepts a literal `0x…` address, `category.name` (`tokens`, `oracles`,
    /// `accounts`, `libs` or a protocol namespace), or a bare token symbol.
    pub fn resolve_address(&self, reference: &str) -> Result<Address> {
        let reference = reference.trim();
        if reference.starts_with("0x") {
            return reference
                .parse()
                .map_err(|e| anyhow!("invalid address '{reference}': {e}"));
        }
        let found = match reference.split_once('.') {
            Some(("tokens", name)) => self.addresses.token(name)?,
            Some(("oracles", name)) => self.addresses.oracle(name)?,
            Some(("accounts", name)) => self.addresses.account(name)?,
            Some(("libs", name)) => self.addresses.lib(name)?,
            Some((namespace, name)) => self.addresses.protocol(namespace, name)?,
            None => self.addresses.token(reference)?,
        };
        found.with_context(|| {
            format!("`{reference}` has no address on chain {}", self.chain_id())
        })
    }

    /// Resolve a token reference and read its metadata once per run.
    pub async fn token(&mut self, reference: &str) -> Result<Token> {
        let address = self.resolve_address(reference)?;
        self.token_at(address).await
    }

    pub async fn token_at(&mut self, address: Address) -> Result<Token> {
        if let Some(token) = self.tokens.get(&address) {
            return Ok(token.clone());
        }
        let (symbol, decimals) = self
            .chain
            .erc20_metadata(address)
            .await
            .with_context(|| format!("reading ERC20 metadata of {address}"))?;
        let token = Token::new(address, symbol, decimals);
        self.tokens.insert(address, token.clone());
        Ok(token)
    }
}
