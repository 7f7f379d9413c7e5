use std::collections::BTreeMap;
use std::path::Path;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Name → address map. An empty string means "not deployed yet".
pub type AddressMap = BTreeMap<String, String>;

/// Addresses known for one chain, grouped by category.
///
/// Protocol namespaces (e.g. `"astrolab"`, `"Venus"`) sit next to the common
/// categories at the top level of the JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct NetworkAddresses {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub accounts: AddressMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub oracles: AddressMap,
    #[serde(default)]
    pub tokens: AddressMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub libs: AddressMap,
    #[serde(flatten)]
    pub protocols: BTreeMap<String, AddressMap>,
}

impl NetworkAddresses {
    pub fn token(&self, symbol: &str) -> Result<Option<Address>> {
        lookup(&self.tokens, symbol).with_context(|| format!("tokens.{symbol}"))
    }

    pub fn lib(&self, name: &str) -> Result<Option<Address>> {
        lookup(&self.libs, name).with_context(|| format!("libs.{name}"))
    }

    pub fn account(&self, name: &str) -> Result<Option<Address>> {
        lookup(&self.accounts, name).with_context(|| format!("accounts.{name}"))
    }

    pub fn oracle(&self, name: &str) -> Result<Option<Address>> {
        lookup(&self.oracles, name).with_context(|| format!("oracles.{name}"))
    }

    pub fn protocol(&self, namespace: &str, name: &str) -> Result<Option<Address>> {
        match self.protocols.get(namespace) {
            Some(map) => lookup(map, name).with_context(|| format!("{namespace}.{name}")),
            None => Ok(None),
        }
    }

    /// Account used by quote providers to simulate swaps on behalf of a
    /// contract that holds no balance yet.
    pub fn impersonate(&self) -> Result<Option<Address>> {
        self.account("impersonate")
    }

    pub fn record_lib(&mut self, name: &str, address: Address) {
        self.libs.insert(name.to_string(), format!("{address:?}"));
    }

    pub fn record_protocol(&mut self, namespace: &str, name: &str, address: Address) {
        self.protocols
            .entry(namespace.to_string())
            .or_default()
            .insert(name.to_string(), format!("{address:?}"));
    }
}

fn lookup(map: &AddressMap, name: &str) -> Result<Option<Address>> {
    match map.get(name).map(|s| s.trim()) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<Address>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid address '{raw}': {e}")),
    }
}

/// Address book for every chain, keyed by chain id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AddressBook {
    pub networks: BTreeMap<u64, NetworkAddresses>,
}

impl AddressBook {
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading address book {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing address book {}", path.display()))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).context("writing address book")?;
        Ok(())
    }

    pub fn network(&self, chain_id: u64) -> Option<&NetworkAddresses> {
        self.networks.get(&chain_id)
    }

    pub fn network_mut(&mut self, chain_id: u64) -> &mut NetworkAddresses {
        self.networks.entry(chain_id).or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOK: &str = r#"{
        "10": {
            "accounts": { "impersonate": "0xacD03D601e5bB1B275Bb94076fF46ED9D753435A" },
            "tokens": { "USDC": "0x0b2c639c533813f4aa9d7837caf62653d097ff85" },
            "libs": { "AsMaths": "", "AsAccounting": "0x1111111111111111111111111111111111111111" },
            "astrolab": { "Swapper": "0xdfe11c1beb360820a6aa9ada899243de459b3894", "StrategyV5Agent": "" }
        }
    }"#;

    #[test]
    fn test_empty_address_means_not_deployed() {
        let book: AddressBook = serde_json::from_str(BOOK).unwrap();
        let net = book.network(10).unwrap();
        assert_eq!(net.lib("AsMaths").unwrap(), None);
        assert!(net.lib("AsAccounting").unwrap().is_some());
        assert_eq!(net.protocol("astrolab", "StrategyV5Agent").unwrap(), None);
        assert!(net.protocol("astrolab", "Swapper").unwrap().is_some());
        assert_eq!(net.protocol("Venus", "Comptroller").unwrap(), None);
        assert!(net.impersonate().unwrap().is_some());
    }

    #[test]
    fn test_recorded_address_is_bound_next_time() {
        let mut book: AddressBook = serde_json::from_str(BOOK).unwrap();
        let addr: Address = "0x2222222222222222222222222222222222222222".parse().unwrap();
        book.network_mut(10).record_protocol("astrolab", "StrategyV5Agent", addr);

        let json = serde_json::to_string(&book).unwrap();
        let reloaded: AddressBook = serde_json::from_str(&json).unwrap();
        assert_eq!(
            reloaded.network(10).unwrap().protocol("astrolab", "StrategyV5Agent").unwrap(),
            Some(addr)
        );
    }

    #[test]
    fn test_malformed_address_is_an_error() {
        let mut net = NetworkAddresses::default();
        net.tokens.insert("BAD".into(), "0x1234".into());
        assert!(net.token("BAD").is_err());
    }
}
