use std::collections::BTreeMap;

use alloy::primitives::Address;

use super::params::InitParams;
use super::token::Token;
use super::unit::{MaterializedUnit, UnitKind};

/// Everything a test run needs to talk to one deployed strategy stack.
///
/// Built by the orchestrator, completed by setup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct StrategyDeployment {
    pub name: String,
    pub contract: String,
    pub underlying: Token,
    /// Index-significant, at most `MAX_SLOTS`.
    pub inputs: Vec<Token>,
    pub reward_tokens: Vec<Token>,
    pub units: BTreeMap<String, MaterializedUnit>,
    pub kinds: BTreeMap<String, UnitKind>,
    pub init_params: Option<InitParams>,
}

impl StrategyDeployment {
    pub fn unit(&self, name: &str) -> Option<&MaterializedUnit> {
        self.units.get(name)
    }

    fn first_of(&self, kind: UnitKind) -> Option<Address> {
        self.kinds
            .iter()
            .find(|(_, k)| **k == kind)
            .and_then(|(name, _)| self.units.get(name))
            .map(|u| u.address)
    }

    /// The strategy proxy address.
    pub fn strategy(&self) -> Address {
        self.first_of(UnitKind::Strategy).unwrap_or(Address::ZERO)
    }

    pub fn agent(&self) -> Address {
        self.first_of(UnitKind::Agent).unwrap_or(Address::ZERO)
    }
}
