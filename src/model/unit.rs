use std::collections::BTreeSet;

use alloy::primitives::{Address, Bytes};

/// Where a library sits in the link hierarchy.
///
/// Ordering is the deploy order: math first, strategy-specific oracle helpers last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LibraryRole {
    BaseMath,
    Accounting,
    OracleAdapter,
    StrategyOracle,
}

impl LibraryRole {
    /// Classify a library by its contract name.
    pub fn classify(name: &str) -> Self {
        match name {
            "AsMaths" => LibraryRole::BaseMath,
            "AsArrays" | "AsAccounting" => LibraryRole::Accounting,
            "PythUtils" | "ChainlinkUtils" | "RedStoneUtils" => LibraryRole::StrategyOracle,
            n if n.ends_with("Oracle") || n.ends_with("OracleLib") => LibraryRole::OracleAdapter,
            _ => LibraryRole::Accounting,
        }
    }

    /// Oracle libraries tied to one strategy family. Never linked into the shared agent.
    pub fn is_oracle_specific(self) -> bool {
        matches!(self, LibraryRole::StrategyOracle)
    }

    /// Libraries every other library may depend on.
    fn base_dependencies(self) -> &'static [&'static str] {
        match self {
            LibraryRole::BaseMath => &[],
            LibraryRole::Accounting | LibraryRole::OracleAdapter | LibraryRole::StrategyOracle => {
                &["AsMaths"]
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnitKind {
    Library(LibraryRole),
    /// Shared implementation the strategy proxy delegates to.
    Agent,
    Strategy,
    Swapper,
}

/// A named contract the orchestrator binds or deploys.
#[derive(Debug, Clone, PartialEq)]
pub struct DeployableUnit {
    pub name: String,
    /// Artifact name used to load bytecode and ABI.
    pub contract: String,
    pub kind: UnitKind,
    pub constructor_args: Bytes,
    pub required_libraries: BTreeSet<String>,
    pub proxy_target: Option<String>,
    pub existing_address: Option<Address>,
    pub verify: bool,
}

impl DeployableUnit {
    /// A library, depending on `AsMaths` unless it is the math library itself.
    pub fn library(name: &str) -> Self {
        let role = LibraryRole::classify(name);
        DeployableUnit {
            name: name.to_string(),
            contract: name.to_string(),
            kind: UnitKind::Library(role),
            constructor_args: Bytes::new(),
            required_libraries: role
                .base_dependencies()
                .iter()
                .filter(|d| **d != name)
                .map(|d| d.to_string())
                .collect(),
            proxy_target: None,
            existing_address: None,
            verify: true,
        }
    }

    pub fn agent(contract: &str) -> Self {
        DeployableUnit {
            name: contract.to_string(),
            contract: contract.to_string(),
            kind: UnitKind::Agent,
            constructor_args: Bytes::new(),
            required_libraries: BTreeSet::new(),
            proxy_target: None,
            existing_address: None,
            verify: true,
        }
    }

    /// The strategy proxy, fronted by `agent`. `name` is the address book key.
    pub fn strategy(contract: &str, name: &str, agent: &str, constructor_args: Bytes) -> Self {
        DeployableUnit {
            name: name.to_string(),
            contract: contract.to_string(),
            kind: UnitKind::Strategy,
            constructor_args,
            required_libraries: BTreeSet::new(),
            proxy_target: Some(agent.to_string()),
            existing_address: None,
            verify: true,
        }
    }

    pub fn swapper() -> Self {
        DeployableUnit {
            name: "Swapper".to_string(),
            contract: "Swapper".to_string(),
            kind: UnitKind::Swapper,
            constructor_args: Bytes::new(),
            required_libraries: BTreeSet::new(),
            proxy_target: None,
            existing_address: None,
            verify: true,
        }
    }

    pub fn with_existing(mut self, address: Option<Address>) -> Self {
        self.existing_address = address;
        self
    }

    pub fn library_role(&self) -> Option<LibraryRole> {
        match self.kind {
            UnitKind::Library(role) => Some(role),
            _ => None,
        }
    }

    /// Units that must be resolved before this one.
    pub fn dependencies(&self) -> impl Iterator<Item = &String> {
        self.required_libraries.iter().chain(self.proxy_target.iter())
    }
}

/// A unit with a resolved address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaterializedUnit {
    pub name: String,
    /// Artifact/ABI handle.
    pub contract: String,
    pub address: Address,
    /// True when this run sent the deployment transaction.
    pub deployed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_roles() {
        assert_eq!(LibraryRole::classify("AsMaths"), LibraryRole::BaseMath);
        assert_eq!(LibraryRole::classify("AsAccounting"), LibraryRole::Accounting);
        assert!(LibraryRole::classify("PythUtils").is_oracle_specific());
        assert!(!LibraryRole::classify("AsAccounting").is_oracle_specific());
        assert!(LibraryRole::BaseMath < LibraryRole::StrategyOracle);
    }

    #[test]
    fn test_library_depends_on_math() {
        assert!(DeployableUnit::library("AsMaths").required_libraries.is_empty());
        let acc = DeployableUnit::library("AsAccounting");
        assert!(acc.required_libraries.contains("AsMaths"));
    }
}
