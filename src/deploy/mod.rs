//! Idempotent, dependency-ordered deployment of the strategy stack.
//!
//! Units are bound to an address from config or the address book when one
//! exists, and deployed otherwise. Newly deployed addresses are written back into
//! the context's address book section so the next run binds them.

mod order;
pub mod strategy;

use std::collections::{BTreeMap, BTreeSet};

use alloy::primitives::Address;
use anyhow::Result;

use crate::chain::DeployRequest;
use crate::context::HarnessContext;
use crate::error::HarnessError;
use crate::model::{DeployableUnit, LibraryRole, MaterializedUnit, UnitKind};

pub use order::deploy_order;
pub use strategy::{deploy_strategy, ensure_swapper};

/// Result of one `materialize` call.
#[derive(Debug, Clone, Default)]
pub struct Materialized {
    pub units: BTreeMap<String, MaterializedUnit>,
    pub kinds: BTreeMap<String, UnitKind>,
    /// Unit names in the order they were resolved.
    pub order: Vec<String>,
}

impl Materialized {
    pub fn address(&self, name: &str) -> Option<Address> {
        self.units.get(name).map(|u| u.address)
    }

    /// Units this call actually sent a deployment for.
    pub fn deployed(&self) -> impl Iterator<Item = &MaterializedUnit> {
        self.order
            .iter()
            .filter_map(|n| self.units.get(n))
            .filter(|u| u.deployed)
    }
}

/// Libraries linked into the shared agent: everything but strategy-specific oracle helpers.
pub fn agent_link_set<'a>(libraries: impl IntoIterator<Item = &'a DeployableUnit>) -> BTreeSet<String> {
    libraries
        .into_iter()
        .filter(|u| u.library_role().is_some_and(|r| !r.is_oracle_specific()))
        .map(|u| u.name.clone())
        .collect()
}

/// Libraries linked into the strategy: everything but the base math library.
pub fn strategy_link_set<'a>(
    libraries: impl IntoIterator<Item = &'a DeployableUnit>,
) -> BTreeSet<String> {
    libraries
        .into_iter()
        .filter(|u| u.library_role().is_some_and(|r| r != LibraryRole::BaseMath))
        .map(|u| u.name.clone())
        .collect()
}

/// Resolve every unit to an address, deploying the ones that have none.
///
/// Agent and strategy link sets are derived from the libraries in `units`,
/// replacing whatever the units carried. With `verify`, freshly deployed units
/// that ask for it are submitted for source verification (failures only warn).
pub async fn materialize(
    ctx: &mut HarnessContext,
    mut units: Vec<DeployableUnit>,
    verify: bool,
) -> Result<Materialized> {
    let strategies = units.iter().filter(|u| u.kind == UnitKind::Strategy).count();
    if strategies > 1 {
        return Err(HarnessError::Deployment {
            unit: "strategy".to_string(),
            reason: format!("{strategies} strategy units given, expected at most one"),
        }
        .into());
    }

    let libraries: Vec<DeployableUnit> = units
        .iter()
        .filter(|u| matches!(u.kind, UnitKind::Library(_)))
        .cloned()
        .collect();
    let agent_libs = agent_link_set(&libraries);
    let strategy_libs = strategy_link_set(&libraries);
    for unit in units.iter_mut() {
        match unit.kind {
            UnitKind::Agent => unit.required_libraries = agent_libs.clone(),
            UnitKind::Strategy => unit.required_libraries = strategy_libs.clone(),
            _ => {}
        }
    }

    let external: BTreeSet<String> = units
        .iter()
        .flat_map(|u| u.dependencies())
        .filter(|d| ctx.cached_unit(d).is_some())
        .cloned()
        .collect();
    let order = deploy_order(&units, &external)?;

    let mut out = Materialized::default();
    for i in order {
        let unit = &units[i];
        let materialized = resolve_unit(ctx, unit, &out, verify).await?;
        out.kinds.insert(unit.name.clone(), unit.kind);
        out.order.push(unit.name.clone());
        out.units.insert(unit.name.clone(), materialized);
    }

    if let Some(strategy) = units.iter().find(|u| u.kind == UnitKind::Strategy) {
        match out.address(&strategy.name) {
            Some(addr) if addr != Address::ZERO => {}
            _ => {
                return Err(HarnessError::Deployment {
                    unit: strategy.name.clone(),
                    reason: "no address resolved".to_string(),
                }
                .into());
            }
        }
    }

    let deployed = out.deployed().count();
    if deployed == 0 {
        tracing::info!(units = out.units.len(), "using existing deployment");
    } else {
        tracing::info!(deployed, bound = out.units.len() - deployed, "deployment complete");
    }
    Ok(out)
}

/// Address of `unit` in the address book, if recorded there.
fn recorded_address(ctx: &HarnessContext, unit: &DeployableUnit) -> Result<Option<Address>> {
    match unit.kind {
        UnitKind::Library(_) => ctx.addresses.lib(&unit.name),
        _ => ctx.addresses.protocol(&ctx.namespace, &unit.name),
    }
}

fn dependency_address(ctx: &HarnessContext, resolved: &Materialized, name: &str) -> Option<Address> {
    resolved
        .address(name)
        .or_else(|| ctx.cached_unit(name).map(|u| u.address))
}

async fn resolve_unit(
    ctx: &mut HarnessContext,
    unit: &DeployableUnit,
    resolved: &Materialized,
    verify: bool,
) -> Result<MaterializedUnit> {
    if let Some(cached) = ctx.cached_unit(&unit.name) {
        tracing::debug!(unit = %unit.name, address = %cached.address, "cached");
        return Ok(MaterializedUnit {
            deployed: false,
            ..cached.clone()
        });
    }

    let existing = match unit.existing_address {
        Some(addr) => Some(addr),
        None => recorded_address(ctx, unit)?,
    };
    if let Some(address) = existing {
        tracing::info!(unit = %unit.name, %address, "using existing");
        let bound = MaterializedUnit {
            name: unit.name.clone(),
            contract: unit.contract.clone(),
            address,
            deployed: false,
        };
        ctx.cache_unit(bound.clone());
        return Ok(bound);
    }

    let mut libraries = BTreeMap::new();
    for lib in &unit.required_libraries {
        // deploy_order guarantees dependencies are resolved first
        let addr = dependency_address(ctx, resolved, lib).ok_or_else(|| HarnessError::Deployment {
            unit: unit.name.clone(),
            reason: format!("library {lib} is not resolved"),
        })?;
        libraries.insert(lib.clone(), addr);
    }
    // the strategy reaches its agent through the init core addresses, not its bytecode
    if let Some(target) = &unit.proxy_target {
        if dependency_address(ctx, resolved, target).is_none() {
            return Err(HarnessError::Deployment {
                unit: unit.name.clone(),
                reason: format!("proxy target {target} is not resolved"),
            }
            .into());
        }
    }

    let request = DeployRequest {
        name: unit.name.clone(),
        contract: unit.contract.clone(),
        constructor_args: unit.constructor_args.clone(),
        libraries,
    };
    tracing::info!(
        unit = %unit.name,
        contract = %unit.contract,
        libraries = ?request.libraries.keys().collect::<Vec<_>>(),
        "deploying"
    );
    let address = ctx
        .chain
        .deploy(&request)
        .await
        .map_err(|e| HarnessError::Deployment {
            unit: unit.name.clone(),
            reason: format!("{e:#}"),
        })?;
    if address == Address::ZERO {
        return Err(HarnessError::Deployment {
            unit: unit.name.clone(),
            reason: "deployed to the zero address".to_string(),
        }
        .into());
    }
    tracing::info!(unit = %unit.name, %address, "deployed");

    let deployed = MaterializedUnit {
        name: unit.name.clone(),
        contract: unit.contract.clone(),
        address,
        deployed: true,
    };
    match unit.kind {
        UnitKind::Library(_) => ctx.addresses.record_lib(&unit.name, address),
        _ => {
            let namespace = ctx.namespace.clone();
            ctx.addresses.record_protocol(&namespace, &unit.name, address);
        }
    }
    if verify && unit.verify {
        if let Err(e) = ctx.chain.verify(&deployed, &request).await {
            tracing::warn!(unit = %unit.name, "verification failed: {e:#}");
        }
    }
    ctx.cache_unit(deployed.clone());
    Ok(deployed)
}
