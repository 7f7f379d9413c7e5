use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap, HashMap};

use anyhow::Result;
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::error::HarnessError;
use crate::model::{DeployableUnit, LibraryRole, UnitKind};

/// Position of a unit among its ready peers. Libraries go first, in role order.
fn rank(unit: &DeployableUnit) -> u8 {
    match unit.kind {
        UnitKind::Library(LibraryRole::BaseMath) => 0,
        UnitKind::Library(LibraryRole::Accounting) => 1,
        UnitKind::Library(LibraryRole::OracleAdapter) => 2,
        UnitKind::Library(LibraryRole::StrategyOracle) => 3,
        UnitKind::Swapper => 4,
        UnitKind::Agent => 5,
        UnitKind::Strategy => 6,
    }
}

/// Order units so every dependency comes before its dependents.
///
/// Ties are broken by role rank, then name, so the order is stable across runs.
/// `external` holds names already resolved outside this batch; edges to them are
/// dropped. Any other unknown dependency is an error.
pub fn deploy_order(units: &[DeployableUnit], external: &BTreeSet<String>) -> Result<Vec<usize>> {
    let mut graph = DiGraph::<usize, ()>::new();
    let mut index_map: HashMap<&str, NodeIndex> = HashMap::new();

    for (i, unit) in units.iter().enumerate() {
        let idx = graph.add_node(i);
        index_map.insert(unit.name.as_str(), idx);
    }

    for unit in units {
        let to = index_map[unit.name.as_str()];
        for dep in unit.dependencies() {
            match index_map.get(dep.as_str()) {
                Some(&from) => {
                    graph.add_edge(from, to, ());
                }
                None if external.contains(dep) => {}
                None => {
                    return Err(HarnessError::UnknownDependency {
                        unit: unit.name.clone(),
                        dependency: dep.clone(),
                    }
                    .into());
                }
            }
        }
    }

    // Kahn's algorithm with a priority queue instead of petgraph's Topo, which
    // does not let us pick among ready nodes.
    let mut in_degree: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
        .collect();
    let key = |n: NodeIndex| {
        let unit = &units[graph[n]];
        Reverse((rank(unit), unit.name.clone(), n))
    };
    let mut ready: BinaryHeap<_> = in_degree
        .iter()
        .filter(|(_, d)| **d == 0)
        .map(|(n, _)| key(*n))
        .collect();

    let mut order = Vec::with_capacity(units.len());
    while let Some(Reverse((_, _, n))) = ready.pop() {
        order.push(graph[n]);
        for next in graph.neighbors_directed(n, Direction::Outgoing) {
            if let Some(d) = in_degree.get_mut(&next) {
                *d -= 1;
                if *d == 0 {
                    ready.push(key(next));
                }
            }
        }
    }

    if order.len() < units.len() {
        let placed: BTreeSet<usize> = order.iter().copied().collect();
        let units: Vec<String> = (0..units.len())
            .filter(|i| !placed.contains(i))
            .map(|i| units[i].name.clone())
            .collect();
        return Err(HarnessError::DependencyCycle { units }.into());
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use alloy::primitives::Bytes;

    use super::*;

    fn names(units: &[DeployableUnit], order: &[usize]) -> Vec<String> {
        order.iter().map(|i| units[*i].name.clone()).collect()
    }

    #[test]
    fn test_libraries_precede_agent_and_strategy() {
        let mut agent = DeployableUnit::agent("StrategyV5Agent");
        agent.required_libraries = ["AsAccounting".to_string()].into();
        let units = vec![
            DeployableUnit::strategy("VenusMultiStake", "Venus USD", "StrategyV5Agent", Bytes::new()),
            agent,
            DeployableUnit::library("PythUtils"),
            DeployableUnit::library("AsAccounting"),
            DeployableUnit::library("AsMaths"),
        ];
        let order = deploy_order(&units, &BTreeSet::new()).unwrap();
        assert_eq!(
            names(&units, &order),
            vec!["AsMaths", "AsAccounting", "PythUtils", "StrategyV5Agent", "Venus USD"]
        );
    }

    #[test]
    fn test_external_dependency_is_skipped() {
        let units = vec![DeployableUnit::library("AsAccounting")];
        let external = BTreeSet::from(["AsMaths".to_string()]);
        assert_eq!(deploy_order(&units, &external).unwrap(), vec![0]);

        let err = deploy_order(&units, &BTreeSet::new()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<HarnessError>(),
            Some(HarnessError::UnknownDependency { dependency, .. }) if dependency == "AsMaths"
        ));
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut a = DeployableUnit::library("LibA");
        a.required_libraries = ["LibB".to_string()].into();
        let mut b = DeployableUnit::library("LibB");
        b.required_libraries = ["LibA".to_string()].into();
        let units = vec![DeployableUnit::library("AsMaths"), a, b];
        let err = deploy_order(&units, &BTreeSet::new()).unwrap_err();
        match err.downcast_ref::<HarnessError>() {
            Some(HarnessError::DependencyCycle { units }) => {
                assert_eq!(units, &vec!["LibA".to_string(), "LibB".to_string()]);
            }
            other => panic!("expected cycle, got {other:?}"),
        }
    }
}
