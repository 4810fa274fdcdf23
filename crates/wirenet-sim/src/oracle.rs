//! Connectivity oracle.
//!
//! Recomputes connected components the slow way, from each node's own
//! neighbour list, and compares them with the networks the topology
//! maintains incrementally. Only meaningful at a quiescent point: nothing may
//! be linking, unlinking or removing while it runs.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use wirenet_topology::{NetworkId, NodeHandle, NodeId};

use crate::error::{Error, Result};

/// Connected components of `nodes`, found by breadth-first search over
/// their neighbour lists. Each component is sorted; components are ordered
/// by their smallest id.
///
/// Neighbours outside `nodes` are ignored.
pub fn components(nodes: &[NodeHandle]) -> Result<Vec<Vec<NodeId>>> {
    let mut adjacency = HashMap::new();
    for node in nodes {
        adjacency.insert(node.id(), node.neighbours()?);
    }

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    let mut ids: Vec<_> = adjacency.keys().copied().collect();
    ids.sort_unstable();

    for start in ids {
        if !seen.insert(start) {
            continue;
        }
        let mut component = BTreeSet::from([start]);
        let mut queue = VecDeque::from([start]);
        while let Some(id) = queue.pop_front() {
            for &next in adjacency.get(&id).into_iter().flatten() {
                if adjacency.contains_key(&next) && seen.insert(next) {
                    component.insert(next);
                    queue.push_back(next);
                }
            }
        }
        result.push(component.into_iter().collect());
    }
    Ok(result)
}

/// Verify that, for the given live nodes:
///
/// - every edge is recorded on both ends;
/// - nodes share a network iff a path of edges joins them;
/// - every network's membership is exactly its component.
pub fn check_connectivity(nodes: &[NodeHandle]) -> Result<()> {
    let by_id: HashMap<NodeId, &NodeHandle> = nodes.iter().map(|node| (node.id(), node)).collect();

    for node in nodes {
        for neighbour in node.neighbours()? {
            let Some(other) = by_id.get(&neighbour) else {
                return Err(Error::InvariantViolation(format!(
                    "{} links to {} which is not live",
                    node.id(),
                    neighbour
                )));
            };
            if !other.neighbours()?.contains(&node.id()) {
                return Err(Error::InvariantViolation(format!(
                    "edge {} -> {} is not symmetric",
                    node.id(),
                    neighbour
                )));
            }
        }
    }

    let mut claimed: HashMap<NetworkId, usize> = HashMap::new();
    for (index, component) in components(nodes)?.iter().enumerate() {
        let network = by_id[&component[0]].network();

        if let Some(previous) = claimed.insert(network.id(), index) {
            return Err(Error::InvariantViolation(format!(
                "components {previous} and {index} share {}",
                network.id()
            )));
        }

        for id in component {
            let actual = by_id[id].network_id();
            if actual != network.id() {
                return Err(Error::InvariantViolation(format!(
                    "{id} is in {actual} but its component is in {}",
                    network.id()
                )));
            }
        }

        let members = network.node_ids();
        if members != *component {
            return Err(Error::InvariantViolation(format!(
                "{} has {} members but its component has {}",
                network.id(),
                members.len(),
                component.len()
            )));
        }
    }
    Ok(())
}
