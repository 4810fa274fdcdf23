//! Wired nodes and the stale-network retry protocol.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::network::{self, Graph, Locked, Member, Network, NetworkSlot};
use crate::{transmit, Endpoint, NetworkId, Packet, PacketReceiver};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique node identifier. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    #[cfg(test)]
    pub(crate) const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Shared handle to a node, as handed out to the environment.
pub type NodeHandle = Arc<Node>;

/// A connection point in the wired topology.
///
/// A node starts alone in its own network. [`link`](Node::link) and
/// [`unlink`](Node::unlink) edit its edges, merging and splitting networks as
/// needed. Dropping the last handle removes the node as if
/// [`remove`](Node::remove) had been called.
pub struct Node {
    id: NodeId,
    endpoint: Arc<dyn Endpoint>,
    slot: Arc<NetworkSlot>,
}

/// Two nodes' networks, exclusively locked.
enum Pair<'a> {
    Shared(Locked<'a>),
    Distinct(Locked<'a>, Locked<'a>),
}

impl Node {
    /// Create a node for `endpoint` in a fresh singleton network.
    pub fn new(endpoint: Arc<dyn Endpoint>) -> NodeHandle {
        let id = NodeId::next();
        let slot = Arc::new_cyclic(|slot| {
            let member = Member::new(Arc::clone(&endpoint), slot.clone());
            NetworkSlot::new(Network::new(Graph::singleton(id, member)))
        });
        trace!(node = %id, "created node");
        Arc::new(Self { id, endpoint, slot })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn endpoint(&self) -> &Arc<dyn Endpoint> {
        &self.endpoint
    }

    /// The network this node currently belongs to.
    ///
    /// Another thread may merge or split it away at any time; re-resolve
    /// rather than holding on to the result.
    pub fn network(&self) -> Arc<Network> {
        self.slot.load()
    }

    pub fn network_id(&self) -> NetworkId {
        self.slot.load().id()
    }

    /// Ids of the directly linked nodes, sorted.
    pub fn neighbours(&self) -> Result<Vec<NodeId>> {
        self.with_read(|_, graph| {
            let mut ids: Vec<_> = graph
                .get(self.id)
                .map(|member| member.neighbours.iter().copied().collect())
                .unwrap_or_default();
            ids.sort_unstable();
            Ok(ids)
        })
    }

    /// Whether there is an edge between this node and `other`.
    pub fn is_linked(&self, other: &Node) -> Result<bool> {
        self.with_read(|_, graph| {
            Ok(graph
                .get(self.id)
                .is_some_and(|member| member.neighbours.contains(&other.id)))
        })
    }

    /// Number of receivers attached to this node.
    pub fn receiver_count(&self) -> Result<usize> {
        self.with_read(|_, graph| Ok(graph.get(self.id).map_or(0, |member| member.receivers.len())))
    }

    /// Attach a receiver. Returns `false` if it was already attached.
    pub fn add_receiver(&self, receiver: Arc<dyn PacketReceiver>) -> Result<bool> {
        self.with_write(|_, graph| {
            Ok(graph
                .get_mut(self.id)
                .is_some_and(|member| member.receivers.insert(receiver)))
        })
    }

    /// Detach a receiver. Returns `false` if it was not attached.
    pub fn remove_receiver(&self, receiver: &Arc<dyn PacketReceiver>) -> Result<bool> {
        self.with_write(|_, graph| {
            Ok(graph
                .get_mut(self.id)
                .is_some_and(|member| member.receivers.remove(receiver)))
        })
    }

    /// Link this node to `other`, merging their networks if they differ.
    ///
    /// Returns `false` if the two were already linked.
    pub fn link(&self, other: &Node) -> Result<bool> {
        if self.id == other.id {
            return Err(Error::SelfLink(self.id));
        }

        self.with_pair(other, |pair| match pair {
            Pair::Shared((_, graph)) => Ok(graph.add_edge(self.id, other.id)),
            Pair::Distinct(mine, theirs) => {
                let (_, graph) = network::merge(mine, theirs);
                Ok(graph.add_edge(self.id, other.id))
            }
        })
    }

    /// Remove the link between this node and `other`, splitting the network
    /// if the link was the only path between them.
    ///
    /// Returns `false` if the two were not linked.
    pub fn unlink(&self, other: &Node) -> Result<bool> {
        if self.id == other.id {
            return Err(Error::SelfLink(self.id));
        }

        self.with_pair(other, |pair| match pair {
            Pair::Distinct(..) => Ok(false),
            Pair::Shared((network, graph)) => {
                if !graph.remove_edge(self.id, other.id) {
                    return Ok(false);
                }
                network::split(network, graph, [self.id, other.id]);
                Ok(true)
            }
        })
    }

    /// Remove this node from the topology.
    ///
    /// All edges are dropped, the former neighbours are split into however
    /// many networks they now form, and attached receivers are discarded.
    /// Every later operation on the node fails with [`Error::InvalidNode`].
    pub fn remove(&self) -> Result<()> {
        self.with_write(|network, graph| {
            let member = graph.remove_member(self.id).ok_or(Error::InvalidNode(self.id))?;
            let created = network::split(network, graph, member.neighbours.iter().copied());
            self.slot.store(Network::empty());
            debug!(
                node = %self.id,
                network = %network.id(),
                neighbours = member.neighbours.len(),
                receivers = member.receivers.len(),
                split = created,
                "removed node"
            );
            Ok(())
        })
    }

    /// Send `packet` to every receiver in this node's network that is in
    /// range and in the sender's dimension.
    ///
    /// The packet must have been built with [`Packet::from_node`] for this
    /// node.
    pub fn transmit_same_dimension(&self, packet: &Packet, range: f64) -> Result<()> {
        self.transmit(packet, range, false)
    }

    /// Send `packet` to every receiver in this node's network, ignoring
    /// distance and dimension.
    pub fn transmit_interdimensional(&self, packet: &Packet) -> Result<()> {
        self.transmit(packet, 0.0, true)
    }

    fn transmit(&self, packet: &Packet, range: f64, interdimensional: bool) -> Result<()> {
        if packet.sender().node() != Some(self.id) {
            return Err(Error::SenderNotInNetwork { node: self.id });
        }

        self.with_read(|network, graph| {
            let delivered = transmit::transmit_wired(graph, self.id, packet, range, interdimensional);
            trace!(
                node = %self.id,
                network = %network.id(),
                channel = packet.channel(),
                delivered,
                "wired transmission"
            );
            Ok(())
        })
    }

    /// Run `f` under the shared lock of the network this node currently
    /// belongs to.
    fn with_read<R>(&self, f: impl FnOnce(&Arc<Network>, &Graph) -> Result<R>) -> Result<R> {
        loop {
            let candidate = self.slot.load();
            let graph = candidate.read();
            if !self.slot.points_at(&candidate) {
                continue;
            }
            self.check_member(&graph)?;
            return f(&candidate, &*graph);
        }
    }

    /// Run `f` under the exclusive lock of the network this node currently
    /// belongs to.
    fn with_write<R>(&self, f: impl FnOnce(&Arc<Network>, &mut Graph) -> Result<R>) -> Result<R> {
        loop {
            let candidate = self.slot.load();
            let mut graph = candidate.write();
            if !self.slot.points_at(&candidate) {
                continue;
            }
            self.check_member(&graph)?;
            return f(&candidate, &mut *graph);
        }
    }

    /// Run `f` with the networks of both nodes exclusively locked.
    fn with_pair<R>(&self, other: &Node, f: impl FnOnce(Pair<'_>) -> Result<R>) -> Result<R> {
        loop {
            let mine = self.slot.load();
            let theirs = other.slot.load();

            if Arc::ptr_eq(&mine, &theirs) {
                let mut graph = mine.write();
                if !(self.slot.points_at(&mine) && other.slot.points_at(&mine)) {
                    continue;
                }
                self.check_member(&graph)?;
                other.check_member(&graph)?;
                return f(Pair::Shared((&mine, &mut *graph)));
            }

            let (mut first, mut second);
            let (my_graph, their_graph) = if mine.id() < theirs.id() {
                first = mine.write();
                second = theirs.write();
                (&mut *first, &mut *second)
            } else {
                first = theirs.write();
                second = mine.write();
                (&mut *second, &mut *first)
            };
            if !(self.slot.points_at(&mine) && other.slot.points_at(&theirs)) {
                continue;
            }
            self.check_member(my_graph)?;
            other.check_member(their_graph)?;
            return f(Pair::Distinct((&mine, my_graph), (&theirs, their_graph)));
        }
    }

    fn check_member(&self, graph: &Graph) -> Result<()> {
        if graph.contains(self.id) {
            Ok(())
        } else {
            Err(Error::InvalidNode(self.id))
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        if self.remove().is_ok() {
            debug!(node = %self.id, "node dropped while still registered");
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("position", &self.endpoint.position())
            .finish_non_exhaustive()
    }
}
