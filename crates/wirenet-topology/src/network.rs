//! Networks: connected components of wired nodes.
//!
//! Each [`Network`] owns an arena of its members behind a read/write lock.
//! Adjacency is stored as id sets in the arena, so nodes never point at each
//! other; the only back-reference is a weak handle from a member to the cell
//! its node reads the current network from.
//!
//! # Merge
//!
//! Linking across two networks moves every member of the smaller network
//! into the larger one and repoints the moved members' cells. Both exclusive
//! locks are held for the whole move, taken in ascending [`NetworkId`] order.
//!
//! # Split
//!
//! Removing an edge or a node may disconnect the network. A breadth-first
//! scan from every affected node finds the surviving components. The largest
//! stays in place; every other component is moved into a fresh network whose
//! arena is complete before any cell is repointed at it. The fresh network
//! stays exclusively locked until all of its members' cells point at it, so
//! the retry protocol never lets another thread act on it half-published.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use tracing::debug;

use crate::{Endpoint, NodeId, ReceiverSet};

static NEXT_NETWORK_ID: AtomicU64 = AtomicU64::new(0);

/// Process-unique network identifier. Never reused.
///
/// Ids are handed out in increasing order, which gives the global order
/// merges acquire locks in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkId(u64);

impl NetworkId {
    fn next() -> Self {
        Self(NEXT_NETWORK_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw id value.
    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "net#{}", self.0)
    }
}

/// Arena entry for one node.
pub(crate) struct Member {
    pub(crate) endpoint: Arc<dyn Endpoint>,
    pub(crate) slot: Weak<NetworkSlot>,
    pub(crate) neighbours: HashSet<NodeId>,
    pub(crate) receivers: ReceiverSet,
}

impl Member {
    pub(crate) fn new(endpoint: Arc<dyn Endpoint>, slot: Weak<NetworkSlot>) -> Self {
        Self {
            endpoint,
            slot,
            neighbours: HashSet::new(),
            receivers: ReceiverSet::new(),
        }
    }
}

/// The members and edges of one network.
#[derive(Default)]
pub(crate) struct Graph {
    members: HashMap<NodeId, Member>,
}

impl Graph {
    pub(crate) fn singleton(id: NodeId, member: Member) -> Self {
        Self {
            members: HashMap::from([(id, member)]),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn contains(&self, id: NodeId) -> bool {
        self.members.contains_key(&id)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&Member> {
        self.members.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Member> {
        self.members.get_mut(&id)
    }

    pub(crate) fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.members.keys().copied()
    }

    /// Add an undirected edge between two members. Returns `false` if it
    /// already existed.
    pub(crate) fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let added = match self.members.get_mut(&a) {
            Some(member) => member.neighbours.insert(b),
            None => return false,
        };
        if let Some(member) = self.members.get_mut(&b) {
            member.neighbours.insert(a);
        }
        added
    }

    /// Remove an undirected edge. Returns `false` if there was none.
    pub(crate) fn remove_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        let removed = match self.members.get_mut(&a) {
            Some(member) => member.neighbours.remove(&b),
            None => return false,
        };
        if let Some(member) = self.members.get_mut(&b) {
            member.neighbours.remove(&a);
        }
        removed
    }

    /// Remove a member and every edge touching it.
    pub(crate) fn remove_member(&mut self, id: NodeId) -> Option<Member> {
        let member = self.members.remove(&id)?;
        for neighbour in &member.neighbours {
            if let Some(other) = self.members.get_mut(neighbour) {
                other.neighbours.remove(&id);
            }
        }
        Some(member)
    }

    /// Every member reachable from `start`, including `start`.
    pub(crate) fn component_of(&self, start: NodeId) -> HashSet<NodeId> {
        let mut seen = HashSet::new();
        if !self.contains(start) {
            return seen;
        }

        let mut queue = VecDeque::from([start]);
        seen.insert(start);
        while let Some(id) = queue.pop_front() {
            if let Some(member) = self.members.get(&id) {
                for &next in &member.neighbours {
                    if seen.insert(next) {
                        queue.push_back(next);
                    }
                }
            }
        }
        seen
    }

    /// Move the given members out into a graph of their own.
    fn take(&mut self, ids: &HashSet<NodeId>) -> Graph {
        let members = ids
            .iter()
            .filter_map(|id| self.members.remove_entry(id))
            .collect();
        Graph { members }
    }

    fn slots(&self) -> impl Iterator<Item = Arc<NetworkSlot>> + '_ {
        self.members.values().filter_map(|member| member.slot.upgrade())
    }
}

/// A connected component of wired nodes.
///
/// A network handle obtained from [`Node::network`](crate::Node::network) may
/// go stale at any moment: after a merge the losing network is empty, and
/// after a split the old network keeps only the largest component. Stale
/// networks are never reused.
pub struct Network {
    id: NetworkId,
    graph: RwLock<Graph>,
}

impl Network {
    pub(crate) fn new(graph: Graph) -> Arc<Self> {
        Arc::new(Self {
            id: NetworkId::next(),
            graph: RwLock::new(graph),
        })
    }

    /// A network with no members, used as the final home of removed nodes.
    pub(crate) fn empty() -> Arc<Self> {
        Self::new(Graph::default())
    }

    pub fn id(&self) -> NetworkId {
        self.id
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the node is a member of this network.
    pub fn contains(&self, node: NodeId) -> bool {
        self.read().contains(node)
    }

    /// Ids of all members, sorted.
    pub fn node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<_> = self.read().ids().collect();
        ids.sort_unstable();
        ids
    }

    /// Shared access for traversal.
    ///
    /// The arena is consistent after every mutation step, so a lock poisoned
    /// by a panicking thread is still safe to use.
    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Graph> {
        self.graph.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Exclusive access for mutation.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Graph> {
        self.graph.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Network").field("id", &self.id).finish_non_exhaustive()
    }
}

/// The replaceable reference from a node to its current network.
pub(crate) struct NetworkSlot {
    current: Mutex<Arc<Network>>,
}

impl NetworkSlot {
    pub(crate) fn new(network: Arc<Network>) -> Self {
        Self {
            current: Mutex::new(network),
        }
    }

    pub(crate) fn load(&self) -> Arc<Network> {
        Arc::clone(&self.current.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub(crate) fn store(&self, network: Arc<Network>) {
        *self.current.lock().unwrap_or_else(PoisonError::into_inner) = network;
    }

    /// Whether this slot currently points at `network`.
    pub(crate) fn points_at(&self, network: &Arc<Network>) -> bool {
        Arc::ptr_eq(&self.current.lock().unwrap_or_else(PoisonError::into_inner), network)
    }
}

/// A locked network: the handle and its arena.
pub(crate) type Locked<'a> = (&'a Arc<Network>, &'a mut Graph);

/// Merge two distinct networks. Both must be exclusively locked by the
/// caller. Returns the survivor.
///
/// The larger network survives; on a tie the older (lower id) one does.
pub(crate) fn merge<'a>(a: Locked<'a>, b: Locked<'a>) -> Locked<'a> {
    let a_wins = match a.1.len().cmp(&b.1.len()) {
        std::cmp::Ordering::Greater => true,
        std::cmp::Ordering::Less => false,
        std::cmp::Ordering::Equal => a.0.id() < b.0.id(),
    };
    let ((survivor, into), (loser, from)) = if a_wins { (a, b) } else { (b, a) };

    let moved = from.len();
    for (id, member) in from.members.drain() {
        if let Some(slot) = member.slot.upgrade() {
            slot.store(Arc::clone(survivor));
        }
        into.members.insert(id, member);
    }

    debug!(
        survivor = %survivor.id(),
        absorbed = %loser.id(),
        moved,
        members = into.len(),
        "merged networks"
    );
    (survivor, into)
}

/// Re-derive components after edges touching `seeds` were removed. The
/// network must be exclusively locked by the caller. Returns how many new
/// networks were split off.
pub(crate) fn split(network: &Arc<Network>, graph: &mut Graph, seeds: impl IntoIterator<Item = NodeId>) -> usize {
    let mut assigned = HashSet::new();
    let mut components = Vec::new();
    for seed in seeds {
        if assigned.contains(&seed) || !graph.contains(seed) {
            continue;
        }
        let component = graph.component_of(seed);
        assigned.extend(component.iter().copied());
        components.push(component);
    }

    if components.len() <= 1 {
        return 0;
    }

    // The largest component keeps the existing network.
    let largest = components
        .iter()
        .enumerate()
        .max_by(|(i, x), (j, y)| x.len().cmp(&y.len()).then(j.cmp(i)))
        .map(|(index, _)| index)
        .unwrap_or(0);
    components.swap_remove(largest);

    let created = components.len();
    for component in components {
        let detached = graph.take(&component);
        let slots: Vec<_> = detached.slots().collect();
        let fresh = Network::new(detached);
        debug!(
            from = %network.id(),
            to = %fresh.id(),
            members = component.len(),
            "split off network"
        );
        // Anyone who already sees one member in `fresh` must wait on its
        // lock until every member does.
        let _publishing = fresh.write();
        for slot in slots {
            slot.store(Arc::clone(&fresh));
        }
    }
    created
}
