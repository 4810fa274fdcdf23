//! Shared fixtures for the wirenet integration tests.

use std::sync::{Arc, Mutex, PoisonError};

use wirenet_sim::SimEndpoint;
use wirenet_topology::{DimensionId, Node, NodeHandle, Packet, PacketReceiver, Vec3};

pub const OVERWORLD: &str = "overworld";
pub const NETHER: &str = "nether";

/// What a [`Probe`] heard, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum Heard {
    Same { channel: u16, distance: f64 },
    Different { channel: u16 },
}

/// A receiver that records every delivery.
#[derive(Debug)]
pub struct Probe {
    position: Vec3,
    dimension: DimensionId,
    range: f64,
    interdimensional: bool,
    heard: Mutex<Vec<Heard>>,
}

impl Probe {
    pub fn new(position: Vec3, dimension: &str, range: f64, interdimensional: bool) -> Arc<Self> {
        Arc::new(Self {
            position,
            dimension: DimensionId::new(dimension),
            range,
            interdimensional,
            heard: Mutex::new(Vec::new()),
        })
    }

    /// An overworld probe with no range of its own.
    pub fn at(position: Vec3) -> Arc<Self> {
        Self::new(position, OVERWORLD, 0.0, false)
    }

    pub fn heard(&self) -> Vec<Heard> {
        self.heard.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn count(&self) -> usize {
        self.heard.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Distances of the same-dimension deliveries.
    pub fn distances(&self) -> Vec<f64> {
        self.heard()
            .into_iter()
            .filter_map(|heard| match heard {
                Heard::Same { distance, .. } => Some(distance),
                Heard::Different { .. } => None,
            })
            .collect()
    }

    fn record(&self, heard: Heard) {
        self.heard.lock().unwrap_or_else(PoisonError::into_inner).push(heard);
    }
}

impl PacketReceiver for Probe {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn dimension(&self) -> DimensionId {
        self.dimension.clone()
    }

    fn range(&self) -> f64 {
        self.range
    }

    fn is_interdimensional(&self) -> bool {
        self.interdimensional
    }

    fn receive_same_dimension(&self, packet: &Packet, distance: f64) {
        self.record(Heard::Same {
            channel: packet.channel(),
            distance,
        });
    }

    fn receive_different_dimension(&self, packet: &Packet) {
        self.record(Heard::Different {
            channel: packet.channel(),
        });
    }
}

/// A node at `position` in `dimension`.
pub fn node_at(position: Vec3, dimension: &str) -> NodeHandle {
    Node::new(SimEndpoint::shared(position, DimensionId::new(dimension)))
}

/// `count` overworld nodes spaced `spacing` apart along the x axis, unlinked.
pub fn row(count: usize, spacing: f64) -> Vec<NodeHandle> {
    (0..count)
        .map(|i| node_at(Vec3::new(i as f64 * spacing, 64.0, 0.0), OVERWORLD))
        .collect()
}

/// Like [`row`], with each node linked to the next.
pub fn chain(count: usize, spacing: f64) -> Vec<NodeHandle> {
    let nodes = row(count, spacing);
    for pair in nodes.windows(2) {
        pair[0].link(&pair[1]).expect("fresh nodes are valid");
    }
    nodes
}

/// Attach a probe at each node's own position.
pub fn probe_each(nodes: &[NodeHandle]) -> Vec<Arc<Probe>> {
    nodes
        .iter()
        .map(|node| {
            let probe = Probe::at(node.endpoint().position());
            node.add_receiver(probe.clone()).expect("node is valid");
            probe
        })
        .collect()
}
