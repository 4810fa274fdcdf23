//! Endpoints and receivers for simulated devices.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use wirenet_topology::{DimensionId, Endpoint, Packet, PacketReceiver, Vec3};

/// A device that stays where it was put.
#[derive(Debug, Clone)]
pub struct SimEndpoint {
    position: Vec3,
    dimension: DimensionId,
}

impl SimEndpoint {
    pub fn new(position: Vec3, dimension: DimensionId) -> Self {
        Self { position, dimension }
    }

    pub fn shared(position: Vec3, dimension: DimensionId) -> Arc<dyn Endpoint> {
        Arc::new(Self::new(position, dimension))
    }
}

impl Endpoint for SimEndpoint {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn dimension(&self) -> DimensionId {
        self.dimension.clone()
    }
}

/// A receiver that counts what it hears.
#[derive(Debug)]
pub struct CountingReceiver {
    position: Vec3,
    dimension: DimensionId,
    range: f64,
    interdimensional: bool,
    same_dimension: AtomicU64,
    different_dimension: AtomicU64,
    travelled: AtomicU64,
}

impl CountingReceiver {
    pub fn new(position: Vec3, dimension: DimensionId, range: f64, interdimensional: bool) -> Arc<Self> {
        Arc::new(Self {
            position,
            dimension,
            range,
            interdimensional,
            same_dimension: AtomicU64::new(0),
            different_dimension: AtomicU64::new(0),
            travelled: AtomicU64::new(0),
        })
    }

    /// Packets delivered from the receiver's own dimension.
    pub fn same_dimension(&self) -> u64 {
        self.same_dimension.load(Ordering::Relaxed)
    }

    /// Packets delivered from other dimensions.
    pub fn different_dimension(&self) -> u64 {
        self.different_dimension.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> u64 {
        self.same_dimension() + self.different_dimension()
    }

    /// Longest distance any same-dimension packet travelled, rounded down.
    pub fn max_travelled(&self) -> u64 {
        self.travelled.load(Ordering::Relaxed)
    }
}

impl PacketReceiver for CountingReceiver {
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

    fn receive_same_dimension(&self, _packet: &Packet, distance: f64) {
        self.same_dimension.fetch_add(1, Ordering::Relaxed);
        if distance.is_finite() {
            self.travelled.fetch_max(distance as u64, Ordering::Relaxed);
        }
    }

    fn receive_different_dimension(&self, _packet: &Packet) {
        self.different_dimension.fetch_add(1, Ordering::Relaxed);
    }
}
