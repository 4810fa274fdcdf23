//! Fixtures shared by the unit tests.

use std::sync::{Arc, Mutex};

use crate::{DimensionId, Endpoint, Packet, PacketReceiver, Vec3};

pub(crate) const OVERWORLD: &str = "overworld";

pub(crate) struct TestEndpoint {
    position: Vec3,
    dimension: DimensionId,
}

impl TestEndpoint {
    pub(crate) fn shared(position: Vec3, dimension: &str) -> Arc<dyn Endpoint> {
        Arc::new(Self {
            position,
            dimension: DimensionId::new(dimension),
        })
    }
}

impl Endpoint for TestEndpoint {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn dimension(&self) -> DimensionId {
        self.dimension.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Delivery {
    Same { channel: u16, distance: f64 },
    Different { channel: u16 },
}

pub(crate) struct RecordingReceiver {
    position: Vec3,
    dimension: DimensionId,
    range: f64,
    interdimensional: bool,
    deliveries: Mutex<Vec<Delivery>>,
}

impl RecordingReceiver {
    pub(crate) fn new(position: Vec3, dimension: &str, range: f64, interdimensional: bool) -> Arc<Self> {
        Arc::new(Self {
            position,
            dimension: DimensionId::new(dimension),
            range,
            interdimensional,
            deliveries: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn at(position: Vec3, range: f64) -> Arc<Self> {
        Self::new(position, OVERWORLD, range, false)
    }

    pub(crate) fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    pub(crate) fn count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

impl PacketReceiver for RecordingReceiver {
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
        self.deliveries.lock().unwrap().push(Delivery::Same {
            channel: packet.channel(),
            distance,
        });
    }

    fn receive_different_dimension(&self, packet: &Packet) {
        self.deliveries.lock().unwrap().push(Delivery::Different {
            channel: packet.channel(),
        });
    }
}

/// A receiver whose callbacks always panic.
pub(crate) struct PanickingReceiver {
    pub(crate) position: Vec3,
}

impl PacketReceiver for PanickingReceiver {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn dimension(&self) -> DimensionId {
        DimensionId::new(OVERWORLD)
    }

    fn range(&self) -> f64 {
        f64::INFINITY
    }

    fn is_interdimensional(&self) -> bool {
        false
    }

    fn receive_same_dimension(&self, _packet: &Packet, _distance: f64) {
        panic!("receiver exploded");
    }

    fn receive_different_dimension(&self, _packet: &Packet) {
        panic!("receiver exploded");
    }
}
