//! The flat, graph-free broadcast domain.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::trace;

use crate::transmit::try_deliver;
use crate::{Packet, PacketReceiver, ReceiverSet};

/// Every receiver in one broadcast domain.
///
/// Reachability is the straight-line distance from the packet's sender to the
/// receiver, inclusive of the effective range. Callbacks run without any lock
/// held, so a receiver may add or remove receivers while handling a packet.
#[derive(Debug, Default)]
pub struct WirelessDomain {
    receivers: RwLock<ReceiverSet>,
}

impl WirelessDomain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a receiver. Returns `false` if it was already registered.
    pub fn add_receiver(&self, receiver: Arc<dyn PacketReceiver>) -> bool {
        self.receivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(receiver)
    }

    /// Deregister a receiver. Returns `false` if it was not registered.
    pub fn remove_receiver(&self, receiver: &Arc<dyn PacketReceiver>) -> bool {
        self.receivers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(receiver)
    }

    pub fn len(&self) -> usize {
        self.receivers.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deregister every receiver.
    pub fn clear(&self) {
        self.receivers.write().unwrap_or_else(PoisonError::into_inner).clear();
    }

    /// Send `packet` to every receiver in range and in the sender's
    /// dimension.
    pub fn transmit_same_dimension(&self, packet: &Packet, range: f64) {
        self.transmit(packet, range, false);
    }

    /// Send `packet` to every receiver, ignoring distance and dimension.
    pub fn transmit_interdimensional(&self, packet: &Packet) {
        self.transmit(packet, 0.0, true);
    }

    fn transmit(&self, packet: &Packet, range: f64, interdimensional: bool) {
        let receivers: Vec<_> = self
            .receivers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect();

        let origin = packet.sender().position();
        let mut delivered = 0;
        for receiver in &receivers {
            let distance_sq = origin.distance_sq(&receiver.position());
            let reached = try_deliver(
                receiver,
                packet,
                range,
                interdimensional,
                |receive_range| distance_sq <= receive_range * receive_range,
                || distance_sq.sqrt(),
            );
            if reached {
                delivered += 1;
            }
        }

        trace!(
            channel = packet.channel(),
            receivers = receivers.len(),
            delivered,
            "wireless transmission"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Delivery, RecordingReceiver, TestEndpoint, OVERWORLD};
    use crate::Vec3;

    fn packet_from(position: Vec3, dimension: &str) -> Packet {
        Packet::new(5, 6, "ping", TestEndpoint::shared(position, dimension))
    }

    #[test]
    fn straight_line_distance() {
        let domain = WirelessDomain::new();
        let near = RecordingReceiver::at(Vec3::new(3.0, 4.0, 0.0), 0.0);
        let far = RecordingReceiver::at(Vec3::new(30.0, 40.0, 0.0), 0.0);
        domain.add_receiver(near.clone());
        domain.add_receiver(far.clone());

        domain.transmit_same_dimension(&packet_from(Vec3::ORIGIN, OVERWORLD), 10.0);

        assert_eq!(near.deliveries(), vec![Delivery::Same { channel: 5, distance: 5.0 }]);
        assert_eq!(far.count(), 0);
    }

    #[test]
    fn boundary_is_inclusive() {
        let domain = WirelessDomain::new();
        let edge = RecordingReceiver::at(Vec3::new(10.0, 0.0, 0.0), 0.0);
        domain.add_receiver(edge.clone());

        domain.transmit_same_dimension(&packet_from(Vec3::ORIGIN, OVERWORLD), 10.0);

        assert_eq!(edge.count(), 1);
    }

    #[test]
    fn receiver_range_is_symmetric() {
        let domain = WirelessDomain::new();
        let tall = RecordingReceiver::at(Vec3::new(0.0, 200.0, 0.0), 384.0);
        domain.add_receiver(tall.clone());

        domain.transmit_same_dimension(&packet_from(Vec3::ORIGIN, OVERWORLD), 64.0);

        assert_eq!(tall.count(), 1);
    }

    #[test]
    fn dimension_gating() {
        let domain = WirelessDomain::new();
        let nether = RecordingReceiver::new(Vec3::ORIGIN, "nether", 1.0e6, false);
        let ender = RecordingReceiver::new(Vec3::new(1.0e7, 0.0, 0.0), "end", 0.0, true);
        domain.add_receiver(nether.clone());
        domain.add_receiver(ender.clone());

        let packet = packet_from(Vec3::ORIGIN, OVERWORLD);
        domain.transmit_same_dimension(&packet, 1.0e6);
        assert_eq!(nether.count(), 0);
        assert_eq!(ender.deliveries(), vec![Delivery::Different { channel: 5 }]);

        domain.transmit_interdimensional(&packet);
        assert_eq!(nether.deliveries(), vec![Delivery::Different { channel: 5 }]);
        assert_eq!(ender.count(), 2);
    }

    #[test]
    fn removed_receiver_hears_nothing() {
        let domain = WirelessDomain::new();
        let receiver: Arc<dyn PacketReceiver> = RecordingReceiver::at(Vec3::ORIGIN, 0.0);

        assert!(domain.add_receiver(receiver.clone()));
        assert!(!domain.add_receiver(receiver.clone()));
        assert_eq!(domain.len(), 1);
        assert!(domain.remove_receiver(&receiver));
        assert!(domain.is_empty());
    }

    #[test]
    fn clear_empties_domain() {
        let domain = WirelessDomain::new();
        domain.add_receiver(RecordingReceiver::at(Vec3::ORIGIN, 0.0));
        domain.add_receiver(RecordingReceiver::at(Vec3::ORIGIN, 0.0));

        domain.clear();
        assert!(domain.is_empty());
    }
}
