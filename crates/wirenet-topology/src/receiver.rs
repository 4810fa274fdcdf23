//! The boundary contract with the environment.
//!
//! The topology never owns the physical things it connects. It only asks an
//! [`Endpoint`] where it is and which dimension it lives in, and it hands
//! packets to [`PacketReceiver`] callbacks.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{DimensionId, Packet, Vec3};

/// Something with a place in the world: a wired node's element or a packet
/// sender.
///
/// Position and dimension must stay stable while the endpoint is part of a
/// topology; the topology reads them on every transmission and never caches.
pub trait Endpoint: Send + Sync {
    /// Current world position.
    fn position(&self) -> Vec3;

    /// Dimension the endpoint lives in.
    fn dimension(&self) -> DimensionId;
}

/// A listener that packets are delivered to.
///
/// Callbacks are fire-and-forget. A panicking callback is caught and logged;
/// it never stops delivery to other receivers and never reaches the sender.
pub trait PacketReceiver: Send + Sync {
    /// Where the receiver is, used for distance checks.
    fn position(&self) -> Vec3;

    /// Dimension the receiver lives in.
    fn dimension(&self) -> DimensionId;

    /// The receiver's own reception range. Reachability uses the larger of
    /// this and the transmission's range.
    fn range(&self) -> f64;

    /// Whether the receiver hears packets regardless of distance and
    /// dimension.
    fn is_interdimensional(&self) -> bool;

    /// Deliver a packet sent from the receiver's dimension.
    ///
    /// `distance` is how far the packet travelled to get here.
    fn receive_same_dimension(&self, packet: &Packet, distance: f64);

    /// Deliver a packet sent from another dimension.
    fn receive_different_dimension(&self, packet: &Packet);
}

/// Identity of a shared receiver: the address of its allocation.
fn key(receiver: &Arc<dyn PacketReceiver>) -> usize {
    Arc::as_ptr(receiver) as *const () as usize
}

/// A set of receivers keyed by identity.
///
/// Adding the same `Arc` twice keeps a single entry; two distinct receivers
/// with equal state are distinct entries.
#[derive(Clone, Default)]
pub struct ReceiverSet {
    receivers: HashMap<usize, Arc<dyn PacketReceiver>>,
}

impl ReceiverSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a receiver. Returns `false` if it was already present.
    pub fn insert(&mut self, receiver: Arc<dyn PacketReceiver>) -> bool {
        self.receivers.insert(key(&receiver), receiver).is_none()
    }

    /// Remove a receiver. Returns `false` if it was not present.
    pub fn remove(&mut self, receiver: &Arc<dyn PacketReceiver>) -> bool {
        self.receivers.remove(&key(receiver)).is_some()
    }

    /// Whether the receiver is in the set.
    pub fn contains(&self, receiver: &Arc<dyn PacketReceiver>) -> bool {
        self.receivers.contains_key(&key(receiver))
    }

    pub fn len(&self) -> usize {
        self.receivers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receivers.is_empty()
    }

    pub fn clear(&mut self) {
        self.receivers.clear();
    }

    /// Iterate over the receivers in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn PacketReceiver>> {
        self.receivers.values()
    }
}

impl std::fmt::Debug for ReceiverSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceiverSet")
            .field("len", &self.receivers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingReceiver;

    #[test]
    fn insert_is_keyed_by_identity() {
        let a: Arc<dyn PacketReceiver> = RecordingReceiver::at(Vec3::ORIGIN, 10.0);
        let b: Arc<dyn PacketReceiver> = RecordingReceiver::at(Vec3::ORIGIN, 10.0);

        let mut set = ReceiverSet::new();
        assert!(set.insert(Arc::clone(&a)));
        assert!(!set.insert(Arc::clone(&a)));
        assert!(set.insert(Arc::clone(&b)));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn remove_only_matching_receiver() {
        let a: Arc<dyn PacketReceiver> = RecordingReceiver::at(Vec3::ORIGIN, 10.0);
        let b: Arc<dyn PacketReceiver> = RecordingReceiver::at(Vec3::ORIGIN, 10.0);

        let mut set = ReceiverSet::new();
        set.insert(Arc::clone(&a));

        assert!(!set.remove(&b));
        assert!(set.contains(&a));
        assert!(set.remove(&a));
        assert!(set.is_empty());
    }
}
