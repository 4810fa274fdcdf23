//! Reachability and delivery shared by the wired and wireless models.

use std::any::Any;
use std::collections::{HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::network::Graph;
use crate::{NodeId, Packet, PacketReceiver};

/// Decide whether `receiver` hears `packet`, and deliver it if so.
///
/// - Same dimension as the sender: delivered when the transmission or the
///   receiver is interdimensional, or when `within` accepts the effective
///   range `max(range, receiver.range())`. The receiver is told the distance
///   computed by `travelled`.
/// - Different dimension: delivered only when the transmission or the
///   receiver is interdimensional.
///
/// Returns whether a delivery was attempted.
pub(crate) fn try_deliver(
    receiver: &Arc<dyn PacketReceiver>,
    packet: &Packet,
    range: f64,
    interdimensional: bool,
    within: impl FnOnce(f64) -> bool,
    travelled: impl FnOnce() -> f64,
) -> bool {
    let reaches_anywhere = interdimensional || receiver.is_interdimensional();

    if receiver.dimension() == *packet.sender().dimension() {
        let receive_range = range.max(receiver.range());
        if reaches_anywhere || within(receive_range) {
            let distance = travelled();
            isolate(packet, || receiver.receive_same_dimension(packet, distance));
            return true;
        }
    } else if reaches_anywhere {
        isolate(packet, || receiver.receive_different_dimension(packet));
        return true;
    }
    false
}

/// Run a receiver callback, containing any panic so the remaining receivers
/// still get the packet.
fn isolate(packet: &Packet, deliver: impl FnOnce()) {
    if let Err(cause) = panic::catch_unwind(AssertUnwindSafe(deliver)) {
        warn!(
            channel = packet.channel(),
            cause = panic_message(cause.as_ref()),
            "packet receiver panicked during delivery"
        );
    }
}

fn panic_message(cause: &(dyn Any + Send)) -> &str {
    if let Some(message) = cause.downcast_ref::<&str>() {
        *message
    } else if let Some(message) = cause.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Walk the network breadth-first from `source` and offer the packet to
/// every receiver on every visited node. The graph must be locked (at least
/// shared) for the duration.
///
/// Each node is visited once. Its distance is the distance of the node it
/// was first reached from plus the straight-line length of that hop; the
/// source starts at its distance from the packet's sender. Neighbours are
/// expanded in id order so the walk is deterministic.
///
/// Returns the number of deliveries attempted.
pub(crate) fn transmit_wired(
    graph: &Graph,
    source: NodeId,
    packet: &Packet,
    range: f64,
    interdimensional: bool,
) -> usize {
    let Some(start) = graph.get(source) else {
        return 0;
    };
    let start_position = start.endpoint.position();
    let start_distance = packet.sender().position().distance(&start_position);

    let mut visited = HashSet::from([source]);
    let mut queue = VecDeque::from([(source, start_position, start_distance)]);
    let mut delivered = 0;

    while let Some((id, position, distance)) = queue.pop_front() {
        let Some(member) = graph.get(id) else {
            continue;
        };

        for receiver in member.receivers.iter() {
            let reached = try_deliver(
                receiver,
                packet,
                range,
                interdimensional,
                |receive_range| distance < receive_range,
                || distance + position.distance(&receiver.position()),
            );
            if reached {
                delivered += 1;
            }
        }

        let mut next: Vec<_> = member
            .neighbours
            .iter()
            .copied()
            .filter(|id| !visited.contains(id))
            .collect();
        next.sort_unstable();
        for id in next {
            visited.insert(id);
            if let Some(neighbour) = graph.get(id) {
                let next_position = neighbour.endpoint.position();
                queue.push_back((id, next_position, distance + position.distance(&next_position)));
            }
        }
    }

    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Delivery, PanickingReceiver, RecordingReceiver, TestEndpoint, OVERWORLD};
    use crate::{Node, Vec3};

    fn sender() -> Packet {
        Packet::new(9, 9, (), TestEndpoint::shared(Vec3::ORIGIN, OVERWORLD))
    }

    fn offer(receiver: &Arc<RecordingReceiver>, range: f64, interdimensional: bool, distance: f64) -> bool {
        let receiver: Arc<dyn PacketReceiver> = receiver.clone();
        try_deliver(
            &receiver,
            &sender(),
            range,
            interdimensional,
            |receive_range| distance < receive_range,
            || distance,
        )
    }

    #[test]
    fn in_range_same_dimension_delivers() {
        let receiver = RecordingReceiver::at(Vec3::ORIGIN, 0.0);

        assert!(offer(&receiver, 10.0, false, 5.0));
        assert_eq!(receiver.deliveries(), vec![Delivery::Same { channel: 9, distance: 5.0 }]);
    }

    #[test]
    fn out_of_range_same_dimension_skips() {
        let receiver = RecordingReceiver::at(Vec3::ORIGIN, 0.0);

        assert!(!offer(&receiver, 10.0, false, 10.0));
        assert_eq!(receiver.count(), 0);
    }

    #[test]
    fn receiver_range_extends_reach() {
        let receiver = RecordingReceiver::at(Vec3::ORIGIN, 50.0);

        assert!(offer(&receiver, 10.0, false, 40.0));
    }

    #[test]
    fn interdimensional_ignores_distance() {
        let receiver = RecordingReceiver::at(Vec3::ORIGIN, 0.0);

        assert!(offer(&receiver, 0.0, true, 1.0e9));
        assert_eq!(receiver.deliveries(), vec![Delivery::Same { channel: 9, distance: 1.0e9 }]);
    }

    #[test]
    fn other_dimension_needs_interdimensional() {
        let plain = RecordingReceiver::new(Vec3::ORIGIN, "nether", 1.0e9, false);
        let ender = RecordingReceiver::new(Vec3::ORIGIN, "nether", 0.0, true);

        assert!(!offer(&plain, 1.0e9, false, 0.0));
        assert!(offer(&plain, 0.0, true, 0.0));
        assert!(offer(&ender, 0.0, false, 0.0));
        assert_eq!(plain.deliveries(), vec![Delivery::Different { channel: 9 }]);
        assert_eq!(ender.deliveries(), vec![Delivery::Different { channel: 9 }]);
    }

    #[test]
    fn panicking_receiver_is_contained() {
        let node = Node::new(TestEndpoint::shared(Vec3::ORIGIN, OVERWORLD));
        let bomb = Arc::new(PanickingReceiver { position: Vec3::ORIGIN });
        let survivor = RecordingReceiver::at(Vec3::ORIGIN, 0.0);
        node.add_receiver(bomb).unwrap();
        node.add_receiver(survivor.clone()).unwrap();

        let packet = Packet::from_node(4, 4, (), &node);
        node.transmit_same_dimension(&packet, 1.0).unwrap();
        node.transmit_same_dimension(&packet, 1.0).unwrap();

        assert_eq!(survivor.count(), 2);
    }

    #[test]
    fn cycle_visits_each_node_once() {
        let nodes: Vec<_> = [0.0, 1.0, 2.0]
            .iter()
            .map(|&x| Node::new(TestEndpoint::shared(Vec3::new(x, 0.0, 0.0), OVERWORLD)))
            .collect();
        nodes[0].link(&nodes[1]).unwrap();
        nodes[1].link(&nodes[2]).unwrap();
        nodes[2].link(&nodes[0]).unwrap();
        let receivers: Vec<_> = nodes
            .iter()
            .map(|node| {
                let receiver = RecordingReceiver::at(node.endpoint().position(), 0.0);
                node.add_receiver(receiver.clone()).unwrap();
                receiver
            })
            .collect();

        let packet = Packet::from_node(1, 1, (), &nodes[0]);
        nodes[0].transmit_same_dimension(&packet, 100.0).unwrap();

        assert!(receivers.iter().all(|r| r.count() == 1));
    }
}
