//! The explicitly owned home of process-wide networking state.

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::Result;
use crate::{Endpoint, Node, NodeHandle, RangeConfig, Vec3, WirelessDomain};

/// Networking state for one running world.
///
/// Create one at startup and hand it to whatever wires endpoints together.
/// Call [`reset`](NetworkContext::reset) at shutdown or when the world is
/// reloaded.
#[derive(Debug, Default)]
pub struct NetworkContext {
    wireless: WirelessDomain,
    config: RangeConfig,
}

impl NetworkContext {
    pub fn new(config: RangeConfig) -> Self {
        Self {
            wireless: WirelessDomain::new(),
            config,
        }
    }

    /// A context whose range configuration is read from the environment.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new(RangeConfig::from_env()?))
    }

    /// Register an endpoint in the wired topology. The node starts alone in
    /// its own network.
    pub fn register_node(&self, endpoint: Arc<dyn Endpoint>) -> NodeHandle {
        let node = Node::new(endpoint);
        debug!(node = %node.id(), network = %node.network_id(), "registered node");
        node
    }

    /// The wireless broadcast domain.
    pub fn wireless(&self) -> &WirelessDomain {
        &self.wireless
    }

    pub fn config(&self) -> &RangeConfig {
        &self.config
    }

    /// Reception range for a wireless modem at `position`.
    pub fn wireless_range(&self, position: Vec3, storming: bool) -> f64 {
        self.config.range_at(position.y, storming)
    }

    /// Drop all wireless registrations.
    ///
    /// Wired nodes belong to their endpoints and are not touched.
    pub fn reset(&self) {
        let receivers = self.wireless.len();
        self.wireless.clear();
        info!(receivers, "network context reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{RecordingReceiver, TestEndpoint, OVERWORLD};
    use crate::Packet;

    #[test]
    fn registered_nodes_start_alone() {
        let context = NetworkContext::default();
        let a = context.register_node(TestEndpoint::shared(Vec3::ORIGIN, OVERWORLD));
        let b = context.register_node(TestEndpoint::shared(Vec3::ORIGIN, OVERWORLD));

        assert_ne!(a.network_id(), b.network_id());
        assert_eq!(a.network().len(), 1);
    }

    #[test]
    fn wireless_range_follows_altitude() {
        let context = NetworkContext::new(RangeConfig::default());

        assert_eq!(context.wireless_range(Vec3::new(0.0, 64.0, 0.0), false), 64.0);
        assert!(context.wireless_range(Vec3::new(0.0, 200.0, 0.0), false) > 64.0);
    }

    #[test]
    fn reset_clears_wireless() {
        let context = NetworkContext::default();
        let receiver = RecordingReceiver::at(Vec3::ORIGIN, 10.0);
        context.wireless().add_receiver(receiver.clone());

        context.reset();
        let packet = Packet::new(0, 0, (), TestEndpoint::shared(Vec3::ORIGIN, OVERWORLD));
        context.wireless().transmit_same_dimension(&packet, 10.0);

        assert!(context.wireless().is_empty());
        assert_eq!(receiver.count(), 0);
    }

    #[test]
    fn contexts_are_independent() {
        let first = NetworkContext::default();
        let second = NetworkContext::default();
        first.wireless().add_receiver(RecordingReceiver::at(Vec3::ORIGIN, 10.0));

        assert_eq!(first.wireless().len(), 1);
        assert!(second.wireless().is_empty());
    }
}
