//! Packets: immutable messages broadcast from one endpoint.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::{DimensionId, Endpoint, Node, NodeId, Vec3};

/// Opaque packet contents, shared between every receiver of a transmission.
pub type Payload = Arc<dyn Any + Send + Sync>;

/// Who sent a packet, and where they were when they did.
///
/// Position and dimension are read from the endpoint once, when the packet
/// is built.
#[derive(Clone)]
pub struct SenderInfo {
    endpoint: Arc<dyn Endpoint>,
    position: Vec3,
    dimension: DimensionId,
    node: Option<NodeId>,
}

impl SenderInfo {
    fn snapshot(endpoint: Arc<dyn Endpoint>, node: Option<NodeId>) -> Self {
        Self {
            position: endpoint.position(),
            dimension: endpoint.dimension(),
            endpoint,
            node,
        }
    }

    pub fn endpoint(&self) -> &Arc<dyn Endpoint> {
        &self.endpoint
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn dimension(&self) -> &DimensionId {
        &self.dimension
    }

    /// The wired node this sender transmits through, if any.
    pub fn node(&self) -> Option<NodeId> {
        self.node
    }
}

impl fmt::Debug for SenderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SenderInfo")
            .field("position", &self.position)
            .field("dimension", &self.dimension)
            .field("node", &self.node)
            .finish_non_exhaustive()
    }
}

/// A message sent on a channel.
///
/// Cloning a packet shares its payload.
#[derive(Clone)]
pub struct Packet {
    channel: u16,
    reply_channel: u16,
    payload: Payload,
    sender: SenderInfo,
}

impl Packet {
    /// Build a packet sent directly by an endpoint, e.g. over a
    /// [`WirelessDomain`](crate::WirelessDomain).
    ///
    /// Such a packet cannot be transmitted through a wired node; use
    /// [`Packet::from_node`] for that.
    pub fn new<T>(channel: u16, reply_channel: u16, payload: T, sender: Arc<dyn Endpoint>) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            channel,
            reply_channel,
            payload: Arc::new(payload),
            sender: SenderInfo::snapshot(sender, None),
        }
    }

    /// Build a packet sent through a wired node. The node's endpoint is the
    /// sender.
    pub fn from_node<T>(channel: u16, reply_channel: u16, payload: T, node: &Node) -> Self
    where
        T: Any + Send + Sync,
    {
        Self {
            channel,
            reply_channel,
            payload: Arc::new(payload),
            sender: SenderInfo::snapshot(Arc::clone(node.endpoint()), Some(node.id())),
        }
    }

    pub fn channel(&self) -> u16 {
        self.channel
    }

    pub fn reply_channel(&self) -> u16 {
        self.reply_channel
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The payload, if it is a `T`.
    pub fn payload_as<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn sender(&self) -> &SenderInfo {
        &self.sender
    }

    /// Whether `endpoint` is the very endpoint that sent this packet.
    ///
    /// Receivers attached to a sender use this to ignore their own packets.
    pub fn is_from(&self, endpoint: &Arc<dyn Endpoint>) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.sender.endpoint), Arc::as_ptr(endpoint))
    }
}

impl fmt::Debug for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Packet")
            .field("channel", &self.channel)
            .field("reply_channel", &self.reply_channel)
            .field("sender", &self.sender)
            .finish_non_exhaustive()
    }
}
