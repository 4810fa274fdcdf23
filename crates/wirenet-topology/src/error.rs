//! Error types for wirenet-topology.

use thiserror::Error;

use crate::NodeId;

/// Result type for topology operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while editing or transmitting over a topology.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The node has been removed from the topology.
    #[error("node {0} has been removed")]
    InvalidNode(NodeId),

    /// The packet's declared wired sender is not the transmitting node.
    #[error("sender is not in the network of node {node}")]
    SenderNotInNetwork { node: NodeId },

    /// A node cannot be linked to (or unlinked from) itself.
    #[error("cannot link node {0} to itself")]
    SelfLink(NodeId),

    /// An environment override could not be parsed.
    #[error("invalid value for {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },
}
