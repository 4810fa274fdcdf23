//! Wirenet Packet Topology
//!
//! Dynamic network topology and packet propagation for independently owned
//! endpoints ("devices").
//!
//! # Two Topology Models
//!
//! - **Wireless**: every receiver lives in one flat [`WirelessDomain`].
//!   Reachability is the straight-line distance between sender and receiver,
//!   compared against the larger of the requested range and the receiver's
//!   own range.
//! - **Wired**: endpoints are wrapped in [`Node`]s joined by undirected links.
//!   A maximal connected set of nodes is a [`Network`]; packets walk the links
//!   breadth-first and accumulate the Euclidean length of every hop.
//!
//! # Networks Change Under You
//!
//! Linking two networks merges them; unlinking a cut edge (or removing a node)
//! splits one network into several. Every node keeps a cell pointing at the
//! network it currently belongs to, and another thread may repoint that cell
//! at any time. Anything that needs a network's lock reads the cell, locks,
//! then re-reads the cell and retries if it moved:
//!
//! ```text
//! loop {
//!     candidate = node.cell
//!     lock(candidate)
//!     if node.cell == candidate { break }   // lock guards the live network
//!     unlock(candidate)
//! }
//! ```
//!
//! Transmissions share a network's lock; links, unlinks and receiver edits
//! take it exclusively. Merges lock both networks in ascending [`NetworkId`]
//! order.
//!
//! # Dimensions
//!
//! Each endpoint lives in a [`DimensionId`]. Packets never cross dimensions
//! unless either the transmission or the receiver is interdimensional, in
//! which case distance is ignored as well.

mod config;
mod context;
mod dimension;
mod error;
mod network;
mod node;
mod packet;
mod receiver;
mod transmit;
mod vec3;
mod wireless;

pub use config::RangeConfig;
pub use context::NetworkContext;
pub use dimension::DimensionId;
pub use error::{Error, Result};
pub use network::{Network, NetworkId};
pub use node::{Node, NodeHandle, NodeId};
pub use packet::{Packet, Payload, SenderInfo};
pub use receiver::{Endpoint, PacketReceiver, ReceiverSet};
pub use vec3::Vec3;
pub use wireless::WirelessDomain;

#[cfg(test)]
pub(crate) mod test_support;
