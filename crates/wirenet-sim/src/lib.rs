//! Wirenet Churn Simulation
//!
//! Drives a wired topology from many threads at once and checks that the
//! result still obeys the connectivity invariant.
//!
//! # Workers
//!
//! Each worker thread owns a seeded RNG and repeatedly picks one of:
//! - link two random nodes
//! - unlink two random nodes
//! - replace a node (remove it and register a fresh one in its place)
//! - transmit from a random node over the wired network
//! - transmit from a random node over the wireless domain
//!
//! Operations on a node that another worker just replaced fail with
//! `InvalidNode`; those are counted, not treated as errors.
//!
//! # Oracle
//!
//! Once every worker has finished, [`check_connectivity`] recomputes the
//! connected components from the nodes' own neighbour lists and verifies that
//! two nodes share a network exactly when a path joins them.

mod error;
mod fixtures;
mod oracle;
mod simulation;

pub use error::{Error, Result};
pub use fixtures::{CountingReceiver, SimEndpoint};
pub use oracle::{check_connectivity, components};
pub use simulation::{Simulation, SimulationConfig, SimulationReport};
