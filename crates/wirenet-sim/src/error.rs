//! Error types for wirenet-sim.

use thiserror::Error;

/// Result type for simulation runs.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can end a simulation run.
#[derive(Debug, Error)]
pub enum Error {
    /// A topology operation failed in a way the simulation did not expect.
    #[error("topology error: {0}")]
    Topology(#[from] wirenet_topology::Error),

    /// The final topology broke an invariant.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// A configuration value is outside its allowed range.
    #[error("invalid simulation config: {field} = {value}")]
    InvalidConfig { field: &'static str, value: f64 },

    /// A worker thread panicked.
    #[error("worker {0} panicked")]
    WorkerPanicked(usize),
}
