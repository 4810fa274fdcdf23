//! Multi-threaded topology churn with delivery accounting.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};
use wirenet_topology::{DimensionId, Error as TopologyError, NetworkContext, NodeHandle, Packet, Vec3};

use crate::error::{Error, Result};
use crate::fixtures::{CountingReceiver, SimEndpoint};
use crate::oracle::check_connectivity;

/// Configuration for the simulation.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Seed for the workers' RNGs. Scheduling is still up to the OS, so runs
    /// are only reproducible in which operations each worker attempts.
    pub seed: u64,
    /// Number of node slots.
    pub nodes: usize,
    /// Number of worker threads.
    pub workers: usize,
    /// Operations per worker.
    pub steps_per_worker: usize,
    /// Probability that a topology edit is a link rather than an unlink.
    pub link_bias: f64,
    /// Probability that a step transmits rather than edits the topology.
    pub transmit_ratio: f64,
    /// Transmission range for same-dimension packets.
    pub range: f64,
    /// Dimensions nodes are spread over.
    pub dimensions: Vec<DimensionId>,
}

impl SimulationConfig {
    /// Check that the probabilities are usable.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("link_bias", self.link_bias), ("transmit_ratio", self.transmit_ratio)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfig { field, value });
            }
        }
        Ok(())
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            nodes: 64,
            workers: 4,
            steps_per_worker: 2_000,
            link_bias: 0.6,
            transmit_ratio: 0.5,
            range: 64.0,
            dimensions: vec![DimensionId::new("overworld"), DimensionId::new("nether")],
        }
    }
}

/// What happened during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulationReport {
    pub links: u64,
    pub unlinks: u64,
    pub replacements: u64,
    pub wired_transmissions: u64,
    pub wireless_transmissions: u64,
    /// Packets handed to receivers, across both models.
    pub deliveries: u64,
    /// Operations that found their node already replaced.
    pub stale_handles: u64,
    /// Networks left when the run ended.
    pub networks: usize,
    /// Members of the largest network left.
    pub largest_network: usize,
}

#[derive(Default)]
struct Counters {
    links: AtomicU64,
    unlinks: AtomicU64,
    replacements: AtomicU64,
    wired_transmissions: AtomicU64,
    wireless_transmissions: AtomicU64,
    stale_handles: AtomicU64,
}

/// One simulated device: its node and the receivers listening for it.
struct Device {
    node: NodeHandle,
    wired: Arc<CountingReceiver>,
}

/// A fixed set of device slots churned by several threads at once.
pub struct Simulation {
    config: SimulationConfig,
    context: NetworkContext,
    slots: Vec<Mutex<Device>>,
    wireless: Vec<Arc<CountingReceiver>>,
    retired: Mutex<Vec<Arc<CountingReceiver>>>,
    counters: Counters,
}

impl Simulation {
    /// Create a simulation with one unlinked device per slot. Fails if the
    /// configuration does not validate.
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;

        let context = NetworkContext::default();
        let mut slots = Vec::with_capacity(config.nodes);
        let mut wireless = Vec::with_capacity(config.nodes);

        for index in 0..config.nodes {
            let (position, dimension) = placement(&config, index);
            slots.push(Mutex::new(Device::register(&context, position, dimension.clone())?));

            let range = context.wireless_range(position, false);
            let receiver = CountingReceiver::new(position, dimension, range, index % 16 == 0);
            context.wireless().add_receiver(receiver.clone());
            wireless.push(receiver);
        }

        Ok(Self {
            config,
            context,
            slots,
            wireless,
            retired: Mutex::new(Vec::new()),
            counters: Counters::default(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// The live node in every slot.
    pub fn nodes(&self) -> Vec<NodeHandle> {
        self.slots
            .iter()
            .map(|slot| Arc::clone(&lock(slot).node))
            .collect()
    }

    /// Run every worker to completion, then check the connectivity
    /// invariant.
    pub fn run(&self) -> Result<SimulationReport> {
        info!(
            seed = self.config.seed,
            nodes = self.config.nodes,
            workers = self.config.workers,
            steps = self.config.steps_per_worker,
            "starting simulation"
        );

        if self.slots.len() >= 2 {
            thread::scope(|scope| {
                let handles: Vec<_> = (0..self.config.workers)
                    .map(|worker| scope.spawn(move || self.worker(worker)))
                    .collect();

                handles
                    .into_iter()
                    .enumerate()
                    .try_for_each(|(worker, handle)| handle.join().map_err(|_| Error::WorkerPanicked(worker))?)
            })?;
        }

        let nodes = self.nodes();
        check_connectivity(&nodes)?;

        let report = self.report(&nodes);
        info!(?report, "simulation finished");
        Ok(report)
    }

    fn worker(&self, worker: usize) -> Result<()> {
        let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(worker as u64));

        for _ in 0..self.config.steps_per_worker {
            let a = rng.gen_range(0..self.slots.len());
            let outcome = if rng.gen_bool(self.config.transmit_ratio) {
                if rng.gen_bool(0.5) {
                    self.transmit_wired(a)
                } else {
                    self.transmit_wireless(a);
                    Ok(())
                }
            } else {
                let b = loop {
                    let b = rng.gen_range(0..self.slots.len());
                    if b != a {
                        break b;
                    }
                };
                match rng.gen_range(0..100) {
                    0..=2 => self.replace(a),
                    _ if rng.gen_bool(self.config.link_bias) => self.link(a, b),
                    _ => self.unlink(a, b),
                }
            };

            match outcome {
                Ok(()) => {}
                Err(TopologyError::InvalidNode(_)) => {
                    self.counters.stale_handles.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => return Err(err.into()),
            }
        }

        debug!(worker, "worker finished");
        Ok(())
    }

    fn node(&self, index: usize) -> NodeHandle {
        Arc::clone(&lock(&self.slots[index]).node)
    }

    fn link(&self, a: usize, b: usize) -> std::result::Result<(), TopologyError> {
        if self.node(a).link(&self.node(b))? {
            self.counters.links.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn unlink(&self, a: usize, b: usize) -> std::result::Result<(), TopologyError> {
        if self.node(a).unlink(&self.node(b))? {
            self.counters.unlinks.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn transmit_wired(&self, a: usize) -> std::result::Result<(), TopologyError> {
        let node = self.node(a);
        let packet = Packet::from_node(1, 1, a, &node);
        node.transmit_same_dimension(&packet, self.config.range)?;
        self.counters.wired_transmissions.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn transmit_wireless(&self, a: usize) {
        let endpoint = Arc::clone(self.node(a).endpoint());
        let packet = Packet::new(2, 2, a, endpoint);
        self.context.wireless().transmit_same_dimension(&packet, self.config.range);
        self.counters.wireless_transmissions.fetch_add(1, Ordering::Relaxed);
    }

    /// Swap a fresh device into the slot and remove the old node. Workers
    /// still holding the old handle see `InvalidNode`.
    fn replace(&self, a: usize) -> std::result::Result<(), TopologyError> {
        let (position, dimension) = placement(&self.config, a);
        let fresh = Device::register(&self.context, position, dimension)?;
        let old = std::mem::replace(&mut *lock(&self.slots[a]), fresh);

        old.node.remove()?;
        lock(&self.retired).push(old.wired);
        self.counters.replacements.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn report(&self, nodes: &[NodeHandle]) -> SimulationReport {
        let networks: HashSet<_> = nodes.iter().map(|node| node.network_id()).collect();
        let largest_network = nodes.iter().map(|node| node.network().len()).max().unwrap_or(0);

        let wired: u64 = self
            .slots
            .iter()
            .map(|slot| lock(slot).wired.total())
            .chain(lock(&self.retired).iter().map(|receiver| receiver.total()))
            .sum();
        let wireless: u64 = self.wireless.iter().map(|receiver| receiver.total()).sum();

        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        SimulationReport {
            links: load(&self.counters.links),
            unlinks: load(&self.counters.unlinks),
            replacements: load(&self.counters.replacements),
            wired_transmissions: load(&self.counters.wired_transmissions),
            wireless_transmissions: load(&self.counters.wireless_transmissions),
            deliveries: wired + wireless,
            stale_handles: load(&self.counters.stale_handles),
            networks: networks.len(),
            largest_network,
        }
    }
}

impl Device {
    fn register(
        context: &NetworkContext,
        position: Vec3,
        dimension: DimensionId,
    ) -> std::result::Result<Self, TopologyError> {
        let node = context.register_node(SimEndpoint::shared(position, dimension.clone()));
        let wired = CountingReceiver::new(position, dimension, 0.0, false);
        node.add_receiver(wired.clone())?;
        Ok(Self { node, wired })
    }
}

/// Slots are laid out on a square grid eight blocks apart, at an altitude
/// that varies with the slot so wireless ranges differ.
fn placement(config: &SimulationConfig, index: usize) -> (Vec3, DimensionId) {
    let side = (config.nodes as f64).sqrt().ceil().max(1.0) as usize;
    let position = Vec3::new(
        (index % side) as f64 * 8.0,
        64.0 + (index % 7) as f64 * 24.0,
        (index / side) as f64 * 8.0,
    );
    let dimension = if config.dimensions.is_empty() {
        DimensionId::new("overworld")
    } else {
        config.dimensions[index % config.dimensions.len()].clone()
    };
    (position, dimension)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
